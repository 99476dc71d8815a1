//! In-memory engine over pre-built metadata.
//!
//! `MemoryEngine` maps image paths to [`MemoryImage`]s. Opening an unregistered path fails with
//! [`ImageLoadError::NotAnImage`], which is how a stray non-image file looks to the harness.
//! Every session call is appended to a shared journal so callers can check session isolation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::{Engine, ImageLoadError, Session, TypeLoadError};
use crate::metadata::{MethodRef, ModuleDef};
use crate::units::{CompileUnit, UnitSet};

/// Session calls, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    AddEntryPoint(MethodRef),
    Resolve,
    Generate,
    GenerateIncludes,
    Reset,
}

/// One registered image: its module plus canned resolution behaviour.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    module: ModuleDef,
    dumps: HashMap<String, String>,
    type_load_errors: HashMap<MethodRef, String>,
}

impl MemoryImage {
    pub fn new(module: ModuleDef) -> Self {
        Self {
            module,
            dumps: HashMap::new(),
            type_load_errors: HashMap::new(),
        }
    }

    /// Dump text produced for `type_name` once an entry point on it has resolved.
    pub fn with_dump(mut self, type_name: impl Into<String>, text: impl Into<String>) -> Self {
        self.dumps.insert(type_name.into(), text.into());
        self
    }

    /// Make resolution fail with `message` whenever `entry` is registered.
    pub fn with_type_load_error(mut self, entry: MethodRef, message: impl Into<String>) -> Self {
        self.type_load_errors.insert(entry, message.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct MemoryEngine {
    images: HashMap<PathBuf, MemoryImage>,
    journal: Arc<Mutex<Vec<SessionEvent>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>, image: MemoryImage) -> Self {
        self.register(path, image);
        self
    }

    pub fn register(&mut self, path: impl Into<PathBuf>, image: MemoryImage) {
        self.images.insert(path.into(), image);
    }

    /// Snapshot of every session call made so far, across all sessions.
    pub fn journal(&self) -> Vec<SessionEvent> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Engine for MemoryEngine {
    type Session = MemorySession;

    fn open_image(&self, path: &Path) -> Result<MemorySession, ImageLoadError> {
        let image = self.images.get(path).ok_or_else(|| ImageLoadError::NotAnImage {
            path: path.to_path_buf(),
            reason: "no image registered for this path".to_string(),
        })?;

        Ok(MemorySession {
            image: image.clone(),
            entries: Vec::new(),
            resolved: false,
            journal: Arc::clone(&self.journal),
        })
    }
}

#[derive(Debug)]
pub struct MemorySession {
    image: MemoryImage,
    entries: Vec<MethodRef>,
    resolved: bool,
    journal: Arc<Mutex<Vec<SessionEvent>>>,
}

impl MemorySession {
    fn log(&self, event: SessionEvent) {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }

    /// Entry points registered since the last reset.
    pub fn entries(&self) -> &[MethodRef] {
        &self.entries
    }
}

fn unit_name(type_name: &str) -> String {
    type_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

impl Session for MemorySession {
    fn module(&self) -> &ModuleDef {
        &self.image.module
    }

    fn add_entry_point(&mut self, method: &MethodRef) {
        self.log(SessionEvent::AddEntryPoint(method.clone()));
        self.entries.push(method.clone());
    }

    fn resolve(&mut self) -> Result<(), TypeLoadError> {
        self.log(SessionEvent::Resolve);
        if let Some(message) = self.entries.iter().find_map(|e| self.image.type_load_errors.get(e)) {
            return Err(TypeLoadError::new(message.clone()));
        }
        self.resolved = true;
        Ok(())
    }

    fn generate(&mut self) -> UnitSet {
        self.log(SessionEvent::Generate);
        let mut set = UnitSet::new();
        for entry in &self.entries {
            let unit = unit_name(&entry.declaring_type);
            let symbol = format!("met_{}_{}", unit, entry.name);
            let mut cu = CompileUnit::new(unit.clone());
            cu.decl_code = format!("int32_t {}();\n", symbol);
            cu.impl_code = format!("int32_t {}()\n{{\n\treturn 0;\n}}\n", symbol);
            set.push(cu);
            set.bind_symbol(entry.clone(), symbol, unit);
        }
        set
    }

    fn generate_includes(&self, units: &mut UnitSet) {
        self.log(SessionEvent::GenerateIncludes);
        for unit in &mut units.units {
            let mut decl = String::from("#pragma once\n");
            for dep in &unit.decl_depends {
                decl.push_str(&format!("#include \"{}.h\"\n", dep));
            }
            decl.push_str(&unit.decl_code);
            unit.decl_code = decl;

            let mut imp = format!("#include \"{}.h\"\n", unit.name);
            for dep in &unit.impl_depends {
                imp.push_str(&format!("#include \"{}.h\"\n", dep));
            }
            imp.push_str(&unit.impl_code);
            unit.impl_code = imp;
        }
    }

    fn dump_types(&self) -> String {
        if !self.resolved {
            return String::new();
        }
        self.entries
            .iter()
            .map(|e| {
                self.image
                    .dumps
                    .get(&e.declaring_type)
                    .cloned()
                    .unwrap_or_else(|| format!("[{}]\n", e.declaring_type))
            })
            .collect()
    }

    fn reset(&mut self) {
        self.log(SessionEvent::Reset);
        self.entries.clear();
        self.resolved = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MethodDef, TypeDef};

    fn engine() -> MemoryEngine {
        let module = ModuleDef::new("case.exe").with_type(
            TypeDef::new("Ns.Case<T>").with_method(MethodDef::new("Entry").with_body(5)),
        );
        MemoryEngine::new().with_image(
            "cases/case.exe",
            MemoryImage::new(module).with_dump("Ns.Case<T>", "Ns.Case<T>\n  Entry\n"),
        )
    }

    #[test]
    fn test_unregistered_path_is_not_an_image() {
        let err = engine().open_image(Path::new("cases/other.exe")).unwrap_err();
        assert!(matches!(err, ImageLoadError::NotAnImage { .. }));
    }

    #[test]
    fn test_resolve_generate_and_reset() {
        let engine = engine();
        let mut session = engine.open_image(Path::new("cases/case.exe")).unwrap();
        let entry = MethodRef::new("Ns.Case<T>", "Entry");

        session.add_entry_point(&entry);
        session.resolve().unwrap();
        assert_eq!(session.dump_types(), "Ns.Case<T>\n  Entry\n");

        let mut units = session.generate();
        let sym = units.symbol_of(&entry).unwrap().clone();
        assert_eq!(sym.unit, "Ns_Case_T_");
        assert_eq!(sym.symbol, "met_Ns_Case_T__Entry");

        session.generate_includes(&mut units);
        assert!(units.units[0].impl_code.starts_with("#include \"Ns_Case_T_.h\"\n"));

        session.reset();
        assert!(session.entries().is_empty());
        assert_eq!(session.dump_types(), "");
        assert_eq!(engine.journal().last(), Some(&SessionEvent::Reset));
    }

    #[test]
    fn test_type_load_error() {
        let entry = MethodRef::new("Ns.Broken", "Entry");
        let module = ModuleDef::new("broken.exe").with_type(TypeDef::new("Ns.Broken"));
        let engine = MemoryEngine::new().with_image(
            "broken.exe",
            MemoryImage::new(module).with_type_load_error(entry.clone(), "Could not load type 'Missing'"),
        );
        let mut session = engine.open_image(Path::new("broken.exe")).unwrap();
        session.add_entry_point(&entry);
        let err = session.resolve().unwrap_err();
        assert_eq!(err.message, "Could not load type 'Missing'");
    }
}
