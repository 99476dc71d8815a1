//! Compile driver: entry registration, timed resolve and generate steps.
//!
//! A session is shared by every test in one image. [`ActiveTest`] holds it exclusively for the
//! duration of one test and resets it when dropped, on every exit path.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use testbed_core::{MethodRef, Session, TypeLoadError, UnitSet};

/// Exclusive use of a session by the current test.
pub struct ActiveTest<'s, S: Session> {
    session: &'s mut S,
}

impl<'s, S: Session> ActiveTest<'s, S> {
    /// Register `entry` as the test's root and take the session.
    pub fn begin(session: &'s mut S, entry: &MethodRef) -> Self {
        session.add_entry_point(entry);
        Self { session }
    }
}

impl<S: Session> Deref for ActiveTest<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.session
    }
}

impl<S: Session> DerefMut for ActiveTest<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session
    }
}

impl<S: Session> Drop for ActiveTest<'_, S> {
    fn drop(&mut self) {
        self.session.reset();
    }
}

/// Outcome of the resolve step.
#[derive(Debug)]
pub struct Resolved {
    pub result: Result<(), TypeLoadError>,
    pub elapsed: Duration,
}

/// Outcome of the generate step.
#[derive(Debug)]
pub struct Generated {
    pub units: UnitSet,
    pub elapsed: Duration,
}

/// Resolve the registered entry. A type-load failure is returned as data, not propagated.
#[tracing::instrument(skip_all)]
pub fn resolve<S: Session>(test: &mut ActiveTest<'_, S>) -> Resolved {
    let start = Instant::now();
    let result = test.resolve();
    let elapsed = start.elapsed();
    if let Err(e) = &result {
        tracing::debug!(message = %e.message, "type load error");
    }
    tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "resolved");
    Resolved { result, elapsed }
}

/// Generate native units for a successfully resolved session.
#[tracing::instrument(skip_all)]
pub fn generate<S: Session>(test: &mut ActiveTest<'_, S>) -> Generated {
    let start = Instant::now();
    let units = test.generate();
    let elapsed = start.elapsed();
    tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, units = units.len(), "generated");
    Generated { units, elapsed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use testbed_core::memory::{MemoryEngine, MemoryImage, SessionEvent};
    use testbed_core::{Engine, MethodDef, ModuleDef, TypeDef};

    fn engine() -> MemoryEngine {
        let module = ModuleDef::new("a.exe")
            .with_type(TypeDef::new("Good").with_method(MethodDef::new("Entry").with_body(3)))
            .with_type(TypeDef::new("Bad").with_method(MethodDef::new("Entry").with_body(3)));
        MemoryEngine::new().with_image(
            "a.exe",
            MemoryImage::new(module).with_type_load_error(MethodRef::new("Bad", "Entry"), "Missing type 'X'"),
        )
    }

    #[test]
    fn test_reset_on_drop() {
        let engine = engine();
        let mut session = engine.open_image(Path::new("a.exe")).unwrap();
        let entry = MethodRef::new("Good", "Entry");
        {
            let mut test = ActiveTest::begin(&mut session, &entry);
            assert!(resolve(&mut test).result.is_ok());
            let generated = generate(&mut test);
            assert!(generated.units.symbol_of(&entry).is_some());
        }
        assert!(session.entries().is_empty());
        assert_eq!(
            engine.journal(),
            vec![
                SessionEvent::AddEntryPoint(entry),
                SessionEvent::Resolve,
                SessionEvent::Generate,
                SessionEvent::Reset,
            ]
        );
    }

    #[test]
    fn test_type_load_error_is_data() {
        let engine = engine();
        let mut session = engine.open_image(Path::new("a.exe")).unwrap();
        let mut test = ActiveTest::begin(&mut session, &MethodRef::new("Bad", "Entry"));
        let resolved = resolve(&mut test);
        assert_eq!(resolved.result.unwrap_err().message, "Missing type 'X'");
    }

    #[test]
    fn test_sequential_tests_do_not_leak_entries() {
        let engine = engine();
        let mut session = engine.open_image(Path::new("a.exe")).unwrap();
        {
            let mut test = ActiveTest::begin(&mut session, &MethodRef::new("Bad", "Entry"));
            assert!(resolve(&mut test).result.is_err());
        }
        let mut test = ActiveTest::begin(&mut session, &MethodRef::new("Good", "Entry"));
        assert!(resolve(&mut test).result.is_ok());
        assert_eq!(test.entries(), &[MethodRef::new("Good", "Entry")]);
    }
}
