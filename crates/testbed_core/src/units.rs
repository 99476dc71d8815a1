//! Generated native source units.

use std::collections::HashMap;

use crate::metadata::MethodRef;

/// One named translation unit: a header half and an implementation half.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileUnit {
    pub name: String,
    pub decl_code: String,
    pub impl_code: String,
    /// Units whose declarations the header needs
    pub decl_depends: Vec<String>,
    /// Units whose declarations the implementation needs
    pub impl_depends: Vec<String>,
}

impl CompileUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Emitted symbol for a method and the unit that defines it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySymbol {
    pub symbol: String,
    pub unit: String,
}

/// Ordered unit list plus the method → symbol table produced by one `generate` call.
#[derive(Debug, Clone, Default)]
pub struct UnitSet {
    pub units: Vec<CompileUnit>,
    symbols: HashMap<MethodRef, EntrySymbol>,
}

impl UnitSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, unit: CompileUnit) {
        self.units.push(unit);
    }

    /// Record where `method` was emitted.
    pub fn bind_symbol(&mut self, method: MethodRef, symbol: impl Into<String>, unit: impl Into<String>) {
        self.symbols.insert(
            method,
            EntrySymbol {
                symbol: symbol.into(),
                unit: unit.into(),
            },
        );
    }

    /// Emitted symbol name and containing unit for `method`.
    pub fn symbol_of(&self, method: &MethodRef) -> Option<&EntrySymbol> {
        self.symbols.get(method)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
