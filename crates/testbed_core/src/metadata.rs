//! Plain-data metadata for one managed-code module.
//!
//! Engines translate whatever their loader produces into these types once per image. The harness only
//! needs enough to classify types: attribute names, methods with optional bodies, and the module entry point.

/// Reference to a method by declaring type and simple name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Fully qualified name of the declaring type
    pub declaring_type: String,
    /// Simple method name
    pub name: String,
}

impl MethodRef {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for MethodRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// IL body summary; only the instruction count matters to the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodBody {
    pub instruction_count: usize,
}

/// A method declared on a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    /// `None` for abstract, extern and runtime-provided methods
    pub body: Option<MethodBody>,
}

impl MethodDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, instruction_count: usize) -> Self {
        self.body = Some(MethodBody { instruction_count });
        self
    }
}

/// A custom attribute applied to a type, identified by its attribute type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAttribute {
    pub namespace: String,
    /// Simple type name, e.g. `TestAttribute`
    pub name: String,
}

impl CustomAttribute {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// A type declared directly in a module, with attributes in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub full_name: String,
    pub custom_attributes: Vec<CustomAttribute>,
    pub methods: Vec<MethodDef>,
}

impl TypeDef {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            custom_attributes: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: CustomAttribute) -> Self {
        self.custom_attributes.push(attribute);
        self
    }

    pub fn with_method(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }

    /// Find a method by simple name; the first declaration wins for overloads.
    pub fn find_method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Build a [`MethodRef`] to one of this type's methods.
    pub fn method_ref(&self, method: &MethodDef) -> MethodRef {
        MethodRef::new(self.full_name.clone(), method.name.clone())
    }
}

/// The primary module of a managed-code image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleDef {
    pub name: String,
    pub types: Vec<TypeDef>,
    pub entry_point: Option<MethodRef>,
}

impl ModuleDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            entry_point: None,
        }
    }

    pub fn with_type(mut self, ty: TypeDef) -> Self {
        self.types.push(ty);
        self
    }

    pub fn with_entry_point(mut self, entry: MethodRef) -> Self {
        self.entry_point = Some(entry);
        self
    }

    /// Look up a method through a reference, if its declaring type lives in this module.
    pub fn method(&self, method: &MethodRef) -> Option<&MethodDef> {
        self.types
            .iter()
            .find(|t| t.full_name == method.declaring_type)
            .and_then(|t| t.find_method(&method.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_method_returns_first_overload() {
        let ty = TypeDef::new("Ns.Case")
            .with_method(MethodDef::new("Entry").with_body(4))
            .with_method(MethodDef::new("Entry"));
        assert_eq!(ty.find_method("Entry").and_then(|m| m.body), Some(MethodBody { instruction_count: 4 }));
        assert!(ty.find_method("Missing").is_none());
    }

    #[test]
    fn test_module_method_lookup() {
        let module = ModuleDef::new("case.exe")
            .with_type(TypeDef::new("Program").with_method(MethodDef::new("Main").with_body(1)))
            .with_entry_point(MethodRef::new("Program", "Main"));
        let entry = module.entry_point.clone().unwrap();
        assert!(module.method(&entry).is_some());
        assert!(module.method(&MethodRef::new("Other", "Main")).is_none());
    }
}
