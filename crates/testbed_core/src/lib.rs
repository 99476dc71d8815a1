//! Describe the boundary between the testbed harness and the managed-to-native translation engine.
//!
//! The engine itself (image parsing, type resolution, native code generation, hierarchy dumps) lives
//! outside this workspace. This crate only fixes the shape of what the harness consumes:
//!
//! - [`metadata`]: a plain-data view of one managed-code module (types, custom attributes, methods, entry point).
//! - [`engine`]: the [`Engine`] / [`Session`] traits and the two errors the engine may report.
//! - [`units`]: generated native source units and the entry-symbol table returned by code generation.
//! - [`memory`]: an in-memory engine over pre-built metadata, for exercising the harness without a translator.
//!
//! ## Notes
//!
//! - No IO happens here. Engines decide how images are read; the harness decides where artifacts are written.
//! - Sessions are stateful and reused sequentially. Callers must `reset` a session after every test.

pub mod engine;
pub mod memory;
pub mod metadata;
pub mod units;

pub use engine::{Engine, ImageLoadError, Session, TypeLoadError};
pub use metadata::{CustomAttribute, MethodBody, MethodDef, MethodRef, ModuleDef, TypeDef};
pub use units::{CompileUnit, EntrySymbol, UnitSet};
