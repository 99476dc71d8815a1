//! Engine and session traits.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::metadata::{MethodRef, ModuleDef};
use crate::units::UnitSet;

/// Failure to open a candidate file as a managed-code image.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("{} is not a managed-code image: {reason}", path.display())]
    NotAnImage { path: PathBuf, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolution failure for the registered entry points.
///
/// This is an expected test outcome: the message becomes the test's recorded result text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TypeLoadError {
    pub message: String,
}

impl TypeLoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Opens managed-code images.
pub trait Engine {
    type Session: Session;

    /// Load `path` and create a fresh session over its primary module.
    fn open_image(&self, path: &Path) -> Result<Self::Session, ImageLoadError>;
}

/// Mutable translation state for one image.
///
/// A session accumulates entry points and intermediate results. It is reused for every test found
/// in the same image, so [`Session::reset`] must run between tests.
pub trait Session {
    /// The image's primary module.
    fn module(&self) -> &ModuleDef;

    /// Register `method` as a required root for the next resolve.
    fn add_entry_point(&mut self, method: &MethodRef);

    /// Resolve everything reachable from the registered entry points.
    fn resolve(&mut self) -> Result<(), TypeLoadError>;

    /// Emit native source units for the resolved graph.
    fn generate(&mut self) -> UnitSet;

    /// Materialize `#include` directives from each unit's dependency lists.
    fn generate_includes(&self, units: &mut UnitSet);

    /// Deterministic textual dump of the resolved type/method hierarchy.
    fn dump_types(&self) -> String;

    /// Drop entry points and every intermediate result.
    fn reset(&mut self);
}
