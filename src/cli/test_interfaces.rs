//! Test kind boundary
//!
//! A [`TestKind`] decides which types are tests and how a selected test is executed. The two run
//! modes, binding (structural dump vs baseline) and codegen (build, run, check the result token),
//! implement it in `binding.rs` and `codegen.rs`. The runner only sees this trait.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use testbed_core::{MethodRef, ModuleDef, Session, TypeDef};

use super::test_runner::TestReporter;
use crate::discovery::ImageSite;
use crate::driver::ActiveTest;
use crate::naming::{display_name, escape_file_name};

/// Harness failures scoped to one test.
///
/// These become the test's FAIL reason; they never stop the run.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("failed to write dump {}: {source}", path.display())]
    WriteDump {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to locate generated-source directory: {0}")]
    GeneratedDir(#[source] std::io::Error),

    #[error("failed to persist generated units to {}: {source}", dir.display())]
    PersistUnits {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("entry method {0} has no emitted symbol")]
    MissingEntrySymbol(MethodRef),

    #[error("build command failed: {0}")]
    Build(#[source] std::io::Error),

    #[error("failed to run produced executable: {0}")]
    Run(#[source] std::io::Error),
}

/// One selected test.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub image_path: PathBuf,
    pub image_dir: PathBuf,
    pub image_name: String,
    /// Directory of the image relative to the test root
    pub subdir: String,
    pub type_name: String,
    pub entry: MethodRef,
    /// `[imageName]typeFullName`
    pub display_name: String,
}

impl TestCase {
    pub fn new(site: &ImageSite, ty: &TypeDef, entry: MethodRef) -> Self {
        Self {
            image_path: site.path.clone(),
            image_dir: site.dir.clone(),
            image_name: site.file_name.clone(),
            subdir: site.subdir.clone(),
            type_name: ty.full_name.clone(),
            entry,
            display_name: display_name(&site.file_name, &ty.full_name),
        }
    }

    /// Display name usable as a file-name component.
    pub fn escaped_name(&self) -> String {
        escape_file_name(&self.display_name)
    }
}

/// Why a test failed.
#[derive(Debug)]
pub enum FailReason {
    /// Binding: the baseline file is missing or unreadable
    MissingBaseline,
    /// Binding: dump and normalized baseline differ
    BaselineMismatch { baseline: Vec<u8>, dump: Vec<u8> },
    /// Codegen: resolution failed before generation
    TypeLoad(String),
    /// Codegen: the build output contained the error marker
    BuildError { output: Vec<String> },
    /// Codegen: the executable ran but did not report `0`
    UnexpectedResult { summary: Option<String> },
    Harness(TestError),
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailReason::MissingBaseline => write!(f, "no baseline"),
            FailReason::BaselineMismatch { .. } => write!(f, "dump differs from baseline"),
            FailReason::TypeLoad(msg) => write!(f, "type load error: {}", msg),
            FailReason::BuildError { .. } => write!(f, "build error"),
            FailReason::UnexpectedResult { summary: Some(s) } => write!(f, "unexpected result: {}", s),
            FailReason::UnexpectedResult { summary: None } => write!(f, "executable printed no result"),
            FailReason::Harness(e) => write!(f, "{}", e),
        }
    }
}

/// Recorded verdict of one test.
#[derive(Debug)]
pub enum TestOutcome {
    Passed,
    Failed(FailReason),
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }

    pub fn fail_reason(&self) -> Option<&FailReason> {
        match self {
            TestOutcome::Passed => None,
            TestOutcome::Failed(r) => Some(r),
        }
    }
}

impl From<TestError> for TestOutcome {
    fn from(e: TestError) -> Self {
        TestOutcome::Failed(FailReason::Harness(e))
    }
}

/// Progress within one test, in the order it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestEvent<'a> {
    /// Binding-mode resolve step
    Bound(Duration),
    Resolved(Duration),
    Generated(Duration),
    BuildStarted,
    BuildProgress,
    /// First build line containing the error marker
    BuildFailed(&'a str),
    /// Build line after the first error
    BuildOutput(&'a str),
    RunStarted,
    RunSummary(Option<&'a str>),
    RunStderr(&'a str),
}

/// A run mode: test selection plus execution.
pub trait TestKind {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// The entry method if `ty` is a test of this kind; `None` skips the type silently.
    fn classify(&self, module: &ModuleDef, ty: &TypeDef) -> Option<MethodRef>;

    /// Run one selected test. The session already has the entry registered and is reset by the
    /// caller once `test` is dropped.
    fn execute<S: Session>(
        &self,
        test: &mut ActiveTest<'_, S>,
        case: &TestCase,
        reporter: &mut dyn TestReporter,
    ) -> TestOutcome;
}

/// First-attribute marker rule shared by both kinds.
///
/// Only the first custom attribute is inspected. `Some(None)` means the type has attributes but
/// is not marked (or lacks the entry method); `None` means the type carries no attributes at all.
pub(crate) fn marked_entry(ty: &TypeDef, marker: &str, entry_method: &str) -> Option<Option<MethodRef>> {
    let first = ty.custom_attributes.first()?;
    if first.name != marker {
        return Some(None);
    }
    Some(ty.find_method(entry_method).map(|m| ty.method_ref(m)))
}
