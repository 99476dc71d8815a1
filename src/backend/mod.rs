//! Native build backend
//!
//! Turns a generated unit set into a built and executed native program.
//!
//! The pipeline is:
//! 1. Append the synthesized `main` unit and let the engine generate includes
//! 2. Persist all units under `<gen root>/<escaped test name>/`
//! 3. Invoke the build command there and fold its output into a [`BuildOutcome`]
//! 4. Unless the build flagged an error, run the produced executable and extract its result token
//!
//! ## Module Organization
//!
//! - `project.rs` - Driver unit synthesis and on-disk layout
//! - `process.rs` - Child processes as finite, ordered line sequences
//! - `build.rs` - Build-output fold and result-token extraction
//! - `native.rs` - Build and run invocations

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod build;
pub mod native;
pub mod process;
pub mod project;

pub use build::{BuildEcho, BuildOutcome, RunOutcome, extract_result};
pub use native::{run_build, run_executable};
pub use project::{add_main_unit, generated_dir, persist_units};
