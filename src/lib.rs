#![forbid(unsafe_code)]
//! Testbed: regression harness for a managed-to-native translation engine
//!
//! The harness walks a tree of compiled test programs, picks out marked test types, and drives
//! the engine once per test in one of two modes:
//!
//! - **binding**: resolve the test's entry point, dump the resolved type hierarchy and compare it
//!   byte-for-byte (newline-normalized) with a stored baseline.
//! - **codegen**: generate native source for the test, add a `main` driver, build it with the
//!   external toolchain, run the executable and expect the entry method to report `0`.
//!
//! The engine itself lives outside this crate behind [`testbed_core::Engine`]; its binary calls
//! [`cli::init_tracing`] and then [`cli::run`].
//!
//! ```no_run
//! use testbed::cli::test_runner::ConsoleReporter;
//! use testbed::cli::binding::BindingTest;
//! use testbed::core::memory::MemoryEngine;
//! use testbed::{HarnessConfig, run_suite};
//!
//! let config = HarnessConfig::new().with_test_dir("testcases");
//! let mut reporter = ConsoleReporter::new(false);
//! let summary = run_suite(&MemoryEngine::new(), &BindingTest::new(&config), &config, &mut reporter)?;
//! println!("{}", summary.stats);
//! # Ok::<(), testbed::discovery::DiscoveryError>(())
//! ```
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `backend` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Per-test failures**: Anything that goes wrong inside one test becomes that test's FAIL reason. Only a missing
//!   test directory or a bad image pattern ends a run early.

pub mod backend;
pub mod cli;
pub mod compare;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod naming;

pub use testbed_core as core;

pub use cli::test_interfaces::{FailReason, TestCase, TestError, TestKind, TestOutcome};
pub use cli::test_runner::{RunStats, RunSummary, TestReporter, run_suite};
pub use config::{CommandSpec, HarnessConfig};
