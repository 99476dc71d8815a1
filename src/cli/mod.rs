//! CLI module for the testbed harness
//!
//! The translation engine links this crate and hands its [`Engine`] to [`run`].
//!
//! ## Commands
//!
//! - `binding [dir]` - Resolve each binding test and compare its hierarchy dump against a baseline
//! - `codegen [dir]` - Generate, build and run each codegen test; the entry must return `0`
//!
//! ## Modules
//!
//! - `test_interfaces` - The `TestKind` boundary, test cases and outcomes
//! - `binding` / `codegen` - The two test kinds
//! - `test_runner` - Orchestration, stats and reporting
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod binding;
pub mod codegen;
pub mod test_interfaces;
pub mod test_runner;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use testbed_core::Engine;

use self::binding::BindingTest;
use self::codegen::CodegenTest;
use self::test_interfaces::TestKind;
use self::test_runner::{ConsoleReporter, RunSummary, run_suite};
use crate::config::{CommandSpec, HarnessConfig};
use crate::discovery::DiscoveryError;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
    pub const USAGE: ExitCode = ExitCode(2);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<DiscoveryError> for CliError {
    fn from(e: DiscoveryError) -> Self {
        CliError::new(format!("Error: {}", e), ExitCode::USAGE)
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Test harness for the managed-to-native translation pipeline
#[derive(Parser, Debug)]
#[command(name = "testbed")]
#[command(version = VERSION)]
#[command(about = "Test harness for the managed-to-native translation pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by both run modes
#[derive(Args, Debug)]
pub struct SuiteArgs {
    /// Root of the test-case tree
    #[arg(value_name = "DIR", default_value = "testcases")]
    pub dir: PathBuf,
    /// Verbose output (failure details, run totals)
    #[arg(short, long)]
    pub verbose: bool,
    /// Only run tests whose name contains EXPR
    #[arg(short = 'k', value_name = "EXPR")]
    pub filter: Option<String>,
    /// File-name glob for candidate binaries
    #[arg(long, value_name = "GLOB", default_value = "*.exe")]
    pub pattern: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare resolved hierarchy dumps against stored baselines
    Binding {
        #[command(flatten)]
        suite: SuiteArgs,
    },

    /// Generate, build and run native code; each entry must return 0
    Codegen {
        #[command(flatten)]
        suite: SuiteArgs,
        /// Build command run in each generated-source directory
        #[arg(long = "build", value_name = "PROGRAM", num_args = 1.., allow_hyphen_values = true)]
        build: Option<Vec<String>>,
        /// Executable produced by the build
        #[arg(long = "exe", value_name = "NAME")]
        exe: Option<String>,
    },
}

impl SuiteArgs {
    fn config(&self) -> HarnessConfig {
        HarnessConfig::new()
            .with_test_dir(&self.dir)
            .with_image_pattern(&self.pattern)
            .with_filter(self.filter.clone())
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Install the `tracing` subscriber: env-based filter (`RUST_LOG`), defaulting to info.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run<E: Engine>(engine: E) {
    let cli = Cli::parse();

    match execute(cli, &engine) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute<E: Engine>(cli: Cli, engine: &E) -> CliResult<ExitCode> {
    match cli.command {
        Command::Binding { suite } => {
            let config = suite.config();
            run_mode(engine, &BindingTest::new(&config), &config, suite.verbose)
        }
        Command::Codegen { suite, build, exe } => {
            let mut config = suite.config();
            if let Some(build) = build {
                config = config.with_build_command(command_from_args(build)?);
            }
            if let Some(exe) = exe {
                config = config.with_executable(exe);
            }
            run_mode(engine, &CodegenTest::new(&config), &config, suite.verbose)
        }
    }
}

fn command_from_args(mut parts: Vec<String>) -> CliResult<CommandSpec> {
    if parts.is_empty() {
        return Err(CliError::new("Error: --build requires a program", ExitCode::USAGE));
    }
    let program = parts.remove(0);
    Ok(parts.into_iter().fold(CommandSpec::new(program), CommandSpec::arg))
}

fn run_mode<E: Engine, K: TestKind>(engine: &E, kind: &K, config: &HarnessConfig, verbose: bool) -> CliResult<ExitCode> {
    let mut reporter = ConsoleReporter::new(verbose);
    let summary = run_suite(engine, kind, config, &mut reporter)?;
    Ok(exit_code(&summary))
}

/// Exit status for a finished run: success only when every recorded test passed.
pub fn exit_code(summary: &RunSummary) -> ExitCode {
    if summary.stats.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_binding() {
        let cli = Cli::try_parse_from(["testbed", "binding", "cases", "-v", "-k", "Generic"]).unwrap();
        if let Command::Binding { suite } = cli.command {
            assert_eq!(suite.dir, PathBuf::from("cases"));
            assert!(suite.verbose);
            assert_eq!(suite.filter.as_deref(), Some("Generic"));
            assert_eq!(suite.pattern, "*.exe");
        } else {
            panic!("Expected Binding command");
        }
    }

    #[test]
    fn test_cli_parse_codegen_overrides() {
        let cli = Cli::try_parse_from([
            "testbed", "codegen", "--exe", "a.out", "--pattern", "*.dll", "--build", "make", "-j4",
        ])
        .unwrap();
        if let Command::Codegen { suite, build, exe } = cli.command {
            assert_eq!(suite.dir, PathBuf::from("testcases"));
            assert_eq!(suite.pattern, "*.dll");
            assert_eq!(exe.as_deref(), Some("a.out"));
            assert_eq!(build, Some(vec!["make".to_string(), "-j4".to_string()]));
        } else {
            panic!("Expected Codegen command");
        }
    }

    #[test]
    fn test_cli_requires_mode() {
        assert!(Cli::try_parse_from(["testbed"]).is_err());
    }

    #[test]
    fn test_command_from_args() {
        let cmd = command_from_args(vec!["make".to_string(), "-j4".to_string()]).unwrap();
        assert_eq!(cmd, CommandSpec::new("make").arg("-j4"));
        assert!(command_from_args(Vec::new()).is_err());
    }

    #[test]
    fn test_missing_dir_is_usage_error() {
        let cli = Cli::try_parse_from(["testbed", "binding", "/definitely/not/a/testbed/dir"]).unwrap();
        let err = execute(cli, &testbed_core::memory::MemoryEngine::new()).unwrap_err();
        assert_eq!(err.exit_code, ExitCode::USAGE);
        assert!(err.message.contains("not found"));
    }
}
