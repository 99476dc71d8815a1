//! Test runner implementation
//!
//! ## TestReporter Trait
//!
//! The runner uses a `TestReporter` trait to separate reporting from execution. The default
//! [`ConsoleReporter`] prints one line per test, coloured PASS/FAIL, and echoes build and run
//! errors to stderr.
//!
//! ## Flow
//!
//! Discovery opens every candidate binary and hands each declared type to the active
//! [`TestKind`]. Types it selects run one at a time; the shared session is reset before the next
//! test starts. Every selected test ends up in exactly one [`TestRecord`] and is counted once in
//! [`RunStats`]. Nothing a single test does stops the run.

use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use testbed_core::{Engine, ImageLoadError, ModuleDef, Session, TypeDef};

use super::test_interfaces::{FailReason, TestCase, TestEvent, TestKind, TestOutcome};
use crate::compare::render_diff;
use crate::config::HarnessConfig;
use crate::discovery::{self, DiscoveryError, ImageSite, ImageVisitor};
use crate::driver::ActiveTest;

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting test execution results.
pub trait TestReporter {
    /// Called when discovery begins
    fn on_discovery_start(&mut self, _root: &Path) {}

    /// Called when a candidate binary is not a loadable image
    fn on_load_error(&mut self, site: &ImageSite, error: &ImageLoadError);

    /// Called when a selected test starts
    fn on_test_start(&mut self, case: &TestCase);

    /// Called as a test moves through its steps
    fn on_event(&mut self, _case: &TestCase, _event: TestEvent<'_>) {}

    /// Called once a test's verdict is known
    fn on_test_complete(&mut self, case: &TestCase, outcome: &TestOutcome);

    /// Called when all tests have completed
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Pass/total counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub passed: usize,
}

impl RunStats {
    /// Count one classified test.
    pub fn record(&mut self, passed: bool) {
        self.total += 1;
        if passed {
            self.passed += 1;
        }
    }

    pub fn failed(&self) -> usize {
        self.total - self.passed
    }

    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.passed, self.total)
    }
}

/// One selected test and its verdict.
#[derive(Debug)]
pub struct TestRecord {
    pub case: TestCase,
    pub outcome: TestOutcome,
}

/// Summary of a test run
#[derive(Debug)]
pub struct RunSummary {
    pub mode: &'static str,
    /// Candidate binaries found, loadable or not
    pub images: usize,
    pub load_errors: usize,
    pub stats: RunStats,
    pub records: Vec<TestRecord>,
    pub duration: Duration,
}

/// Default console reporter
pub struct ConsoleReporter {
    pub verbose: bool,
    color: bool,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            color: true,
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
        }
    }

    /// Report into arbitrary writers without ANSI colours.
    pub fn with_writers(out: Box<dyn Write>, err: Box<dyn Write>, verbose: bool) -> Self {
        Self {
            verbose,
            color: false,
            out,
            err,
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    fn print_failure_detail(&mut self, reason: &FailReason) {
        let detail = match reason {
            FailReason::BaselineMismatch { baseline, dump } => render_diff(baseline, dump),
            FailReason::BuildError { output } => output.join("\n") + "\n",
            other => format!("{}\n", other),
        };
        for line in detail.lines() {
            let _ = writeln!(self.out, "    {}", line);
        }
    }
}

// Console output is best effort; a closed stdout must not fail a test.
impl TestReporter for ConsoleReporter {
    fn on_load_error(&mut self, site: &ImageSite, error: &ImageLoadError) {
        let _ = match error {
            ImageLoadError::NotAnImage { .. } => writeln!(
                self.out,
                "* Load Error: \"{}\" is not a managed-code image.",
                site.relative_path()
            ),
            ImageLoadError::Io { source, .. } => writeln!(
                self.out,
                "* Load Error: \"{}\" could not be read: {}",
                site.relative_path(),
                source
            ),
        };
    }

    fn on_test_start(&mut self, case: &TestCase) {
        let _ = if case.subdir.is_empty() {
            write!(self.out, "{}: ", case.display_name)
        } else {
            write!(self.out, "{} {}: ", case.subdir, case.display_name)
        };
        let _ = self.out.flush();
    }

    fn on_event(&mut self, _case: &TestCase, event: TestEvent<'_>) {
        let _ = match event {
            TestEvent::Bound(d) => write!(self.out, "{}ms, ", d.as_millis()),
            TestEvent::Resolved(d) => write!(self.out, "Res({}ms) ", d.as_millis()),
            TestEvent::Generated(d) => write!(self.out, "Gen({}ms) ", d.as_millis()),
            TestEvent::BuildStarted => write!(self.out, "Building"),
            TestEvent::BuildProgress => write!(self.out, "."),
            TestEvent::BuildFailed(line) => {
                let _ = writeln!(self.out);
                let _ = self.out.flush();
                writeln!(self.err, "{}", line)
            }
            TestEvent::BuildOutput(line) | TestEvent::RunStderr(line) => writeln!(self.err, "{}", line),
            TestEvent::RunStarted => write!(self.out, " Running"),
            TestEvent::RunSummary(summary) => write!(self.out, " {} ", summary.unwrap_or("")),
        };
        let _ = self.out.flush();
    }

    fn on_test_complete(&mut self, _case: &TestCase, outcome: &TestOutcome) {
        let verdict = match outcome {
            TestOutcome::Passed => self.paint("32", "PASS"),
            TestOutcome::Failed(_) => self.paint("31", "FAIL"),
        };
        let _ = writeln!(self.out, "{}", verdict);

        if self.verbose {
            if let TestOutcome::Failed(reason) = outcome {
                self.print_failure_detail(reason);
            }
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        let line = format!("Passed: {}", summary.stats);
        let line = if summary.stats.all_passed() {
            self.paint("1;32", &line)
        } else {
            self.paint("1;31", &line)
        };
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "{}", line);
        if self.verbose {
            let _ = writeln!(
                self.out,
                "{} test(s) from {} image(s), {} load error(s) in {:.2}s",
                summary.stats.total,
                summary.images,
                summary.load_errors,
                summary.duration.as_secs_f64()
            );
        }
        let _ = self.out.flush();
    }
}

// ============================================================================
// Run orchestration
// ============================================================================

struct SuiteRun<'a, K: TestKind> {
    kind: &'a K,
    config: &'a HarnessConfig,
    reporter: &'a mut dyn TestReporter,
    stats: RunStats,
    records: Vec<TestRecord>,
    load_errors: usize,
}

impl<S: Session, K: TestKind> ImageVisitor<S> for SuiteRun<'_, K> {
    fn on_load_error(&mut self, site: &ImageSite, error: &ImageLoadError) {
        self.load_errors += 1;
        self.reporter.on_load_error(site, error);
    }

    fn on_type(&mut self, session: &mut S, module: &ModuleDef, ty: &TypeDef, site: &ImageSite) {
        let Some(entry) = self.kind.classify(module, ty) else {
            return;
        };
        let case = TestCase::new(site, ty, entry);
        if !self.config.selects(&case.display_name) {
            tracing::debug!(test = %case.display_name, "filtered out");
            return;
        }

        self.reporter.on_test_start(&case);
        let outcome = {
            let mut test = ActiveTest::begin(session, &case.entry);
            self.kind.execute(&mut test, &case, &mut *self.reporter)
        };

        self.stats.record(outcome.passed());
        tracing::debug!(
            mode = self.kind.name(),
            test = %case.display_name,
            passed = outcome.passed(),
            "test recorded"
        );
        self.reporter.on_test_complete(&case, &outcome);
        self.records.push(TestRecord { case, outcome });
    }
}

/// Run every test of `kind` found under the configured test directory.
///
/// Only a missing test directory or an invalid pattern is an error; every per-test failure is
/// recorded in the summary instead.
#[tracing::instrument(skip_all, fields(mode = kind.name(), root = %config.test_dir.display()))]
pub fn run_suite<E: Engine, K: TestKind>(
    engine: &E,
    kind: &K,
    config: &HarnessConfig,
    reporter: &mut dyn TestReporter,
) -> Result<RunSummary, DiscoveryError> {
    let start = Instant::now();
    reporter.on_discovery_start(&config.test_dir);

    let mut suite = SuiteRun {
        kind,
        config,
        reporter,
        stats: RunStats::default(),
        records: Vec::new(),
        load_errors: 0,
    };
    let images = discovery::walk(engine, &config.test_dir, &config.image_pattern, &mut suite)?;

    let summary = RunSummary {
        mode: kind.name(),
        images,
        load_errors: suite.load_errors,
        stats: suite.stats,
        records: suite.records,
        duration: start.elapsed(),
    };
    suite.reporter.on_run_complete(&summary);
    Ok(summary)
}
