//! Codegen tests: resolve, generate, build natively, run, and expect the entry to return `0`.

use testbed_core::{MethodRef, ModuleDef, Session, TypeDef};

use super::test_interfaces::{FailReason, TestCase, TestError, TestEvent, TestKind, TestOutcome, marked_entry};
use super::test_runner::TestReporter;
use crate::backend::{self, BuildEcho};
use crate::config::HarnessConfig;
use crate::driver::{self, ActiveTest};

/// Result token the entry method must produce.
pub const EXPECTED_RESULT: &str = "0";

pub struct CodegenTest<'c> {
    config: &'c HarnessConfig,
}

impl<'c> CodegenTest<'c> {
    pub fn new(config: &'c HarnessConfig) -> Self {
        Self { config }
    }
}

impl TestKind for CodegenTest<'_> {
    fn name(&self) -> &'static str {
        "codegen"
    }

    fn classify(&self, _module: &ModuleDef, ty: &TypeDef) -> Option<MethodRef> {
        marked_entry(ty, &self.config.codegen_marker, &self.config.entry_method).flatten()
    }

    #[tracing::instrument(skip_all, fields(test = %case.display_name))]
    fn execute<S: Session>(
        &self,
        test: &mut ActiveTest<'_, S>,
        case: &TestCase,
        reporter: &mut dyn TestReporter,
    ) -> TestOutcome {
        let resolved = driver::resolve(test);
        reporter.on_event(case, TestEvent::Resolved(resolved.elapsed));
        if let Err(e) = resolved.result {
            return TestOutcome::Failed(FailReason::TypeLoad(e.message));
        }

        let generated = driver::generate(test);
        reporter.on_event(case, TestEvent::Generated(generated.elapsed));
        let mut units = generated.units;

        let Some(entry) = units.symbol_of(&case.entry).cloned() else {
            return TestError::MissingEntrySymbol(case.entry.clone()).into();
        };
        backend::add_main_unit(&mut units, &entry, &self.config.runtime_init);
        test.generate_includes(&mut units);

        let dir = match backend::generated_dir(&case.image_dir, &self.config.generated_root, &case.escaped_name()) {
            Ok(d) => d,
            Err(e) => return TestError::GeneratedDir(e).into(),
        };
        if let Err(source) = backend::persist_units(&dir, &units) {
            return TestError::PersistUnits { dir, source }.into();
        }

        reporter.on_event(case, TestEvent::BuildStarted);
        let build = backend::run_build(&dir, self.config, |line, echo| match echo {
            BuildEcho::Quiet => {}
            BuildEcho::Progress => reporter.on_event(case, TestEvent::BuildProgress),
            BuildEcho::FirstError => reporter.on_event(case, TestEvent::BuildFailed(line)),
            BuildEcho::Error => reporter.on_event(case, TestEvent::BuildOutput(line)),
        });
        let build = match build {
            Ok(b) => b,
            Err(e) => return TestError::Build(e).into(),
        };
        if build.had_error {
            return TestOutcome::Failed(FailReason::BuildError { output: build.lines });
        }

        reporter.on_event(case, TestEvent::RunStarted);
        let run = backend::run_executable(&dir, self.config, |line| {
            reporter.on_event(case, TestEvent::RunStderr(line))
        });
        let run = match run {
            Ok(r) => r,
            Err(e) => return TestError::Run(e).into(),
        };
        reporter.on_event(case, TestEvent::RunSummary(run.summary.as_deref()));

        if run.result.as_deref() == Some(EXPECTED_RESULT) {
            TestOutcome::Passed
        } else {
            TestOutcome::Failed(FailReason::UnexpectedResult { summary: run.summary })
        }
    }
}
