//! Binding tests: resolve the entry, dump the resolved hierarchy, compare against a baseline.

use testbed_core::{MethodRef, ModuleDef, Session, TypeDef};

use super::test_interfaces::{FailReason, TestCase, TestError, TestEvent, TestKind, TestOutcome, marked_entry};
use super::test_runner::TestReporter;
use crate::compare::{self, Comparison, DUMP_HEADER};
use crate::config::HarnessConfig;
use crate::driver::{self, ActiveTest};

pub struct BindingTest<'c> {
    config: &'c HarnessConfig,
}

impl<'c> BindingTest<'c> {
    pub fn new(config: &'c HarnessConfig) -> Self {
        Self { config }
    }
}

impl TestKind for BindingTest<'_> {
    fn name(&self) -> &'static str {
        "binding"
    }

    fn classify(&self, module: &ModuleDef, ty: &TypeDef) -> Option<MethodRef> {
        match marked_entry(ty, &self.config.binding_marker, &self.config.entry_method) {
            Some(entry) => entry,
            None => {
                // Unmarked: accept a non-trivial module entry point declared on this type
                let entry = module.entry_point.as_ref().filter(|e| e.declaring_type == ty.full_name)?;
                let body = module.method(entry)?.body?;
                (body.instruction_count > self.config.min_entry_instructions).then(|| entry.clone())
            }
        }
    }

    #[tracing::instrument(skip_all, fields(test = %case.display_name))]
    fn execute<S: Session>(
        &self,
        test: &mut ActiveTest<'_, S>,
        case: &TestCase,
        reporter: &mut dyn TestReporter,
    ) -> TestOutcome {
        let resolved = driver::resolve(test);
        reporter.on_event(case, TestEvent::Bound(resolved.elapsed));

        let text = match resolved.result {
            Ok(()) => format!("{}{}", DUMP_HEADER, test.dump_types()),
            Err(e) => e.message,
        };
        let dump = text.into_bytes();

        let escaped = case.escaped_name();
        let dump_path = compare::dump_path(&case.image_dir, &escaped);
        if let Err(source) = compare::write_dump(&dump_path, &dump) {
            return TestError::WriteDump { path: dump_path, source }.into();
        }

        let baseline = compare::read_baseline(&compare::baseline_path(&case.image_dir, &escaped));
        match compare::compare(&dump, baseline) {
            Comparison::Match => TestOutcome::Passed,
            Comparison::MissingBaseline => TestOutcome::Failed(FailReason::MissingBaseline),
            Comparison::Mismatch { baseline } => TestOutcome::Failed(FailReason::BaselineMismatch { baseline, dump }),
        }
    }
}
