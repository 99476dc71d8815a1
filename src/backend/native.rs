//! Build-tool and produced-executable invocation.
//!
//! Both steps run synchronously: all output is drained and the child has exited before a result
//! is returned, so nothing the child wrote is read half-flushed.

use std::io;
use std::path::Path;

use super::build::{BuildEcho, BuildMarkers, BuildOutcome, RunOutcome, fold_build_output};
use super::process::{ProcessLines, Stream};
use crate::config::HarnessConfig;

/// Run the configured build command in `dir`; `on_echo` sees every output line as it is classified.
#[tracing::instrument(skip_all, fields(dir = %dir.display(), command = %config.build_command))]
pub fn run_build(dir: &Path, config: &HarnessConfig, on_echo: impl FnMut(&str, BuildEcho)) -> io::Result<BuildOutcome> {
    let mut proc = ProcessLines::spawn(&config.build_command, dir, &config.scrubbed_env)?;
    let markers = BuildMarkers {
        error: &config.error_marker,
        progress: &config.progress_marker,
    };
    let outcome = fold_build_output(proc.by_ref().map(|l| l.text), markers, on_echo);
    let status = proc.finish()?;
    tracing::debug!(?status, had_error = outcome.had_error, lines = outcome.lines.len(), "build finished");
    Ok(outcome)
}

/// Run the produced executable in `dir` with no arguments.
///
/// The summary is the last line written to stdout; stderr lines go to `on_stderr`.
#[tracing::instrument(skip_all, fields(dir = %dir.display(), exe = %config.executable))]
pub fn run_executable(dir: &Path, config: &HarnessConfig, mut on_stderr: impl FnMut(&str)) -> io::Result<RunOutcome> {
    let program = dir.join(&config.executable);
    let mut proc = ProcessLines::spawn_program(&program, &[], dir, &config.scrubbed_env)?;

    let mut summary = None;
    for line in proc.by_ref() {
        match line.stream {
            Stream::Stdout => summary = Some(line.text),
            Stream::Stderr => on_stderr(&line.text),
        }
    }
    let status = proc.finish()?;
    tracing::debug!(?status, ?summary, "executable finished");
    Ok(RunOutcome::from_summary(summary))
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::CommandSpec;
    use std::fs;

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_build_then_run() {
        let dir = scratch("testbed_native_ok");
        let script = "echo 'Compiled: main.cpp'; printf '#!/bin/sh\\necho warn 1>&2\\necho \"Result(0), 3ms\"\\n' > final; chmod +x final";
        let config = HarnessConfig::new()
            .with_build_command(CommandSpec::new("sh").arg("-c").arg(script))
            .with_executable("final");

        let mut progress = 0;
        let build = run_build(&dir, &config, |_, e| {
            if e == BuildEcho::Progress {
                progress += 1;
            }
        })
        .unwrap();
        assert!(!build.had_error);
        assert_eq!(progress, 1);

        let mut errors = Vec::new();
        let run = run_executable(&dir, &config, |l| errors.push(l.to_string())).unwrap();
        assert_eq!(run.summary.as_deref(), Some("Result(0), 3ms"));
        assert_eq!(run.result.as_deref(), Some("0"));
        assert_eq!(errors, vec!["warn".to_string()]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_executable_is_io_error() {
        let dir = scratch("testbed_native_missing");
        let config = HarnessConfig::new().with_executable("final");
        assert!(run_executable(&dir, &config, |_| {}).is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
