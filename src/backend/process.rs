//! Child processes as finite line sequences.
//!
//! [`ProcessLines`] spawns a command with both pipes captured and yields their lines in arrival
//! order as one sequence. Iteration ends once both pipes are closed. The child is always waited
//! for: explicitly through [`ProcessLines::finish`], otherwise when the value is dropped.

use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::config::CommandSpec;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
}

/// A running child whose output is consumed as a single ordered line sequence.
pub struct ProcessLines {
    child: Child,
    lines: Receiver<OutputLine>,
    readers: Vec<JoinHandle<()>>,
    status: Option<ExitStatus>,
}

impl ProcessLines {
    /// Spawn `spec` in `cwd` with `scrubbed_env` removed from the inherited environment.
    pub fn spawn(spec: &CommandSpec, cwd: &Path, scrubbed_env: &[String]) -> io::Result<Self> {
        Self::spawn_program(&spec.program, &spec.args, cwd, scrubbed_env)
    }

    pub fn spawn_program(
        program: impl AsRef<std::ffi::OsStr>,
        args: &[String],
        cwd: &Path,
        scrubbed_env: &[String],
    ) -> io::Result<Self> {
        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for var in scrubbed_env {
            command.env_remove(var);
        }

        let mut child = command.spawn()?;
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut readers = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            readers.push(pump(out, Stream::Stdout, tx.clone()));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(pump(err, Stream::Stderr, tx));
        }

        Ok(Self {
            child,
            lines: rx,
            readers,
            status: None,
        })
    }

    /// Drain any unread output, then wait for the child to exit.
    pub fn finish(mut self) -> io::Result<ExitStatus> {
        self.wait_inner()
    }

    fn wait_inner(&mut self) -> io::Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        while self.lines.recv().is_ok() {}
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        let status = self.child.wait()?;
        self.status = Some(status);
        Ok(status)
    }
}

impl Iterator for ProcessLines {
    type Item = OutputLine;

    fn next(&mut self) -> Option<OutputLine> {
        self.lines.recv().ok()
    }
}

impl Drop for ProcessLines {
    fn drop(&mut self) {
        if let Err(e) = self.wait_inner() {
            tracing::warn!(error = %e, "failed to wait for child process");
        }
    }
}

fn pump<R: Read + Send + 'static>(pipe: R, stream: Stream, tx: Sender<OutputLine>) -> JoinHandle<()> {
    thread::spawn(move || forward_lines(BufReader::new(pipe), stream, &tx))
}

/// Send each complete line of `reader` until EOF, a read error, or a dropped receiver.
fn forward_lines(mut reader: impl BufRead, stream: Stream, tx: &Sender<OutputLine>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Err(e) => {
                tracing::warn!(?stream, error = %e, "stopped reading child output");
                break;
            }
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                let text = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(OutputLine { stream, text }).is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn test_collects_both_streams() {
        let cwd = std::env::temp_dir();
        let mut proc = ProcessLines::spawn(&sh("echo out; echo err 1>&2; echo done"), &cwd, &[]).unwrap();
        let lines: Vec<OutputLine> = proc.by_ref().collect();
        let status = proc.finish().unwrap();

        assert!(status.success());
        let stdout: Vec<&str> = lines
            .iter()
            .filter(|l| l.stream == Stream::Stdout)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(stdout, vec!["out", "done"]);
        assert!(lines.iter().any(|l| l.stream == Stream::Stderr && l.text == "err"));
    }

    #[test]
    fn test_crlf_and_partial_last_line() {
        let cwd = std::env::temp_dir();
        let proc = ProcessLines::spawn(&sh("printf 'a\\r\\nb'"), &cwd, &[]).unwrap();
        let text: Vec<String> = proc.map(|l| l.text).collect();
        assert_eq!(text, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_scrubbed_env_is_removed() {
        let cwd = std::env::temp_dir();
        let proc = ProcessLines::spawn(&sh("echo \"[$HOME]\""), &cwd, &["HOME".to_string()]).unwrap();
        let text: Vec<String> = proc.map(|l| l.text).collect();
        assert_eq!(text, vec!["[]".to_string()]);
    }

    #[test]
    fn test_nonzero_exit_is_reported() {
        let cwd = std::env::temp_dir();
        let proc = ProcessLines::spawn(&sh("exit 3"), &cwd, &[]).unwrap();
        assert_eq!(proc.finish().unwrap().code(), Some(3));
    }

    #[test]
    fn test_missing_program_fails_to_spawn() {
        let cwd = std::env::temp_dir();
        let result = ProcessLines::spawn(&CommandSpec::new("testbed-no-such-program"), &cwd, &[]);
        assert!(result.is_err());
    }

    #[derive(Clone, Default)]
    struct LogBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Serves one line, then fails every read.
    struct ResetPipe {
        served: bool,
    }

    impl Read for ResetPipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::other("connection reset"));
            }
            self.served = true;
            let line = b"first\n";
            buf[..line.len()].copy_from_slice(line);
            Ok(line.len())
        }
    }

    #[test]
    fn test_read_error_is_logged() {
        let logs = LogBuf::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let (tx, rx) = crossbeam_channel::unbounded();
        tracing::subscriber::with_default(subscriber, || {
            forward_lines(BufReader::new(ResetPipe { served: false }), Stream::Stderr, &tx)
        });
        drop(tx);

        let lines: Vec<String> = rx.iter().map(|l| l.text).collect();
        assert_eq!(lines, vec!["first"]);
        let log = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("stopped reading child output"));
        assert!(log.contains("connection reset"));
    }
}
