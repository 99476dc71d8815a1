//! Dump artifacts and baseline comparison for binding tests.
//!
//! A dump is always written as `<escaped name>.dump` next to the test binary. The baseline is the
//! optional, author-supplied `<escaped name>.txt` in the same directory. Baselines are compared after
//! collapsing CRLF to LF, so they can be checked out with either line ending.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Header preceding the engine's type dump.
pub const DUMP_HEADER: &str = "* Types:\n";

/// Result of comparing a fresh dump against its baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,
    /// No baseline file, or it could not be read
    MissingBaseline,
    /// Baseline present but different; carries the normalized baseline
    Mismatch { baseline: Vec<u8> },
}

impl Comparison {
    pub fn is_match(&self) -> bool {
        matches!(self, Comparison::Match)
    }
}

pub fn dump_path(image_dir: &Path, escaped_name: &str) -> PathBuf {
    image_dir.join(format!("{}.dump", escaped_name))
}

pub fn baseline_path(image_dir: &Path, escaped_name: &str) -> PathBuf {
    image_dir.join(format!("{}.txt", escaped_name))
}

/// Collapse every CR LF pair into a single LF in one left-to-right pass.
///
/// Any other CR, including one at the very end of the buffer, is kept as is.
pub fn normalize_newlines(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut bytes = data.iter().copied().peekable();
    while let Some(b) = bytes.next() {
        if b == b'\r' && bytes.peek() == Some(&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

/// Write the dump, replacing any artifact from an earlier run.
pub fn write_dump(path: &Path, dump: &[u8]) -> io::Result<()> {
    fs::write(path, dump)
}

/// Read and normalize the baseline; a missing or unreadable file is `None`.
pub fn read_baseline(path: &Path) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(data) => Some(normalize_newlines(&data)),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no baseline");
            None
        }
    }
}

/// Byte-exact comparison of a dump against an already normalized baseline.
pub fn compare(dump: &[u8], baseline: Option<Vec<u8>>) -> Comparison {
    match baseline {
        None => Comparison::MissingBaseline,
        Some(b) if b == dump => Comparison::Match,
        Some(b) => Comparison::Mismatch { baseline: b },
    }
}

/// Unified diff from baseline to dump, for verbose failure output.
pub fn render_diff(baseline: &[u8], dump: &[u8]) -> String {
    let old = String::from_utf8_lossy(baseline);
    let new = String::from_utf8_lossy(dump);
    similar::TextDiff::from_lines(old.as_ref(), new.as_ref())
        .unified_diff()
        .context_radius(3)
        .header("baseline", "dump")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crlf_collapses() {
        assert_eq!(normalize_newlines(b"a\r\nb\r\n"), b"a\nb\n");
    }

    #[test]
    fn test_lone_cr_kept() {
        assert_eq!(normalize_newlines(b"a\rb"), b"a\rb");
        assert_eq!(normalize_newlines(b"a\r"), b"a\r");
        assert_eq!(normalize_newlines(b"a\r\r\nb"), b"a\r\nb");
        assert_eq!(normalize_newlines(b"a\r\r"), b"a\r\r");
    }

    #[test]
    fn test_compare_outcomes() {
        assert_eq!(compare(b"x\n", None), Comparison::MissingBaseline);
        assert!(compare(b"x\n", Some(b"x\n".to_vec())).is_match());
        assert_eq!(
            compare(b"x\n", Some(b"y\n".to_vec())),
            Comparison::Mismatch { baseline: b"y\n".to_vec() }
        );
        // Length differences alone fail
        assert!(!compare(b"x", Some(b"x\n".to_vec())).is_match());
    }

    #[test]
    fn test_artifact_paths() {
        let dir = Path::new("cases/gc");
        assert_eq!(dump_path(dir, "[a.exe]T"), dir.join("[a.exe]T.dump"));
        assert_eq!(baseline_path(dir, "[a.exe]T"), dir.join("[a.exe]T.txt"));
    }

    #[test]
    fn test_read_baseline_missing_is_none() {
        let dir = std::env::temp_dir().join("testbed_compare_missing");
        assert!(read_baseline(&dir.join("nope.txt")).is_none());
    }

    #[test]
    fn test_baseline_round_trip_on_disk() {
        let dir = std::env::temp_dir().join("testbed_compare_disk");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();

        let baseline = baseline_path(&dir, "case");
        fs::write(&baseline, b"* Types:\r\nA\r\n").unwrap();
        let dump = dump_path(&dir, "case");
        write_dump(&dump, b"* Types:\nA\n").unwrap();

        let written = fs::read(&dump).unwrap();
        assert!(compare(&written, read_baseline(&baseline)).is_match());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_render_diff_marks_changes() {
        let diff = render_diff(b"a\nb\n", b"a\nc\n");
        assert!(diff.contains("-b"));
        assert!(diff.contains("+c"));
    }
}
