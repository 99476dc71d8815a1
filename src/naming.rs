//! Test display names and their filesystem-safe form.

use std::path::{Component, Path};

/// Display name of a test: `[imageFileName]typeFullName`.
pub fn display_name(image_name: &str, type_full_name: &str) -> String {
    format!("[{}]{}", image_name, type_full_name)
}

/// Replace `<` and `>` with `_` so a display name can be used as a file name.
///
/// Every other character passes through, so the character count is preserved.
pub fn escape_file_name(name: &str) -> String {
    name.chars().map(|c| if c == '<' || c == '>' { '_' } else { c }).collect()
}

/// `dir` relative to `root`, with `/` separators; empty when `dir` is the root itself.
///
/// Falls back to the full `dir` when it does not live under `root`.
pub fn relative_dir(dir: &Path, root: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::CurDir => None,
            other => Some(other.as_os_str().to_string_lossy().into_owned()),
        })
        .collect::<Vec<_>>()
        .join("/")
}
