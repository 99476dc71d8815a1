//! Candidate-binary discovery.
//!
//! Walks the test tree for files matching the image pattern, opens each through the engine and
//! hands every type declared in the image's primary module to an [`ImageVisitor`]. A file that
//! cannot be opened is reported once and contributes no tests.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use testbed_core::{Engine, ImageLoadError, ModuleDef, Session, TypeDef};

use crate::naming::relative_dir;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("test directory '{}' not found", .0.display())]
    MissingRoot(PathBuf),

    #[error("invalid image pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Where a candidate binary lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSite {
    pub path: PathBuf,
    /// Directory containing the binary
    pub dir: PathBuf,
    /// File name of the binary, e.g. `generics.exe`
    pub file_name: String,
    /// `dir` relative to the discovery root (`/`-separated, empty at the root)
    pub subdir: String,
}

impl ImageSite {
    fn new(path: PathBuf, root: &Path) -> Self {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let subdir = relative_dir(&dir, root);
        Self {
            path,
            dir,
            file_name,
            subdir,
        }
    }

    /// Path of the binary relative to the discovery root.
    pub fn relative_path(&self) -> String {
        if self.subdir.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.subdir, self.file_name)
        }
    }
}

/// Receives discovery results.
pub trait ImageVisitor<S: Session> {
    /// A candidate file could not be opened as an image.
    fn on_load_error(&mut self, site: &ImageSite, error: &ImageLoadError);

    /// A type declared directly in an opened image's primary module.
    fn on_type(&mut self, session: &mut S, module: &ModuleDef, ty: &TypeDef, site: &ImageSite);
}

/// Find candidate binaries under `root` whose file names match `pattern`, in sorted order.
pub fn discover_images(root: &Path, pattern: &str) -> Result<Vec<ImageSite>, DiscoveryError> {
    if !root.is_dir() {
        return Err(DiscoveryError::MissingRoot(root.to_path_buf()));
    }
    let matcher = glob::Pattern::new(pattern).map_err(|source| DiscoveryError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.matches(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    Ok(files.into_iter().map(|p| ImageSite::new(p, root)).collect())
}

/// Open every discovered image and visit its types.
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn walk<E, V>(engine: &E, root: &Path, pattern: &str, visitor: &mut V) -> Result<usize, DiscoveryError>
where
    E: Engine,
    V: ImageVisitor<E::Session>,
{
    let sites = discover_images(root, pattern)?;
    tracing::debug!(images = sites.len(), "discovered candidate binaries");

    for site in &sites {
        let mut session = match engine.open_image(&site.path) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(path = %site.relative_path(), error = %e, "image load error");
                visitor.on_load_error(site, &e);
                continue;
            }
        };

        let module = session.module().clone();
        for ty in &module.types {
            visitor.on_type(&mut session, &module, ty, site);
        }
    }
    Ok(sites.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use testbed_core::memory::{MemoryEngine, MemoryImage, MemorySession};

    fn tree(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("gc/alloc")).unwrap();
        fs::write(root.join("b.exe"), b"").unwrap();
        fs::write(root.join("gc/alloc/a.exe"), b"").unwrap();
        fs::write(root.join("gc/readme.txt"), b"").unwrap();
        root
    }

    #[test]
    fn test_discover_sorted_matching_files() {
        let root = tree("testbed_discovery_sorted");
        let sites = discover_images(&root, "*.exe").unwrap();
        let rel: Vec<String> = sites.iter().map(ImageSite::relative_path).collect();
        assert_eq!(rel, vec!["b.exe".to_string(), "gc/alloc/a.exe".to_string()]);
        assert_eq!(sites[1].subdir, "gc/alloc");
        assert_eq!(sites[1].file_name, "a.exe");
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_missing_root() {
        let err = discover_images(Path::new("/definitely/not/here"), "*.exe").unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingRoot(_)));
    }

    #[derive(Default)]
    struct Collect {
        load_errors: Vec<String>,
        types: Vec<String>,
    }

    impl ImageVisitor<MemorySession> for Collect {
        fn on_load_error(&mut self, site: &ImageSite, _error: &ImageLoadError) {
            self.load_errors.push(site.relative_path());
        }

        fn on_type(&mut self, _session: &mut MemorySession, _module: &ModuleDef, ty: &TypeDef, site: &ImageSite) {
            self.types.push(format!("{}:{}", site.file_name, ty.full_name));
        }
    }

    #[test]
    fn test_walk_visits_types_and_reports_load_errors() {
        let root = tree("testbed_discovery_walk");
        let module = ModuleDef::new("a.exe")
            .with_type(TypeDef::new("<Module>"))
            .with_type(TypeDef::new("Tests.Alloc"));
        let engine = MemoryEngine::new().with_image(root.join("gc/alloc/a.exe"), MemoryImage::new(module));

        let mut visitor = Collect::default();
        let images = walk(&engine, &root, "*.exe", &mut visitor).unwrap();

        assert_eq!(images, 2);
        assert_eq!(visitor.load_errors, vec!["b.exe".to_string()]);
        assert_eq!(visitor.types, vec!["a.exe:<Module>".to_string(), "a.exe:Tests.Alloc".to_string()]);
        let _ = fs::remove_dir_all(&root);
    }
}
