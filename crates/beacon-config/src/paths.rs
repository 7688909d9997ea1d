//! Project path resolution.
//!
//! All paths are derived from a single project root: the public asset
//! directory, the source directory, the application entry point, and
//! the production build directory.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Extensions probed for the application entry, in priority order.
pub const MODULE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "mjs"];

/// Path-resolution failures. All are fatal to startup.
#[derive(Debug, Error)]
pub enum PathsError {
    /// A required project file is absent.
    #[error("required file is missing: {}\n\nHint: every beacon project needs public/index.html and a src/index entry", .0.display())]
    MissingFile(PathBuf),

    /// No `src/index.*` entry was found.
    #[error("no application entry found in {}\n\nHint: create src/index.js (or .jsx/.ts/.tsx)", .0.display())]
    NoEntry(PathBuf),
}

/// Well-known locations inside one project.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Static asset root, served after the build output directory.
    pub fn public_dir(&self) -> PathBuf {
        self.root.join("public")
    }

    /// The application shell template.
    pub fn app_html(&self) -> PathBuf {
        self.public_dir().join("index.html")
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    /// Production build output directory.
    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    /// Resolve `src/index.*`, probing [`MODULE_EXTENSIONS`] in order.
    pub fn app_entry(&self) -> Result<PathBuf, PathsError> {
        let src = self.src_dir();
        for ext in MODULE_EXTENSIONS {
            let candidate = src.join(format!("index.{ext}"));
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(PathsError::NoEntry(src))
    }

    /// Verify the files every project must have.
    ///
    /// Checked before any build is attempted so the failure mode is a
    /// clear message instead of a confusing bundler error.
    pub fn check_required_files(&self) -> Result<(), PathsError> {
        let html = self.app_html();
        if !html.is_file() {
            return Err(PathsError::MissingFile(html));
        }
        self.app_entry().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scaffold(dir: &Path, entry: &str) {
        std::fs::create_dir_all(dir.join("public")).unwrap();
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::write(dir.join("public/index.html"), "<html></html>").unwrap();
        std::fs::write(dir.join("src").join(entry), "export {};").unwrap();
    }

    #[test]
    fn test_app_entry_probes_extensions_in_order() {
        let temp = TempDir::new().unwrap();
        scaffold(temp.path(), "index.tsx");

        let paths = ProjectPaths::new(temp.path());
        assert_eq!(paths.app_entry().unwrap(), temp.path().join("src/index.tsx"));

        // js wins over tsx once both exist
        std::fs::write(temp.path().join("src/index.js"), "export {};").unwrap();
        assert_eq!(paths.app_entry().unwrap(), temp.path().join("src/index.js"));
    }

    #[test]
    fn test_check_required_files_ok() {
        let temp = TempDir::new().unwrap();
        scaffold(temp.path(), "index.js");

        let paths = ProjectPaths::new(temp.path());
        assert!(paths.check_required_files().is_ok());
    }

    #[test]
    fn test_check_required_files_missing_html() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("src/index.js"), "export {};").unwrap();

        let paths = ProjectPaths::new(temp.path());
        let err = paths.check_required_files().unwrap_err();
        assert!(matches!(err, PathsError::MissingFile(_)));
    }

    #[test]
    fn test_check_required_files_missing_entry() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("public")).unwrap();
        std::fs::write(temp.path().join("public/index.html"), "<html></html>").unwrap();

        let paths = ProjectPaths::new(temp.path());
        let err = paths.check_required_files().unwrap_err();
        assert!(matches!(err, PathsError::NoEntry(_)));
    }
}
