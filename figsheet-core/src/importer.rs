//! Collect image file paths from explicit paths and directory scans.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Extensions recognized as image files (lowercase).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "tif", "tiff", "nd2", "png", "jpg", "jpeg", "bmp", "gif", "webp",
];

/// Whether a path has a supported image extension (case-insensitive).
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Flat, de-duplicated, order-preserving list of absolute file paths.
#[derive(Debug, Clone, Default)]
pub struct FileImporter {
    base: Option<PathBuf>,
    files: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl FileImporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base` instead of the current directory.
    #[must_use]
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
            ..Self::default()
        }
    }

    /// Add one file. Returns `true` if it was not already present.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> bool {
        let abs = self.absolute(path.as_ref());
        if self.seen.insert(abs.clone()) {
            self.files.push(abs);
            true
        } else {
            false
        }
    }

    /// Add every supported image directly inside `dir`, sorted by name.
    ///
    /// Returns the number of newly added files.
    ///
    /// # Errors
    /// Returns the underlying I/O error if the directory cannot be read.
    pub fn add_dir(&mut self, dir: impl AsRef<Path>) -> std::io::Result<usize> {
        let dir = self.absolute(dir.as_ref());
        let mut found: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_supported_image(p))
            .collect();
        found.sort();
        let added = found.into_iter().filter(|p| self.add_file(p)).count();
        log::debug!("scanned {}: {} new files", dir.display(), added);
        Ok(added)
    }

    /// Add a path that may be a file or a directory.
    ///
    /// # Errors
    /// Returns the I/O error of a failed directory scan.
    pub fn add_path(&mut self, path: impl AsRef<Path>) -> std::io::Result<usize> {
        let path = path.as_ref();
        if self.absolute(path).is_dir() {
            self.add_dir(path)
        } else {
            Ok(usize::from(self.add_file(path)))
        }
    }

    /// Remove every collected file.
    pub fn clear(&mut self) {
        self.files.clear();
        self.seen.clear();
    }

    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn into_files(self) -> Vec<PathBuf> {
        self.files
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match &self.base {
            Some(base) => base.join(path),
            None => std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_extension_filter_is_case_insensitive() {
        assert!(is_supported_image(Path::new("a.TIF")));
        assert!(is_supported_image(Path::new("a.nd2")));
        assert!(!is_supported_image(Path::new("a.txt")));
        assert!(!is_supported_image(Path::new("tif")));
    }

    #[test]
    fn test_deduplicates_and_preserves_order() {
        let mut importer = FileImporter::with_base("/base");
        assert!(importer.add_file("b.tif"));
        assert!(importer.add_file("/base/a.tif"));
        assert!(!importer.add_file("/base/b.tif"));
        assert_eq!(
            importer.files(),
            &[PathBuf::from("/base/b.tif"), PathBuf::from("/base/a.tif")]
        );
    }

    #[test]
    fn test_add_dir_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.png", "a.tif", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.tif")).unwrap();

        let mut importer = FileImporter::new();
        assert_eq!(importer.add_path(dir.path()).unwrap(), 2);
        assert_eq!(importer.add_dir(dir.path()).unwrap(), 0);
        let names: Vec<_> = importer
            .files()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.tif", "c.png"]);
    }
}
