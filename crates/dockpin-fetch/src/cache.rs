use crate::FetchError;
use std::fs;
use std::path::{Path, PathBuf};

/// apt's own archive cache, so installed artifacts line up with what apt expects.
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/apt/archives";

/// Directory layout of the package cache.
///
/// Finished artifacts live directly under the root; in-flight downloads live
/// in `partial/` until verified.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
}

impl Default for CacheLayout {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_DIR)
    }
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn partial_dir(&self) -> PathBuf {
        self.root.join("partial")
    }

    #[inline]
    pub fn artifact_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    #[inline]
    pub fn partial_path(&self, filename: &str) -> PathBuf {
        self.partial_dir().join(filename)
    }

    pub fn initialize(&self) -> Result<(), FetchError> {
        fs::create_dir_all(self.partial_dir())?;
        Ok(())
    }

    pub fn is_cached(&self, filename: &str) -> bool {
        self.artifact_path(filename).is_file()
    }

    /// Remove a leftover placeholder. Missing placeholders are not an error.
    pub fn discard_partial(&self, filename: &str) -> Result<(), FetchError> {
        validate_filename(filename)?;
        remove_if_exists(&self.partial_path(filename))
    }

    pub fn remove_artifact(&self, filename: &str) -> Result<(), FetchError> {
        validate_filename(filename)?;
        remove_if_exists(&self.artifact_path(filename))
    }
}

fn remove_if_exists(path: &Path) -> Result<(), FetchError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// A lock file names the artifact; it must not escape the cache directory.
pub(crate) fn validate_filename(filename: &str) -> Result<(), FetchError> {
    if filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains('\0')
    {
        return Err(FetchError::InvalidFilename(filename.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = CacheLayout::new("/cache");
        assert_eq!(layout.partial_dir(), PathBuf::from("/cache/partial"));
        assert_eq!(
            layout.artifact_path("curl_1.0_amd64.deb"),
            PathBuf::from("/cache/curl_1.0_amd64.deb")
        );
        assert_eq!(
            layout.partial_path("curl_1.0_amd64.deb"),
            PathBuf::from("/cache/partial/curl_1.0_amd64.deb")
        );
        assert_eq!(CacheLayout::default().root(), Path::new(DEFAULT_CACHE_DIR));
    }

    #[test]
    fn initialize_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path());
        layout.initialize().unwrap();
        assert!(layout.partial_dir().is_dir());

        fs::write(layout.partial_path("a.deb"), b"half").unwrap();
        layout.discard_partial("a.deb").unwrap();
        assert!(!layout.partial_path("a.deb").exists());
        layout.discard_partial("a.deb").unwrap();
    }

    #[test]
    fn remove_artifact_clears_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path());
        layout.initialize().unwrap();
        fs::write(layout.artifact_path("a.deb"), b"x").unwrap();
        assert!(layout.is_cached("a.deb"));
        layout.remove_artifact("a.deb").unwrap();
        assert!(!layout.is_cached("a.deb"));
    }

    #[test]
    fn removal_refuses_names_outside_cache() {
        let cache = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let victim = outside.path().join("victim.txt");
        fs::write(&victim, b"keep").unwrap();
        let layout = CacheLayout::new(cache.path());
        layout.initialize().unwrap();

        let absolute = victim.to_str().unwrap();
        assert!(matches!(
            layout.discard_partial(absolute),
            Err(FetchError::InvalidFilename(_))
        ));
        assert!(matches!(
            layout.remove_artifact(absolute),
            Err(FetchError::InvalidFilename(_))
        ));
        assert!(layout.remove_artifact("../victim.txt").is_err());
        assert!(victim.exists());
    }

    #[test]
    fn filenames_cannot_escape() {
        assert!(validate_filename("curl_1.0_amd64.deb").is_ok());
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("").is_err());
    }
}
