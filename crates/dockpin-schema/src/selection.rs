use crate::lock::LockError;
use std::path::Path;

/// Package specifiers requested by the user, one per line in the selection file.
///
/// Specifiers are passed to the package manager as-is, so version constraints
/// such as `curl=7.88.1-10` are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    specifiers: Vec<String>,
}

impl Selection {
    pub fn parse(content: &str) -> Self {
        let specifiers = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_owned)
            .collect();
        Self { specifiers }
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let content = std::fs::read(path)?;
        let content = std::str::from_utf8(&content).map_err(|_| LockError::NotUtf8)?;
        Ok(Self::parse(content))
    }

    pub fn specifiers(&self) -> &[String] {
        &self.specifiers
    }

    pub fn is_empty(&self) -> bool {
        self.specifiers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.specifiers.len()
    }
}
