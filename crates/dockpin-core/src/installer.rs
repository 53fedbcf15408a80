use crate::CoreError;
use dockpin_fetch::{FetchError, Fetcher};
use dockpin_runtime::PackageBackend;
use dockpin_schema::{LockDocument, PinnedPackage};
use serde::Serialize;
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What the installer does with the dependencies a package declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DependencyPolicy {
    /// Log them only. Packages are applied strictly in lock file order.
    #[default]
    Report,
    /// Apply dependencies that are pinned in the same lock file first.
    InstallFromLock,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    pub dependencies: DependencyPolicy,
    /// Delete each cached artifact once it has been applied.
    pub remove_artifacts: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PackageDependencies {
    pub filename: String,
    pub depends: Vec<String>,
}

/// Outcome of a successful install run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct InstallReport {
    /// Filenames in the order they were applied.
    pub applied: Vec<String>,
    /// Packages applied without dependency inspection to break a cycle.
    pub cycle_breaks: Vec<String>,
    pub dependencies: Vec<PackageDependencies>,
}

impl InstallReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Per-run bookkeeping: packages on the current call stack, and packages
/// already applied.
#[derive(Debug, Default)]
pub struct InstallSession {
    in_progress: HashSet<String>,
    installed: HashSet<String>,
}

impl InstallSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_progress(&self, filename: &str) -> bool {
        self.in_progress.contains(filename)
    }

    pub fn is_installed(&self, filename: &str) -> bool {
        self.installed.contains(filename)
    }

    /// Mark `filename` in progress until the returned guard is dropped.
    fn enter(&mut self, filename: &str) -> InProgressGuard<'_> {
        self.in_progress.insert(filename.to_owned());
        InProgressGuard {
            session: self,
            filename: filename.to_owned(),
        }
    }
}

/// Removes its package from the in-progress set on every exit path.
struct InProgressGuard<'s> {
    session: &'s mut InstallSession,
    filename: String,
}

impl Deref for InProgressGuard<'_> {
    type Target = InstallSession;

    fn deref(&self) -> &InstallSession {
        self.session
    }
}

impl DerefMut for InProgressGuard<'_> {
    fn deref_mut(&mut self) -> &mut InstallSession {
        self.session
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.session.in_progress.remove(&self.filename);
    }
}

/// Applies a lock document package by package, in document order.
///
/// Processing stops at the first fetch, inspection or apply failure.
pub struct Installer<'a> {
    backend: &'a dyn PackageBackend,
    fetcher: &'a Fetcher,
    options: InstallOptions,
}

impl<'a> Installer<'a> {
    pub fn new(
        backend: &'a dyn PackageBackend,
        fetcher: &'a Fetcher,
        options: InstallOptions,
    ) -> Self {
        Self {
            backend,
            fetcher,
            options,
        }
    }

    pub fn install(&self, document: &LockDocument) -> Result<InstallReport, CoreError> {
        let mut report = InstallReport::default();
        if document.is_empty() {
            info!("no packages in the lock file, nothing to be done");
            return Ok(report);
        }

        let mut session = InstallSession::new();
        for pkg in &document.packages {
            self.visit(&mut session, document, pkg, &mut report)?;
        }
        debug_assert!(session.in_progress.is_empty());
        info!("installed {} package(s)", report.applied.len());
        Ok(report)
    }

    fn visit(
        &self,
        session: &mut InstallSession,
        document: &LockDocument,
        pkg: &PinnedPackage,
        report: &mut InstallReport,
    ) -> Result<(), CoreError> {
        if session.is_installed(&pkg.filename) {
            return Ok(());
        }

        if session.is_in_progress(&pkg.filename) {
            warn!("circular dependency detected for {}", pkg.filename);
            let artifact = self.fetch(pkg)?;
            info!("installing {} (circular dependency)", pkg.filename);
            report.cycle_breaks.push(pkg.filename.clone());
            return self.apply(session, pkg, &artifact, report);
        }

        let mut guard = session.enter(&pkg.filename);
        let artifact = self.fetch(pkg)?;

        let depends = self
            .backend
            .inspect_depends(&artifact)
            .map_err(|source| CoreError::Inspect {
                filename: pkg.filename.clone(),
                source,
            })?;
        info!("{} - dependencies: [{}]", pkg.filename, depends.join(", "));
        report.dependencies.push(PackageDependencies {
            filename: pkg.filename.clone(),
            depends: depends.clone(),
        });

        if self.options.dependencies == DependencyPolicy::InstallFromLock {
            for dep in &depends {
                match document.find_by_name(dep) {
                    Some(dep_pkg) => {
                        debug!("installing dependency {dep} for {}", pkg.filename);
                        self.visit(&mut guard, document, dep_pkg, report)?;
                    }
                    None => debug!("dependency {dep} of {} is not in the lock file", pkg.filename),
                }
            }
            // A cycle break further down may already have applied this package.
            if guard.is_installed(&pkg.filename) {
                return Ok(());
            }
        }

        self.apply(&mut guard, pkg, &artifact, report)
    }

    /// Fetch through the cache, discarding our own placeholder on failure.
    fn fetch(&self, pkg: &PinnedPackage) -> Result<PathBuf, CoreError> {
        self.fetcher.fetch(pkg).map_err(|source| {
            // A concurrent download owns its placeholder; a rejected name has none.
            if !matches!(
                source,
                FetchError::AlreadyInProgress { .. } | FetchError::InvalidFilename(_)
            ) {
                if let Err(e) = self.fetcher.cache().discard_partial(&pkg.filename) {
                    warn!("failed to remove partial download of {}: {e}", pkg.filename);
                }
            }
            CoreError::Fetch {
                filename: pkg.filename.clone(),
                source,
            }
        })
    }

    fn apply(
        &self,
        session: &mut InstallSession,
        pkg: &PinnedPackage,
        artifact: &Path,
        report: &mut InstallReport,
    ) -> Result<(), CoreError> {
        self.backend
            .apply_package(artifact)
            .map_err(|source| CoreError::Install {
                filename: pkg.filename.clone(),
                source,
            })?;
        session.installed.insert(pkg.filename.clone());
        report.applied.push(pkg.filename.clone());

        if self.options.remove_artifacts {
            if let Err(e) = self.fetcher.cache().remove_artifact(&pkg.filename) {
                warn!("failed to remove {}: {e}", artifact.display());
            }
        }
        Ok(())
    }
}
