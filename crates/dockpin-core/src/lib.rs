//! Pinning and installation engine for dockpin.
//!
//! The [`Resolver`] turns a package selection and a base image into a
//! hash-pinned [`LockDocument`](dockpin_schema::LockDocument) by running the
//! package manager inside a throwaway container. The [`Installer`] replays a
//! lock document: it fetches each artifact through the hash-verifying
//! [`Fetcher`](dockpin_fetch::Fetcher) and applies it with the low-level
//! package installer, breaking dependency cycles instead of recursing forever.

pub mod installer;
pub mod resolver;

pub use installer::{
    DependencyPolicy, InstallOptions, InstallReport, InstallSession, Installer,
    PackageDependencies,
};
pub use resolver::{PinOptions, PinResult, Resolver};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("lock error: {0}")]
    Lock(#[from] dockpin_schema::LockError),
    #[error("runtime error: {0}")]
    Runtime(#[from] dockpin_runtime::RuntimeError),
    #[error("no base image found: {0}")]
    NoBaseImageFound(String),
    #[error("bug: lock file generated from the container is invalid: {0}")]
    InternalConsistency(String),
    #[error("failed to fetch {filename}: {source}")]
    Fetch {
        filename: String,
        #[source]
        source: dockpin_fetch::FetchError,
    },
    #[error("failed to get dependencies for {filename}: {source}")]
    Inspect {
        filename: String,
        #[source]
        source: dockpin_runtime::RuntimeError,
    },
    #[error("failed to install {filename}: {source}")]
    Install {
        filename: String,
        #[source]
        source: dockpin_runtime::RuntimeError,
    },
}

impl CoreError {
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, CoreError::Fetch { source, .. } if source.is_integrity_failure())
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, CoreError::Lock(_))
    }
}
