//! Process backends for dockpin.
//!
//! This crate is the boundary to external tools: the `PackageBackend` trait
//! abstracts resolving package URIs inside a throwaway container, reading a
//! package's declared dependencies, and applying a package file. The `docker`
//! backend shells out to `docker run` and `dpkg`; the `mock` backend records
//! calls and serves canned answers for tests.

pub mod backend;
pub mod docker;
pub mod dpkg;
pub mod mock;
pub mod prereq;

pub use backend::{select_backend, PackageBackend};
pub use docker::DockerAptBackend;
pub use dpkg::parse_depends;
pub use mock::{MockBackend, MockCall};
pub use prereq::{check_install_prereqs, check_pin_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    ExitStatus { program: String, status: String },
    #[error("runtime execution failed: {0}")]
    ExecFailed(String),
}
