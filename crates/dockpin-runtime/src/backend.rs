use crate::RuntimeError;
use dockpin_schema::Selection;
use std::path::Path;

/// External tools used to resolve and apply packages.
///
/// The resolver and installer only talk to this trait, so they never depend
/// on how processes are spawned.
pub trait PackageBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Run the package manager's "print URIs" mode for `selection` inside a
    /// disposable instance of `image` and return its raw stdout.
    ///
    /// `elevate` prefixes the package manager commands with `sudo`.
    fn resolve_uris(
        &self,
        image: &str,
        selection: &Selection,
        elevate: bool,
    ) -> Result<Vec<u8>, RuntimeError>;

    /// Names of the packages a package file declares it depends on.
    fn inspect_depends(&self, artifact: &Path) -> Result<Vec<String>, RuntimeError>;

    /// Install a package file, even if its declared dependencies are not
    /// yet satisfied on the system.
    fn apply_package(&self, artifact: &Path) -> Result<(), RuntimeError>;
}

pub fn select_backend(name: &str) -> Result<Box<dyn PackageBackend>, RuntimeError> {
    match name {
        "docker" => Ok(Box::new(crate::docker::DockerAptBackend::from_env())),
        "mock" => Ok(Box::new(crate::mock::MockBackend::new())),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_valid_backends() {
        assert_eq!(select_backend("docker").unwrap().name(), "docker");
        assert_eq!(select_backend("mock").unwrap().name(), "mock");
    }

    #[test]
    fn select_invalid_backend_fails() {
        let err = select_backend("podman-compose").err().unwrap();
        assert!(err.to_string().contains("podman-compose"));
    }
}
