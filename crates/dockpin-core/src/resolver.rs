use crate::CoreError;
use dockpin_runtime::PackageBackend;
use dockpin_schema::{last_base_image, parse_package_lines, LockDocument, Selection};
use std::path::Path;
use tracing::{info, warn};

/// Inputs to [`Resolver::pin`] besides the selection itself.
#[derive(Debug, Clone, Default)]
pub struct PinOptions {
    /// Explicit base image. Takes precedence over `dockerfile`.
    pub base_image: Option<String>,
    /// Dockerfile contents to infer the base image from.
    pub dockerfile: Option<String>,
    /// Run package manager commands inside the container through `sudo`.
    pub elevate: bool,
}

#[derive(Debug, Clone)]
pub struct PinResult {
    pub document: LockDocument,
    /// True when the base image came from the Dockerfile rather than an explicit option.
    pub inferred_base_image: bool,
}

/// Resolves a package selection into a lock document against a base image.
pub struct Resolver<'a> {
    backend: &'a dyn PackageBackend,
}

impl<'a> Resolver<'a> {
    pub fn new(backend: &'a dyn PackageBackend) -> Self {
        Self { backend }
    }

    /// Pick the base image: the explicit one, else the Dockerfile's last `FROM`.
    pub fn base_image(options: &PinOptions) -> Result<(String, bool), CoreError> {
        if let Some(image) = options.base_image.as_deref().map(str::trim) {
            if !image.is_empty() {
                return Ok((image.to_owned(), false));
            }
        }
        let dockerfile = options.dockerfile.as_deref().ok_or_else(|| {
            CoreError::NoBaseImageFound("no --base-image given and no Dockerfile".to_owned())
        })?;
        let image = last_base_image(dockerfile).ok_or_else(|| {
            CoreError::NoBaseImageFound("no images found in your Dockerfile".to_owned())
        })?;
        Ok((image, true))
    }

    /// Run resolution in a disposable container and validate its output.
    ///
    /// Output that does not parse is a defect of the resolution step, never a
    /// user error, and is reported as [`CoreError::InternalConsistency`].
    pub fn resolve(
        &self,
        selection: &Selection,
        base_image: &str,
        elevate: bool,
    ) -> Result<LockDocument, CoreError> {
        if selection.is_empty() {
            warn!("selection is empty; the lock file will list no packages");
        }
        info!(
            "resolving {} package(s) against {base_image} via {}",
            selection.len(),
            self.backend.name()
        );
        let stdout = self.backend.resolve_uris(base_image, selection, elevate)?;
        let stdout = std::str::from_utf8(&stdout).map_err(|_| {
            CoreError::InternalConsistency("resolver output is not valid UTF-8".to_owned())
        })?;
        let packages =
            parse_package_lines(stdout).map_err(|e| CoreError::InternalConsistency(e.to_string()))?;

        let document = LockDocument::new(base_image, packages);
        let reparsed = LockDocument::parse(&document.serialize())
            .map_err(|e| CoreError::InternalConsistency(e.to_string()))?;
        if reparsed != document {
            return Err(CoreError::InternalConsistency(
                "lock document does not survive a serialize/parse round trip".to_owned(),
            ));
        }
        Ok(document)
    }

    /// Resolve and write the lock file at `lock_path`, replacing it atomically.
    ///
    /// Nothing is written unless resolution and validation succeed.
    pub fn pin(
        &self,
        selection: &Selection,
        options: &PinOptions,
        lock_path: &Path,
    ) -> Result<PinResult, CoreError> {
        let (base_image, inferred) = Self::base_image(options)?;
        if inferred {
            info!(
                "based on your Dockerfile, packages will be resolved against {base_image}; pass --base-image if that's incorrect"
            );
        }
        let document = self.resolve(selection, &base_image, options.elevate)?;
        document.write_to_file(lock_path)?;
        info!(
            "pinned {} package(s) in {}",
            document.packages.len(),
            lock_path.display()
        );
        Ok(PinResult {
            document,
            inferred_base_image: inferred,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockpin_runtime::{MockBackend, MockCall};
    use dockpin_schema::LOCK_HEADER;

    const CURL_LINE: &str =
        "'http://example/curl_1.0.deb' curl_1.0.deb 12345 MD5Sum:00112233445566778899aabbccddeeff";

    #[test]
    fn explicit_base_image_wins() {
        let options = PinOptions {
            base_image: Some(" debian:12 ".to_owned()),
            dockerfile: Some("FROM ubuntu:22.04\n".to_owned()),
            elevate: false,
        };
        assert_eq!(
            Resolver::base_image(&options).unwrap(),
            ("debian:12".to_owned(), false)
        );
    }

    #[test]
    fn base_image_inferred_from_dockerfile() {
        let options = PinOptions {
            dockerfile: Some("FROM golang AS b\nFROM ubuntu:22.04\n".to_owned()),
            ..PinOptions::default()
        };
        assert_eq!(
            Resolver::base_image(&options).unwrap(),
            ("ubuntu:22.04".to_owned(), true)
        );
    }

    #[test]
    fn no_base_image_found() {
        let options = PinOptions {
            dockerfile: Some("RUN true\n".to_owned()),
            ..PinOptions::default()
        };
        assert!(matches!(
            Resolver::base_image(&options),
            Err(CoreError::NoBaseImageFound(_))
        ));
        assert!(matches!(
            Resolver::base_image(&PinOptions::default()),
            Err(CoreError::NoBaseImageFound(_))
        ));
    }

    #[test]
    fn pin_writes_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("dockpin-apt.lock");
        let backend = MockBackend::new().with_resolve_output(format!("{CURL_LINE}\n"));
        let resolver = Resolver::new(&backend);
        let options = PinOptions {
            base_image: Some("debian:12".to_owned()),
            elevate: true,
            ..PinOptions::default()
        };

        let result = resolver
            .pin(&Selection::parse("curl\n"), &options, &lock_path)
            .unwrap();
        assert_eq!(result.document.packages.len(), 1);
        assert!(!result.inferred_base_image);

        let written = std::fs::read_to_string(&lock_path).unwrap();
        assert_eq!(
            written,
            format!("{LOCK_HEADER}\nbase-image=debian:12\n\n{CURL_LINE}\n")
        );
        assert_eq!(
            backend.calls(),
            vec![MockCall::Resolve {
                image: "debian:12".to_owned(),
                elevate: true
            }]
        );
    }

    #[test]
    fn unparsable_output_is_internal_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("dockpin-apt.lock");
        std::fs::write(&lock_path, "previous").unwrap();
        let backend = MockBackend::new().with_resolve_output("E: Unable to locate package nope\n");
        let resolver = Resolver::new(&backend);
        let options = PinOptions {
            base_image: Some("debian:12".to_owned()),
            ..PinOptions::default()
        };

        let err = resolver
            .pin(&Selection::parse("nope\n"), &options, &lock_path)
            .unwrap_err();
        assert!(matches!(err, CoreError::InternalConsistency(_)));
        assert!(err.to_string().contains("Unable to locate package"));
        assert_eq!(std::fs::read_to_string(&lock_path).unwrap(), "previous");
    }

    #[test]
    fn duplicate_output_is_internal_error() {
        let backend =
            MockBackend::new().with_resolve_output(format!("{CURL_LINE}\n{CURL_LINE}\n"));
        let err = Resolver::new(&backend)
            .resolve(&Selection::parse("curl"), "debian:12", false)
            .unwrap_err();
        assert!(matches!(err, CoreError::InternalConsistency(_)));
    }

    #[test]
    fn empty_selection_resolves_to_empty_document() {
        let backend = MockBackend::new().with_resolve_output("");
        let doc = Resolver::new(&backend)
            .resolve(&Selection::default(), "debian:12", false)
            .unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.base_image, "debian:12");
    }
}
