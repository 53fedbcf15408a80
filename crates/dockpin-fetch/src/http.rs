use crate::cache::{validate_filename, CacheLayout};
use crate::FetchError;
use dockpin_schema::PinnedPackage;
use md5::{Digest, Md5};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};

/// Tees written bytes into an MD5 hasher and counts them.
struct HashingWriter<W> {
    inner: W,
    hasher: Md5,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Md5::new(),
            written: 0,
        }
    }

    fn finish(self) -> (W, u64, String) {
        (self.inner, self.written, hex::encode(self.hasher.finalize()))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Downloads pinned packages into a [`CacheLayout`].
pub struct Fetcher {
    cache: CacheLayout,
    agent: ureq::Agent,
    user_agent: String,
}

impl Fetcher {
    /// `version` is reported in the `User-Agent` header of every request.
    pub fn new(cache: CacheLayout, version: &str) -> Self {
        Self {
            cache,
            agent: ureq::Agent::new_with_defaults(),
            user_agent: format!("dockpin/{version}"),
        }
    }

    pub fn cache(&self) -> &CacheLayout {
        &self.cache
    }

    /// Make `pkg`'s artifact available in the cache and return its path.
    ///
    /// A cached artifact is returned without any network access. Otherwise
    /// the body is streamed into `partial/<filename>`, verified, and renamed
    /// into the cache root. On failure the placeholder is left behind for
    /// the caller to discard; the cache root is never touched.
    pub fn fetch(&self, pkg: &PinnedPackage) -> Result<PathBuf, FetchError> {
        validate_filename(&pkg.filename)?;
        let target = self.cache.artifact_path(&pkg.filename);
        if self.cache.is_cached(&pkg.filename) {
            debug!("cache hit: {}", target.display());
            return Ok(target);
        }

        self.cache.initialize()?;
        let partial = self.cache.partial_path(&pkg.filename);
        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&partial)
        {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(FetchError::AlreadyInProgress {
                    filename: pkg.filename.clone(),
                    path: partial.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "downloading {} ({})",
            pkg.url,
            indicatif::BinaryBytes(pkg.size)
        );
        let (file, written, digest) = self.download(pkg, file)?;

        if written != pkg.size {
            return Err(FetchError::SizeMismatch {
                url: pkg.url.clone(),
                expected: pkg.size,
                actual: written,
            });
        }
        if !digest.eq_ignore_ascii_case(&pkg.md5) {
            return Err(FetchError::HashMismatch {
                url: pkg.url.clone(),
                expected: pkg.md5.clone(),
                actual: digest,
            });
        }

        file.sync_all()?;
        drop(file);
        std::fs::rename(&partial, &target)?;
        Ok(target)
    }

    fn download(&self, pkg: &PinnedPackage, file: File) -> Result<(File, u64, String), FetchError> {
        let resp = match self
            .agent
            .get(&pkg.url)
            .header("User-Agent", &self.user_agent)
            .call()
        {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(FetchError::Status {
                    url: pkg.url.clone(),
                    status: code,
                });
            }
            Err(e) => {
                return Err(FetchError::Network {
                    url: pkg.url.clone(),
                    message: e.to_string(),
                });
            }
        };

        let code = resp.status().as_u16();
        if code != 200 {
            return Err(FetchError::Status {
                url: pkg.url.clone(),
                status: code,
            });
        }

        // One byte past the pinned size is enough to report a mismatch.
        let mut reader = resp
            .into_body()
            .into_reader()
            .take(pkg.size.saturating_add(1));
        let mut writer = HashingWriter::new(file);
        io::copy(&mut reader, &mut writer).map_err(|source| FetchError::Transfer {
            url: pkg.url.clone(),
            source,
        })?;
        Ok(writer.finish())
    }
}
