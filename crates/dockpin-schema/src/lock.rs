use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// First line of every lock file written by dockpin.
pub const LOCK_HEADER: &str = "# dockpin apt lock file v1";

const BASE_IMAGE_PREFIX: &str = "base-image=";
const HASH_PREFIX: &str = "MD5Sum:";
const HASH_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse line {line:?}")]
    Parse { line: String },
    #[error("lock file has no base-image= line")]
    MissingBaseImage,
    #[error("lock file has an empty base-image= value")]
    EmptyBaseImage,
    #[error("package '{0}' is listed more than once")]
    DuplicatePackage(String),
    #[error("lock file is not valid UTF-8")]
    NotUtf8,
}

impl LockError {
    fn parse(line: &str) -> Self {
        LockError::Parse {
            line: line.to_owned(),
        }
    }
}

/// One package artifact pinned by URL, size and MD5 digest.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PinnedPackage {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub md5: String,
}

impl PinnedPackage {
    /// Parse one `'<url>' <filename> <size> MD5Sum:<hash>` line.
    pub fn parse_line(line: &str) -> Result<Self, LockError> {
        let rest = line.strip_prefix('\'').ok_or_else(|| LockError::parse(line))?;
        let (url, rest) = rest.split_once('\'').ok_or_else(|| LockError::parse(line))?;
        if url.is_empty() {
            return Err(LockError::parse(line));
        }
        let rest = rest.strip_prefix(' ').ok_or_else(|| LockError::parse(line))?;

        let fields: Vec<&str> = rest.split(' ').collect();
        let [filename, size, hash] = fields.as_slice() else {
            return Err(LockError::parse(line));
        };
        if !is_plain_filename(filename) {
            return Err(LockError::parse(line));
        }
        if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LockError::parse(line));
        }
        let size: u64 = size.parse().map_err(|_| LockError::parse(line))?;

        let md5 = hash
            .strip_prefix(HASH_PREFIX)
            .ok_or_else(|| LockError::parse(line))?;
        if md5.len() != HASH_LEN || !md5.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(LockError::parse(line));
        }

        Ok(PinnedPackage {
            url: url.to_owned(),
            filename: (*filename).to_owned(),
            size,
            md5: md5.to_owned(),
        })
    }

    /// Render the package in the exact line format accepted by [`parse_line`](Self::parse_line).
    pub fn to_line(&self) -> String {
        format!(
            "'{}' {} {} {HASH_PREFIX}{}",
            self.url, self.filename, self.size, self.md5
        )
    }

    /// Whether this artifact is a build of the binary package `name`.
    ///
    /// Debian archive filenames are `<name>_<version>_<arch>.deb`.
    pub fn provides(&self, name: &str) -> bool {
        self.filename
            .strip_prefix(name)
            .is_some_and(|rest| rest.starts_with('_'))
    }
}

/// A bare file name: no path separators, no whitespace, not `.` or `..`.
fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename
            .bytes()
            .any(|b| b == b'/' || b == b'\\' || b == 0 || b.is_ascii_whitespace())
}

/// Parse package lines, skipping blank lines and `#` comments.
///
/// Used both for lock files and for raw `apt-get --print-uris` output.
pub fn parse_package_lines(content: &str) -> Result<Vec<PinnedPackage>, LockError> {
    let mut packages = Vec::new();
    for line in content.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        packages.push(PinnedPackage::parse_line(line)?);
    }
    Ok(packages)
}

/// A lock document: the base image packages were resolved against, and the
/// packages to install in order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LockDocument {
    pub base_image: String,
    pub packages: Vec<PinnedPackage>,
}

impl LockDocument {
    pub fn new(base_image: impl Into<String>, packages: Vec<PinnedPackage>) -> Self {
        Self {
            base_image: base_image.into(),
            packages,
        }
    }

    pub fn parse(content: &str) -> Result<Self, LockError> {
        let mut base_image = None;
        let mut packages = Vec::new();
        let mut seen = HashSet::new();

        for line in content.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(image) = line.strip_prefix(BASE_IMAGE_PREFIX) {
                let image = image.trim();
                if image.is_empty() {
                    return Err(LockError::EmptyBaseImage);
                }
                base_image = Some(image.to_owned());
                continue;
            }
            let pkg = PinnedPackage::parse_line(line)?;
            if !seen.insert(pkg.filename.clone()) {
                return Err(LockError::DuplicatePackage(pkg.filename));
            }
            packages.push(pkg);
        }

        let base_image = base_image.ok_or(LockError::MissingBaseImage)?;
        Ok(Self {
            base_image,
            packages,
        })
    }

    pub fn parse_bytes(content: &[u8]) -> Result<Self, LockError> {
        let content = std::str::from_utf8(content).map_err(|_| LockError::NotUtf8)?;
        Self::parse(content)
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        out.push_str(LOCK_HEADER);
        out.push('\n');
        out.push_str(BASE_IMAGE_PREFIX);
        out.push_str(&self.base_image);
        out.push_str("\n\n");
        for pkg in &self.packages {
            out.push_str(&pkg.to_line());
            out.push('\n');
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// The pinned artifact for binary package `name`, if the document has one.
    pub fn find_by_name(&self, name: &str) -> Option<&PinnedPackage> {
        self.packages.iter().find(|p| p.provides(name))
    }

    /// Write the document to `path`, replacing any previous content atomically.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let path = path.as_ref();
        let content = self.serialize();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LockError::Io(e.error))?;
        // Fsync parent directory to ensure rename durability on power loss.
        if let Ok(f) = fs::File::open(dir) {
            let _ = f.sync_all();
        }
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let content = fs::read(path)?;
        Self::parse_bytes(&content)
    }
}
