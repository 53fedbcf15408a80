use crate::backend::PackageBackend;
use crate::RuntimeError;
use dockpin_schema::Selection;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// MD5 of the empty string; mock artifacts are zero bytes long.
const EMPTY_MD5: &str = "d41d8cd98f00b204e9800998ecf8427e";

/// A call observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Resolve { image: String, elevate: bool },
    Inspect(PathBuf),
    Apply(PathBuf),
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
}

/// In-memory backend for tests.
///
/// Artifacts are identified by file name. Dependency lists and apply failures
/// are configured per file name; resolver output is canned or derived from
/// the selection.
#[derive(Default)]
pub struct MockBackend {
    resolve_output: Option<Vec<u8>>,
    depends: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `output` verbatim from [`PackageBackend::resolve_uris`].
    #[must_use]
    pub fn with_resolve_output(mut self, output: impl Into<Vec<u8>>) -> Self {
        self.resolve_output = Some(output.into());
        self
    }

    #[must_use]
    pub fn with_depends(mut self, filename: &str, depends: &[&str]) -> Self {
        self.depends.insert(
            filename.to_owned(),
            depends.iter().map(|d| (*d).to_owned()).collect(),
        );
        self
    }

    #[must_use]
    pub fn with_failing_apply(mut self, filename: &str) -> Self {
        self.failing.insert(filename.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// File names passed to `apply_package`, in call order.
    pub fn applied(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Apply(path) => Some(Self::file_name(&path)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MockCall) -> Result<(), RuntimeError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))?;
        state.calls.push(call);
        Ok(())
    }

    fn file_name(artifact: &Path) -> String {
        artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// One zero-byte package line per selected name, ignoring version constraints.
    fn default_resolve_output(selection: &Selection) -> Vec<u8> {
        let mut out = String::new();
        for spec in selection.specifiers() {
            let name = spec.split(['=', '/']).next().unwrap_or(spec);
            let filename = format!("{name}_0.0.0-mock_all.deb");
            out.push_str(&format!(
                "'http://mock.invalid/pool/{filename}' {filename} 0 MD5Sum:{EMPTY_MD5}\n"
            ));
        }
        out.into_bytes()
    }
}

impl PackageBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn resolve_uris(
        &self,
        image: &str,
        selection: &Selection,
        elevate: bool,
    ) -> Result<Vec<u8>, RuntimeError> {
        self.record(MockCall::Resolve {
            image: image.to_owned(),
            elevate,
        })?;
        Ok(self
            .resolve_output
            .clone()
            .unwrap_or_else(|| Self::default_resolve_output(selection)))
    }

    fn inspect_depends(&self, artifact: &Path) -> Result<Vec<String>, RuntimeError> {
        let name = Self::file_name(artifact);
        self.record(MockCall::Inspect(artifact.to_path_buf()))?;
        Ok(self.depends.get(&name).cloned().unwrap_or_default())
    }

    fn apply_package(&self, artifact: &Path) -> Result<(), RuntimeError> {
        let name = Self::file_name(artifact);
        self.record(MockCall::Apply(artifact.to_path_buf()))?;
        if self.failing.contains(&name) {
            return Err(RuntimeError::ExitStatus {
                program: "dpkg".to_owned(),
                status: "exit status: 1".to_owned(),
            });
        }
        Ok(())
    }
}
