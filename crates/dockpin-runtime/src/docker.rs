use crate::backend::PackageBackend;
use crate::dpkg::parse_depends;
use crate::RuntimeError;
use dockpin_schema::Selection;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

fn shell_quote(s: &str) -> String {
    // Single-quoting in POSIX shell: replace ' with '\'' then wrap in '
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Build the shell script run inside the container to print package URIs.
///
/// Progress goes to stderr; stdout carries only `apt-get --print-uris` lines.
pub fn print_uris_script(selection: &Selection, elevate: bool) -> String {
    let sudo = if elevate { "sudo " } else { "" };
    let mut script = format!(
        "{sudo}apt-get update >&2 && echo Determining dependencies... >&2 && {sudo}apt-get install --print-uris -qq"
    );
    for spec in selection.specifiers() {
        script.push(' ');
        script.push_str(&shell_quote(spec));
    }
    script
}

fn check_status(program: &str, status: ExitStatus) -> Result<(), RuntimeError> {
    if status.success() {
        Ok(())
    } else {
        Err(RuntimeError::ExitStatus {
            program: program.to_owned(),
            status: status.to_string(),
        })
    }
}

/// Resolves with `docker run --rm <image> bash -c ...` and applies with `dpkg`.
pub struct DockerAptBackend {
    docker: String,
    dpkg: String,
}

impl Default for DockerAptBackend {
    fn default() -> Self {
        Self {
            docker: "docker".to_owned(),
            dpkg: "dpkg".to_owned(),
        }
    }
}

impl DockerAptBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Honor `DOCKPIN_DOCKER` to use another docker-compatible CLI (e.g. podman).
    pub fn from_env() -> Self {
        match std::env::var("DOCKPIN_DOCKER") {
            Ok(program) if !program.trim().is_empty() => Self::new().with_docker(program.trim()),
            _ => Self::new(),
        }
    }

    #[must_use]
    pub fn with_docker(mut self, program: &str) -> Self {
        program.clone_into(&mut self.docker);
        self
    }

    #[must_use]
    pub fn with_dpkg(mut self, program: &str) -> Self {
        program.clone_into(&mut self.dpkg);
        self
    }

    pub fn docker_program(&self) -> &str {
        &self.docker
    }

    fn spawn_err(program: &str) -> impl FnOnce(std::io::Error) -> RuntimeError + '_ {
        move |source| RuntimeError::Spawn {
            program: program.to_owned(),
            source,
        }
    }
}

impl PackageBackend for DockerAptBackend {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn resolve_uris(
        &self,
        image: &str,
        selection: &Selection,
        elevate: bool,
    ) -> Result<Vec<u8>, RuntimeError> {
        let script = print_uris_script(selection, elevate);
        debug!("{} run --rm {image} bash -c {script:?}", self.docker);
        let output = Command::new(&self.docker)
            .args(["run", "--rm", image, "bash", "-c", &script])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(Self::spawn_err(&self.docker))?;
        check_status(&self.docker, output.status)?;
        Ok(output.stdout)
    }

    fn inspect_depends(&self, artifact: &Path) -> Result<Vec<String>, RuntimeError> {
        debug!("{} -I {}", self.dpkg, artifact.display());
        let output = Command::new(&self.dpkg)
            .arg("-I")
            .arg(artifact)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(Self::spawn_err(&self.dpkg))?;
        check_status(&self.dpkg, output.status)?;
        Ok(parse_depends(&String::from_utf8_lossy(&output.stdout)))
    }

    fn apply_package(&self, artifact: &Path) -> Result<(), RuntimeError> {
        debug!("{} -i --force-depends {}", self.dpkg, artifact.display());
        let status = Command::new(&self.dpkg)
            .args(["-i", "--force-depends"])
            .arg(artifact)
            .env("DEBIAN_FRONTEND", "noninteractive")
            .status()
            .map_err(Self::spawn_err(&self.dpkg))?;
        check_status(&self.dpkg, status)
    }
}
