use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check the tools `pin` needs. `docker` is the container CLI in use.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_pin_prereqs(docker: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    if !command_exists(docker) {
        missing.push(MissingPrereq {
            name: docker.to_owned(),
            purpose: "running the base image to resolve package URIs",
            install_hint: "install Docker or set DOCKPIN_DOCKER to a compatible CLI such as podman",
        });
    }
    missing
}

/// Check the tools `install` needs.
pub fn check_install_prereqs() -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    if !command_exists("dpkg") {
        missing.push(MissingPrereq {
            name: "dpkg".to_owned(),
            purpose: "inspecting and installing .deb packages",
            install_hint: "run dockpin inside a Debian or Ubuntu based image",
        });
    }
    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nSet DOCKPIN_SKIP_PREREQS=1 to skip these checks.");
    msg
}
