pub mod completions;
pub mod install;
pub mod pin;

use dockpin_core::CoreError;
use dockpin_runtime::{format_missing, MissingPrereq, PackageBackend};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_PARSE_ERROR: u8 = 2;
pub const EXIT_INTEGRITY_ERROR: u8 = 3;

/// A failed command: the message printed to stderr and the process exit code.
#[derive(Debug)]
pub struct CommandError {
    pub code: u8,
    pub message: String,
}

impl CommandError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<String> for CommandError {
    fn from(message: String) -> Self {
        Self::new(EXIT_FAILURE, message)
    }
}

impl From<CoreError> for CommandError {
    fn from(e: CoreError) -> Self {
        let code = if e.is_integrity_failure() {
            EXIT_INTEGRITY_ERROR
        } else if e.is_parse_error() {
            EXIT_PARSE_ERROR
        } else {
            EXIT_FAILURE
        };
        Self::new(code, e.to_string())
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "pinned" | "installed" => Style::new().green().apply_to(status).to_string(),
        "cycle" => Style::new().yellow().apply_to(status).to_string(),
        _ => status.to_owned(),
    }
}

/// The backend named by `DOCKPIN_BACKEND` (default `docker`).
pub fn make_backend() -> Result<Box<dyn PackageBackend>, CommandError> {
    let name = std::env::var("DOCKPIN_BACKEND").unwrap_or_else(|_| "docker".to_owned());
    dockpin_runtime::select_backend(name.trim()).map_err(|e| CommandError::from(e.to_string()))
}

/// Fail with an install hint when tools are missing, unless checks are
/// disabled or the backend never spawns processes.
pub fn ensure_prereqs(
    backend: &dyn PackageBackend,
    check: impl FnOnce() -> Vec<MissingPrereq>,
) -> Result<(), CommandError> {
    if backend.name() == "mock" || std::env::var("DOCKPIN_SKIP_PREREQS").as_deref() == Ok("1") {
        return Ok(());
    }
    let missing = check();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CommandError::from(format_missing(&missing)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockpin_fetch::FetchError;
    use dockpin_runtime::MockBackend;

    #[test]
    fn json_pretty_serializes_object() {
        let val = serde_json::json!({"status": "pinned"});
        let result = json_pretty(&val).unwrap();
        assert!(result.contains("\"status\""));
        assert!(result.contains("\"pinned\""));
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_ne!(EXIT_SUCCESS, EXIT_FAILURE);
        assert_ne!(EXIT_FAILURE, EXIT_PARSE_ERROR);
        assert_ne!(EXIT_PARSE_ERROR, EXIT_INTEGRITY_ERROR);
    }

    #[test]
    fn core_errors_map_to_exit_codes() {
        let integrity = CoreError::Fetch {
            filename: "a.deb".to_owned(),
            source: FetchError::HashMismatch {
                url: "http://x/a.deb".to_owned(),
                expected: "a".repeat(32),
                actual: "b".repeat(32),
            },
        };
        assert_eq!(CommandError::from(integrity).code, EXIT_INTEGRITY_ERROR);

        let parse = CoreError::from(dockpin_schema::LockError::Parse {
            line: "bogus".to_owned(),
        });
        assert_eq!(CommandError::from(parse).code, EXIT_PARSE_ERROR);

        let other = CoreError::NoBaseImageFound("none".to_owned());
        assert_eq!(CommandError::from(other).code, EXIT_FAILURE);
    }

    #[test]
    fn mock_backend_skips_prereqs() {
        let backend = MockBackend::new();
        let result = ensure_prereqs(&backend, || {
            vec![MissingPrereq {
                name: "docker".to_owned(),
                purpose: "test",
                install_hint: "test",
            }]
        });
        assert!(result.is_ok());
    }

    #[test]
    fn colorize_status_keeps_text() {
        for status in ["pinned", "installed", "cycle", "other"] {
            assert!(colorize_status(status).contains(status));
        }
    }

    #[test]
    fn spinner_creates_progress_bar() {
        let pb = spinner("testing...");
        spin_ok(&pb, "done");
        let pb = spinner("testing...");
        spin_fail(&pb, "failed");
    }
}
