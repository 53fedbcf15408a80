use super::{
    colorize_status, ensure_prereqs, json_pretty, make_backend, spin_fail, spin_ok, spinner,
    CommandError, EXIT_SUCCESS,
};
use dockpin_core::{PinOptions, Resolver};
use dockpin_runtime::check_pin_prereqs;
use dockpin_schema::Selection;
use std::io::Read;
use std::path::Path;

fn read_dockerfile(path: &Path) -> Result<String, CommandError> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| format!("failed to read Dockerfile from stdin: {e}"))?;
        return Ok(content);
    }
    std::fs::read_to_string(path).map_err(|e| {
        CommandError::from(format!(
            "failed to read {}: {e} (pass --base-image or --dockerfile)",
            path.display()
        ))
    })
}

pub fn run(
    selection_file: &Path,
    pin_file: &Path,
    base_image: Option<String>,
    dockerfile: &Path,
    sudo: bool,
    json: bool,
) -> Result<u8, CommandError> {
    let selection = Selection::read_from_file(selection_file).map_err(|e| {
        CommandError::from(format!(
            "failed to read selection file {}: {e}",
            selection_file.display()
        ))
    })?;

    let explicit = base_image.as_deref().is_some_and(|s| !s.trim().is_empty());
    let dockerfile = if explicit {
        None
    } else {
        Some(read_dockerfile(dockerfile)?)
    };
    let options = PinOptions {
        base_image,
        dockerfile,
        elevate: sudo,
    };

    let backend = make_backend()?;
    let docker = std::env::var("DOCKPIN_DOCKER").unwrap_or_else(|_| "docker".to_owned());
    ensure_prereqs(backend.as_ref(), || check_pin_prereqs(docker.trim()))?;

    let pb = if json {
        None
    } else {
        Some(spinner("resolving package versions..."))
    };
    let result = match Resolver::new(backend.as_ref()).pin(&selection, &options, pin_file) {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "package versions resolved");
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "resolution failed");
            }
            return Err(e.into());
        }
    };

    if json {
        let payload = serde_json::json!({
            "status": "pinned",
            "lock_file": pin_file,
            "base_image": result.document.base_image,
            "inferred_base_image": result.inferred_base_image,
            "packages": result.document.packages,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        eprintln!(
            "{} {} package(s) for {} in {}",
            colorize_status("pinned"),
            result.document.packages.len(),
            result.document.base_image,
            pin_file.display()
        );
    }

    Ok(EXIT_SUCCESS)
}
