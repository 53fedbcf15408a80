use super::{
    colorize_status, ensure_prereqs, json_pretty, make_backend, CommandError, EXIT_FAILURE,
    EXIT_PARSE_ERROR, EXIT_SUCCESS,
};
use dockpin_core::{InstallOptions, Installer};
use dockpin_fetch::{CacheLayout, Fetcher, DEFAULT_CACHE_DIR};
use dockpin_runtime::check_install_prereqs;
use dockpin_schema::{LockDocument, LockError};
use std::path::{Path, PathBuf};

fn cache_root(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| {
        std::env::var_os("DOCKPIN_CACHE_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
    .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
}

pub fn run(
    pin_file: &Path,
    cache_dir: Option<PathBuf>,
    options: InstallOptions,
    json: bool,
) -> Result<u8, CommandError> {
    let document = LockDocument::read_from_file(pin_file).map_err(|e| {
        let code = match e {
            LockError::Io(_) => EXIT_FAILURE,
            _ => EXIT_PARSE_ERROR,
        };
        CommandError::new(
            code,
            format!("failed to read lock file {}: {e}", pin_file.display()),
        )
    })?;

    let backend = make_backend()?;
    if !document.is_empty() {
        ensure_prereqs(backend.as_ref(), check_install_prereqs)?;
    }

    let fetcher = Fetcher::new(
        CacheLayout::new(cache_root(cache_dir)),
        env!("CARGO_PKG_VERSION"),
    );
    let report = Installer::new(backend.as_ref(), &fetcher, options).install(&document)?;

    if json {
        println!("{}", json_pretty(&report)?);
    } else if report.is_empty() {
        eprintln!("nothing to do");
    } else {
        eprintln!(
            "{} {} package(s) for {}",
            colorize_status("installed"),
            report.applied.len(),
            document.base_image
        );
        for cycle in &report.cycle_breaks {
            eprintln!("  {} broken at {cycle}", colorize_status("cycle"));
        }
    }

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_cache_dir_wins() {
        let dir = PathBuf::from("/tmp/dockpin-cache");
        assert_eq!(cache_root(Some(dir.clone())), dir);
    }
}
