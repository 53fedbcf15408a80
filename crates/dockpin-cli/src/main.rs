mod commands;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use dockpin_core::{DependencyPolicy, InstallOptions};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "dockpin",
    version,
    about = "Pin OS package versions for Docker builds and install exactly those versions"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pinning and installing apt packages.
    Apt(AptArgs),
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Args)]
struct AptArgs {
    /// File with pinned package versions.
    #[arg(short, long, default_value = "dockpin-apt.lock", global = true)]
    pin_file: PathBuf,

    #[command(subcommand)]
    command: AptCommands,
}

#[derive(Debug, Subcommand)]
enum AptCommands {
    /// Pin which versions to install (but don't install them).
    Pin {
        /// File with packages to be installed, one per line.
        #[arg(short, long, default_value = "dockpin-apt.pkgs")]
        selection_file: PathBuf,
        /// Docker image you're going to use dockpin in. Inferred from the Dockerfile if omitted.
        #[arg(long)]
        base_image: Option<String>,
        /// Dockerfile to infer the base image from ("-" for stdin).
        #[arg(short = 'f', long, default_value = "Dockerfile")]
        dockerfile: PathBuf,
        /// Use sudo when executing commands inside the container.
        #[arg(short = 'S', long, default_value_t = false)]
        sudo: bool,
    },
    /// Install the pinned versions.
    Install {
        /// Package cache directory (default: $DOCKPIN_CACHE_DIR or /var/cache/apt/archives).
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Delete each downloaded package once it is installed.
        #[arg(long, default_value_t = false)]
        remove_artifacts: bool,
        /// Install a package's dependencies first when they are pinned in the same lock file.
        #[arg(long, default_value_t = false)]
        install_deps_from_lock: bool,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DOCKPIN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Apt(apt) => match apt.command {
            AptCommands::Pin {
                selection_file,
                base_image,
                dockerfile,
                sudo,
            } => commands::pin::run(
                &selection_file,
                &apt.pin_file,
                base_image,
                &dockerfile,
                sudo,
                json_output,
            ),
            AptCommands::Install {
                cache_dir,
                remove_artifacts,
                install_deps_from_lock,
            } => commands::install::run(
                &apt.pin_file,
                cache_dir,
                InstallOptions {
                    dependencies: if install_deps_from_lock {
                        DependencyPolicy::InstallFromLock
                    } else {
                        DependencyPolicy::Report
                    },
                    remove_artifacts,
                },
                json_output,
            ),
        },
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {}", e.message);
            ExitCode::from(e.code)
        }
    }
}
