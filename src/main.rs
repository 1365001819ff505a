//! tfinspect CLI entry point.
//!
//! This binary provides the command-line interface for tfinspect.

use clap::Parser;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tfinspect::cli::Cli;
use tfinspect::reporter::Reporter;
use tfinspect::{Config, Loader, Module};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            eprintln!("Error: {e}");

            let mut source = e.source();
            if source.is_some() {
                eprintln!("\nCaused by:");
                let mut i = 0;
                while let Some(cause) = source {
                    eprintln!("  {i}: {cause}");
                    source = cause.source();
                    i += 1;
                }
            }

            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        // RUST_LOG wins over the verbose flag
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let base_level = match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            EnvFilter::new(format!("warn,tfinspect={base_level}"))
        })
    };

    // Reports go to stdout; logs stay on stderr.
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    tracing::debug!("Loading configuration");
    let mut config = load_config(cli)?;
    config.merge_cli_args(cli);

    if !config.output.colored {
        colored::control::set_override(false);
    }

    let (module, load_failed) = match Loader::new(&config).load(&cli.dir) {
        Ok(module) => (module, false),
        Err(e) if e.is_directory_error() => {
            tracing::error!(dir = %cli.dir.display(), error = %e, "Cannot load directory");
            eprintln!("Error: {e}");
            (Module::new(cli.dir.display().to_string()), true)
        }
        Err(e) => return Err(e.into()),
    };

    let report = match Reporter::new(&config).generate(&module, config.output.format) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error producing report: {e}");
            return Ok(ExitCode::from(e.exit_code()));
        }
    };

    if let Some(output_path) = &cli.output {
        std::fs::write(output_path, &report)?;
        tracing::info!(path = %output_path.display(), "Report written");
    } else {
        std::io::stdout().lock().write_all(report.as_bytes())?;
    }

    let exit_code = if load_failed || module.has_errors() {
        1
    } else {
        0
    };

    Ok(ExitCode::from(exit_code))
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(config_path) = &cli.config {
        tracing::debug!(path = %config_path.display(), "Loading configuration from explicit path");
        let content = std::fs::read_to_string(config_path)?;
        return Ok(Config::from_yaml(&content)?);
    }

    for path in Config::DEFAULT_FILES {
        if Path::new(path).exists() {
            tracing::debug!(path = %path, "Found configuration file");
            let content = std::fs::read_to_string(path)?;
            return Ok(Config::from_yaml(&content)?);
        }
    }

    tracing::debug!("No configuration file found, using default configuration");
    Ok(Config::default())
}
