use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info};

use prism_cli::{Args, CliError, error_adapter::ErrorAdapter};

fn main() {
    miette::set_panic_hook();

    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting Prism");
    debug!(args:?; "Parsed arguments");

    match prism_cli::run(&args) {
        Ok(()) => info!("Completed successfully"),
        // The report already lists every diagnostic.
        Err(CliError::Invalid { invalid, total }) => {
            info!(invalid = invalid, total = total; "Validation failed");
            process::exit(1);
        }
        Err(err) => {
            let adapted_error = ErrorAdapter(&err);

            let reporter = miette::GraphicalReportHandler::new();
            let mut writer = String::new();
            if reporter.render_report(&mut writer, &adapted_error).is_err() {
                writer = err.to_string();
            }

            error!("Failed\n{writer}");
            process::exit(1);
        }
    }
}
