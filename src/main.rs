//! HyPrism CLI entry point
//!
//! Parses the command line, sets up logging (stderr plus a daily log file in the
//! application's `logs/` directory) and runs the selected command. Failures are
//! printed with suggestions and exit with status 1.

use clap::Parser;
use hyprism::cli::Cli;
use hyprism::core::error::user_friendly_error;
use hyprism::utils::platform::AppLayout;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes logging.
///
/// `RUST_LOG` wins over the verbosity flags. The file layer is skipped when the
/// logs directory cannot be used.
fn init_tracing(cli: &Cli) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    let (file_layer, guard) = match open_log_file() {
        Some((writer, guard)) => {
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn open_log_file() -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let logs_dir = AppLayout::detect().ok()?.logs_dir();
    std::fs::create_dir_all(&logs_dir).ok()?;
    let appender = RollingBuilder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix("hyprism")
        .filename_suffix("log")
        .build(&logs_dir)
        .ok()?;
    Some(tracing_appender::non_blocking(appender))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let log_guard = init_tracing(&cli);

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    if let Err(e) = cli.execute().await {
        user_friendly_error(e).display();
        drop(log_guard);
        std::process::exit(1);
    }
}
