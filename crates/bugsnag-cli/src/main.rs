use anyhow::{Context, Result};
use bugsnag_core::{Configuration, Level, LoggingEvent, MemoryReporter, NotificationBuilder};
use bugsnag_sender::{Delivery, Sender};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_MESSAGE: &str = "Test notification sent by bugsnag-notify";
const LOGGER_NAME: &str = "bugsnag_notify";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(
    after_help = "CONFIGURATION:\n  Settings are read from the configuration file, then BUGSNAG_* environment\n  variables, then the flags given here. Later sources win."
)]
struct Cli {
    /// Configuration file path
    #[arg(long, help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Bugsnag project API key")]
    api_key: Option<String>,

    #[arg(long, help = "Notify endpoint host, without protocol")]
    endpoint: Option<String>,

    #[arg(long, help = "Release stage reported with the notification")]
    release_stage: Option<String>,

    #[arg(long, help = "Deliver over HTTPS")]
    ssl: bool,

    #[arg(long, help = "Message of the test notification")]
    message: Option<String>,

    /// Only validate the configuration
    #[arg(long, help = "Validate the configuration and exit without sending")]
    check: bool,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", help = "Set log level")]
    log_level: String,
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// File, then environment, then flags.
fn configuration_for(cli: &Cli) -> Result<Configuration> {
    let mut config = Configuration::load(cli.config.as_deref()).with_context(|| {
        format!(
            "Failed to load configuration{}",
            cli.config
                .as_ref()
                .map(|path| format!(" from {}", path.display()))
                .unwrap_or_default()
        )
    })?;

    if let Some(api_key) = &cli.api_key {
        config.api_key = Some(api_key.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(release_stage) = &cli.release_stage {
        config.release_stage = Some(release_stage.clone());
    }
    if cli.ssl {
        config.ssl_enabled = true;
    }

    Ok(config)
}

fn print_errors(reporter: &MemoryReporter) {
    for error in reporter.errors() {
        match error.cause {
            Some(cause) => eprintln!("error: {}: {}", error.message, cause),
            None => eprintln!("error: {}", error.message),
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let configuration = Arc::new(configuration_for(&cli)?);
    let reporter = Arc::new(MemoryReporter::new());

    if configuration.is_invalid() {
        configuration.add_errors(reporter.as_ref());
        print_errors(&reporter);
        return Ok(ExitCode::FAILURE);
    }

    if cli.check {
        println!(
            "Configuration is valid, notifications go to {}",
            configuration.endpoint_with_protocol()
        );
        return Ok(ExitCode::SUCCESS);
    }

    let message = cli.message.as_deref().unwrap_or(DEFAULT_MESSAGE);
    let event = LoggingEvent::new(Level::Error, LOGGER_NAME, message);
    let Some(notification) = NotificationBuilder::new(&configuration).build(&event) else {
        println!(
            "Release stage {} is not notified for, nothing was sent",
            configuration.release_stage.as_deref().unwrap_or_default()
        );
        return Ok(ExitCode::SUCCESS);
    };

    let sender = Sender::new();
    sender.start(configuration.clone(), reporter.clone());
    debug!(started = sender.is_started(), "Sender prepared");

    let delivery = sender.send(&notification);
    sender.stop();

    match delivery {
        Delivery::Delivered { status } if (200..300).contains(&status) => {
            info!(status, "Test notification accepted");
            println!("Notification delivered (HTTP {})", status);
            Ok(ExitCode::SUCCESS)
        }
        Delivery::Delivered { status } => {
            println!("Notification rejected by endpoint (HTTP {})", status);
            Ok(ExitCode::FAILURE)
        }
        Delivery::Failed | Delivery::Skipped => {
            print_errors(&reporter);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.log_level);

    run(cli)
}
