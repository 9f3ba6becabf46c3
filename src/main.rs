//! Network Speed Tester - Main CLI Application
//!
//! Measures latency, jitter and throughput against a speed-test endpoint
//! and prints a report.

use clap::Parser;
use network_speed_tester::{
    cli::Cli,
    config::parser::{display_config_summary, load_config},
    error::{AppError, Result},
    logging::LoggerFactory,
    models::Config,
    output::OutputFormatterFactory,
    SpeedTestApp, PKG_NAME, VERSION,
};
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    if cli.debug {
        print_build_banner();
    }

    // Until the configuration is loaded only the command line knows about color
    let cli_color = cli.color_override().unwrap_or(true);
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => exit_with_error(&e, cli_color),
    };

    let use_color = config.enable_color;
    if let Err(e) = run_application(config).await {
        exit_with_error(&e, use_color);
    }
}

fn print_build_banner() {
    eprintln!("{} v{}", PKG_NAME, VERSION);
    eprintln!(
        "Build: {} ({})",
        option_env!("GIT_COMMIT").unwrap_or("unknown"),
        option_env!("BUILD_TIME").unwrap_or("unknown time"),
    );
    eprintln!("Target: {}", option_env!("TARGET_TRIPLE").unwrap_or("unknown"));
    eprintln!();
}

fn exit_with_error(error: &AppError, use_color: bool) -> ! {
    eprintln!("Error: {}", error.format_for_console(use_color));
    print_error_suggestions(error);
    process::exit(error.exit_code());
}

/// Main application logic
async fn run_application(config: Config) -> Result<()> {
    if config.debug {
        eprintln!("Configuration loaded successfully:");
        for line in display_config_summary(&config).lines() {
            eprintln!("  {}", line);
        }
        eprintln!();
    }

    let loggers = LoggerFactory::new(config.clone());
    let app = SpeedTestApp::new(config.clone())?
        .with_logger(loggers.create_measurement_logger().await);

    let report = app.run().await?;

    let formatter = OutputFormatterFactory::create_formatter(&config);
    println!("{}", formatter.format_report(&report)?);

    Ok(())
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - Server URL must start with http:// or https://");
            eprintln!("  - Latency count must be between 1 and 1000");
        }
        AppError::Network(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Verify the server URL is reachable");
            eprintln!("  - Set a request timeout with --timeout if requests stall");
        }
        AppError::Statistics(_) => {
            eprintln!();
            eprintln!("Every request of a measurement failed. Run with --verbose to see each failure.");
        }
        _ => {}
    }
}
