//! L4 Connection Tester - command-line client
//!
//! Opens a configured number of TCP or UDP connections to one endpoint,
//! writes a payload on each, and exits non-zero when the success rate stays
//! below the threshold.

use clap::{error::ErrorKind, Parser};
use l4_conn_tester::{
    build_info,
    cli::Cli,
    config::{display_config_summary, load_config, validate_config, EnvManager, ValidationLevel},
    error::{AppError, ErrorReporter, Result},
    logging::{LogLevel, Logger},
    signal::spawn_signal_bridge,
    tester::{ConnTester, RunSummary, Verdict},
    PKG_NAME,
};
use std::io::IsTerminal;
use std::path::Path;
use std::process;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
    }));

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => e.exit(),
            _ => {
                // Exit code 2 belongs to a failed test
                let rendered = e.render().to_string();
                let error = AppError::validation(rendered.trim_start_matches("error: ").trim_end());
                ErrorReporter::new(std::io::stderr().is_terminal(), false).report_error(&error);
                process::exit(error.exit_code());
            }
        },
    };

    if cli.env_help {
        println!("{}", EnvManager::display_env_help());
        return;
    }

    let use_color = !cli.no_color && std::io::stderr().is_terminal();

    match run_application(cli).await {
        Ok(summary) => process::exit(summary.verdict.exit_code()),
        Err(e) => {
            ErrorReporter::new(use_color, e.exit_code() == 1).report_error(&e);
            process::exit(e.exit_code());
        }
    }
}

/// Load configuration, run the test and report its verdict
async fn run_application(cli: Cli) -> Result<RunSummary> {
    let config = load_config(cli)?;
    let logger = Logger::with_config(PKG_NAME, &config)?;
    let session_id = logger.start_session().await;

    logger.debug("client starting")
        .field("build", build_info())
        .field("session_id", &session_id)
        .log()
        .await;

    if let Some(lines) = EnvManager::check_env_file(Path::new(".env"))? {
        for line in lines {
            logger.warn(&line).field("source", ".env").log().await;
        }
    }

    for warning in validate_config(&config)? {
        let level = match warning.level {
            ValidationLevel::Info => LogLevel::Info,
            ValidationLevel::Warning => LogLevel::Warn,
        };
        logger.log(level, &warning.message).field("source", "config").log().await;
    }

    let tester = ConnTester::from_config(&config, logger.named("tester"))?;
    if logger.would_log(LogLevel::Debug) {
        for line in display_config_summary(tester.config()).lines() {
            logger.debug(line).log().await;
        }
    }

    let cancel = CancellationToken::new();
    let signals = spawn_signal_bridge(cancel.clone(), logger.named("signal"));

    let summary = tester.spawn(cancel).wait().await;
    signals.abort();
    let summary = summary?;

    match summary.clone().into_result() {
        Ok(()) => {
            logger.info("test passed")
                .field("rate", summary.rate)
                .field("threshold", summary.threshold)
                .log()
                .await;
        }
        Err(e) if summary.verdict == Verdict::Cancelled => {
            logger.warn("test cancelled").error_info(&e).log().await;
        }
        Err(e) => {
            logger.error("test failed").error_info(&e).log().await;
        }
    }

    Ok(summary)
}
