mod cli;
mod config;
mod error;
mod output;

use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tgpush::{Dispatcher, RuleContext};
use tracing::{error, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::Args,
    error::{CliError, Result},
    output::OutcomeRecord,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose, args.quiet) {
        eprintln!("Error: {e}");
        return ExitCode::from(2);
    }

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Application error: {:#}", e);
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether the message was delivered.
async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = config::load(args.config.as_deref())?;
    config::apply_overrides(&mut config, &args);

    if args.print_config {
        print!("{}", config::render_masked(&config)?);
        return Ok(true);
    }

    let message = read_message(args.message.as_deref())?;
    let rule = args.rule_id.map(|id| RuleContext {
        id,
        name: args.rule_name.clone().unwrap_or_default(),
    });

    let dispatcher = Dispatcher::new(&config.request);

    let interrupt = dispatcher.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling delivery");
            interrupt.shutdown();
        }
    });

    let outcome = dispatcher
        .dispatch(&config.telegram, message, rule.as_ref(), args.log_id)
        .outcome()
        .await;

    let record = OutcomeRecord::new(&outcome, args.log_id, args.rule_id);
    println!(
        "{}",
        record
            .render(args.compact)
            .context("Failed to serialize outcome")?
    );

    Ok(outcome.is_success())
}

/// Message from the argument, or all of stdin with the trailing newline
/// dropped.
fn read_message(arg: Option<&str>) -> Result<String> {
    let message = match arg {
        Some(message) => message.to_string(),
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                return Err(CliError::InvalidArgument(
                    "no message given and stdin is a terminal".to_string(),
                ));
            }
            let mut buffer = String::new();
            stdin.lock().read_to_string(&mut buffer)?;
            trim_trailing_newline(buffer)
        }
    };

    if message.trim().is_empty() {
        return Err(CliError::InvalidArgument("message is empty".to_string()));
    }
    Ok(message)
}

fn trim_trailing_newline(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

/// `--quiet` and `--verbose` win; otherwise `RUST_LOG` as given, or `info`
/// when it is unset, blank or malformed.
fn log_filter(verbose: bool, quiet: bool, rust_log: Option<&str>) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        rust_log
            .filter(|directives| !directives.trim().is_empty())
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    }
}

fn init_logging(verbose: bool, quiet: bool) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    // stdout carries the outcome record.
    tracing_subscriber::registry()
        .with(log_filter(verbose, quiet, rust_log.as_deref()))
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tracing_subscriber::filter::LevelFilter;

    #[rstest]
    #[case(false, false, None, LevelFilter::INFO)]
    #[case(false, false, Some(""), LevelFilter::INFO)]
    #[case(false, false, Some("debug"), LevelFilter::DEBUG)]
    #[case(false, false, Some("warn"), LevelFilter::WARN)]
    #[case(false, false, Some("trace"), LevelFilter::TRACE)]
    #[case(false, false, Some("tgpush=debug,warn"), LevelFilter::DEBUG)]
    #[case(true, false, Some("warn"), LevelFilter::DEBUG)]
    #[case(false, true, Some("trace"), LevelFilter::ERROR)]
    fn test_log_filter_respects_rust_log(
        #[case] verbose: bool,
        #[case] quiet: bool,
        #[case] rust_log: Option<&str>,
        #[case] expected: LevelFilter,
    ) {
        assert_eq!(
            log_filter(verbose, quiet, rust_log).max_level_hint(),
            Some(expected)
        );
    }

    #[rstest]
    #[case("hello\n", "hello")]
    #[case("hello\r\n", "hello")]
    #[case("line one\nline two\n\n", "line one\nline two\n")]
    #[case("no newline", "no newline")]
    fn test_trim_trailing_newline(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(trim_trailing_newline(input.to_string()), expected);
    }

    #[test]
    fn test_message_argument_is_used_verbatim() {
        assert_eq!(
            read_message(Some("  padded  ")).unwrap(),
            "  padded  ".to_string()
        );
    }

    #[test]
    fn test_blank_message_is_rejected() {
        let err = read_message(Some(" \n ")).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
