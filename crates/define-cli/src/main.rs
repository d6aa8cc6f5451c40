//! Define-XML metadata graph CLI.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use tracing::level_filters::LevelFilter;

use define_cli::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use define_cli::commands::{run_apply, run_check, run_copy_results, run_save};
use define_cli::config::CliConfig;
use define_cli::logging::{LogConfig, LogFormat, init_logging};
use define_cli::summary::{render_apply, render_check, render_copy, render_save};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = CliConfig::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Check(args) => {
            let result = run_check(args)?;
            print!("{}", render_check(&result));
            Ok(if result.has_issues() { 1 } else { 0 })
        }
        Command::Apply(args) => {
            let result = run_apply(args, &config)?;
            report(&render_apply(&result), args.output.is_some());
            Ok(0)
        }
        Command::Save(args) => {
            let result = run_save(args, &config)?;
            report(&render_save(&result), args.output.is_some());
            Ok(0)
        }
        Command::CopyResults(args) => {
            let result = run_copy_results(args, &config)?;
            report(&render_copy(&result), args.output.is_some());
            Ok(0)
        }
    }
}

/// Summaries go to stderr when the document itself went to stdout.
fn report(summary: &str, wrote_file: bool) {
    if wrote_file {
        print!("{summary}");
    } else {
        eprint!("{summary}");
    }
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
