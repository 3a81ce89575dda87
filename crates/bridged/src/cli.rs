//! Command-line entry point.
//!
//! Besides running the daemon, the binary can print an example registry
//! (`--example`) or validate a registry and summarise it (`--validate`).

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use bridge_config::{EXAMPLE_DOCUMENT, ServerConfig, Settings};
use clap::Parser;
use clap::error::ErrorKind;

use crate::process::run_daemon;

const USAGE_EXIT: u8 = 2;

/// Parses `args` and runs the selected mode.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let settings = match Settings::try_parse_from(args) {
        Ok(settings) => settings,
        Err(error) => return report_usage(&error, stdout, stderr),
    };

    if settings.example {
        return exit_with(writeln!(stdout, "{EXAMPLE_DOCUMENT}").is_ok());
    }
    if settings.validate {
        return validate(&settings, stdout, stderr);
    }

    match run_daemon(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            drop(writeln!(stderr, "bridged: {error}"));
            ExitCode::FAILURE
        }
    }
}

fn validate<W: Write, E: Write>(settings: &Settings, stdout: &mut W, stderr: &mut E) -> ExitCode {
    match ServerConfig::load(settings) {
        Ok(config) => exit_with(write_summary(&config, stdout).is_ok()),
        Err(error) => {
            drop(writeln!(stderr, "Configuration is invalid: {error}"));
            ExitCode::FAILURE
        }
    }
}

fn write_summary<W: Write>(config: &ServerConfig, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "Configuration is valid")?;
    writeln!(out, "  name: {}", config.name())?;
    writeln!(out, "  socket: {} ({})", config.socket(), config.socket().permissions())?;
    writeln!(out, "  commands: {}", config.commands().names().join(", "))?;
    let limit = config.request_limit();
    if limit.enabled() {
        writeln!(
            out,
            "  rate limit: {} requests per {} seconds",
            limit.requests(),
            limit.window().as_secs()
        )?;
    } else {
        writeln!(out, "  rate limit: disabled")?;
    }
    writeln!(
        out,
        "  authentication: {}",
        if config.auth().enabled() { "enabled" } else { "disabled" }
    )
}

fn report_usage<W: Write, E: Write>(
    error: &clap::Error,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode {
    let rendered = error.render().to_string();
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            exit_with(write!(stdout, "{rendered}").is_ok())
        }
        _ => {
            drop(write!(stderr, "{rendered}"));
            ExitCode::from(USAGE_EXIT)
        }
    }
}

fn exit_with(written: bool) -> ExitCode {
    if written {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
