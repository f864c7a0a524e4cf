//! CLI for rtry.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rtry_core::config::{self, RtryConfig, SwallowMode};
use std::path::{Path, PathBuf};

use commands::{run_config, run_exec, ExecOptions};

/// Top-level CLI for rtry.
#[derive(Debug, Parser)]
#[command(name = "rtry")]
#[command(about = "rtry: run a command until it succeeds, attempts run out or time is up", long_about = None)]
pub struct Cli {
    /// Read defaults from this file instead of ~/.config/rtry/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Which failures (spawn errors, signal deaths) are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SwallowArg {
    All,
    None,
}

impl From<SwallowArg> for SwallowMode {
    fn from(arg: SwallowArg) -> Self {
        match arg {
            SwallowArg::All => SwallowMode::All,
            SwallowArg::None => SwallowMode::None,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a program, retrying until it exits with the expected code.
    Exec {
        /// Maximum number of attempts, including the first.
        #[arg(long, value_name = "N")]
        attempts: Option<u32>,
        /// Seconds to wait between attempts.
        #[arg(long, value_name = "SECS")]
        delay: Option<f64>,
        /// Wall-clock bound on all attempts together, in seconds (0 = none).
        #[arg(long, value_name = "SECS")]
        timeout: Option<f64>,
        /// Retry failures to start or finish the program.
        #[arg(long, value_enum)]
        swallow: Option<SwallowArg>,
        /// Exit code that counts as success.
        #[arg(long, default_value = "0", value_name = "CODE", allow_negative_numbers = true)]
        until_code: i32,
        /// Program and its arguments (after `--`).
        #[arg(required = true, trailing_var_arg = true, value_name = "PROGRAM")]
        command: Vec<String>,
    },

    /// Show the config file path and the effective retry defaults.
    Config,
}

fn load_config(path: Option<&Path>) -> Result<RtryConfig> {
    match path {
        Some(path) => config::load_from_path(path),
        None => config::load_or_init(),
    }
}

impl CliCommand {
    /// Parse arguments and dispatch. Returns the process exit code.
    pub fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let cfg = load_config(cli.config.as_deref())?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Exec {
                attempts,
                delay,
                timeout,
                swallow,
                until_code,
                command,
            } => {
                let opts = ExecOptions {
                    attempts,
                    delay_secs: delay,
                    timeout_secs: timeout,
                    swallow: swallow.map(Into::into),
                    until_code,
                    command,
                };
                run_exec(&cfg, opts)
            }
            CliCommand::Config => {
                run_config(&cfg, cli.config.as_deref())?;
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests;
