//! Tests for the config subcommand and global options.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_config() {
    match parse(&["rtry", "config"]) {
        CliCommand::Config => {}
        _ => panic!("expected Config"),
    }
}

#[test]
fn cli_parse_global_config_path() {
    let cli = Cli::try_parse_from(["rtry", "exec", "--config", "/tmp/r.toml", "--", "true"])
        .unwrap();
    assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/r.toml")));

    let cli = Cli::try_parse_from(["rtry", "--config", "/tmp/r.toml", "config"]).unwrap();
    assert_eq!(cli.config.as_deref(), Some(Path::new("/tmp/r.toml")));
}

#[test]
fn cli_parse_unknown_subcommand_fails() {
    assert!(Cli::try_parse_from(["rtry", "frobnicate"]).is_err());
}
