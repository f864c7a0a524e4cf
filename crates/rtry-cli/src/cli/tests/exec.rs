//! Tests for the exec subcommand.

use super::parse;
use crate::cli::{Cli, CliCommand, SwallowArg};
use clap::Parser;

#[test]
fn cli_parse_exec_minimal() {
    match parse(&["rtry", "exec", "--", "curl", "-fsS", "http://localhost"]) {
        CliCommand::Exec {
            attempts,
            delay,
            timeout,
            swallow,
            until_code,
            command,
        } => {
            assert!(attempts.is_none());
            assert!(delay.is_none());
            assert!(timeout.is_none());
            assert!(swallow.is_none());
            assert_eq!(until_code, 0);
            assert_eq!(command, vec!["curl", "-fsS", "http://localhost"]);
        }
        _ => panic!("expected Exec"),
    }
}

#[test]
fn cli_parse_exec_all_flags() {
    match parse(&[
        "rtry",
        "exec",
        "--attempts",
        "5",
        "--delay",
        "0.5",
        "--timeout",
        "30",
        "--swallow",
        "none",
        "--until-code",
        "2",
        "--",
        "make",
        "test",
    ]) {
        CliCommand::Exec {
            attempts,
            delay,
            timeout,
            swallow,
            until_code,
            command,
        } => {
            assert_eq!(attempts, Some(5));
            assert_eq!(delay, Some(0.5));
            assert_eq!(timeout, Some(30.0));
            assert_eq!(swallow, Some(SwallowArg::None));
            assert_eq!(until_code, 2);
            assert_eq!(command, vec!["make", "test"]);
        }
        _ => panic!("expected Exec"),
    }
}

#[test]
fn cli_parse_exec_without_separator() {
    match parse(&["rtry", "exec", "--attempts", "2", "ls", "-la"]) {
        CliCommand::Exec { command, attempts, .. } => {
            assert_eq!(attempts, Some(2));
            assert_eq!(command, vec!["ls", "-la"]);
        }
        _ => panic!("expected Exec"),
    }
}

#[test]
fn cli_parse_exec_requires_program() {
    assert!(Cli::try_parse_from(["rtry", "exec"]).is_err());
    assert!(Cli::try_parse_from(["rtry", "exec", "--attempts", "2"]).is_err());
}

#[test]
fn cli_parse_exec_rejects_unknown_swallow() {
    assert!(Cli::try_parse_from(["rtry", "exec", "--swallow", "some", "--", "true"]).is_err());
}
