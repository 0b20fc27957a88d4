//! CLI parse tests.

use super::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

#[test]
fn cli_parse_run() {
    match parse(&["fetchy", "run", "requests.toml"]) {
        CliCommand::Run {
            manifest,
            concurrency,
        } => {
            assert_eq!(manifest, PathBuf::from("requests.toml"));
            assert!(concurrency.is_none());
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_concurrency() {
    match parse(&["fetchy", "run", "m.toml", "--concurrency", "4"]) {
        CliCommand::Run { concurrency, .. } => assert_eq!(concurrency, Some(4)),
        _ => panic!("expected Run"),
    }
    match parse(&["fetchy", "run", "-c", "1", "m.toml"]) {
        CliCommand::Run { concurrency, .. } => assert_eq!(concurrency, Some(1)),
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_check() {
    match parse(&["fetchy", "check", "m.toml"]) {
        CliCommand::Check { manifest } => assert_eq!(manifest, PathBuf::from("m.toml")),
        _ => panic!("expected Check"),
    }
}

#[test]
fn cli_rejects_missing_manifest() {
    assert!(Cli::try_parse_from(["fetchy", "run"]).is_err());
    assert!(Cli::try_parse_from(["fetchy", "run", "m.toml", "--concurrency", "many"]).is_err());
}

#[test]
fn cli_rejects_unknown_command() {
    assert!(Cli::try_parse_from(["fetchy", "status"]).is_err());
}
