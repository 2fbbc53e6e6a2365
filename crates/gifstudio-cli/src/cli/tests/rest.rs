//! Tests for presets and probe.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_presets() {
    match parse(&["gifstudio", "presets"]) {
        CliCommand::Presets => {}
        _ => panic!("expected Presets"),
    }
}

#[test]
fn cli_parse_probe() {
    match parse(&["gifstudio", "probe", "clip.webm"]) {
        CliCommand::Probe { video } => assert_eq!(video, PathBuf::from("clip.webm")),
        _ => panic!("expected Probe"),
    }
}

#[test]
fn cli_parse_unknown_subcommand_fails() {
    assert!(Cli::try_parse_from(["gifstudio", "upload", "x"]).is_err());
}
