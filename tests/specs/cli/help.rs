//! Specs: top-level help lists the frozen command surface.

use crate::prelude::*;

#[test]
fn help_lists_all_seven_commands() {
    let stdout = cli().args(&["--help"]).passes();
    for command in ["init", "check", "run", "status", "replay", "takeover", "handoff"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn version_flag_works() {
    let stdout = cli().args(&["--version"]).passes();
    assert!(stdout.contains("daokit"));
}
