// tests/cli_args.rs

use std::path::PathBuf;

use clap::Parser;

use rulewatch::cli::CliArgs;
use rulewatch::config::loader::DEFAULT_CONFIG_FILE;

#[test]
fn config_defaults_to_rulewatch_toml() {
    let args = CliArgs::try_parse_from(["rulewatch"]).expect("parse");
    assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    assert!(!args.once);
    assert!(!args.dry_run);
}

#[test]
fn flags_are_parsed() {
    let args = CliArgs::try_parse_from([
        "rulewatch",
        "--config",
        "web/Rulewatch.toml",
        "--once",
        "--no-cycle-detection",
        "--cwd",
        "web",
    ])
    .expect("parse");
    assert_eq!(args.config, PathBuf::from("web/Rulewatch.toml"));
    assert!(args.once);
    assert!(args.no_cycle_detection);
    assert_eq!(args.cwd.as_deref(), Some("web"));
}
