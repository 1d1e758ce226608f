// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{EngineOptions, RuleEngine};
use crate::fs::RealFileSystem;
use crate::types::HostMode;
use crate::watch::path_utils::absolutize;
use crate::watch::patterns::{expand, ResolvedWatch};

pub use crate::engine::EngineState;
pub use crate::types::{Action, WatchRule};

/// High-level entry point used by `main.rs`.
///
/// Stands in for the host build tool: loads the rules, fires the "before
/// first run" signal, and in interactive mode keeps watching until Ctrl-C,
/// which becomes the shutdown signal.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)?;

    let mode = if args.once {
        HostMode::Build
    } else {
        HostMode::Interactive
    };

    let base_dir = config_root_dir(&config_path);
    let mut options = cfg.engine_options(&base_dir, mode);
    if let Some(cwd) = &args.cwd {
        let invocation_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        options.cwd = absolutize(&invocation_dir, Path::new(cwd));
    }
    if args.no_cycle_detection {
        options.cycle_detection = false;
    }

    if args.dry_run {
        print_dry_run(&cfg, &options)?;
        return Ok(());
    }

    let mut engine = RuleEngine::from_rules(cfg.rules(), options)?;
    engine.before_first_run().await?;

    if mode == HostMode::Build {
        info!("build mode finished");
        return Ok(());
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C; shutting down");
    }

    if let Some(stats) = engine.on_shutdown().await {
        info!(?stats, "stopped watching");
    }
    Ok(())
}

/// Figure out the directory relative patterns are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "configs/Rulewatch.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Rulewatch.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => absolutize(&cwd, parent),
        _ => cwd,
    }
}

/// Dry-run output: rules, their watch roots and what matches right now.
fn print_dry_run(cfg: &ConfigFile, options: &EngineOptions) -> Result<()> {
    let fs = RealFileSystem;

    println!("rulewatch dry-run");
    println!("  cwd = {}", options.cwd.display());
    println!("  debounce = {:?}", options.debounce_window);
    println!("  settle = {:?}", options.settle_delay);
    println!("  cycle_detection = {}", options.cycle_detection);
    println!("  path_env = {}", options.path_env);
    println!();

    let rules = cfg.rules();
    println!("rules ({}):", rules.len());
    for rule in &rules {
        println!("  - {}", rule.display_name());
        println!("      action: {:?}", rule.action());
        if rule.runs_on_first_compilation() {
            println!("      first_compilation: true");
        }
        if rule.is_shared_action() {
            println!("      shared_action: true");
        }

        let resolved = ResolvedWatch::resolve(rule.patterns(), &options.cwd)?;
        for root in resolved.roots() {
            println!("      root: {}", root.display());
        }
        for target in resolved.subscription_targets(&fs) {
            println!(
                "      watch: {} ({})",
                target.path.display(),
                if target.recursive { "recursive" } else { "flat" }
            );
        }
        for pattern in rule.patterns() {
            let matched = expand(pattern, &options.cwd, &fs)?;
            println!("      {pattern}: {} match(es)", matched.len());
            for path in matched {
                println!("        {}", path.display());
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
