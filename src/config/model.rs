// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{
    EngineOptions, DEFAULT_DEBOUNCE_MS, DEFAULT_PATH_ENV, DEFAULT_SETTLE_MS,
    DEFAULT_SHUTDOWN_GRACE_MS,
};
use crate::types::{Action, HostMode, WatchRule};
use crate::watch::path_utils::absolutize;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// debounce_ms = 100
/// path_env = "WATCH_FILE"
///
/// [[rule]]
/// name = "codegen"
/// files = ["schema/*.graphql", "codegen.yml"]
/// cmd = "npm run codegen"
/// first_compilation = true
/// shared_action = true
/// ```
///
/// Use `ConfigFile::try_from` (or `config::load_and_validate`) to obtain a
/// validated [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Engine behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All rules from `[[rule]]`, in declaration order.
    #[serde(default)]
    pub rule: Vec<RuleConfig>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    rules: Vec<RuleConfig>,
}

impl ConfigFile {
    /// Build without validation; only `TryFrom<RawConfigFile>` should call this.
    pub(crate) fn new_unchecked(config: ConfigSection, rules: Vec<RuleConfig>) -> Self {
        Self { config, rules }
    }

    pub fn section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn rule_configs(&self) -> &[RuleConfig] {
        &self.rules
    }

    /// Turn every `[[rule]]` into a command-action [`WatchRule`].
    pub fn rules(&self) -> Vec<WatchRule> {
        self.rules.iter().map(RuleConfig::to_watch_rule).collect()
    }

    /// Engine options; a relative `[config].cwd` is resolved against
    /// `base_dir` (normally the config file's directory).
    pub fn engine_options(&self, base_dir: &Path, mode: HostMode) -> EngineOptions {
        let cwd = match &self.config.cwd {
            Some(cwd) => absolutize(base_dir, cwd),
            None => base_dir.to_path_buf(),
        };

        let mut options = EngineOptions::new(cwd, mode);
        options.debounce_window = Duration::from_millis(self.config.debounce_ms);
        options.settle_delay = Duration::from_millis(self.config.settle_ms);
        options.cycle_detection = self.config.cycle_detection;
        options.path_env = self.config.path_env.clone();
        options.shutdown_grace = Duration::from_millis(self.config.shutdown_grace_ms);
        options
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Base directory for relative patterns. Defaults to the config file's
    /// directory.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Debounce window for `shared_action` rules, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Quiet period before a live change counts as written, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Warn about files stuck in a change loop.
    #[serde(default = "default_true")]
    pub cycle_detection: bool,

    /// Environment variable that carries the triggering path into commands.
    #[serde(default = "default_path_env")]
    pub path_env: String,

    /// How long shutdown waits for running actions, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

fn default_true() -> bool {
    true
}

fn default_path_env() -> String {
    DEFAULT_PATH_ENV.to_string()
}

fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_MS
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            cwd: None,
            debounce_ms: default_debounce_ms(),
            settle_ms: default_settle_ms(),
            cycle_detection: default_true(),
            path_env: default_path_env(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

/// `files = "a"` or `files = ["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Patterns {
    One(String),
    Many(Vec<String>),
}

impl Patterns {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Patterns::One(p) => vec![p.clone()],
            Patterns::Many(ps) => ps.clone(),
        }
    }
}

/// One `[[rule]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Optional display name used in logs.
    #[serde(default)]
    pub name: Option<String>,

    /// Glob or literal patterns, relative to the working directory.
    pub files: Patterns,

    /// Shell command to run for a triggering file.
    pub cmd: String,

    /// Also run for every currently matching file before the first build.
    #[serde(default)]
    pub first_compilation: bool,

    /// Collapse matches that happen together into one invocation.
    #[serde(default)]
    pub shared_action: bool,
}

impl RuleConfig {
    pub fn to_watch_rule(&self) -> WatchRule {
        let mut rule = WatchRule::new(self.files.to_vec(), Action::command(self.cmd.clone()))
            .first_compilation(self.first_compilation)
            .shared_action(self.shared_action);
        if let Some(name) = &self.name {
            rule = rule.named(name.clone());
        }
        rule
    }
}
