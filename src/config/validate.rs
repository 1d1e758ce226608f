// src/config/validate.rs

use std::collections::HashSet;
use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile, RuleConfig};
use crate::errors::{Result, RulewatchError};
use crate::watch::patterns::matcher_for;

/// Upper bound for `settle_ms`; anything longer makes live mode feel dead.
const MAX_SETTLE_MS: u64 = 60_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::RulewatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.rule))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_rules(cfg)?;
    validate_global_config(cfg)?;
    validate_rule_names(cfg)?;
    for (idx, rule) in cfg.rule.iter().enumerate() {
        validate_rule(idx, rule)?;
    }
    Ok(())
}

fn ensure_has_rules(cfg: &RawConfigFile) -> Result<()> {
    if cfg.rule.is_empty() {
        return Err(RulewatchError::ConfigError(
            "config must contain at least one [[rule]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    let path_env = cfg.config.path_env.trim();
    if path_env.is_empty() || path_env.contains('=') || path_env.contains('\0') {
        return Err(RulewatchError::ConfigError(format!(
            "[config].path_env must be a valid environment variable name (got {:?})",
            cfg.config.path_env
        )));
    }

    if cfg.config.settle_ms > MAX_SETTLE_MS {
        return Err(RulewatchError::ConfigError(format!(
            "[config].settle_ms must be <= {MAX_SETTLE_MS} (got {})",
            cfg.config.settle_ms
        )));
    }

    Ok(())
}

fn validate_rule_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for name in cfg.rule.iter().filter_map(|r| r.name.as_deref()) {
        if !seen.insert(name) {
            return Err(RulewatchError::ConfigError(format!(
                "duplicate rule name '{name}'"
            )));
        }
    }
    Ok(())
}

fn validate_rule(idx: usize, rule: &RuleConfig) -> Result<()> {
    let label = rule
        .name
        .clone()
        .unwrap_or_else(|| format!("#{}", idx + 1));

    let patterns = rule.files.to_vec();
    if patterns.is_empty() {
        return Err(RulewatchError::ConfigError(format!(
            "rule '{label}' must have at least one entry in `files`"
        )));
    }
    if patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(RulewatchError::ConfigError(format!(
            "rule '{label}' has an empty pattern in `files`"
        )));
    }
    if rule.cmd.trim().is_empty() {
        return Err(RulewatchError::ConfigError(format!(
            "rule '{label}' has an empty `cmd`"
        )));
    }

    // Compile against a neutral base; only pattern syntax matters here.
    for pattern in &patterns {
        matcher_for(pattern, Path::new("/"))?;
    }

    Ok(())
}
