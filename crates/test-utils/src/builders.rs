#![allow(dead_code)]

use rulewatch::config::{ConfigFile, ConfigSection, Patterns, RawConfigFile, RuleConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                rule: Vec::new(),
            },
        }
    }

    pub fn with_rule(mut self, rule: RuleConfig) -> Self {
        self.config.rule.push(rule);
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.config.config.settle_ms = ms;
        self
    }

    pub fn cycle_detection(mut self, val: bool) -> Self {
        self.config.config.cycle_detection = val;
        self
    }

    pub fn path_env(mut self, name: &str) -> Self {
        self.config.config.path_env = name.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RuleConfig`.
pub struct RuleConfigBuilder {
    rule: RuleConfig,
}

impl RuleConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            rule: RuleConfig {
                name: None,
                files: Patterns::Many(Vec::new()),
                cmd: cmd.to_string(),
                first_compilation: false,
                shared_action: false,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.rule.name = Some(name.to_string());
        self
    }

    pub fn file(mut self, pattern: &str) -> Self {
        let mut patterns = self.rule.files.to_vec();
        patterns.push(pattern.to_string());
        self.rule.files = Patterns::Many(patterns);
        self
    }

    pub fn first_compilation(mut self, val: bool) -> Self {
        self.rule.first_compilation = val;
        self
    }

    pub fn shared_action(mut self, val: bool) -> Self {
        self.rule.shared_action = val;
        self
    }

    pub fn build(self) -> RuleConfig {
        self.rule
    }
}
