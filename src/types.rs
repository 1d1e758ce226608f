// src/types.rs

//! Rule declaration types shared by config, engine and dispatcher.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by a callback action.
pub type CallbackFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Callback action: receives the absolute path of the triggering file.
pub type Callback = Arc<dyn Fn(PathBuf) -> CallbackFuture + Send + Sync>;

/// What a rule does when one of its files changes.
#[derive(Clone)]
pub enum Action {
    /// Shell command; the triggering path is exported through an environment
    /// variable (see `EngineOptions::path_env`).
    Command(String),
    /// In-process callback.
    Callback(Callback),
}

impl Action {
    pub fn command(cmd: impl Into<String>) -> Self {
        Action::Command(cmd.into())
    }

    /// Wrap an async closure as a callback action.
    pub fn callback<F, Fut>(f: F) -> Self
    where
        F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Action::Callback(Arc::new(move |path| Box::pin(f(path)) as CallbackFuture))
    }

    /// Wrap a plain closure as a callback action.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(PathBuf) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Action::Callback(Arc::new(move |path| {
            let res = f(path);
            Box::pin(async move { res }) as CallbackFuture
        }))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Command(cmd) => f.debug_tuple("Command").field(cmd).finish(),
            Action::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// A declarative watch rule.
///
/// Immutable once handed to the engine.
#[derive(Debug, Clone)]
pub struct WatchRule {
    patterns: Vec<String>,
    action: Action,
    first_compilation: bool,
    shared_action: bool,
    name: Option<String>,
}

impl WatchRule {
    pub fn new<I, S>(patterns: I, action: Action) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            action,
            first_compilation: false,
            shared_action: false,
            name: None,
        }
    }

    /// Run this rule during the initial pass, before the first build.
    pub fn first_compilation(mut self, val: bool) -> Self {
        self.first_compilation = val;
        self
    }

    /// Collapse matches that happen together into a single invocation.
    pub fn shared_action(mut self, val: bool) -> Self {
        self.shared_action = val;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn runs_on_first_compilation(&self) -> bool {
        self.first_compilation
    }

    pub fn is_shared_action(&self) -> bool {
        self.shared_action
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used in logs: the explicit name, else the joined patterns.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.patterns.join(", "),
        }
    }
}

/// How the host build tool is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostMode {
    /// Dev server / watch mode: initial pass, then live watching.
    #[default]
    Interactive,
    /// One-shot build: initial pass only.
    Build,
}
