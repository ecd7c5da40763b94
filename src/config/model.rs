// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// shutdown_grace_ms = 2000
/// background_default = false
///
/// [action.sfc-scan]
/// command = "sfc"
/// args = ["/scannow"]
/// background = true
/// pass_on_output = "did not find any integrity violations"
/// fail_on_output = "found corrupt files"
/// ```
///
/// All sections are optional and have reasonable defaults, except that at
/// least one `[action.<name>]` must be present (checked in `validate`).
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All actions from `[action.<name>]`, keyed by action name.
    #[serde(default)]
    pub action: BTreeMap<String, ActionConfig>,
}

/// Validated configuration.
///
/// Constructed only via `TryFrom<RawConfigFile>` (see `validate`), so holding
/// one means the action set is non-empty and every pattern compiles.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub action: BTreeMap<String, ActionConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        action: BTreeMap<String, ActionConfig>,
    ) -> Self {
        Self { config, action }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// How long the shutdown sweep waits for a killed process to exit, in
    /// milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Default for actions that do not set `background` themselves.
    #[serde(default)]
    pub background_default: bool,
}

fn default_shutdown_grace_ms() -> u64 {
    2000
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: default_shutdown_grace_ms(),
            background_default: false,
        }
    }
}

impl ConfigSection {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// `[action.<name>]` section: one external command plus output classifiers.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    /// Executable to run. A bare name is resolved via `PATH`; anything with a
    /// path separator is used as-is.
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Run on a worker instead of blocking the caller.
    ///
    /// If `None`, falls back to `config.background_default`.
    #[serde(default)]
    pub background: Option<bool>,

    /// Free-form description shown by `--list`.
    #[serde(default)]
    pub description: Option<String>,

    /// Regex marking an output line as PASS.
    #[serde(default)]
    pub pass_on_output: Option<String>,

    /// Regex marking an output line as WARN.
    #[serde(default)]
    pub warn_on_output: Option<String>,

    /// Regex marking an output line as FAIL. A match also fails the action.
    #[serde(default)]
    pub fail_on_output: Option<String>,
}

impl ActionConfig {
    /// Effective `background` value given the global default.
    pub fn effective_background(&self, default: bool) -> bool {
        self.background.unwrap_or(default)
    }
}
