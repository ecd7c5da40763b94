#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use taskbench::config::{ActionConfig, ConfigFile, ConfigSection, RawConfigFile};
use taskbench::executor::{ActionExecutor, ProgressSink};
use taskbench::logbook::Logbook;
use taskbench::registry::TaskRegistry;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                action: BTreeMap::new(),
            },
        }
    }

    pub fn with_action(mut self, name: &str, action: ActionConfig) -> Self {
        self.config.action.insert(name.to_string(), action);
        self
    }

    pub fn with_shutdown_grace_ms(mut self, ms: u64) -> Self {
        self.config.config.shutdown_grace_ms = ms;
        self
    }

    pub fn with_background_default(mut self, val: bool) -> Self {
        self.config.config.background_default = val;
        self
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

/// Builder for `ActionConfig`.
pub struct ActionConfigBuilder {
    action: ActionConfig,
}

impl ActionConfigBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            action: ActionConfig {
                command: command.to_string(),
                args: vec![],
                background: None,
                description: None,
                pass_on_output: None,
                warn_on_output: None,
                fail_on_output: None,
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.action.args.push(arg.to_string());
        self
    }

    pub fn background(mut self, val: bool) -> Self {
        self.action.background = Some(val);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.action.description = Some(desc.to_string());
        self
    }

    pub fn pass_on_output(mut self, pattern: &str) -> Self {
        self.action.pass_on_output = Some(pattern.to_string());
        self
    }

    pub fn warn_on_output(mut self, pattern: &str) -> Self {
        self.action.warn_on_output = Some(pattern.to_string());
        self
    }

    pub fn fail_on_output(mut self, pattern: &str) -> Self {
        self.action.fail_on_output = Some(pattern.to_string());
        self
    }

    pub fn build(self) -> ActionConfig {
        self.action
    }
}

/// A fully wired core (logbook, registry, executor) with a short grace
/// period suitable for tests.
pub struct TestCore {
    pub logbook: Arc<Logbook>,
    pub registry: Arc<TaskRegistry>,
    pub executor: ActionExecutor,
}

pub fn test_core(progress: Box<dyn ProgressSink>) -> TestCore {
    let logbook = Arc::new(Logbook::new());
    let registry = Arc::new(TaskRegistry::new(Duration::from_millis(500)));
    let executor = ActionExecutor::new(Arc::clone(&logbook), Arc::clone(&registry), progress);
    TestCore {
        logbook,
        registry,
        executor,
    }
}
