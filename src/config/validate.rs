// src/config/validate.rs

use crate::action::OutputRules;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, ToolkitError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ToolkitError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.action))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_actions(cfg)?;
    validate_global_config(cfg)?;
    validate_actions(cfg)?;
    Ok(())
}

fn ensure_has_actions(cfg: &RawConfigFile) -> Result<()> {
    if cfg.action.is_empty() {
        return Err(ToolkitError::ConfigError(
            "config must contain at least one [action.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.shutdown_grace_ms == 0 {
        return Err(ToolkitError::ConfigError(
            "[config].shutdown_grace_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_actions(cfg: &RawConfigFile) -> Result<()> {
    for (name, action) in cfg.action.iter() {
        if name.trim().is_empty() {
            return Err(ToolkitError::ConfigError(
                "action names must not be empty".to_string(),
            ));
        }
        if action.command.trim().is_empty() {
            return Err(ToolkitError::ConfigError(format!(
                "action '{name}' has an empty command"
            )));
        }
        // Compile the classifiers now so a bad pattern is a load-time error,
        // not a mid-action failure.
        OutputRules::compile(action).map_err(|e| {
            ToolkitError::ConfigError(format!("action '{name}': {e}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{ActionConfig, ConfigSection};
    use std::collections::BTreeMap;

    fn raw_with_action(name: &str, action: ActionConfig) -> RawConfigFile {
        let mut actions = BTreeMap::new();
        actions.insert(name.to_string(), action);
        RawConfigFile {
            config: ConfigSection::default(),
            action: actions,
        }
    }

    fn echo_action() -> ActionConfig {
        ActionConfig {
            command: "echo".to_string(),
            args: vec!["hello".to_string()],
            background: None,
            description: None,
            pass_on_output: None,
            warn_on_output: None,
            fail_on_output: None,
        }
    }

    #[test]
    fn empty_action_set_is_rejected() {
        let raw = RawConfigFile {
            config: ConfigSection::default(),
            action: BTreeMap::new(),
        };
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("at least one"));
    }

    #[test]
    fn zero_grace_period_is_rejected() {
        let mut raw = raw_with_action("ping-check", echo_action());
        raw.config.shutdown_grace_ms = 0;
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("shutdown_grace_ms"));
    }

    #[test]
    fn empty_command_is_rejected() {
        let mut action = echo_action();
        action.command = "  ".to_string();
        let err = ConfigFile::try_from(raw_with_action("blank", action)).unwrap_err();
        assert!(err.to_string().contains("empty command"));
    }

    #[test]
    fn invalid_output_regex_is_rejected_with_the_action_name() {
        let mut action = echo_action();
        action.fail_on_output = Some("(unclosed".to_string());
        let err = ConfigFile::try_from(raw_with_action("sfc-scan", action)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sfc-scan"));
        assert!(msg.contains("fail_on_output"));
    }

    #[test]
    fn valid_config_round_trips() {
        let cfg = ConfigFile::try_from(raw_with_action("ping-check", echo_action())).unwrap();
        assert_eq!(cfg.action.len(), 1);
        assert_eq!(cfg.config.shutdown_grace_ms, 2000);
    }
}
