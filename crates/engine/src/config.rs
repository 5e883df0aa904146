use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use policyd_executor::ActionRunner;
use policyd_store::RuleStore;

use crate::engine::RuleEngine;

fn default_min_trigger_interval() -> f64 {
    60.0
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_owned()
}

/// On-disk configuration, loaded from TOML at startup by `policyd-server`
/// and `policyd-cli`.
///
/// # Examples
///
/// ```
/// use policyd_engine::PolicydConfig;
///
/// let toml = r#"
/// rules_dir = "/var/lib/policyd/rules"
/// "#;
/// let config: PolicydConfig = toml::from_str(toml).unwrap();
/// assert_eq!(config.min_trigger_interval, 60.0);
/// assert_eq!(config.bind_address, "127.0.0.1:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicydConfig {
    /// Directory each application's rule XML files are stored under,
    /// one subdirectory per application name.
    pub rules_dir: PathBuf,

    /// Floor, in seconds, below which a poll rule will never be
    /// rescheduled to fire again, regardless of its own `pollPeriod`.
    #[serde(default = "default_min_trigger_interval")]
    pub min_trigger_interval: f64,

    /// Shell script sourced into the same subshell before every query
    /// and action command, if set.
    #[serde(default)]
    pub environment_script: Option<String>,

    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl PolicydConfig {
    /// Construct the store, action runner, and engine this configuration
    /// describes, loading and registering every rule already on disk.
    #[must_use]
    pub fn build(&self) -> RuleEngine {
        let store = RuleStore::new(self.rules_dir.clone());
        let action_runner = ActionRunner::new(self.environment_script.clone());
        RuleEngine::new(store, action_runner, self.min_trigger_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_when_absent() {
        let config: PolicydConfig = toml::from_str(r#"rules_dir = "/tmp/rules""#).unwrap();
        assert_eq!(config.min_trigger_interval, 60.0);
        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert!(config.environment_script.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let toml = r#"
            rules_dir = "/var/lib/policyd/rules"
            min_trigger_interval = 30
            environment_script = "/etc/policyd/env.sh"
            bind_address = "0.0.0.0:9090"
        "#;
        let config: PolicydConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.min_trigger_interval, 30.0);
        assert_eq!(config.environment_script.as_deref(), Some("/etc/policyd/env.sh"));
        assert_eq!(config.bind_address, "0.0.0.0:9090");
    }
}
