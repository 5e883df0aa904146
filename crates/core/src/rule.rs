use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::monitor::ApplicationMonitor;
use crate::rule_id::RuleId;
use crate::xpath_variable::XPathVariable;

/// The only status value the engine treats as "enabled". Any other value —
/// including [`STATUS_DISABLED_BY_ADMIN`] and any free-form string a rule
/// author writes — is treated as disabled.
pub const STATUS_ENABLED: &str = "enabled";

/// Status written back by `disableRule` when a caller (rather than the
/// auto-disable path) disables a rule.
pub const STATUS_DISABLED_BY_ADMIN: &str = "disabled by administrator";

/// The rule aggregate: identity, monitor configuration, XPath variables, and
/// the ordered condition list that must ALL hold (logical AND, short-circuit
/// in declaration order) for the rule's action to fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub application_name: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub application_monitor: ApplicationMonitor,
    #[serde(default)]
    pub xpath_variables: Vec<XPathVariable>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Rule {
    #[must_use]
    pub fn new(
        application_name: impl Into<String>,
        name: impl Into<String>,
        application_monitor: ApplicationMonitor,
    ) -> Self {
        Self {
            application_name: application_name.into(),
            name: name.into(),
            description: None,
            status: STATUS_ENABLED.to_owned(),
            application_monitor,
            xpath_variables: Vec::new(),
            conditions: Vec::new(),
        }
    }

    #[must_use]
    pub fn rule_id(&self) -> RuleId {
        RuleId::new(self.application_name.clone(), self.name.clone())
    }

    /// The engine treats any status other than `"enabled"` as disabled.
    #[must_use]
    pub fn is_status_enabled(&self) -> bool {
        self.status == STATUS_ENABLED
    }

    pub fn set_status_enabled(&mut self) {
        self.status = STATUS_ENABLED.to_owned();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }
}
