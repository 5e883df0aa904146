use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dispatch mode for a rule's application monitor.
///
/// Unknown values in the source XML default to `Event`: any `monitorType`
/// that isn't literally `"poll"` or `"receive"` falls through to the event
/// branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorType {
    Poll,
    Receive,
    Event,
}

impl FromStr for MonitorType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "poll" => Self::Poll,
            "receive" => Self::Receive,
            _ => Self::Event,
        })
    }
}

impl MonitorType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Receive => "receive",
            Self::Event => "event",
        }
    }
}

/// The monitor configuration embedded in a [`crate::Rule`]: dispatch mode,
/// commands, invocation budget, and the runtime counters the evaluator and
/// scheduler feed back into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationMonitor {
    pub monitor_type: MonitorType,
    pub description: Option<String>,
    /// Poll interval in seconds; only meaningful when `monitor_type == Poll`.
    pub poll_period: Option<f64>,
    /// Unset or zero means unlimited successful action invocations.
    pub max_action_invocations: Option<u64>,
    pub query_command: Option<String>,
    /// Accepted for schema compatibility but never invoked by the evaluator.
    pub analyze_command: Option<String>,
    pub action_command: String,

    #[serde(default)]
    pub rule_invocations: u64,
    #[serde(default)]
    pub query_invocations_success: u64,
    #[serde(default)]
    pub query_invocations_failure: u64,
    #[serde(default)]
    pub action_invocations_success: u64,
    #[serde(default)]
    pub action_invocations_failure: u64,
    #[serde(default)]
    pub last_successful_action_invocation_time: Option<DateTime<Utc>>,
}

impl ApplicationMonitor {
    #[must_use]
    pub fn new(monitor_type: MonitorType, action_command: impl Into<String>) -> Self {
        Self {
            monitor_type,
            description: None,
            poll_period: None,
            max_action_invocations: None,
            query_command: None,
            analyze_command: None,
            action_command: action_command.into(),
            rule_invocations: 0,
            query_invocations_success: 0,
            query_invocations_failure: 0,
            action_invocations_success: 0,
            action_invocations_failure: 0,
            last_successful_action_invocation_time: None,
        }
    }

    pub fn rule_invoked(&mut self) {
        self.rule_invocations += 1;
    }

    pub fn query_invocation_succeeded(&mut self) {
        self.query_invocations_success += 1;
    }

    pub fn query_invocation_failed(&mut self) {
        self.query_invocations_failure += 1;
    }

    pub fn action_invocation_succeeded(&mut self, at: DateTime<Utc>) {
        self.action_invocations_success += 1;
        self.last_successful_action_invocation_time = Some(at);
    }

    pub fn action_invocation_failed(&mut self) {
        self.action_invocations_failure += 1;
    }

    /// `true` once `max_action_invocations` is set, nonzero, and has been
    /// reached by `action_invocations_success`.
    #[must_use]
    pub fn max_invocations_reached(&self) -> bool {
        match self.max_action_invocations {
            Some(max) if max > 0 => self.action_invocations_success >= max,
            _ => false,
        }
    }
}
