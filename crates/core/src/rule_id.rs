use std::fmt;

/// The composite identity of a rule: `"<applicationName>/<name>"`.
///
/// Unique process-wide. Two rules with the same `application_name` but
/// different `name` are distinct; two rules with the same `name` registered
/// under different applications are also distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId {
    application_name: String,
    name: String,
}

impl RuleId {
    #[must_use]
    pub fn new(application_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.application_name, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_with_slash() {
        let id = RuleId::new("cluster-monitor", "high-load");
        assert_eq!(id.to_string(), "cluster-monitor/high-load");
    }

    #[test]
    fn distinct_by_either_component() {
        let a = RuleId::new("app1", "rule");
        let b = RuleId::new("app2", "rule");
        let c = RuleId::new("app1", "other");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
