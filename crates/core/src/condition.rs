use serde::{Deserialize, Serialize};

/// One clause of a rule's condition list: `metricXPath evaluationOperator
/// triggerValue`. `evaluation_operator` is stored as the raw token from the
/// rule XML (`"<"`, `">="`, ...) rather than a parsed [`crate::Operator`] so
/// that an unrecognized token can be represented and still round-trip through
/// serialization; the evaluator parses it at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub metric_xpath: String,
    pub evaluation_operator: String,
    pub trigger_value: String,
    pub description: Option<String>,
}

impl Condition {
    #[must_use]
    pub fn new(
        metric_xpath: impl Into<String>,
        evaluation_operator: impl Into<String>,
        trigger_value: impl Into<String>,
    ) -> Self {
        Self {
            metric_xpath: metric_xpath.into(),
            evaluation_operator: evaluation_operator.into(),
            trigger_value: trigger_value.into(),
            description: None,
        }
    }
}
