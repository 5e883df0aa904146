use serde::{Deserialize, Serialize};

/// A named XPath expression evaluated once per invocation to build the
/// substitution map used by condition resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XPathVariable {
    pub name: String,
    pub xpath_expr: String,
}

impl XPathVariable {
    #[must_use]
    pub fn new(name: impl Into<String>, xpath_expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            xpath_expr: xpath_expr.into(),
        }
    }
}
