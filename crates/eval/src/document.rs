use sxd_document::Package;
use sxd_document::parser;

use crate::error::EvalError;

/// An owned, parsed monitor-data XML document, ready for repeated XPath
/// queries (one per condition/variable) against the same parse tree.
pub struct MonitorDocument {
    package: Package,
}

impl MonitorDocument {
    pub fn parse(xml: &[u8]) -> Result<Self, EvalError> {
        let text =
            std::str::from_utf8(xml).map_err(|e| EvalError::InvalidUtf8(e.to_string()))?;

        let package = parser::parse(text).map_err(|e| EvalError::InvalidXml(e.to_string()))?;

        Ok(Self { package })
    }

    /// Evaluate an XPath expression against the document and return its
    /// string form — the result is always consumed as a string, regardless
    /// of whether the matched node is an attribute, element, or text node.
    pub fn evaluate_xpath(&self, expr: &str) -> Result<String, EvalError> {
        let document = self.package.as_document();

        let value = sxd_xpath::evaluate_xpath(&document, expr)
            .map_err(|e| EvalError::XPath(e.to_string()))?;

        Ok(value.string())
    }
}
