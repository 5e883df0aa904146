use thiserror::Error;

/// Errors surfaced while parsing monitor XML or evaluating an XPath
/// expression against it. The evaluator never lets these escape its public
/// API: every site that can produce one catches it, logs it, and forces the
/// surrounding verdict to `false`.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("monitor data is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("could not parse monitor XML: {0}")]
    InvalidXml(String),

    #[error("xpath evaluation failed: {0}")]
    XPath(String),
}
