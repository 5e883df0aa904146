use serde::Deserialize;

/// Wire body for the application-data submission endpoint and for explicit
/// `execute` calls against a `receive`-mode rule: a base64-encoded payload.
#[derive(Debug, Deserialize)]
pub struct DataRequest {
    pub data: String,
}
