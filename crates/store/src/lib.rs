pub mod error;
pub mod rule_store;
mod rule_xml;

pub use error::StoreError;
pub use rule_store::RuleStore;
pub use rule_xml::{parse_rule_xml, write_rule_xml};
