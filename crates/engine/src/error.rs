use policyd_core::RuleId;

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule not found: {0}")]
    NotFound(RuleId),

    #[error("rule already exists: {0}")]
    AlreadyExists(RuleId),

    #[error("rule already enabled: {0}")]
    AlreadyEnabled(RuleId),

    #[error("rule already disabled: {0}")]
    AlreadyDisabled(RuleId),

    #[error("rule is disabled: {0}")]
    Disabled(RuleId),

    #[error(transparent)]
    Store(#[from] policyd_store::StoreError),
}
