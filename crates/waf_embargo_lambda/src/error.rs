use waf_embargo_core::contract::ValidationError;

/// Failure of a handler operation. The `Display` text is what callers see as
/// the failure reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Firewall(String),
    #[error("{0}")]
    Storage(String),
    #[error("{0}")]
    Origin(String),
}
