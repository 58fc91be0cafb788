//! Assistant error types

use medimind_foundation::ResourceInitError;
use medimind_provider::ProviderError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Errors surfaced by [`crate::ReportAssistant`]
///
/// Delegate and initialization failures are passed through verbatim and are
/// never cached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssistantError {
    /// A shared client could not be built
    #[error(transparent)]
    ResourceInit(#[from] ResourceInitError),

    /// A delegate call failed
    #[error(transparent)]
    Delegate(#[from] ProviderError),

    /// Rejected before any delegate or cache work
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A cache entry held a value of the wrong shape
    #[error("Unexpected cached value for '{operation}': expected {expected}")]
    UnexpectedCachedValue {
        operation: String,
        expected: &'static str,
    },
}

impl AssistantError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AssistantError::InvalidInput(message.into())
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AssistantError::InvalidInput(_)
                | AssistantError::Delegate(ProviderError::UnsupportedFormat(_))
                | AssistantError::Delegate(ProviderError::NotConfigured(_))
        )
    }

    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            AssistantError::ResourceInit(_) => true,
            AssistantError::Delegate(e) => e.is_retryable(),
            _ => false,
        }
    }
}
