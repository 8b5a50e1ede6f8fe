use crate::error::{CoreError, StateError};

/// Classification helpers used by the scheduler's cycle logs and the
/// startup error path.
pub trait ErrorExt {
    /// Stable uppercase tag identifying the error family.
    fn error_code(&self) -> &'static str;

    /// Fatal errors abort the process; everything else is retried on the
    /// next scheduled cycle.
    fn is_fatal(&self) -> bool;
}

impl ErrorExt for CoreError {
    fn error_code(&self) -> &'static str {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API",
            CoreError::Llm(_) => "LLM",
            CoreError::Delivery(_) => "DELIVERY",
            CoreError::State(_) => "STATE",
            CoreError::Config(_) => "CONFIG",
            CoreError::Io(_) => "IO",
            CoreError::Serialization(_) => "SERIALIZATION",
            CoreError::Network(_) => "NETWORK",
        }
    }

    fn is_fatal(&self) -> bool {
        match self {
            CoreError::Config(_) => true,
            // A state file that cannot be read or parsed means prior
            // notifications are unknown; proceeding would re-notify
            // everything. A failed write is retried next cycle.
            CoreError::State(e) => !matches!(e, StateError::WriteFailed { .. }),
            _ => false,
        }
    }
}
