/// Convenience result type used across reeltime.
pub type ReeltimeResult<T> = Result<T, ReeltimeError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Only construction-time failures cross the [`crate::Timeline`] boundary; everything that
/// goes wrong while serving frame requests is logged and degraded into a valid frame.
#[derive(thiserror::Error, Debug)]
pub enum ReeltimeError {
    /// Invalid user-provided or composition data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while resolving the composition at a given time.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors while opening or reading media.
    #[error("io error: {0}")]
    Io(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// The frame request scheduler could not be started.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReeltimeError {
    /// Build a [`ReeltimeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReeltimeError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`ReeltimeError::Io`] value.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Build a [`ReeltimeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`ReeltimeError::Scheduler`] value.
    pub fn scheduler(msg: impl Into<String>) -> Self {
        Self::Scheduler(msg.into())
    }
}

impl From<serde_json::Error> for ReeltimeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
