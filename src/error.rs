//! Domain error kinds for the night-window pipeline.
//!
//! Parsing and field errors abort the current computation and surface as an
//! error state in the display layer. Provider failures are retried by the
//! fetch state machine before they surface. None of them crash the process.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QiyamError {
    /// A time-of-day string that is not `H{1,2}:M{1,2}` or is out of range.
    #[error("Malformed time string: '{raw}'")]
    MalformedTime { raw: String },

    /// A required prayer label is absent from the provider response.
    #[error("Missing field in provider response: {field}")]
    MissingField { field: &'static str },

    /// Network failure, non-success status, or a response that does not match the schema.
    #[error("Prayer time data unavailable: {reason}")]
    DataUnavailable { reason: String },

    /// The device location could not be determined.
    #[error("Location unavailable: {reason}")]
    GeolocationDenied { reason: String },
}

impl QiyamError {
    pub fn malformed(raw: impl Into<String>) -> Self {
        QiyamError::MalformedTime { raw: raw.into() }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        QiyamError::DataUnavailable {
            reason: reason.into(),
        }
    }

    /// Text shown in place of the window when this error ends a computation.
    pub fn user_message(&self) -> &'static str {
        match self {
            QiyamError::MalformedTime { .. } | QiyamError::MissingField { .. } => {
                "Unable to load times"
            }
            QiyamError::DataUnavailable { .. } => "Unable to load times (service unavailable)",
            QiyamError::GeolocationDenied { .. } => "Set your location",
        }
    }

    /// Only provider failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, QiyamError::DataUnavailable { .. })
    }
}

impl From<reqwest::Error> for QiyamError {
    fn from(err: reqwest::Error) -> Self {
        QiyamError::unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_distinguish_missing_and_unavailable() {
        let missing = QiyamError::MissingField { field: "Maghrib" };
        let down = QiyamError::unavailable("HTTP 503");
        assert_ne!(missing.user_message(), down.user_message());
        assert_eq!(missing.user_message(), "Unable to load times");
    }

    #[test]
    fn test_only_provider_failures_are_retryable() {
        assert!(QiyamError::unavailable("timeout").is_retryable());
        assert!(!QiyamError::malformed("25:00").is_retryable());
        assert!(!QiyamError::MissingField { field: "Fajr" }.is_retryable());
    }
}
