//! Error types for tuning data.
//!
//! The simulation itself never fails: degenerate geometry and out-of-range
//! values are corrected in place. Only loading a [`crate::Tuning`] from
//! external data can produce an error.

use thiserror::Error;

/// Result type alias for tuning operations.
pub type TuningResult<T> = Result<T, TuningError>;

/// Failure to load or validate a tuning table.
#[derive(Debug, Error)]
pub enum TuningError {
    /// The tuning document is not valid JSON for [`crate::Tuning`].
    #[error("tuning parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value parsed but is physically meaningless.
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl TuningError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
