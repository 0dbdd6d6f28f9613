//! Error types for conversion runs.
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures of a conversion run.
///
/// Configuration errors are raised before any record is read. Per-feature geometric anomalies
/// (empty rings, undersized groups) are not errors; they only contribute nothing to the output.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("field `{0}` is not declared by the feature source")]
    MissingField(String),

    #[error("feature source failed: {0}")]
    Source(#[source] BoxError),

    #[error("feature sink failed: {0}")]
    Sink(#[source] BoxError),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Returns if this error was raised while validating configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::InvalidArgument { .. } | Error::MissingField(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
