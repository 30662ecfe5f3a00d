//! Error types for scheduling-time resolution.

use thiserror::Error;

/// A parse failure. Every variant carries the original user expression so
/// callers can echo it back in diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unrecognized time expression: '{raw}'")]
    UnrecognizedFormat { raw: String },

    #[error("unsupported offset unit '{unit}' in '{raw}'")]
    InvalidUnit { raw: String, unit: String },

    #[error("offset amount must be positive in '{raw}' (got {amount})")]
    NonPositiveOffset { raw: String, amount: i64 },

    #[error("unrecognized weekday '{token}' in '{raw}'")]
    InvalidWeekday { raw: String, token: String },

    #[error("time of day out of range in '{raw}'")]
    OutOfRangeTime { raw: String },

    #[error("malformed timestamp '{raw}': date, time, and zone are all required")]
    MalformedStrictTimestamp { raw: String },
}

impl ResolveError {
    /// The original expression the failure was raised for.
    pub fn raw(&self) -> &str {
        match self {
            Self::UnrecognizedFormat { raw }
            | Self::InvalidUnit { raw, .. }
            | Self::NonPositiveOffset { raw, .. }
            | Self::InvalidWeekday { raw, .. }
            | Self::OutOfRangeTime { raw }
            | Self::MalformedStrictTimestamp { raw } => raw,
        }
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
