//! Error types and wire error-code mapping.
//!
//! Every codec failure surfaces synchronously as a [`DattyError`]. The three
//! codec kinds (`Parse`, `NumberFormat`, `Usage`) abort the in-flight encode or
//! decode; the calling layer decides whether to retry. Store-level variants are
//! raised by [`crate::store`] drivers.

use thiserror::Error;

/// Common Datty error conditions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DattyError {
    /// Malformed header, truncated buffer, unexpected format tag, or an
    /// invalid/missing mandatory discriminant.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A literal classified as numeric does not parse as that numeric type.
    #[error("number format error: {literal:?}")]
    NumberFormat { literal: String },

    /// Caller misuse: absent path source, conflicting table key kind, missing
    /// required identifiers.
    #[error("usage error: {message}")]
    Usage { message: String },

    /// Optimistic concurrency check failed.
    #[error("version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: String, actual: String },

    /// Operation is not supported by the driver.
    #[error("unsupported: {message}")]
    Unsupported { message: String },
}

impl DattyError {
    /// Create a Parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a NumberFormat error.
    pub fn number_format(literal: impl Into<String>) -> Self {
        Self::NumberFormat {
            literal: literal.into(),
        }
    }

    /// Create a Usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create a VersionConflict error.
    pub fn version_conflict(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::VersionConflict {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an Unsupported error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Check if this is a wire parse failure.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Check if this is a caller misuse failure.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage { .. })
    }

    /// Check if this error indicates the operation could succeed on retry.
    ///
    /// Codec failures are deterministic in their input, so only a version
    /// conflict (which depends on concurrent writers) qualifies.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

/// Result type using DattyError.
pub type DattyResult<T> = Result<T, DattyError>;

// ============================================================================
// Wire error codes
// ============================================================================

/// Error code carried by an error result on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrCode {
    Unknown = 0,
    BadArguments = 1,
    BadPayload = 2,
    ConcurrentUpdate = 3,
    UnsupportedOperation = 4,
    Timeout = 5,
    DriverError = 6,
}

impl ErrCode {
    /// Numeric wire code.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Look up a code; unknown codes map to `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::BadArguments),
            2 => Some(Self::BadPayload),
            3 => Some(Self::ConcurrentUpdate),
            4 => Some(Self::UnsupportedOperation),
            5 => Some(Self::Timeout),
            6 => Some(Self::DriverError),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::BadArguments => write!(f, "BAD_ARGUMENTS"),
            Self::BadPayload => write!(f, "BAD_PAYLOAD"),
            Self::ConcurrentUpdate => write!(f, "CONCURRENT_UPDATE"),
            Self::UnsupportedOperation => write!(f, "UNSUPPORTED_OPERATION"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::DriverError => write!(f, "DRIVER_ERROR"),
        }
    }
}

impl From<&DattyError> for ErrCode {
    fn from(error: &DattyError) -> Self {
        match error {
            DattyError::Parse { .. } => ErrCode::BadPayload,
            DattyError::NumberFormat { .. } => ErrCode::BadPayload,
            DattyError::Usage { .. } => ErrCode::BadArguments,
            DattyError::VersionConflict { .. } => ErrCode::ConcurrentUpdate,
            DattyError::Unsupported { .. } => ErrCode::UnsupportedOperation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DattyError::parse("insufficient buffer length");
        assert_eq!(err.to_string(), "parse error: insufficient buffer length");

        let err = DattyError::number_format("12x");
        assert_eq!(err.to_string(), "number format error: \"12x\"");
    }

    #[test]
    fn test_error_classification() {
        assert!(DattyError::parse("x").is_parse());
        assert!(DattyError::usage("x").is_usage());
        assert!(!DattyError::parse("x").is_retriable());
        assert!(DattyError::version_conflict("1", "2").is_retriable());
    }

    #[test]
    fn test_err_code_mapping() {
        assert_eq!(ErrCode::from(&DattyError::parse("x")), ErrCode::BadPayload);
        assert_eq!(ErrCode::from(&DattyError::usage("x")), ErrCode::BadArguments);
        assert_eq!(
            ErrCode::from(&DattyError::version_conflict("1", "2")),
            ErrCode::ConcurrentUpdate
        );
    }

    #[test]
    fn test_err_code_round_trip() {
        for code in 0..=6 {
            let err_code = ErrCode::from_code(code).unwrap();
            assert_eq!(err_code.code(), code);
        }
        assert_eq!(ErrCode::from_code(99), None);
    }
}
