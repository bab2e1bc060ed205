//! Binary package codec errors.
//!
//! Covers the fixed 64-byte single-firmware header, the zonal container
//! header and its per-firmware metadata records.

use crate::common::ErrorSeverity;

/// Package codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Input has the wrong length
    #[error("Bad length: expected {expected} bytes, got {actual}")]
    BadLength {
        /// Required length
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// Magic value does not match
    #[error("Bad magic: expected {expected:#010x}, got {actual:#010x}")]
    BadMagic {
        /// Required magic
        expected: u32,
        /// Magic found
        actual: u32,
    },

    /// A field value does not fit its on-wire width
    #[error("Field '{field}' value {value} exceeds maximum {max}")]
    FieldOverflow {
        /// Field name
        field: &'static str,
        /// Value supplied
        value: u64,
        /// Largest encodable value
        max: u64,
    },

    /// Software type byte is not a known variant
    #[error("Unknown software type: {0}")]
    UnknownSoftwareType(u8),

    /// Compression flag byte is not 0 or 1
    #[error("Unknown compression flag: {0}")]
    UnknownCompressionFlag(u8),

    /// Input ended before a structure was complete
    #[error("Truncated input while reading {context}")]
    Truncated {
        /// What was being read
        context: String,
    },

    /// Length-prefixed text field is not valid UTF-8
    #[error("Invalid UTF-8 in {0}")]
    InvalidText(String),

    /// Container format version is not supported
    #[error("Unsupported package format version: {0}")]
    UnsupportedFormatVersion(u16),

    /// CRC-32 of the payload does not match the header
    #[error("CRC mismatch: header says {expected:#010x}, payload is {actual:#010x}")]
    CrcMismatch {
        /// CRC stored in the header
        expected: u32,
        /// CRC computed over the payload
        actual: u32,
    },

    /// Payload length differs from the declared size
    #[error("Payload size mismatch: declared {declared} bytes, found {actual}")]
    PayloadSizeMismatch {
        /// Declared size
        declared: u64,
        /// Bytes present
        actual: u64,
    },

    /// Compression or decompression failed
    #[error("Compression failed: {0}")]
    Compression(String),
}

impl CodecError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CodecError::BadLength { .. } => ErrorSeverity::Error,
            CodecError::BadMagic { .. } => ErrorSeverity::Error,
            CodecError::FieldOverflow { .. } => ErrorSeverity::Error,
            CodecError::UnknownSoftwareType(_) => ErrorSeverity::Error,
            CodecError::UnknownCompressionFlag(_) => ErrorSeverity::Error,
            CodecError::Truncated { .. } => ErrorSeverity::Error,
            CodecError::InvalidText(_) => ErrorSeverity::Error,
            CodecError::UnsupportedFormatVersion(_) => ErrorSeverity::Error,
            CodecError::CrcMismatch { .. } => ErrorSeverity::Critical,
            CodecError::PayloadSizeMismatch { .. } => ErrorSeverity::Critical,
            CodecError::Compression(_) => ErrorSeverity::Error,
        }
    }

    /// Check if this error indicates corrupted content rather than a malformed request.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            CodecError::CrcMismatch { .. } | CodecError::PayloadSizeMismatch { .. }
        )
    }

    /// Create a bad length error.
    pub fn bad_length(expected: usize, actual: usize) -> Self {
        CodecError::BadLength { expected, actual }
    }

    /// Create a field overflow error.
    pub fn overflow(field: &'static str, value: u64, max: u64) -> Self {
        CodecError::FieldOverflow { field, value, max }
    }

    /// Create a truncated input error.
    pub fn truncated(context: impl Into<String>) -> Self {
        CodecError::Truncated {
            context: context.into(),
        }
    }
}
