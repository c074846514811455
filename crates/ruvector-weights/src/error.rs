//! Error types for the weight conversion and tensor codec pipeline.
//!
//! Every fallible function in this crate returns [`WeightResult`]. Errors
//! carry the field name and the offending value so a failure can be
//! diagnosed without re-running the conversion.
//!
//! ## Hierarchy
//!
//! ```text
//! WeightError (top-level)
//! ├── argument / shape errors   (InvalidArgument, LengthMismatch, IndexOutOfRange)
//! ├── emission input errors     (NegativeWeight, NegativeUid)
//! ├── codec errors              (UnsupportedType, Decode, Encode, Json)
//! └── ConfigError               (weight policy validation / file loading)
//! ```

use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// WeightResult
// ---------------------------------------------------------------------------

/// Convenient `Result` alias used throughout the crate.
pub type WeightResult<T> = Result<T, WeightError>;

// ---------------------------------------------------------------------------
// WeightError
// ---------------------------------------------------------------------------

/// Top-level error type for weight conversion and tensor (de)serialization.
#[derive(Debug, Error)]
pub enum WeightError {
    /// An argument is outside its valid domain (negative universe size,
    /// limit outside `(0, 1]`, malformed shape string, ...).
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidArgument {
        /// Name of the argument.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// Two parallel sequences have different lengths.
    #[error("Length mismatch: `{left}` has {left_len} elements but `{right}` has {right_len}")]
    LengthMismatch {
        /// Name of the first sequence.
        left: &'static str,
        /// Name of the second sequence.
        right: &'static str,
        /// Length of the first sequence.
        left_len: usize,
        /// Length of the second sequence.
        right_len: usize,
    },

    /// A sparse index lies outside the universe `[0, len)`.
    #[error("Index {index} is out of range for universe of size {len}")]
    IndexOutOfRange {
        /// The offending index.
        index: i64,
        /// Size of the universe.
        len: usize,
    },

    /// A weight passed to the emission quantizer is negative.
    #[error("Negative weight {value} at position {position}")]
    NegativeWeight {
        /// Position of the weight in the input sequence.
        position: usize,
        /// The offending value.
        value: f64,
    },

    /// A uid passed to the emission quantizer is negative.
    #[error("Negative uid {uid} at position {position}")]
    NegativeUid {
        /// Position of the uid in the input sequence.
        position: usize,
        /// The offending uid.
        uid: i64,
    },

    /// The element type is not part of the supported enumeration.
    #[error("Unsupported element type: {0}")]
    UnsupportedType(String),

    /// A tensor envelope or its binary payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A tensor payload could not be encoded.
    #[error("Encode error: {0}")]
    Encode(String),

    /// A weight policy is invalid or could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// JSON (de)serialization of an envelope failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WeightError {
    /// Construct a [`WeightError::InvalidArgument`].
    pub fn invalid_argument<S: Into<String>>(field: &'static str, reason: S) -> Self {
        WeightError::InvalidArgument { field, reason: reason.into() }
    }

    /// Construct a [`WeightError::LengthMismatch`].
    pub fn length_mismatch(
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    ) -> Self {
        WeightError::LengthMismatch { left, right, left_len, right_len }
    }

    /// Construct a [`WeightError::UnsupportedType`].
    pub fn unsupported_type<S: Into<String>>(name: S) -> Self {
        WeightError::UnsupportedType(name.into())
    }

    /// Construct a [`WeightError::Decode`].
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        WeightError::Decode(msg.into())
    }
}

impl From<base64::DecodeError> for WeightError {
    fn from(e: base64::DecodeError) -> Self {
        WeightError::Decode(format!("invalid base64 buffer: {e}"))
    }
}

impl From<rmp_serde::decode::Error> for WeightError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        WeightError::Decode(format!("invalid msgpack payload: {e}"))
    }
}

impl From<rmp_serde::encode::Error> for WeightError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        WeightError::Encode(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced when loading or validating a [`WeightPolicy`].
///
/// [`WeightPolicy`]: crate::config::WeightPolicy
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A policy file could not be read or written.
    #[error("Cannot access policy file `{path}`: {source}")]
    FileRead {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A policy file contains malformed JSON.
    #[error("Cannot parse policy file `{path}`: {source}")]
    ParseError {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue { field, reason: reason.into() }
    }
}
