//! Error types for decoding and encoding.
//!
//! Decoding has exactly one failure class, malformed input, which always carries
//! the 1-based line number where the tokenizer (or the structural checks layered
//! on top of it) gave up. Encoding only fails when the caller hands over a value
//! that cannot be expressed as XML elements.

use thiserror::Error;

/// The error type for all codec operations.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The XML input is not well formed.
    #[error("malformed XML at line {line}: {message}")]
    Malformed {
        /// 1-based line number of the offending input.
        line: u64,
        /// Tokenizer or structural error message.
        message: String,
    },

    /// Input ended while an element was still open.
    #[error("unclosed element <{name}> opened at line {line}")]
    UnclosedElement {
        /// Qualified name of the innermost open element.
        name: String,
        /// Line the element was opened on.
        line: u64,
    },

    /// The root scope string is not a usable element path.
    #[error("invalid root scope {scope:?}: {reason}")]
    InvalidScope { scope: String, reason: String },

    /// The character set label is not one the decoder knows.
    #[error("unknown character set {0:?}")]
    UnknownCharset(String),

    /// A value handed to the encoder cannot be expressed as XML elements.
    #[error("cannot encode value at {path}: {reason}")]
    InvalidShape { path: String, reason: String },

    /// Writer error from the XML layer.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// JSON parse or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while reading input or writing output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    pub(crate) fn malformed(line: u64, message: impl Into<String>) -> Self {
        CodecError::Malformed {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_shape(path: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::InvalidShape {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the input line this error points at, if it is a decode error.
    pub fn line(&self) -> Option<u64> {
        match self {
            CodecError::Malformed { line, .. } | CodecError::UnclosedElement { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
