//! Wire codec errors
//!
//! Codec errors are fail-fast: the first one aborts the encode or decode call.

use serde::de;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WireError {
    /// Bytes do not parse as the wire format at all
    #[error("malformed wire bytes: {0}")]
    Malformed(String),

    #[error("failed to encode configuration: {0}")]
    Encode(String),

    /// A present value cannot populate a target field even after weak coercion
    #[error("cannot decode '{path}': {message}")]
    DecodeType { path: String, message: String },
}

impl WireError {
    pub fn decode_type(path: impl Into<String>, message: impl fmt::Display) -> Self {
        WireError::DecodeType {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Attach a field path unless a deeper one is already recorded
    pub(crate) fn with_path(self, path: &str) -> Self {
        match self {
            WireError::DecodeType { path: p, message } if p.is_empty() => WireError::DecodeType {
                path: path.to_string(),
                message,
            },
            other => other,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            WireError::DecodeType { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl de::Error for WireError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        WireError::decode_type(String::new(), msg)
    }
}

impl From<rmp_serde::encode::Error> for WireError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        WireError::Encode(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for WireError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        WireError::Malformed(err.to_string())
    }
}
