//! The error taxonomy of the protocol engine and the on-wire error codes.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the codec, the attribute store, and the predicate
/// evaluator.
///
/// Parsers fail fast on the first error and drop partial state; nothing is
/// recovered inside the engine. Serializers that write into a caller-owned
/// buffer report the required size via [`SlpError::BufferOverflow`] so the
/// caller can retry with more space.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum SlpError {
    /// Malformed input: wire buffer, attribute string, or predicate string.
    #[error("parse error: {0}")]
    Parse(&'static str),

    /// An attribute operation was applied to a value of the wrong type.
    #[error("attribute operation applied to a value of the wrong type")]
    TypeMismatch,

    /// Lookup of a tag that is not present in the attribute set.
    ///
    /// Kept distinct from [`SlpError::TypeMismatch`] so that callers can fold
    /// "attribute absent" to a plain `false` during predicate evaluation.
    #[error("no attribute with the requested tag")]
    UnknownTag,

    /// The output buffer is too small; `needed` is the required size in bytes.
    #[error("output buffer too small, {needed} bytes required")]
    BufferOverflow { needed: usize },

    /// The function id is valid in the protocol but not implemented by this
    /// agent (primarily SLPv1 reply frames).
    #[error("message type not supported by this agent")]
    NotSupported,

    /// Infrastructure failure, surfaced to the caller unmodified.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

impl SlpError {
    /// The error code a reply body would carry for this error.
    pub fn wire_code(&self) -> ErrorCode {
        match self {
            SlpError::Parse(_) | SlpError::TypeMismatch | SlpError::UnknownTag => {
                ErrorCode::ParseError
            }
            SlpError::NotSupported => ErrorCode::MessageNotSupported,
            SlpError::BufferOverflow { .. } | SlpError::Internal(_) => ErrorCode::NotImplemented,
        }
    }
}

/// Error codes carried in reply bodies (unsigned 16-bit on the wire).
///
/// Codes the engine does not know are preserved losslessly in
/// [`ErrorCode::Other`] so that replies round-trip byte-exact.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorCode {
    Ok,
    LanguageNotSupported,
    ParseError,
    InvalidRegistration,
    ScopeNotSupported,
    AuthenticationAbsent,
    AuthenticationFailed,
    InvalidUpdate,
    MessageNotSupported,
    RefreshRejected,
    NotImplemented,
    Other(u16),
}

impl ErrorCode {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => ErrorCode::Ok,
            1 => ErrorCode::LanguageNotSupported,
            2 => ErrorCode::ParseError,
            3 => ErrorCode::InvalidRegistration,
            4 => ErrorCode::ScopeNotSupported,
            6 => ErrorCode::AuthenticationAbsent,
            7 => ErrorCode::AuthenticationFailed,
            9 => ErrorCode::InvalidUpdate,
            10 => ErrorCode::MessageNotSupported,
            11 => ErrorCode::RefreshRejected,
            12 => ErrorCode::NotImplemented,
            other => ErrorCode::Other(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            ErrorCode::Ok => 0,
            ErrorCode::LanguageNotSupported => 1,
            ErrorCode::ParseError => 2,
            ErrorCode::InvalidRegistration => 3,
            ErrorCode::ScopeNotSupported => 4,
            ErrorCode::AuthenticationAbsent => 6,
            ErrorCode::AuthenticationFailed => 7,
            ErrorCode::InvalidUpdate => 9,
            ErrorCode::MessageNotSupported => 10,
            ErrorCode::RefreshRejected => 11,
            ErrorCode::NotImplemented => 12,
            ErrorCode::Other(other) => other,
        }
    }
}
