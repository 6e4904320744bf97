//! Error types for the codec, config loader, and switch bootstrap.
//!
//! Mirrors the flat-enum-plus-manual-`Display` style used throughout this
//! crate's lineage: no `thiserror`, just `std::error::Error` impls.

use std::fmt;

/// Failure decoding a wire message.
///
/// A datagram that fails to decode is dropped by the caller; this type
/// carries enough detail to log a useful diagnostic, never to retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Not enough bytes remained to read a fixed-size field.
    Truncated {
        /// What was being read when bytes ran out.
        context: &'static str,
    },
    /// The leading type-tag byte didn't match any known message kind.
    BadTag(u8),
    /// A NUL-terminated host string ran off the end of the datagram.
    UnterminatedHost,
    /// A record count field declared more records than remain in the buffer.
    CountExceedsBudget { declared: usize, remaining: usize },
    /// The datagram exceeds the maximum wire size.
    DatagramTooLarge { len: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated { context } => {
                write!(f, "truncated message while reading {context}")
            }
            CodecError::BadTag(tag) => write!(f, "unknown message tag {tag}"),
            CodecError::UnterminatedHost => {
                write!(f, "host string missing NUL terminator")
            }
            CodecError::CountExceedsBudget { declared, remaining } => write!(
                f,
                "declared record count {declared} exceeds {remaining} remaining bytes"
            ),
            CodecError::DatagramTooLarge { len } => {
                write!(f, "datagram of {len} bytes exceeds the 4096-byte limit")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Failure loading the static topology config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    /// Line 1 wasn't a valid switch count.
    InvalidHeader { line: String },
    /// An edge line wasn't `s1 s2 cost` with positive integers.
    InvalidEdge { line: usize, text: String },
    /// An edge referenced a switch id outside `0..N`.
    IdOutOfRange { id: i64, n: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "could not read config file: {msg}"),
            ConfigError::InvalidHeader { line } => {
                write!(f, "expected switch count on line 1, found {line:?}")
            }
            ConfigError::InvalidEdge { line, text } => {
                write!(f, "malformed edge on line {line}: {text:?}")
            }
            ConfigError::IdOutOfRange { id, n } => {
                write!(f, "switch id {id} out of range 0..{n}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// The Controller's reply to a Switch's initial `REGISTER_REQUEST` was not a
/// `REGISTER_RESPONSE`. The switch exits 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationError {
    pub got_tag: u8,
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected REGISTER_RESPONSE from controller, got message tag {}",
            self.got_tag
        )
    }
}

impl std::error::Error for RegistrationError {}
