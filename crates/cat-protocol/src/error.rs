//! Error types for CAT frame decoding and reply correlation

use thiserror::Error;

use crate::command::{EventKind, Meter};

/// Errors that can occur while decoding a single inbound frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Frame is not printable ASCII or has no opcode
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Opcode has no decoder
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Frame length does not match the reply format for its opcode
    #[error("bad {opcode} reply length: expected {expected}, got {actual}")]
    BadLength {
        opcode: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Invalid or out of range frequency value
    #[error("invalid frequency: {0}")]
    InvalidFrequency(String),

    /// Invalid mode digit
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// Invalid meter id or reading
    #[error("invalid meter reading: {0}")]
    InvalidMeter(String),

    /// Width index missing from the width table
    #[error("invalid bandwidth: {0}")]
    InvalidBandwidth(String),

    /// Too many bytes arrived without a `;`
    #[error("{0} bytes received without a frame terminator")]
    Overrun(usize),
}

/// Higher-level protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A reply arrived with no query outstanding
    #[error("unsolicited {0:?} reply")]
    Unsolicited(EventKind),

    /// A reply arrived out of order
    #[error("unexpected {actual:?} reply while waiting for {expected:?}")]
    UnexpectedReply {
        expected: EventKind,
        actual: EventKind,
    },

    /// A meter reading arrived that the running sweep did not ask for
    #[error("{actual:?} meter reading while waiting for {expected:?}")]
    UnexpectedMeter {
        expected: Option<Meter>,
        actual: Meter,
    },

    /// The radio answered `?;`
    #[error("radio rejected command: {0}")]
    Rejected(String),

    /// Value cannot be expressed on the wire
    #[error("cannot encode: {0}")]
    Unencodable(String),
}
