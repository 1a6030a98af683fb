//! Error types for the engine
//!
//! [`EngineError`] is fatal: it unwinds the reactor and ends the program.
//! [`UserError`] is reported to the operator where it happens and the
//! reactor carries on.

use thiserror::Error;

/// Conditions that stop the reactor
#[derive(Debug, Error)]
pub enum EngineError {
    /// I/O error on the CAT link
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed, unexpected or rejected reply
    #[error("CAT error: {0}")]
    Protocol(#[from] cat_protocol::ProtocolError),

    /// The radio end of the link went away
    #[error("CAT EOF (radio disconnected? RF interference?)")]
    LinkClosed,

    /// A query went unanswered
    #[error("CAT timeout: no reply within {0}ms")]
    Timeout(u64),

    /// A timer worker exited while its timer was still in use
    #[error("timer worker stopped unexpectedly")]
    TimerStopped,

    /// Key line could not be driven
    #[error("key line error: {0}")]
    KeyLine(String),

    /// QSO log could not be read or written
    #[error("log error: {0}")]
    Log(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Operator mistakes and requests that cannot be served right now
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserError {
    /// A compound CAT operation is still waiting for its replies
    #[error("CAT busy with a previous operation, try again")]
    Busy,

    /// Nothing to send
    #[error("nothing to send")]
    EmptyText,

    /// Text contained no characters the keyer can send
    #[error("no sendable characters in {0:?}")]
    NothingSendable(String),

    /// Keyer speed outside the supported range
    #[error("keyer speed {0} WPM out of range 1..=100")]
    InvalidWpm(u32),

    /// Preset number outside 0..=9
    #[error("no preset #{0}")]
    UnknownPreset(u8),

    /// The subsystem needed for the request is not configured
    #[error("{0} disabled")]
    Disabled(&'static str),

    /// Frequency or mode not yet known
    #[error("{0}")]
    NotReady(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;
