//! CAT Protocol Library
//!
//! Wire format for the Yaesu FT-891 ASCII CAT protocol: semicolon-terminated
//! frames carrying two-letter opcodes.
//!
//! # Architecture
//!
//! - [`command`]: typed commands ([`CatCommand`]), decoded replies
//!   ([`RadioEvent`]) and the mode/meter/band code tables
//! - [`yaesu_ascii`]: the streaming frame splitter and reply decoder
//! - [`bandwidth`]: the filter width table used by `SH`
//!
//! The protocol has no transaction ids. A reply is recognised only by its
//! opcode, so callers pair replies with queries through [`EventKind`].
//!
//! # Example
//!
//! ```rust
//! use cat_protocol::{ProtocolCodec, RadioEvent};
//! use cat_protocol::yaesu_ascii::YaesuAsciiCodec;
//!
//! let mut codec = YaesuAsciiCodec::new();
//! codec.push_bytes(b"FA014250000;MD0");
//!
//! let frame = codec.next_frame().unwrap();
//! assert_eq!(codec.decode(&frame), Ok(RadioEvent::Frequency(14_250_000)));
//! assert!(codec.next_frame().is_none());
//! ```

pub mod bandwidth;
pub mod command;
pub mod error;
pub mod yaesu_ascii;

pub use bandwidth::WidthTable;
pub use command::{
    Band, CatCommand, Direction, EventKind, FanMode, Meter, OperatingMode, RadioEvent,
};
pub use error::{ParseError, ProtocolError};

/// Trait for codecs that split an incoming byte stream into frames
pub trait ProtocolCodec {
    /// The frame type produced by this codec
    type Frame;

    /// Push raw bytes into the codec's buffer
    fn push_bytes(&mut self, data: &[u8]);

    /// Try to extract the next complete frame from the buffer
    fn next_frame(&mut self) -> Option<Self::Frame>;

    /// Clear the internal buffer
    fn clear(&mut self);
}

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format
    fn encode(&self) -> Vec<u8>;
}
