//! CAT Protocol Simulation Library
//!
//! A virtual Yaesu FT-891 for testing CAT clients without a radio:
//!
//! - **VirtualRadio**: answers `FA`, `MD`, `SH` and `RM` queries from its
//!   own state and applies set commands
//! - **run_virtual_radio_task**: serves a `VirtualRadio` over any async
//!   byte stream, such as one half of [`tokio::io::duplex`]
//!
//! # Example
//!
//! ```rust
//! use cat_sim::VirtualRadio;
//! use cat_protocol::Meter;
//!
//! let mut radio = VirtualRadio::new("FT-891");
//! radio.set_meter(Meter::Sig, 120);
//!
//! radio.process_bytes(b"FA;RM1;");
//! assert_eq!(radio.take_output().unwrap(), b"FA014025000;");
//! assert_eq!(radio.take_output().unwrap(), b"RM1120;");
//! ```

pub mod radio;
pub mod radio_task;

pub use radio::{VirtualRadio, VirtualRadioConfig};
pub use radio_task::{run_virtual_radio_task, VirtualRadioCommand};
