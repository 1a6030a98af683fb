//! CAT Engine
//!
//! The coordination core of the FT-891 contest controller: a single-task
//! [`Reactor`] that multiplexes operator input, the CAT link and three
//! software timers.
//!
//! # Architecture
//!
//! - [`timer`]: one-shot timers backed by a worker task, with stale firings
//!   filtered by generation
//! - [`client`]: [`CatClient`] pairs replies with queries through a FIFO of
//!   expected reply kinds and arms the reply timeout while it is non-empty
//! - [`sequencer`]: compound operations (tune, filter step, log) that need
//!   a reply before they can issue the next command
//! - [`sweep`]: the periodic meter-read chain
//! - [`keyer`]: text to Morse, keyed on a [`KeyLine`] one timer firing at a
//!   time
//! - [`reactor`]: the event loop tying it all together
//!
//! Collaborators live behind traits so front ends can swap them:
//! [`Display`], [`BandPlan`], [`MeterCalibration`], [`QsoLog`],
//! [`ExchangeSequence`] and [`KeyLine`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cat_engine::{CatSession, EngineConfig, Reactor, StaticBandPlan, UiEvent};
//! use cat_protocol::WidthTable;
//! # use cat_engine::{Display, MeterReport};
//! # struct Stdout;
//! # impl Display for Stdout {
//! #     fn print(&mut self, line: &str) { println!("{line}"); }
//! #     fn meters_updated(&mut self, _: &MeterReport) {}
//! # }
//!
//! # async fn demo(link: tokio::io::DuplexStream) -> cat_engine::Result<()> {
//! let config = EngineConfig::default();
//! let (ui_tx, ui_rx) = tokio::sync::mpsc::channel(32);
//! let session = CatSession::new(
//!     link,
//!     WidthTable::ft891_ssb(),
//!     Arc::new(StaticBandPlan::iaru_region1()),
//!     &config,
//! );
//!
//! ui_tx.send(UiEvent::Tune(100)).await.ok();
//! Reactor::new(ui_rx, Box::new(Stdout)).with_cat(session).run().await
//! # }
//! ```

pub mod band_plan;
pub mod client;
pub mod config;
pub mod contest;
pub mod error;
pub mod events;
pub mod exchange;
pub mod keyer;
pub mod meters;
pub mod presets;
pub mod reactor;
pub mod sequencer;
pub mod sweep;
pub mod timer;

pub use band_plan::{BandPlan, StaticBandPlan};
pub use client::CatClient;
pub use config::EngineConfig;
pub use contest::{Contest, QsoDraft, QsoEntry, QsoLog};
pub use error::{EngineError, Result, UserError};
pub use events::{format_frequency, Display, MeterReport, MeterSample, UiEvent};
pub use exchange::{ExchangeSequence, SerialExchange};
pub use keyer::{KeyEdge, KeyLine, KeyerScheduler, NullKeyLine};
pub use meters::{Ft891Calibration, MeterCalibration};
pub use presets::Presets;
pub use reactor::{CatSession, Reactor};
pub use sequencer::{Admission, OperationSequencer, ScheduledOperation};
pub use sweep::MeterSweep;
pub use timer::{Timer, TimerHandle};
