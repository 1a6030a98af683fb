//! Virtual FT-891
//!
//! Answers CAT queries from its own state the way the radio does: one reply
//! per query, nothing for set commands, `?;` for anything it cannot parse.

use std::collections::{BTreeMap, VecDeque};

use cat_protocol::yaesu_ascii::{encode_reply, parse_command, YaesuAsciiCodec};
use cat_protocol::{
    Band, CatCommand, FanMode, Meter, OperatingMode, ProtocolCodec, RadioEvent, WidthTable,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// A simulated radio answering CAT queries
#[derive(Debug)]
pub struct VirtualRadio {
    /// Display name
    id: String,
    /// Splits incoming bytes into frames
    codec: YaesuAsciiCodec,
    /// VFO-A frequency in Hz
    frequency_hz: u32,
    /// VFO-B frequency in Hz, swapped in by `SV`
    vfo_b_hz: u32,
    mode: OperatingMode,
    width_hz: u32,
    band: Option<Band>,
    fan: FanMode,
    /// Raw meter readings returned by `RM`
    meters: BTreeMap<Meter, u8>,
    /// When set, queries go unanswered
    silent: bool,
    /// Every command received, oldest first
    received: Vec<CatCommand>,
    /// Replies not yet written to the link
    pending_output: VecDeque<Vec<u8>>,
}

/// Configuration for creating a virtual radio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualRadioConfig {
    /// Display name/identifier
    pub id: String,
    /// Initial VFO-A frequency in Hz
    pub initial_frequency_hz: u32,
    /// Initial operating mode
    pub initial_mode: OperatingMode,
    /// Initial filter width in Hz
    pub initial_width_hz: u32,
    /// S-meter reading while receiving
    pub signal: u8,
}

impl Default for VirtualRadioConfig {
    fn default() -> Self {
        Self {
            id: "Virtual FT-891".to_string(),
            initial_frequency_hz: 14_025_000,
            initial_mode: OperatingMode::CwU,
            initial_width_hz: 2400,
            signal: 100,
        }
    }
}

/// Frequency the radio lands on after a band change
fn band_start(band: Band) -> Option<u32> {
    Some(match band {
        Band::M160 => 1_830_000,
        Band::M80 => 3_550_000,
        Band::M40 => 7_030_000,
        Band::M30 => 10_120_000,
        Band::M20 => 14_030_000,
        Band::M17 => 18_080_000,
        Band::M15 => 21_030_000,
        Band::M12 => 24_900_000,
        Band::M10 => 28_030_000,
        Band::M6 => 50_100_000,
        Band::Mw => 1_000_000,
        Band::Gen => return None,
    })
}

impl VirtualRadio {
    /// Create a new virtual radio with default settings
    pub fn new(id: impl Into<String>) -> Self {
        Self::from_config(VirtualRadioConfig {
            id: id.into(),
            ..VirtualRadioConfig::default()
        })
    }

    /// Create a virtual radio from configuration
    pub fn from_config(config: VirtualRadioConfig) -> Self {
        let mut meters = BTreeMap::new();
        meters.insert(Meter::Sig, config.signal);
        Self {
            id: config.id,
            codec: YaesuAsciiCodec::with_widths(WidthTable::ft891_ssb()),
            frequency_hz: config.initial_frequency_hz,
            vfo_b_hz: config.initial_frequency_hz,
            mode: config.initial_mode,
            width_hz: config.initial_width_hz,
            band: None,
            fan: FanMode::Normal,
            meters,
            silent: false,
            received: Vec::new(),
            pending_output: VecDeque::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    pub fn vfo_b_hz(&self) -> u32 {
        self.vfo_b_hz
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn width_hz(&self) -> u32 {
        self.width_hz
    }

    /// Band last selected with `BS`
    pub fn band(&self) -> Option<Band> {
        self.band
    }

    pub fn fan_mode(&self) -> FanMode {
        self.fan
    }

    /// Raw reading `meter` will report
    pub fn meter(&self, meter: Meter) -> u8 {
        self.meters.get(&meter).copied().unwrap_or(0)
    }

    /// Set the raw reading `meter` will report
    pub fn set_meter(&mut self, meter: Meter, raw: u8) {
        self.meters.insert(meter, raw);
    }

    /// Simulate keying the transmitter: non-zero drive current and output
    /// readings, or all transmit meters back to zero
    pub fn set_transmitting(&mut self, transmitting: bool) {
        let readings: [(Meter, u8); 5] = if transmitting {
            [
                (Meter::Idd, 90),
                (Meter::Alc, 40),
                (Meter::Comp, 0),
                (Meter::Pwr, 160),
                (Meter::Swr, 20),
            ]
        } else {
            [
                (Meter::Idd, 0),
                (Meter::Alc, 0),
                (Meter::Comp, 0),
                (Meter::Pwr, 0),
                (Meter::Swr, 0),
            ]
        };
        self.meters.extend(readings);
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Stop (or resume) answering queries
    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    /// Commands received so far, oldest first
    pub fn received(&self) -> &[CatCommand] {
        &self.received
    }

    /// Queue raw bytes for the link, as if the radio sent them unasked
    pub fn inject(&mut self, bytes: impl Into<Vec<u8>>) {
        self.pending_output.push_back(bytes.into());
    }

    /// Feed bytes from the link. Replies are queued for [`take_output`].
    ///
    /// [`take_output`]: VirtualRadio::take_output
    pub fn process_bytes(&mut self, data: &[u8]) {
        self.codec.push_bytes(data);
        while let Some(frame) = self.codec.next_frame() {
            if let Some(reply) = self.handle_frame(&frame) {
                self.pending_output.push_back(reply);
            }
        }
        if let Err(e) = self.codec.check_overrun() {
            warn!("{} rejecting input: {}", self.id, e);
            self.codec.clear();
            if let Some(reply) = self.reply(RadioEvent::ProtocolError(e.to_string())) {
                self.pending_output.push_back(reply);
            }
        }
    }

    /// Take the next pending output bytes
    pub fn take_output(&mut self) -> Option<Vec<u8>> {
        self.pending_output.pop_front()
    }

    /// Check if there is pending output
    pub fn has_output(&self) -> bool {
        !self.pending_output.is_empty()
    }

    /// Execute one frame (without its `;`) and return the reply, if any
    pub fn handle_frame(&mut self, frame: &str) -> Option<Vec<u8>> {
        let cmd = match parse_command(frame) {
            Ok(cmd) => cmd,
            Err(e) => {
                warn!("{} rejecting {:?}: {}", self.id, frame, e);
                return self.reply(RadioEvent::ProtocolError(frame.to_string()));
            }
        };
        trace!("{} << {:?}", self.id, cmd);
        self.received.push(cmd);

        match cmd {
            CatCommand::GetMeter(meter) => self.reply(RadioEvent::MeterSample {
                meter,
                raw: self.meter(meter),
            }),
            CatCommand::GetFrequency => self.reply(RadioEvent::Frequency(self.frequency_hz)),
            CatCommand::SetFrequency(hz) => {
                self.frequency_hz = hz;
                self.changed()
            }
            CatCommand::GetMode => self.reply(RadioEvent::Mode(self.mode)),
            CatCommand::SetMode(mode) => {
                self.mode = mode;
                self.changed()
            }
            CatCommand::GetWidth => self.reply(RadioEvent::Bandwidth(self.width_hz)),
            CatCommand::SetWidth(index) => match self.codec.widths().hz_for_index(index) {
                Some(hz) => {
                    self.width_hz = hz;
                    self.changed()
                }
                None => self.reply(RadioEvent::ProtocolError(frame.to_string())),
            },
            CatCommand::SetBand(band) => {
                self.band = Some(band);
                if let Some(hz) = band_start(band) {
                    self.frequency_hz = hz;
                }
                self.changed()
            }
            CatCommand::SetFanMode(fan) => {
                self.fan = fan;
                self.changed()
            }
            CatCommand::SwapVfo => {
                std::mem::swap(&mut self.frequency_hz, &mut self.vfo_b_hz);
                self.changed()
            }
            CatCommand::ZeroIn => {
                debug!("{} zero-in at {} Hz", self.id, self.frequency_hz);
                None
            }
        }
    }

    /// Set commands are not answered
    fn changed(&self) -> Option<Vec<u8>> {
        debug!("{}", self.state_summary());
        None
    }

    fn reply(&self, event: RadioEvent) -> Option<Vec<u8>> {
        if self.silent {
            debug!("{} staying silent", self.id);
            return None;
        }
        encode_reply(&event, self.codec.widths())
    }

    /// Get a summary of current state
    pub fn state_summary(&self) -> String {
        format!(
            "{} - {:.3} MHz {} {} Hz{}",
            self.id,
            f64::from(self.frequency_hz) / 1_000_000.0,
            self.mode,
            self.width_hz,
            if self.meter(Meter::Idd) > 0 { " [TX]" } else { "" }
        )
    }
}
