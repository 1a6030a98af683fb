//! Yaesu ASCII CAT Protocol Implementation
//!
//! The FT-891 speaks an ASCII protocol with semicolon-terminated frames.
//! Only the subset needed for contest operation is handled here:
//!
//! | Query   | Reply          | Meaning                            |
//! |---------|----------------|------------------------------------|
//! | `RMn;`  | `RMnddd;`      | meter `n`, raw reading 0..=255     |
//! | `FA;`   | `FAddddddddd;` | VFO-A frequency, 9 digits, Hz      |
//! | `MD0;`  | `MD0x;`        | mode, one hex digit                |
//! | `SH0;`  | `SH0nn;`       | filter width index                 |
//!
//! Set commands (`FA`, `MD0`, `SH0`, `BS`, `EX0520`, `SV`, `ZI`) produce no reply.
//! A rejected command is answered with `?;`.
//!
//! # References
//! - FT-891 CAT Operation Reference Manual (1711-D)

use tracing::warn;

use crate::bandwidth::WidthTable;
use crate::command::{Band, CatCommand, FanMode, Meter, OperatingMode, RadioEvent};
use crate::error::ParseError;
use crate::{EncodeCommand, ProtocolCodec};

/// Longest frame we expect to see
const MAX_FRAME_LEN: usize = 64;

/// Unterminated bytes tolerated before the link is declared garbled
const MAX_UNTERMINATED: usize = MAX_FRAME_LEN * 4;

/// Frequency digit count (9 digits = 1 Hz resolution)
const FREQ_DIGITS: usize = 9;

/// Lowest frequency the radio tunes to
pub const MIN_FREQUENCY_HZ: u32 = 30_000;

/// Highest frequency the radio tunes to
pub const MAX_FREQUENCY_HZ: u32 = 56_000_000;

const METER_REPLY_LEN: usize = 6;
const FREQUENCY_REPLY_LEN: usize = 2 + FREQ_DIGITS;
const MODE_REPLY_LEN: usize = 4;
const WIDTH_REPLY_LEN: usize = 5;

/// Streaming Yaesu ASCII codec
///
/// Splits the inbound byte stream on `;` and decodes reply frames. Bytes
/// after the last terminator stay buffered until more data arrives.
#[derive(Debug, Clone)]
pub struct YaesuAsciiCodec {
    buffer: Vec<u8>,
    widths: WidthTable,
}

impl YaesuAsciiCodec {
    /// Create a codec using the FT-891 SSB width table
    pub fn new() -> Self {
        Self::with_widths(WidthTable::default())
    }

    /// Create a codec with an explicit width table
    pub fn with_widths(widths: WidthTable) -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_FRAME_LEN),
            widths,
        }
    }

    /// Width table used to translate `SH` indices
    pub fn widths(&self) -> &WidthTable {
        &self.widths
    }

    /// Bytes received but not yet terminated
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Fail once the unterminated tail grows past any valid frame. Call
    /// after draining [`ProtocolCodec::next_frame`].
    pub fn check_overrun(&self) -> Result<(), ParseError> {
        if self.buffer.len() > MAX_UNTERMINATED && !self.buffer.contains(&b';') {
            warn!("{} CAT bytes without a terminator", self.buffer.len());
            return Err(ParseError::Overrun(self.buffer.len()));
        }
        Ok(())
    }

    /// Decode one reply frame (terminator already stripped)
    pub fn decode(&self, frame: &str) -> Result<RadioEvent, ParseError> {
        if !frame.is_ascii() {
            return Err(ParseError::InvalidFrame(format!("{frame:?} is not ASCII")));
        }
        if frame == "?" {
            return Ok(RadioEvent::ProtocolError("command rejected by radio".into()));
        }
        if frame.len() < 2 {
            return Err(ParseError::InvalidFrame(format!("{frame:?} too short")));
        }

        match &frame[..2] {
            "RM" => decode_meter(frame),
            "FA" => decode_frequency(frame),
            "MD" => decode_mode(frame),
            "SH" => self.decode_width(frame),
            _ => Err(ParseError::UnknownCommand(frame.to_string())),
        }
    }

    fn decode_width(&self, frame: &str) -> Result<RadioEvent, ParseError> {
        expect_len("SH", frame, WIDTH_REPLY_LEN)?;
        if &frame[2..3] != "0" {
            return Err(ParseError::InvalidFrame(format!("{frame}: bad receiver")));
        }
        let index: u8 = parse_digits(&frame[3..])
            .ok_or_else(|| ParseError::InvalidBandwidth(frame.to_string()))?;
        self.widths
            .hz_for_index(index)
            .map(RadioEvent::Bandwidth)
            .ok_or_else(|| ParseError::InvalidBandwidth(format!("{frame}: no width for index {index}")))
    }
}

impl Default for YaesuAsciiCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolCodec for YaesuAsciiCodec {
    type Frame = String;

    fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    fn next_frame(&mut self) -> Option<String> {
        let term_pos = self.buffer.iter().position(|&b| b == b';')?;
        let frame: Vec<u8> = self.buffer.drain(..=term_pos).collect();
        Some(String::from_utf8_lossy(&frame[..frame.len() - 1]).into_owned())
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Parse a command frame as the radio sees it (terminator stripped).
///
/// Used by the simulator to answer queries.
pub fn parse_command(frame: &str) -> Result<CatCommand, ParseError> {
    if !frame.is_ascii() || frame.len() < 2 {
        return Err(ParseError::InvalidFrame(frame.to_string()));
    }
    let (opcode, params) = frame.split_at(2);

    match (opcode, params) {
        ("RM", p) if p.len() == 1 => Ok(CatCommand::GetMeter(Meter::from_code(first_char(p))?)),
        ("FA", "") => Ok(CatCommand::GetFrequency),
        ("FA", p) if p.len() == FREQ_DIGITS => parse_frequency(p).map(CatCommand::SetFrequency),
        ("MD", "0") => Ok(CatCommand::GetMode),
        ("MD", p) if p.len() == 2 && p.starts_with('0') => {
            OperatingMode::from_code(p.chars().nth(1).unwrap_or('0')).map(CatCommand::SetMode)
        }
        ("SH", "0") => Ok(CatCommand::GetWidth),
        ("SH", p) if p.len() == 3 && p.starts_with('0') => parse_digits(&p[1..])
            .map(CatCommand::SetWidth)
            .ok_or_else(|| ParseError::InvalidBandwidth(frame.to_string())),
        ("BS", p) if p.len() == 2 => parse_digits::<u8>(p)
            .and_then(|code| Band::ALL.into_iter().find(|b| b.code() == code))
            .map(CatCommand::SetBand)
            .ok_or_else(|| ParseError::InvalidFrame(frame.to_string())),
        ("EX", "05200") => Ok(CatCommand::SetFanMode(FanMode::Normal)),
        ("EX", "05201") => Ok(CatCommand::SetFanMode(FanMode::Contest)),
        ("SV", "") => Ok(CatCommand::SwapVfo),
        ("ZI", "") => Ok(CatCommand::ZeroIn),
        _ => Err(ParseError::UnknownCommand(frame.to_string())),
    }
}

impl EncodeCommand for CatCommand {
    fn encode(&self) -> Vec<u8> {
        let cmd = match self {
            CatCommand::GetMeter(meter) => format!("RM{}", meter.code()),
            CatCommand::GetFrequency => "FA".to_string(),
            CatCommand::SetFrequency(hz) => format!("FA{:09}", hz),
            CatCommand::GetMode => "MD0".to_string(),
            CatCommand::SetMode(mode) => format!("MD0{}", mode.code()),
            CatCommand::GetWidth => "SH0".to_string(),
            CatCommand::SetWidth(index) => format!("SH0{:02}", index),
            CatCommand::SetBand(band) => format!("BS{:02}", band.code()),
            CatCommand::SetFanMode(FanMode::Normal) => "EX05200".to_string(),
            CatCommand::SetFanMode(FanMode::Contest) => "EX05201".to_string(),
            CatCommand::SwapVfo => "SV".to_string(),
            CatCommand::ZeroIn => "ZI".to_string(),
        };
        format!("{};", cmd).into_bytes()
    }
}

/// Encode a reply the way the radio would send it
pub fn encode_reply(event: &RadioEvent, widths: &WidthTable) -> Option<Vec<u8>> {
    let reply = match event {
        RadioEvent::ProtocolError(_) => "?".to_string(),
        RadioEvent::MeterSample { meter, raw } => format!("RM{}{:03}", meter.code(), raw),
        RadioEvent::Frequency(hz) => format!("FA{:09}", hz),
        RadioEvent::Mode(mode) => format!("MD0{}", mode.code()),
        RadioEvent::Bandwidth(hz) => format!("SH0{:02}", widths.index_for_hz(*hz)?),
    };
    Some(format!("{};", reply).into_bytes())
}

fn decode_meter(frame: &str) -> Result<RadioEvent, ParseError> {
    expect_len("RM", frame, METER_REPLY_LEN)?;
    let meter = Meter::from_code(first_char(&frame[2..]))?;
    let raw: u16 = parse_digits(&frame[3..])
        .ok_or_else(|| ParseError::InvalidMeter(frame.to_string()))?;
    let raw = u8::try_from(raw)
        .map_err(|_| ParseError::InvalidMeter(format!("{frame}: reading {raw} above 255")))?;
    Ok(RadioEvent::MeterSample { meter, raw })
}

fn decode_frequency(frame: &str) -> Result<RadioEvent, ParseError> {
    expect_len("FA", frame, FREQUENCY_REPLY_LEN)?;
    parse_frequency(&frame[2..]).map(RadioEvent::Frequency)
}

fn decode_mode(frame: &str) -> Result<RadioEvent, ParseError> {
    expect_len("MD", frame, MODE_REPLY_LEN)?;
    if &frame[2..3] != "0" {
        return Err(ParseError::InvalidFrame(format!("{frame}: bad receiver")));
    }
    OperatingMode::from_code(first_char(&frame[3..])).map(RadioEvent::Mode)
}

fn parse_frequency(digits: &str) -> Result<u32, ParseError> {
    let hz: u32 =
        parse_digits(digits).ok_or_else(|| ParseError::InvalidFrequency(digits.to_string()))?;
    if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&hz) {
        return Err(ParseError::InvalidFrequency(format!(
            "{hz} Hz outside {MIN_FREQUENCY_HZ}..={MAX_FREQUENCY_HZ}"
        )));
    }
    Ok(hz)
}

fn expect_len(opcode: &'static str, frame: &str, expected: usize) -> Result<(), ParseError> {
    if frame.len() != expected {
        return Err(ParseError::BadLength {
            opcode,
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

/// Parse a field that must consist only of decimal digits
fn parse_digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn first_char(s: &str) -> char {
    s.chars().next().unwrap_or('\0')
}
