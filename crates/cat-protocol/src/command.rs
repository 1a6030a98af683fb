//! Typed commands, replies and code tables for the FT-891 CAT subset
//!
//! Outbound traffic is described by [`CatCommand`]; inbound replies are
//! decoded into [`RadioEvent`]s whose [`EventKind`] is used to pair each
//! reply with the query that caused it.

use std::fmt;

use crate::error::ParseError;

/// Operating modes as numbered by the radio's `MD` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperatingMode {
    /// Lower Sideband (`1`)
    Lsb,
    /// Upper Sideband (`2`)
    Usb,
    /// CW, upper side (`3`)
    CwU,
    /// Frequency Modulation (`4`)
    Fm,
    /// Amplitude Modulation (`5`)
    Am,
    /// RTTY, lower side (`6`)
    RttyL,
    /// CW, lower side (`7`)
    CwL,
    /// Data, lower side (`8`)
    DataL,
    /// RTTY, upper side (`9`)
    RttyU,
    /// FM Narrow (`B`)
    FmN,
    /// Data, upper side (`C`)
    DataU,
    /// AM Narrow (`D`)
    AmN,
}

impl OperatingMode {
    /// Hex digit used on the wire
    pub fn code(self) -> char {
        match self {
            Self::Lsb => '1',
            Self::Usb => '2',
            Self::CwU => '3',
            Self::Fm => '4',
            Self::Am => '5',
            Self::RttyL => '6',
            Self::CwL => '7',
            Self::DataL => '8',
            Self::RttyU => '9',
            Self::FmN => 'B',
            Self::DataU => 'C',
            Self::AmN => 'D',
        }
    }

    /// Parse the wire digit (case-insensitive)
    pub fn from_code(c: char) -> Result<Self, ParseError> {
        match c.to_ascii_uppercase() {
            '1' => Ok(Self::Lsb),
            '2' => Ok(Self::Usb),
            '3' => Ok(Self::CwU),
            '4' => Ok(Self::Fm),
            '5' => Ok(Self::Am),
            '6' => Ok(Self::RttyL),
            '7' => Ok(Self::CwL),
            '8' => Ok(Self::DataL),
            '9' => Ok(Self::RttyU),
            'B' => Ok(Self::FmN),
            'C' => Ok(Self::DataU),
            'D' => Ok(Self::AmN),
            _ => Err(ParseError::InvalidMode(c.to_string())),
        }
    }

    /// Returns whether this is a CW mode
    pub fn is_cw(self) -> bool {
        matches!(self, Self::CwU | Self::CwL)
    }

    /// Returns whether this is an RTTY or data mode
    pub fn is_digital(self) -> bool {
        matches!(self, Self::RttyL | Self::RttyU | Self::DataL | Self::DataU)
    }

    /// Returns whether this is an FM mode
    pub fn is_fm(self) -> bool {
        matches!(self, Self::Fm | Self::FmN)
    }

    /// Short display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Lsb => "LSB",
            Self::Usb => "USB",
            Self::CwU => "CW-U",
            Self::Fm => "FM",
            Self::Am => "AM",
            Self::RttyL => "RTTY-L",
            Self::CwL => "CW-L",
            Self::DataL => "DATA-L",
            Self::RttyU => "RTTY-U",
            Self::FmN => "FM-N",
            Self::DataU => "DATA-U",
            Self::AmN => "AM-N",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Meters readable with `RM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Meter {
    /// S-meter (receive)
    Sig,
    /// Speech compression level
    Comp,
    /// ALC level
    Alc,
    /// Forward power
    Pwr,
    /// Standing wave ratio
    Swr,
    /// Final stage drain current; zero while receiving
    Idd,
}

impl Meter {
    /// Meter number used on the wire
    pub fn code(self) -> u8 {
        match self {
            Self::Sig => 1,
            Self::Comp => 3,
            Self::Alc => 4,
            Self::Pwr => 5,
            Self::Swr => 6,
            Self::Idd => 7,
        }
    }

    /// Parse the wire meter number
    pub fn from_code(c: char) -> Result<Self, ParseError> {
        match c {
            '1' => Ok(Self::Sig),
            '3' => Ok(Self::Comp),
            '4' => Ok(Self::Alc),
            '5' => Ok(Self::Pwr),
            '6' => Ok(Self::Swr),
            '7' => Ok(Self::Idd),
            _ => Err(ParseError::InvalidMeter(format!("unknown meter {c}"))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sig => "SIG",
            Self::Comp => "COMP",
            Self::Alc => "ALC",
            Self::Pwr => "PWR",
            Self::Swr => "SWR",
            Self::Idd => "IDD",
        }
    }
}

/// Bands selectable with `BS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Band {
    M160,
    M80,
    M40,
    M30,
    M20,
    M17,
    M15,
    M12,
    M10,
    M6,
    /// General coverage
    Gen,
    /// Medium wave broadcast
    Mw,
}

impl Band {
    /// Every band, in band-switch order
    pub const ALL: [Band; 12] = [
        Band::M160,
        Band::M80,
        Band::M40,
        Band::M30,
        Band::M20,
        Band::M17,
        Band::M15,
        Band::M12,
        Band::M10,
        Band::M6,
        Band::Gen,
        Band::Mw,
    ];

    /// Band-switch number used on the wire
    pub fn code(self) -> u8 {
        match self {
            Self::M160 => 0,
            Self::M80 => 1,
            Self::M40 => 3,
            Self::M30 => 4,
            Self::M20 => 5,
            Self::M17 => 6,
            Self::M15 => 7,
            Self::M12 => 8,
            Self::M10 => 9,
            Self::M6 => 10,
            Self::Gen => 11,
            Self::Mw => 12,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::M160 => "160 m",
            Self::M80 => "80 m",
            Self::M40 => "40 m",
            Self::M30 => "30 m",
            Self::M20 => "20 m",
            Self::M17 => "17 m",
            Self::M15 => "15 m",
            Self::M12 => "12 m",
            Self::M10 => "10 m",
            Self::M6 => "6 m",
            Self::Gen => "generic",
            Self::Mw => "MW",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a filter width change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Narrower,
    Wider,
}

/// Radio cooling fan profile (`EX0520`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FanMode {
    Normal,
    Contest,
}

// ============================================================================
// Outbound commands
// ============================================================================

/// A command sent to the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatCommand {
    /// `RMn;`
    GetMeter(Meter),
    /// `FA;`
    GetFrequency,
    /// `FAnnnnnnnnn;`
    SetFrequency(u32),
    /// `MD0;`
    GetMode,
    /// `MD0x;`
    SetMode(OperatingMode),
    /// `SH0;`
    GetWidth,
    /// `SH0nn;` with an index into the radio's width table
    SetWidth(u8),
    /// `BSnn;`
    SetBand(Band),
    /// `EX0520n;`
    SetFanMode(FanMode),
    /// `SV;`
    SwapVfo,
    /// `ZI;`
    ZeroIn,
}

impl CatCommand {
    /// Kind of reply this command provokes, if any
    pub fn expected_reply(&self) -> Option<EventKind> {
        match self {
            Self::GetMeter(_) => Some(EventKind::Meter),
            Self::GetFrequency => Some(EventKind::Frequency),
            Self::GetMode => Some(EventKind::Mode),
            Self::GetWidth => Some(EventKind::Bandwidth),
            Self::SetFrequency(_)
            | Self::SetMode(_)
            | Self::SetWidth(_)
            | Self::SetBand(_)
            | Self::SetFanMode(_)
            | Self::SwapVfo
            | Self::ZeroIn => None,
        }
    }
}

// ============================================================================
// Inbound events
// ============================================================================

/// A decoded reply frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// The radio reported an error (`?;`)
    ProtocolError(String),
    /// Raw meter reading, 0..=255
    MeterSample { meter: Meter, raw: u8 },
    /// VFO-A frequency in Hz
    Frequency(u32),
    /// Current operating mode
    Mode(OperatingMode),
    /// Receive filter width in Hz
    Bandwidth(u32),
}

impl RadioEvent {
    /// Correlation kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ProtocolError(_) => EventKind::ProtocolError,
            Self::MeterSample { .. } => EventKind::Meter,
            Self::Frequency(_) => EventKind::Frequency,
            Self::Mode(_) => EventKind::Mode,
            Self::Bandwidth(_) => EventKind::Bandwidth,
        }
    }
}

/// Reply category used to pair replies with outstanding queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ProtocolError,
    Meter,
    Frequency,
    Mode,
    Bandwidth,
}
