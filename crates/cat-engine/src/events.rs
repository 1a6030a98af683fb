//! Events flowing into the reactor and notifications flowing out of it

use cat_protocol::{Band, Direction, FanMode, Meter, OperatingMode, RadioEvent};

// ============================================================================
// Operator input
// ============================================================================

/// A request from the operator's front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Leave the program
    Quit,
    /// Move the VFO by a signed number of Hz, staying inside the current band
    Tune(i32),
    /// Jump to the lower edge of the current band
    ResetFrequency,
    SelectBand(Band),
    SelectMode(OperatingMode),
    SetFanMode(FanMode),
    SwapVfo,
    /// Step the receive filter
    Bandwidth(Direction),
    ShowPresets,
    /// Send preset by its key, `1`..`9` then `0` for the tenth
    SendPreset(u8),
    ShowExchange,
    /// Report whether a callsign is already logged
    CheckCall(String),
    /// Remember the current time for the next log entry
    FreezeTime,
    /// Log a contact at the current frequency and mode
    Log {
        call: String,
        report: Option<String>,
        exchange: String,
    },
    SendText(String),
    WpmUp,
    WpmDown,
    AbortSending,
    ZeroIn,
}

// ============================================================================
// Display notifications
// ============================================================================

/// One meter reading from a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterSample {
    pub meter: Meter,
    pub raw: u8,
}

/// Result of a complete meter sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterReport {
    /// Samples in the order they were read
    pub samples: Vec<MeterSample>,
    /// Last frequency seen from the radio. Only tuning and logging read it,
    /// so it is stale after the VFO knob is turned.
    pub frequency_hz: Option<u32>,
    /// Last mode seen from the radio, refreshed only when logging
    pub mode: Option<OperatingMode>,
}

impl MeterReport {
    /// Whether the radio was transmitting during the sweep
    pub fn transmitting(&self) -> bool {
        self.samples.iter().any(|s| s.meter == Meter::Idd)
    }
}

/// Operator-facing output
pub trait Display: Send {
    /// Show a status line
    fn print(&mut self, line: &str);

    /// A meter sweep completed
    fn meters_updated(&mut self, report: &MeterReport);

    /// A reply was decoded
    fn radio_event(&mut self, _event: &RadioEvent) {}
}

/// Format a frequency as `14.025.000`
pub fn format_frequency(hz: u32) -> String {
    format!(
        "{}.{:03}.{:03}",
        hz / 1_000_000,
        (hz / 1000) % 1000,
        hz % 1000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_frequency() {
        assert_eq!(format_frequency(14_025_000), "14.025.000");
        assert_eq!(format_frequency(7_000_010), "7.000.010");
        assert_eq!(format_frequency(30_000), "0.030.000");
    }

    #[test]
    fn test_transmitting_report() {
        let rx = MeterReport {
            samples: vec![MeterSample {
                meter: Meter::Sig,
                raw: 40,
            }],
            frequency_hz: None,
            mode: None,
        };
        assert!(!rx.transmitting());

        let tx = MeterReport {
            samples: vec![MeterSample {
                meter: Meter::Idd,
                raw: 40,
            }],
            ..rx
        };
        assert!(tx.transmitting());
    }
}
