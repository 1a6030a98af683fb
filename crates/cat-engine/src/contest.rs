//! Contest bookkeeping: QSO entries, the log, the exchange and presets

use std::time::SystemTime;

use cat_protocol::OperatingMode;
use tracing::info;

use crate::error::{Result, UserError};
use crate::events::format_frequency;
use crate::exchange::ExchangeSequence;
use crate::presets::Presets;

/// Report sent and assumed received when the operator gives none
pub fn default_report(mode: OperatingMode) -> &'static str {
    if mode.is_cw() {
        "599"
    } else {
        "59"
    }
}

/// What the operator typed, before frequency and mode are known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QsoDraft {
    pub timestamp: SystemTime,
    pub call: String,
    pub report: Option<String>,
    pub exchange: String,
}

impl QsoDraft {
    /// Fill in radio state and defaults
    pub fn complete(self, frequency_hz: u32, mode: OperatingMode, sent_exchange: String) -> QsoEntry {
        let default = default_report(mode);
        let rcvd_report = match self.report {
            Some(r) if !r.trim().is_empty() => r,
            _ => default.to_string(),
        };
        QsoEntry {
            timestamp: self.timestamp,
            frequency_hz,
            mode,
            sent_report: default.to_string(),
            sent_exchange,
            rcvd_call: self.call,
            rcvd_report,
            rcvd_exchange: self.exchange,
        }
    }
}

/// A completed contact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QsoEntry {
    pub timestamp: SystemTime,
    pub frequency_hz: u32,
    pub mode: OperatingMode,
    pub sent_report: String,
    pub sent_exchange: String,
    pub rcvd_call: String,
    pub rcvd_report: String,
    pub rcvd_exchange: String,
}

/// Persistent contest log
pub trait QsoLog: Send {
    /// Append an entry; returns the line as written
    fn log(&mut self, entry: &QsoEntry) -> Result<String>;

    /// Whether `call` is already in the log
    fn exists(&self, call: &str) -> Result<bool>;
}

/// The contest-related collaborators, each optional
#[derive(Default)]
pub struct Contest {
    pub exchange: Option<Box<dyn ExchangeSequence>>,
    pub log: Option<Box<dyn QsoLog>>,
    pub presets: Option<Presets>,
    frozen_time: Option<SystemTime>,
}

impl Contest {
    pub fn new(
        exchange: Option<Box<dyn ExchangeSequence>>,
        log: Option<Box<dyn QsoLog>>,
        presets: Option<Presets>,
    ) -> Self {
        Self {
            exchange,
            log,
            presets,
            frozen_time: None,
        }
    }

    /// Remember now as the time of the next logged contact
    pub fn freeze_time(&mut self) {
        self.frozen_time = Some(SystemTime::now());
    }

    /// The frozen time if any, else now. Unfreezes.
    pub fn take_timestamp(&mut self) -> SystemTime {
        self.frozen_time.take().unwrap_or_else(SystemTime::now)
    }

    pub fn can_log(&self) -> bool {
        self.log.is_some() && self.exchange.is_some()
    }

    pub fn current_exchange(&self) -> std::result::Result<String, UserError> {
        self.exchange
            .as_ref()
            .map(|x| x.get())
            .ok_or(UserError::Disabled("exchange support"))
    }

    pub fn is_logged(&self, call: &str) -> Result<Option<bool>> {
        match &self.log {
            Some(log) => log.exists(call).map(Some),
            None => Ok(None),
        }
    }

    /// Write a completed contact and advance the exchange.
    ///
    /// Returns status lines for the operator.
    pub fn record(
        &mut self,
        draft: QsoDraft,
        frequency_hz: u32,
        mode: OperatingMode,
    ) -> Result<Vec<String>> {
        let (Some(log), Some(exchange)) = (self.log.as_mut(), self.exchange.as_mut()) else {
            return Ok(vec!["Cannot log -- logging disabled".into()]);
        };

        let entry = draft.complete(frequency_hz, mode, exchange.get());
        info!(
            "logging {} on {} {}",
            entry.rcvd_call,
            format_frequency(frequency_hz),
            mode
        );
        let mut lines = vec![log.log(&entry)?];
        if exchange.next() {
            lines.push(format!("Log entry written, next exchange: {}", exchange.get()));
        } else {
            lines.push("Log entry written, exchange did not change".into());
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::exchange::SerialExchange;

    #[derive(Clone, Default)]
    struct MemoryLog {
        entries: Arc<Mutex<Vec<QsoEntry>>>,
    }

    impl QsoLog for MemoryLog {
        fn log(&mut self, entry: &QsoEntry) -> Result<String> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(format!("QSO: {}", entry.rcvd_call))
        }

        fn exists(&self, call: &str) -> Result<bool> {
            Ok(self.entries.lock().unwrap().iter().any(|e| e.rcvd_call == call))
        }
    }

    fn draft(report: Option<&str>) -> QsoDraft {
        QsoDraft {
            timestamp: SystemTime::UNIX_EPOCH,
            call: "DL1ABC".into(),
            report: report.map(String::from),
            exchange: "042".into(),
        }
    }

    #[test]
    fn test_default_reports() {
        let entry = draft(None).complete(7_025_000, OperatingMode::CwU, "001".into());
        assert_eq!(entry.sent_report, "599");
        assert_eq!(entry.rcvd_report, "599");

        let entry = draft(Some("  ")).complete(14_200_000, OperatingMode::Usb, "001".into());
        assert_eq!(entry.sent_report, "59");
        assert_eq!(entry.rcvd_report, "59");
    }

    #[test]
    fn test_explicit_report_kept() {
        let entry = draft(Some("579")).complete(7_025_000, OperatingMode::CwL, "001".into());
        assert_eq!(entry.sent_report, "599");
        assert_eq!(entry.rcvd_report, "579");
    }

    #[test]
    fn test_record_advances_exchange() {
        let log = MemoryLog::default();
        let mut contest = Contest::new(
            Some(Box::new(SerialExchange::new("", "001", ""))),
            Some(Box::new(log.clone())),
            None,
        );

        let lines = contest.record(draft(None), 7_025_000, OperatingMode::CwU).unwrap();
        assert_eq!(lines[0], "QSO: DL1ABC");
        assert_eq!(lines[1], "Log entry written, next exchange: 002");
        assert_eq!(log.entries.lock().unwrap()[0].sent_exchange, "001");
        assert_eq!(contest.is_logged("DL1ABC").unwrap(), Some(true));
        assert_eq!(contest.is_logged("G4XYZ").unwrap(), Some(false));
    }

    #[test]
    fn test_frozen_time_used_once() {
        let mut contest = Contest::default();
        contest.freeze_time();
        let frozen = contest.take_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(contest.take_timestamp() > frozen);
    }

    #[test]
    fn test_disabled_log() {
        let contest = Contest::default();
        assert!(!contest.can_log());
        assert_eq!(contest.is_logged("X").unwrap(), None);
        assert!(contest.current_exchange().is_err());
    }
}
