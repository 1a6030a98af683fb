//! Cabrillo QSO log
//!
//! Only `QSO:` lines are written. The header and footer are left to the
//! operator.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use cat_engine::{EngineError, QsoEntry, QsoLog};
use cat_protocol::OperatingMode;
use chrono::{DateTime, Utc};

/// Cabrillo mode column for `mode`
pub fn cabrillo_mode(mode: OperatingMode) -> &'static str {
    match mode {
        OperatingMode::Lsb | OperatingMode::Usb | OperatingMode::Am | OperatingMode::AmN => "PH",
        OperatingMode::CwU | OperatingMode::CwL => "CW",
        OperatingMode::DataL | OperatingMode::DataU => "DG",
        OperatingMode::RttyL | OperatingMode::RttyU => "RY",
        OperatingMode::Fm | OperatingMode::FmN => "FM",
    }
}

/// Format one `QSO:` line, uppercased
pub fn format_qso(callsign: &str, entry: &QsoEntry) -> String {
    let time: DateTime<Utc> = entry.timestamp.into();
    format!(
        "QSO: {} {} {} {} {} {} {} {} {}",
        entry.frequency_hz / 1000,
        cabrillo_mode(entry.mode),
        time.format("%Y-%m-%d %H%M"),
        callsign,
        entry.sent_report,
        entry.sent_exchange,
        entry.rcvd_call,
        entry.rcvd_report,
        entry.rcvd_exchange,
    )
    .to_uppercase()
}

/// Appends QSOs to a Cabrillo file
#[derive(Debug, Clone)]
pub struct CabrilloLog {
    callsign: String,
    path: PathBuf,
}

impl CabrilloLog {
    pub fn new(callsign: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            callsign: callsign.to_uppercase(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, e: std::io::Error) -> EngineError {
        EngineError::Log(format!("{}: {}", self.path.display(), e))
    }
}

impl QsoLog for CabrilloLog {
    fn log(&mut self, entry: &QsoEntry) -> cat_engine::Result<String> {
        let line = format_qso(&self.callsign, entry);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error(e))?;
        writeln!(file, "{line}").map_err(|e| self.error(e))?;
        Ok(line)
    }

    fn exists(&self, call: &str) -> cat_engine::Result<bool> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(self.error(e)),
        };
        let call = call.to_uppercase();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| self.error(e))?.to_uppercase();
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() == 11 && tokens[0] == "QSO:" && tokens[8] == call {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn entry(call: &str) -> QsoEntry {
        QsoEntry {
            // 2024-03-09 14:05 UTC
            timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(1_709_993_100),
            frequency_hz: 7_025_900,
            mode: OperatingMode::CwU,
            sent_report: "599".into(),
            sent_exchange: "001".into(),
            rcvd_call: call.into(),
            rcvd_report: "599".into(),
            rcvd_exchange: "15".into(),
        }
    }

    fn temp_log(name: &str) -> CabrilloLog {
        let path = std::env::temp_dir().join(format!(
            "catkeyer-{}-{}.cbr",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        CabrilloLog::new("sp5abc", path)
    }

    #[test]
    fn test_format_qso_line() {
        assert_eq!(
            format_qso("SP5ABC", &entry("dl1abc")),
            "QSO: 7025 CW 2024-03-09 1405 SP5ABC 599 001 DL1ABC 599 15"
        );
    }

    #[test]
    fn test_modes() {
        assert_eq!(cabrillo_mode(OperatingMode::Usb), "PH");
        assert_eq!(cabrillo_mode(OperatingMode::AmN), "PH");
        assert_eq!(cabrillo_mode(OperatingMode::DataU), "DG");
        assert_eq!(cabrillo_mode(OperatingMode::RttyL), "RY");
        assert_eq!(cabrillo_mode(OperatingMode::FmN), "FM");
    }

    #[test]
    fn test_log_then_exists() {
        let mut log = temp_log("exists");
        assert!(!log.exists("DL1ABC").unwrap());

        let line = log.log(&entry("DL1ABC")).unwrap();
        assert!(line.starts_with("QSO: 7025 CW"));
        assert!(log.exists("dl1abc").unwrap());
        assert!(!log.exists("DL1AB").unwrap());

        let _ = std::fs::remove_file(log.path());
    }

    #[test]
    fn test_exists_ignores_other_lines() {
        let log = temp_log("header");
        std::fs::write(
            log.path(),
            "START-OF-LOG: 3.0\nCALLSIGN: DL1ABC\nSOAPBOX: QSO: DL1ABC\n",
        )
        .unwrap();
        assert!(!log.exists("DL1ABC").unwrap());
        let _ = std::fs::remove_file(log.path());
    }
}
