//! Application settings

use std::path::{Path, PathBuf};

use cat_engine::EngineConfig;
use cat_sim::VirtualRadioConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serial_io::SUPPORTED_BAUD_RATES;

/// Errors loading or checking settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine settings path")]
    NoConfigDir,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write settings: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("unsupported CAT baud rate {0} (supported: 4800, 9600, 19200, 38400)")]
    BaudRate(u32),

    #[error(transparent)]
    Engine(#[from] cat_engine::EngineError),
}

/// Fixed and numbered parts of the contest exchange
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExchangeSettings {
    pub prefix: String,
    /// Numeric part, incremented after every logged QSO; leading zeros set
    /// the minimum width
    pub infix: String,
    pub suffix: String,
}

impl ExchangeSettings {
    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.infix.is_empty() && self.suffix.is_empty()
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Own callsign, needed for presets and logging
    pub callsign: String,
    /// Cabrillo file QSOs are appended to
    pub cabrillo_file: Option<PathBuf>,
    /// Serial port of the radio's CAT interface
    pub cat_port: Option<String>,
    /// CAT baud rate
    pub cat_baud: u32,
    /// Serial port whose DTR line keys the transmitter
    pub ptt_port: Option<String>,
    pub exchange: ExchangeSettings,
    /// Keyer speed and CAT timing
    pub engine: EngineConfig,
    /// Talk to a virtual radio instead of `cat_port`
    pub simulate: Option<VirtualRadioConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            callsign: String::new(),
            cabrillo_file: None,
            cat_port: None,
            cat_baud: 4800,
            ptt_port: None,
            exchange: ExchangeSettings::default(),
            engine: EngineConfig::default(),
            simulate: None,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for catkeyer
    /// Uses $XDG_CONFIG_HOME/catkeyer on Linux/macOS, falls back to ~/.config/catkeyer
    pub fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("catkeyer"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("catkeyer"))
    }

    /// Get the default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from `path`, or from the default location.
    ///
    /// A missing default file gives default settings; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::settings_path().ok_or(SettingsError::NoConfigDir)?, false),
        };

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(SettingsError::Read { path, source }),
        };
        serde_json::from_str(&text).map_err(|source| SettingsError::Parse { path, source })
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Check values the radio or engine would reject
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.cat_port.is_some() && !SUPPORTED_BAUD_RATES.contains(&self.cat_baud) {
            return Err(SettingsError::BaudRate(self.cat_baud));
        }
        self.engine.validate()?;
        Ok(())
    }

    pub fn has_cat(&self) -> bool {
        self.cat_port.is_some() || self.simulate.is_some()
    }

    pub fn has_exchange(&self) -> bool {
        !self.exchange.is_empty()
    }

    /// Presets need the exchange and a callsign
    pub fn has_presets(&self) -> bool {
        self.has_exchange() && !self.callsign.is_empty()
    }

    /// Logging needs the exchange, CAT, a callsign and a Cabrillo file
    pub fn has_log(&self) -> bool {
        self.has_exchange()
            && self.has_cat()
            && !self.callsign.is_empty()
            && self.cabrillo_file.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.engine.wpm, 25);
        assert!(!settings.has_cat());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_feature_wiring() {
        let mut settings: Settings = serde_json::from_str(
            r#"{
                "callsign": "sp5abc",
                "cat_port": "/dev/ttyUSB0",
                "exchange": { "infix": "001" }
            }"#,
        )
        .unwrap();
        assert!(settings.has_cat());
        assert!(settings.has_presets());
        assert!(!settings.has_log());

        settings.cabrillo_file = Some("contest.cbr".into());
        assert!(settings.has_log());

        settings.exchange = ExchangeSettings::default();
        assert!(!settings.has_presets());
        assert!(!settings.has_log());
    }

    #[test]
    fn test_baud_rate_checked() {
        let settings = Settings {
            cat_port: Some("/dev/ttyUSB0".into()),
            cat_baud: 115_200,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::BaudRate(115_200))
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/catkeyer.json")));
        assert!(matches!(result, Err(SettingsError::Read { .. })));
    }

    #[test]
    fn test_simulated_radio_counts_as_cat() {
        let settings: Settings =
            serde_json::from_str(r#"{"simulate": {"initial_frequency_hz": 7025000}}"#).unwrap();
        assert!(settings.has_cat());
        assert_eq!(
            settings.simulate.map(|s| s.initial_frequency_hz),
            Some(7_025_000)
        );
    }
}
