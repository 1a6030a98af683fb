//! Line-oriented operator console
//!
//! Every line typed on stdin is one command; output goes to stdout while
//! diagnostics go to stderr.

use cat_engine::config::{TUNE_STEP_FAST, TUNE_STEP_NORM, TUNE_STEP_SLOW, TUNE_STEP_XFAST};
use cat_engine::{format_frequency, Display, MeterCalibration, MeterReport, UiEvent};
use cat_protocol::{Band, Direction, FanMode, OperatingMode};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub const HELP: &str = "\
Commands (one per line):
  q              quit
  h              this help
  n <text>       note, ignored
  > / <          tune up / down 10 Hz
  + / -          tune up / down 100 Hz
  ++ / --        tune up / down 1 kHz
  +++ / ---      tune up / down 10 kHz
  =              go to the lower band edge
  b <key>        band: 1=160 2=80 3=40 4=30 5=20 6=17 7=15 8=12 9=10 0=6 g=generic m=MW
  m <key>        mode: l=LSB u=USB c=CW d=data f=FM a=AM
  f <n|c>        fan: normal or contest
  v              swap VFO
  [ / ]          narrower / wider filter
  p              show presets
  0..9           send preset
  x              show next exchange
  c <call>       check whether call is logged
  l              freeze the time for the next log entry
  l <call> [rst] <exchange>
                 log a QSO
  t <text>       send text
  u / d          keyer speed up / down
  a              abort sending
  z              zero in";

/// Operator input that could not be turned into a command
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid command {0:?}; type 'h' for help, 'q' to quit")]
    UnknownCommand(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("Unknown band key {0:?} -- band selection abandoned")]
    UnknownBand(String),

    #[error("Unknown mode key {0:?} -- mode selection abandoned")]
    UnknownMode(String),

    #[error("Unknown fan mode {0:?}")]
    UnknownFanMode(String),

    #[error("Invalid number of tokens ({0}), logging aborted")]
    LogTokens(usize),
}

/// What a line of input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Forward to the reactor
    Event(UiEvent),
    Help,
    /// Blank line or a note
    Nothing,
}

fn band_for_key(key: &str) -> Option<Band> {
    Some(match key {
        "1" => Band::M160,
        "2" => Band::M80,
        "3" => Band::M40,
        "4" => Band::M30,
        "5" => Band::M20,
        "6" => Band::M17,
        "7" => Band::M15,
        "8" => Band::M12,
        "9" => Band::M10,
        "0" => Band::M6,
        "g" => Band::Gen,
        "m" => Band::Mw,
        _ => return None,
    })
}

fn mode_for_key(key: &str) -> Option<OperatingMode> {
    Some(match key {
        "l" => OperatingMode::Lsb,
        "u" => OperatingMode::Usb,
        "c" => OperatingMode::CwU,
        "d" => OperatingMode::DataU,
        "f" => OperatingMode::Fm,
        "a" => OperatingMode::Am,
        _ => return None,
    })
}

/// Parse one line of operator input
pub fn parse_line(line: &str) -> Result<Command, InputError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let arg = |name: &'static str| {
        if rest.is_empty() {
            Err(InputError::MissingArgument(name))
        } else {
            Ok(rest)
        }
    };

    let event = match word {
        "" | "n" => return Ok(Command::Nothing),
        "h" | "?" => return Ok(Command::Help),
        "q" => UiEvent::Quit,
        ">" => UiEvent::Tune(TUNE_STEP_SLOW),
        "<" => UiEvent::Tune(-TUNE_STEP_SLOW),
        "+" => UiEvent::Tune(TUNE_STEP_NORM),
        "-" => UiEvent::Tune(-TUNE_STEP_NORM),
        "++" => UiEvent::Tune(TUNE_STEP_FAST),
        "--" => UiEvent::Tune(-TUNE_STEP_FAST),
        "+++" => UiEvent::Tune(TUNE_STEP_XFAST),
        "---" => UiEvent::Tune(-TUNE_STEP_XFAST),
        "=" => UiEvent::ResetFrequency,
        "b" => {
            let key = arg("b")?;
            UiEvent::SelectBand(band_for_key(key).ok_or_else(|| InputError::UnknownBand(key.into()))?)
        }
        "m" => {
            let key = arg("m")?;
            UiEvent::SelectMode(mode_for_key(key).ok_or_else(|| InputError::UnknownMode(key.into()))?)
        }
        "f" => match arg("f")? {
            "n" | "normal" => UiEvent::SetFanMode(FanMode::Normal),
            "c" | "contest" => UiEvent::SetFanMode(FanMode::Contest),
            other => return Err(InputError::UnknownFanMode(other.into())),
        },
        "v" => UiEvent::SwapVfo,
        "[" => UiEvent::Bandwidth(Direction::Narrower),
        "]" => UiEvent::Bandwidth(Direction::Wider),
        "p" => UiEvent::ShowPresets,
        "x" => UiEvent::ShowExchange,
        "c" => UiEvent::CheckCall(arg("c")?.to_uppercase()),
        "l" if rest.is_empty() => UiEvent::FreezeTime,
        "l" => {
            let tokens: Vec<String> = rest.split_whitespace().map(str::to_uppercase).collect();
            match <[String; 2]>::try_from(tokens) {
                Ok([call, exchange]) => UiEvent::Log {
                    call,
                    report: None,
                    exchange,
                },
                Err(tokens) => match <[String; 3]>::try_from(tokens) {
                    Ok([call, report, exchange]) => UiEvent::Log {
                        call,
                        report: Some(report),
                        exchange,
                    },
                    Err(tokens) => return Err(InputError::LogTokens(tokens.len())),
                },
            }
        }
        "t" => UiEvent::SendText(arg("t")?.to_string()),
        "u" => UiEvent::WpmUp,
        "d" => UiEvent::WpmDown,
        "a" => UiEvent::AbortSending,
        "z" => UiEvent::ZeroIn,
        digit if digit.len() == 1 && digit.as_bytes()[0].is_ascii_digit() => {
            UiEvent::SendPreset(digit.as_bytes()[0] - b'0')
        }
        other => return Err(InputError::UnknownCommand(other.to_string())),
    };
    Ok(Command::Event(event))
}

/// Read stdin line by line and forward commands until EOF or `q`
pub async fn run_input_task(tx: mpsc::Sender<UiEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed");
                break;
            }
            Err(e) => {
                tracing::warn!("stdin error: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Ok(Command::Event(event)) => {
                let quit = event == UiEvent::Quit;
                if tx.send(event).await.is_err() || quit {
                    break;
                }
            }
            Ok(Command::Help) => println!("{HELP}"),
            Ok(Command::Nothing) => {}
            Err(e) => println!("{e}"),
        }
    }
    info!("input task ended");
}

/// One meter line, `14.025.000 CW-U | SIG S9 (0 dB)`
pub fn render_meters(report: &MeterReport, calibration: &dyn MeterCalibration) -> String {
    let mut line = match (report.frequency_hz, report.mode) {
        (Some(hz), Some(mode)) => format!("{} {}", format_frequency(hz), mode),
        (Some(hz), None) => format_frequency(hz),
        _ => "--.---.---".to_string(),
    };
    if report.transmitting() {
        line.push_str(" TX");
    }
    for sample in &report.samples {
        line.push_str(&format!(
            " | {} {}",
            sample.meter.name(),
            calibration.render(sample.meter, sample.raw)
        ));
    }
    line
}

/// Prints status lines, and meter lines when they change
pub struct StdoutDisplay {
    calibration: Box<dyn MeterCalibration>,
    last_meters: String,
}

impl StdoutDisplay {
    pub fn new(calibration: Box<dyn MeterCalibration>) -> Self {
        Self {
            calibration,
            last_meters: String::new(),
        }
    }
}

impl Display for StdoutDisplay {
    fn print(&mut self, line: &str) {
        println!("{line}");
    }

    fn meters_updated(&mut self, report: &MeterReport) {
        let line = render_meters(report, self.calibration.as_ref());
        if line != self.last_meters {
            println!("{line}");
            self.last_meters = line;
        }
    }
}

#[cfg(test)]
mod tests {
    use cat_engine::{Ft891Calibration, MeterSample};
    use cat_protocol::Meter;
    use proptest::prelude::*;

    use super::*;

    fn event(line: &str) -> UiEvent {
        match parse_line(line) {
            Ok(Command::Event(event)) => event,
            other => panic!("{line:?} parsed to {other:?}"),
        }
    }

    #[test]
    fn test_tuning_keys() {
        assert_eq!(event(">"), UiEvent::Tune(10));
        assert_eq!(event("-"), UiEvent::Tune(-100));
        assert_eq!(event("++"), UiEvent::Tune(1000));
        assert_eq!(event("---"), UiEvent::Tune(-10_000));
        assert_eq!(event("="), UiEvent::ResetFrequency);
    }

    #[test]
    fn test_band_and_mode() {
        assert_eq!(event("b 3"), UiEvent::SelectBand(Band::M40));
        assert_eq!(event("b g"), UiEvent::SelectBand(Band::Gen));
        assert_eq!(event("m c"), UiEvent::SelectMode(OperatingMode::CwU));
        assert_eq!(
            parse_line("b x"),
            Err(InputError::UnknownBand("x".into()))
        );
        assert_eq!(parse_line("m"), Err(InputError::MissingArgument("m")));
    }

    #[test]
    fn test_log_entries() {
        assert_eq!(event("l"), UiEvent::FreezeTime);
        assert_eq!(
            event("l dl1abc 15"),
            UiEvent::Log {
                call: "DL1ABC".into(),
                report: None,
                exchange: "15".into(),
            }
        );
        assert_eq!(
            event("l dl1abc 579 15"),
            UiEvent::Log {
                call: "DL1ABC".into(),
                report: Some("579".into()),
                exchange: "15".into(),
            }
        );
        assert_eq!(parse_line("l dl1abc"), Err(InputError::LogTokens(1)));
        assert_eq!(parse_line("l a b c d"), Err(InputError::LogTokens(4)));
    }

    #[test]
    fn test_presets_and_text() {
        assert_eq!(event("0"), UiEvent::SendPreset(0));
        assert_eq!(event("7"), UiEvent::SendPreset(7));
        assert_eq!(event("t cq test"), UiEvent::SendText("cq test".into()));
        assert_eq!(event("c sp5abc"), UiEvent::CheckCall("SP5ABC".into()));
        assert_eq!(parse_line("  "), Ok(Command::Nothing));
        assert_eq!(parse_line("n worked him last year"), Ok(Command::Nothing));
        assert_eq!(parse_line("h"), Ok(Command::Help));
        assert!(matches!(parse_line("42"), Err(InputError::UnknownCommand(_))));
    }

    #[test]
    fn test_render_meters() {
        let report = MeterReport {
            samples: vec![MeterSample {
                meter: Meter::Sig,
                raw: 130,
            }],
            frequency_hz: Some(14_025_000),
            mode: Some(OperatingMode::CwU),
        };
        let line = render_meters(&report, &Ft891Calibration);
        assert!(line.starts_with("14.025.000 CW-U | "));
        assert!(line.contains("S9"));
        assert!(!line.contains(" TX"));
    }

    mod proptest_tests {
        use super::*;

        proptest! {
            #[test]
            fn parse_line_never_panics(line in "\\PC{0,40}") {
                let _ = parse_line(&line);
            }

            #[test]
            fn single_digit_selects_preset(digit in 0u8..=9) {
                prop_assert_eq!(
                    parse_line(&digit.to_string()),
                    Ok(Command::Event(UiEvent::SendPreset(digit)))
                );
            }
        }
    }
}
