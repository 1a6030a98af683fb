//! Serial ports: the CAT link and the DTR keying line

use std::time::Duration;

use cat_engine::{EngineError, KeyLine};
use serialport::SerialPort;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info, warn};

/// Baud rates the FT-891 CAT port can be set to
pub const SUPPORTED_BAUD_RATES: [u32; 4] = [4800, 9600, 19200, 38400];

/// Open the radio's CAT port, 8N1 without flow control
pub fn open_cat_port(path: &str, baud_rate: u32) -> Result<SerialStream, tokio_serial::Error> {
    let stream = tokio_serial::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(100))
        .open_native_async()?;
    info!("Opened CAT port {} at {} baud", path, baud_rate);
    Ok(stream)
}

/// Keys the transmitter through the DTR line of a serial port
pub struct DtrKeyLine {
    name: String,
    port: Box<dyn SerialPort>,
}

impl DtrKeyLine {
    /// Open `path` and release the key
    pub fn open(path: &str) -> Result<Self, serialport::Error> {
        let port = serialport::new(path, 9600)
            .timeout(Duration::from_millis(100))
            .open()?;
        let mut line = Self {
            name: path.to_string(),
            port,
        };
        line.port.write_data_terminal_ready(false)?;
        info!("Opened PTT port {}", path);
        Ok(line)
    }

    fn set_dtr(&mut self, on: bool) -> cat_engine::Result<()> {
        debug!("{} DTR {}", self.name, if on { "on" } else { "off" });
        self.port
            .write_data_terminal_ready(on)
            .map_err(|e| EngineError::KeyLine(format!("{}: {}", self.name, e)))
    }
}

impl KeyLine for DtrKeyLine {
    fn key_down(&mut self) -> cat_engine::Result<()> {
        self.set_dtr(true)
    }

    fn key_up(&mut self) -> cat_engine::Result<()> {
        self.set_dtr(false)
    }
}

impl Drop for DtrKeyLine {
    fn drop(&mut self) {
        if let Err(e) = self.port.write_data_terminal_ready(false) {
            warn!("Could not clear DTR on {}: {}", self.name, e);
        }
    }
}
