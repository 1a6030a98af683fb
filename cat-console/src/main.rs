//! catkeyer: console contest controller for the Yaesu FT-891
//!
//! Tunes the radio and reads its meters over CAT, sends Morse by keying a
//! serial DTR line, and logs QSOs to a Cabrillo file.
//!
//! ```text
//! catkeyer [settings.json]
//! catkeyer --write-settings
//! ```

mod cabrillo;
mod console;
mod serial_io;
mod settings;

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cat_engine::{
    CatSession, Contest, ExchangeSequence, Ft891Calibration, KeyerScheduler, Presets, QsoLog,
    Reactor, SerialExchange, StaticBandPlan,
};
use cat_protocol::WidthTable;
use cat_sim::{run_virtual_radio_task, VirtualRadio};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cabrillo::CabrilloLog;
use console::{run_input_task, StdoutDisplay};
use serial_io::{open_cat_port, DtrKeyLine};
use settings::Settings;

/// Queue depth between the input task and the reactor
const UI_CHANNEL_SIZE: usize = 32;

fn main() -> ExitCode {
    // Diagnostics go to stderr so they do not mix with console output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "catkeyer=info,cat_engine=info,cat_protocol=info,cat_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let arg = std::env::args_os().nth(1);
    if arg.as_deref() == Some(OsStr::new("--write-settings")) {
        return match Settings::default().save() {
            Ok(path) => {
                println!("Default settings written to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Fatal error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let result = tokio::runtime::Runtime::new()
        .context("failed to start async runtime")
        .and_then(|runtime| {
            let result = runtime.block_on(run(arg.map(PathBuf::from)));
            // stdin is read on a blocking thread that cannot be cancelled
            runtime.shutdown_timeout(Duration::from_millis(100));
            result
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings_path: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = Settings::load(settings_path.as_deref()).context("failed to load settings")?;
    settings.validate().context("invalid settings")?;

    info!("Starting catkeyer");
    println!("catkeyer {} -- type 'h' for help", env!("CARGO_PKG_VERSION"));

    let (ui_tx, ui_rx) = mpsc::channel(UI_CHANNEL_SIZE);
    tokio::spawn(run_input_task(ui_tx));

    if let Some(sim) = settings.simulate.clone() {
        if settings.cat_port.is_some() {
            warn!("both cat_port and simulate are set, using the virtual radio");
        }
        let (link, radio_end) = tokio::io::duplex(1024);
        let (_radio_tx, radio_rx) = mpsc::channel(1);
        let radio = tokio::spawn(run_virtual_radio_task(
            radio_end,
            VirtualRadio::from_config(sim),
            radio_rx,
        ));
        let result = run_reactor(&settings, ui_rx, Some(link)).await;
        radio.abort();
        return result;
    }

    match settings.cat_port.as_deref() {
        Some(port) => {
            let link = open_cat_port(port, settings.cat_baud)
                .with_context(|| format!("could not open CAT port {port}"))?;
            run_reactor(&settings, ui_rx, Some(link)).await
        }
        None => {
            println!("CAT disabled: no cat_port in settings");
            run_reactor::<tokio::io::DuplexStream>(&settings, ui_rx, None).await
        }
    }
}

/// Build the optional subsystems the settings allow and run until quit
async fn run_reactor<T>(
    settings: &Settings,
    ui_rx: mpsc::Receiver<cat_engine::UiEvent>,
    link: Option<T>,
) -> anyhow::Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let display = StdoutDisplay::new(Box::new(Ft891Calibration));
    let mut reactor = Reactor::new(ui_rx, Box::new(display));

    if let Some(link) = link {
        reactor = reactor.with_cat(CatSession::new(
            link,
            WidthTable::ft891_ssb(),
            Arc::new(StaticBandPlan::iaru_region1()),
            &settings.engine,
        ));
    }

    if let Some(port) = settings.ptt_port.as_deref() {
        let line = DtrKeyLine::open(port).with_context(|| format!("could not open PTT port {port}"))?;
        let keyer = KeyerScheduler::new(settings.engine.wpm, Box::new(line))
            .context("could not start keyer")?;
        reactor = reactor.with_keyer(keyer);
    }

    let exchange = settings.has_exchange().then(|| {
        let x = &settings.exchange;
        SerialExchange::new(&x.prefix, &x.infix, &x.suffix)
    });
    let presets = settings
        .has_presets()
        .then(|| Presets::new(&settings.callsign));
    let log = match (&settings.cabrillo_file, settings.has_log()) {
        (Some(path), true) => Some(CabrilloLog::new(&settings.callsign, path)),
        _ => None,
    };
    if let Some(log) = &log {
        info!("Logging to {}", log.path().display());
    }
    reactor = reactor.with_contest(Contest::new(
        exchange.map(|x| Box::new(x) as Box<dyn ExchangeSequence>),
        log.map(|l| Box::new(l) as Box<dyn QsoLog>),
        presets,
    ));

    reactor.run().await?;
    Ok(())
}
