//! The event loop
//!
//! One task owns every piece of engine state and waits on five sources, in
//! this priority order:
//!
//! 1. operator input
//! 2. bytes from the radio
//! 3. the keyer timer
//! 4. the meter poll timer
//! 5. the CAT reply timeout
//!
//! A turn blocks until the first source is ready, then rescans without
//! blocking and services every other ready source once, still in priority
//! order, before blocking again. A busy radio link therefore cannot starve
//! the keyer and the reply timeout cannot pre-empt a reply that is already
//! waiting.

use std::ops::ControlFlow;
use std::sync::Arc;

use cat_protocol::{RadioEvent, WidthTable};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::band_plan::BandPlan;
use crate::client::CatClient;
use crate::config::EngineConfig;
use crate::contest::{Contest, QsoDraft};
use crate::error::{EngineError, Result, UserError};
use crate::events::{format_frequency, Display, MeterReport, UiEvent};
use crate::keyer::KeyerScheduler;
use crate::presets::PRESET_COUNT;
use crate::sequencer::{Admission, OperationSequencer, ScheduledOperation};
use crate::sweep::MeterSweep;
use crate::timer::Timer;

/// Everything that exists only while a radio is connected
pub struct CatSession<T> {
    client: CatClient<T>,
    timeout: Timer,
    poll: Timer,
    sequencer: OperationSequencer,
    sweep: MeterSweep,
}

impl<T> CatSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an open link and start polling the meters. Must be called inside
    /// a tokio runtime.
    pub fn new(
        io: T,
        widths: WidthTable,
        band_plan: Arc<dyn BandPlan>,
        config: &EngineConfig,
    ) -> Self {
        let timeout = Timer::new(config.cat_timeout());
        let poll = Timer::new(config.meter_poll_interval());
        let session = Self {
            client: CatClient::new(io, widths, timeout.handle()),
            sequencer: OperationSequencer::new(band_plan),
            sweep: MeterSweep::new(poll.handle()),
            timeout,
            poll,
        };
        session.poll.start();
        session
    }

    pub fn client(&self) -> &CatClient<T> {
        &self.client
    }

    pub fn sequencer(&self) -> &OperationSequencer {
        &self.sequencer
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.handle().default_interval().as_millis() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Ui = 1,
    Cat = 1 << 1,
    Keyer = 1 << 2,
    MeterPoll = 1 << 3,
    CatTimeout = 1 << 4,
}

/// Sources already serviced this turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SourceSet(u8);

impl SourceSet {
    fn insert(&mut self, source: Source) {
        self.0 |= source as u8;
    }

    fn contains(self, source: Source) -> bool {
        self.0 & source as u8 != 0
    }
}

#[derive(Debug)]
enum Wake {
    /// `None` once every sender is gone
    Ui(Option<UiEvent>),
    Cat(Result<Vec<RadioEvent>>),
    Keyer(Result<()>),
    MeterPoll(Result<()>),
    CatTimeout(Result<()>),
}

impl Wake {
    fn source(&self) -> Source {
        match self {
            Wake::Ui(_) => Source::Ui,
            Wake::Cat(_) => Source::Cat,
            Wake::Keyer(_) => Source::Keyer,
            Wake::MeterPoll(_) => Source::MeterPoll,
            Wake::CatTimeout(_) => Source::CatTimeout,
        }
    }
}

async fn read_cat<T>(client: Option<&mut CatClient<T>>) -> Result<Vec<RadioEvent>>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match client {
        Some(client) => client.read().await,
        None => std::future::pending().await,
    }
}

async fn timer_fired(timer: Option<&mut Timer>) -> Result<()> {
    match timer {
        Some(timer) => timer.fired().await,
        None => std::future::pending().await,
    }
}

async fn keyer_fired(keyer: Option<&mut KeyerScheduler>) -> Result<()> {
    match keyer {
        Some(keyer) => keyer.fired().await,
        None => std::future::pending().await,
    }
}

/// The CAT client, or `None` after telling the operator CAT is off
fn client_or_report<'a, T>(
    cat: &'a mut Option<CatSession<T>>,
    display: &mut dyn Display,
) -> Option<&'a mut CatClient<T>> {
    match cat.as_mut() {
        Some(session) => Some(&mut session.client),
        None => {
            display.print("CAT disabled");
            None
        }
    }
}

/// Single-task dispatcher for operator input, the CAT link and the timers
pub struct Reactor<T> {
    ui_rx: mpsc::Receiver<UiEvent>,
    display: Box<dyn Display>,
    cat: Option<CatSession<T>>,
    keyer: Option<KeyerScheduler>,
    contest: Contest,
}

impl<T> Reactor<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// A reactor with no radio, no keyer and no contest support
    pub fn new(ui_rx: mpsc::Receiver<UiEvent>, display: Box<dyn Display>) -> Self {
        Self {
            ui_rx,
            display,
            cat: None,
            keyer: None,
            contest: Contest::default(),
        }
    }

    pub fn with_cat(mut self, session: CatSession<T>) -> Self {
        self.cat = Some(session);
        self
    }

    pub fn with_keyer(mut self, keyer: KeyerScheduler) -> Self {
        self.keyer = Some(keyer);
        self
    }

    pub fn with_contest(mut self, contest: Contest) -> Self {
        self.contest = contest;
        self
    }

    /// Run until the operator quits. Any error is fatal.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "reactor started (cat: {}, keyer: {}, log: {})",
            self.cat.is_some(),
            self.keyer.is_some(),
            self.contest.can_log()
        );

        loop {
            let mut serviced = SourceSet::default();
            let mut block = true;
            while let Some(wake) = self.next_wake(serviced, block).await {
                serviced.insert(wake.source());
                block = false;
                if self.dispatch(wake).await?.is_break() {
                    info!("reactor stopped");
                    return Ok(());
                }
            }
        }
    }

    /// Highest-priority ready source not yet serviced. With `block` unset,
    /// `None` means nothing else is ready.
    async fn next_wake(&mut self, serviced: SourceSet, block: bool) -> Option<Wake> {
        let Self {
            ui_rx, cat, keyer, ..
        } = self;
        let (client, poll, timeout) = match cat.as_mut() {
            Some(session) => (
                Some(&mut session.client),
                Some(&mut session.poll),
                Some(&mut session.timeout),
            ),
            None => (None, None, None),
        };

        tokio::select! {
            biased;
            event = ui_rx.recv(), if !serviced.contains(Source::Ui) => Some(Wake::Ui(event)),
            result = read_cat(client), if !serviced.contains(Source::Cat) => Some(Wake::Cat(result)),
            result = keyer_fired(keyer.as_mut()), if !serviced.contains(Source::Keyer) => {
                Some(Wake::Keyer(result))
            }
            result = timer_fired(poll), if !serviced.contains(Source::MeterPoll) => {
                Some(Wake::MeterPoll(result))
            }
            result = timer_fired(timeout), if !serviced.contains(Source::CatTimeout) => {
                Some(Wake::CatTimeout(result))
            }
            _ = std::future::ready(()), if !block => None,
            else => None,
        }
    }

    async fn dispatch(&mut self, wake: Wake) -> Result<ControlFlow<()>> {
        match wake {
            Wake::Ui(None) => {
                debug!("operator input closed");
                return Ok(ControlFlow::Break(()));
            }
            Wake::Ui(Some(event)) => return self.handle_ui(event).await,
            Wake::Cat(events) => self.handle_radio_events(events?).await?,
            Wake::Keyer(fired) => {
                fired?;
                if let Some(keyer) = self.keyer.as_mut() {
                    keyer.advance()?;
                }
            }
            Wake::MeterPoll(fired) => {
                fired?;
                if let Some(session) = self.cat.as_mut() {
                    session.sweep.on_poll(&mut session.client).await?;
                }
            }
            Wake::CatTimeout(fired) => {
                fired?;
                let ms = self.cat.as_ref().map_or(0, CatSession::timeout_ms);
                return Err(EngineError::Timeout(ms));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn handle_radio_events(&mut self, events: Vec<RadioEvent>) -> Result<()> {
        let Self {
            display,
            cat,
            contest,
            ..
        } = self;
        let Some(session) = cat.as_mut() else {
            return Ok(());
        };

        for event in &events {
            display.radio_event(event);
            if let RadioEvent::MeterSample { .. } = event {
                if let Some(samples) = session.sweep.on_sample(event, &mut session.client).await? {
                    display.meters_updated(&MeterReport {
                        samples,
                        frequency_hz: session.sequencer.last_frequency(),
                        mode: session.sequencer.last_mode(),
                    });
                    session.sweep.rearm();
                }
            } else {
                let lines = session
                    .sequencer
                    .on_event(event, &mut session.client, contest)
                    .await?;
                for line in lines {
                    display.print(&line);
                }
            }
        }
        Ok(())
    }

    async fn handle_ui(&mut self, event: UiEvent) -> Result<ControlFlow<()>> {
        debug!("ui event {:?}", event);
        match event {
            UiEvent::Quit => return Ok(ControlFlow::Break(())),
            UiEvent::Tune(delta) => self.schedule(ScheduledOperation::FrequencyAdjust(delta)).await?,
            UiEvent::ResetFrequency => self.schedule(ScheduledOperation::FrequencyAdjust(0)).await?,
            UiEvent::Bandwidth(direction) => {
                self.schedule(ScheduledOperation::BandwidthStep(direction)).await?
            }
            UiEvent::SelectBand(band) => {
                if let Some(client) = client_or_report(&mut self.cat, self.display.as_mut()) {
                    client.set_band(band).await?;
                    self.display.print(&format!("Selecting {band} band"));
                }
            }
            UiEvent::SelectMode(mode) => {
                if let Some(client) = client_or_report(&mut self.cat, self.display.as_mut()) {
                    client.set_mode(mode).await?;
                    self.display.print(&format!("Selecting {mode}"));
                }
            }
            UiEvent::SetFanMode(fan) => {
                if let Some(client) = client_or_report(&mut self.cat, self.display.as_mut()) {
                    client.set_fan_mode(fan).await?;
                    self.display.print(&format!("Selecting {fan:?} fan mode"));
                }
            }
            UiEvent::SwapVfo => {
                if let Some(client) = client_or_report(&mut self.cat, self.display.as_mut()) {
                    client.swap_vfo().await?;
                    self.display.print("Swapping VFO");
                }
            }
            UiEvent::ZeroIn => {
                let from = self.cat.as_ref().and_then(|s| s.sequencer.last_frequency());
                if let Some(client) = client_or_report(&mut self.cat, self.display.as_mut()) {
                    client.zero_in().await?;
                    match from {
                        Some(hz) => self
                            .display
                            .print(&format!("Zeroing in from {}", format_frequency(hz))),
                        None => self.display.print("Zeroing in"),
                    }
                }
            }
            UiEvent::ShowPresets => self.show_presets(),
            UiEvent::SendPreset(key) => self.send_preset(key),
            UiEvent::ShowExchange => match self.contest.current_exchange() {
                Ok(exchange) => self.display.print(&format!("Next exchange: {exchange}")),
                Err(_) => self.display.print("Exchange support disabled"),
            },
            UiEvent::CheckCall(call) => {
                let call = call.to_uppercase();
                let line = match self.contest.is_logged(&call)? {
                    Some(true) => format!("Callsign {call} already in log"),
                    Some(false) => format!("Callsign {call} not in log"),
                    None => "Cannot check call -- logging disabled".to_string(),
                };
                self.display.print(&line);
            }
            UiEvent::FreezeTime => {
                self.contest.freeze_time();
                self.display.print("Time frozen for the next log entry");
            }
            UiEvent::Log {
                call,
                report,
                exchange,
            } => self.log_qso(call, report, exchange).await?,
            UiEvent::SendText(text) => match self.keyer.as_mut() {
                Some(keyer) => match keyer.send(&text) {
                    Ok(()) => self.display.print(&format!("Sending text: {text}")),
                    Err(e) => self.display.print(&e.to_string()),
                },
                None => self.display.print("Cannot send text -- keyer support disabled"),
            },
            UiEvent::WpmUp => self.change_speed(KeyerScheduler::wpm_up),
            UiEvent::WpmDown => self.change_speed(KeyerScheduler::wpm_down),
            UiEvent::AbortSending => match self.keyer.as_mut() {
                Some(keyer) if keyer.is_sending() => {
                    keyer.abort();
                    self.display.print("Sending aborted");
                }
                _ => self
                    .display
                    .print("Cannot abort sending -- keyer is not sending"),
            },
        }
        Ok(ControlFlow::Continue(()))
    }

    fn change_speed(&mut self, step: fn(&mut KeyerScheduler) -> u32) {
        match self.keyer.as_mut() {
            Some(keyer) => {
                let wpm = step(keyer);
                self.display.print(&format!("Keyer speed: {wpm} WPM"));
            }
            None => self.display.print("Keyer support disabled"),
        }
    }

    async fn schedule(&mut self, op: ScheduledOperation) -> Result<()> {
        let Some(session) = self.cat.as_mut() else {
            self.display.print("CAT disabled");
            return Ok(());
        };
        if session.sequencer.start(op, &mut session.client).await? == Admission::Busy {
            self.display.print(&UserError::Busy.to_string());
        }
        Ok(())
    }

    fn show_presets(&mut self) {
        let (Some(presets), Ok(exchange)) =
            (self.contest.presets.as_ref(), self.contest.current_exchange())
        else {
            self.display.print("Preset support disabled");
            return;
        };
        self.display
            .print(&format!("Number of presets: {PRESET_COUNT}"));
        for (key, text) in presets.list(&exchange) {
            self.display.print(&format!("Preset #{key}: {text}"));
        }
    }

    fn send_preset(&mut self, key: u8) {
        let (Some(presets), Ok(exchange), Some(keyer)) = (
            self.contest.presets.as_ref(),
            self.contest.current_exchange(),
            self.keyer.as_mut(),
        ) else {
            self.display
                .print("Cannot send preset -- preset or keyer support disabled");
            return;
        };
        let sent = presets
            .for_key(key, &exchange)
            .and_then(|text| keyer.send(&text).map(|()| text));
        match sent {
            Ok(text) => self.display.print(&format!("Sending preset: {text}")),
            Err(e) => self.display.print(&e.to_string()),
        }
    }

    async fn log_qso(
        &mut self,
        call: String,
        report: Option<String>,
        exchange: String,
    ) -> Result<()> {
        let Some(session) = self.cat.as_mut().filter(|_| self.contest.can_log()) else {
            self.display.print("Cannot log -- logging disabled");
            return Ok(());
        };
        if session.sequencer.is_busy() {
            self.display.print(&UserError::Busy.to_string());
            return Ok(());
        }

        let call = call.to_uppercase();
        if self.contest.is_logged(&call)? == Some(true) {
            self.display
                .print(&format!("Warning: call {call} already exists in log"));
        }
        let draft = QsoDraft {
            timestamp: self.contest.take_timestamp(),
            call,
            report,
            exchange: exchange.to_uppercase(),
        };
        session
            .sequencer
            .start(ScheduledOperation::LogQso(draft), &mut session.client)
            .await?;
        Ok(())
    }
}
