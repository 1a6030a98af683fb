//! One-shot rearmable timer backed by a worker task
//!
//! A [`Timer`] owns a tokio task that sleeps until the current deadline and
//! then signals once. The worker only waits and signals; whoever awaits
//! [`Timer::fired`] runs the follow-up work.
//!
//! Control goes through a cloneable [`TimerHandle`] so components that only
//! arm and disarm (the CAT client arming its reply timeout, for instance) do
//! not need access to the receiving side.
//!
//! Every arm starts a new generation and a firing produced by an older
//! generation is dropped when it is received, so only the most recent arm
//! can ever be observed. Disarming cancels a firing the worker has not sent
//! yet. A firing already sent stays pending until [`Timer::fired`] consumes
//! it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

use crate::error::EngineError;

#[derive(Debug)]
enum TimerControl {
    Arm { generation: u64, deadline: Instant },
    Disarm,
}

#[derive(Debug, Default)]
struct TimerState {
    generation: AtomicU64,
    armed: AtomicBool,
}

/// Arm/disarm side of a [`Timer`]
#[derive(Debug, Clone)]
pub struct TimerHandle {
    control_tx: mpsc::UnboundedSender<TimerControl>,
    state: Arc<TimerState>,
    default_interval: Duration,
}

impl TimerHandle {
    /// Arm with `interval`, restarting the count from now
    pub fn arm(&self, interval: Duration) {
        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.armed.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + interval;
        trace!("timer armed for {:?} (generation {})", interval, generation);
        // A closed channel means the worker is gone; Timer::fired reports that
        let _ = self.control_tx.send(TimerControl::Arm {
            generation,
            deadline,
        });
    }

    /// Arm with the timer's default interval
    pub fn start(&self) {
        self.arm(self.default_interval);
    }

    /// Cancel a firing that has not been signalled yet. No-op when not
    /// armed.
    pub fn disarm(&self) {
        if !self.state.armed.swap(false, Ordering::SeqCst) {
            return;
        }
        trace!("timer disarmed");
        let _ = self.control_tx.send(TimerControl::Disarm);
    }

    /// Whether an arm is pending and not yet consumed
    pub fn is_armed(&self) -> bool {
        self.state.armed.load(Ordering::SeqCst)
    }

    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }
}

/// Timer with a private worker task
///
/// Dropping the timer aborts its worker.
#[derive(Debug)]
pub struct Timer {
    handle: TimerHandle,
    fired_rx: mpsc::UnboundedReceiver<u64>,
    worker: JoinHandle<()>,
}

impl Timer {
    /// Spawn a disarmed timer. Must be called inside a tokio runtime.
    pub fn new(default_interval: Duration) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_timer_worker(control_rx, fired_tx));

        Self {
            handle: TimerHandle {
                control_tx,
                state: Arc::new(TimerState::default()),
                default_interval,
            },
            fired_rx,
            worker,
        }
    }

    /// A new control handle for this timer
    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    pub fn arm(&self, interval: Duration) {
        self.handle.arm(interval);
    }

    pub fn start(&self) {
        self.handle.start();
    }

    pub fn disarm(&self) {
        self.handle.disarm();
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_armed()
    }

    /// Wait for the current arm cycle to complete.
    ///
    /// Consumes the firing and leaves the timer disarmed. Firings of
    /// superseded arms are discarded; a firing signalled before a disarm is
    /// still returned. Cancel safe: dropping the future never loses a
    /// current firing.
    pub async fn fired(&mut self) -> Result<(), EngineError> {
        loop {
            let generation = self.fired_rx.recv().await.ok_or(EngineError::TimerStopped)?;
            let state = &self.handle.state;
            if generation == state.generation.load(Ordering::SeqCst) {
                state.armed.store(false, Ordering::SeqCst);
                return Ok(());
            }
            trace!("dropping stale timer firing (generation {})", generation);
        }
    }

    /// Abort the worker and wait for it to finish
    pub async fn shutdown(mut self) {
        self.worker.abort();
        let _ = (&mut self.worker).await;
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_timer_worker(
    mut control_rx: mpsc::UnboundedReceiver<TimerControl>,
    fired_tx: mpsc::UnboundedSender<u64>,
) {
    let mut pending: Option<(u64, Instant)> = None;

    loop {
        let deadline = pending.map(|(_, at)| at);
        tokio::select! {
            control = control_rx.recv() => match control {
                Some(TimerControl::Arm { generation, deadline }) => {
                    pending = Some((generation, deadline));
                }
                Some(TimerControl::Disarm) => pending = None,
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((generation, _)) = pending.take() {
                    if fired_tx.send(generation).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_interval() {
        let mut timer = Timer::new(Duration::from_millis(100));
        let start = Instant::now();
        timer.start();
        assert!(timer.is_armed());

        timer.fired().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_arm() {
        let mut timer = Timer::new(Duration::from_millis(10));
        timer.start();
        timer.fired().await.unwrap();

        let second = tokio::time::timeout(Duration::from_secs(5), timer.fired()).await;
        assert!(second.is_err(), "timer fired without being re-armed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_fires_immediately() {
        let mut timer = Timer::new(Duration::from_millis(100));
        let start = Instant::now();
        timer.arm(Duration::ZERO);
        timer.fired().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_restarts_count() {
        let mut timer = Timer::new(Duration::from_millis(100));
        let start = Instant::now();
        timer.start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        timer.arm(Duration::from_millis(100));

        timer.fired().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(160));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_cancels_firing() {
        let mut timer = Timer::new(Duration::from_millis(50));
        timer.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        timer.disarm();
        assert!(!timer.is_armed());

        let result = tokio::time::timeout(Duration::from_secs(1), timer.fired()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_signalled_firing_survives_disarm() {
        let mut timer = Timer::new(Duration::from_millis(10));
        timer.start();
        // let the worker signal without consuming it
        tokio::time::sleep(Duration::from_millis(20)).await;
        timer.disarm();
        assert!(!timer.is_armed());

        let result = tokio::time::timeout(Duration::from_secs(1), timer.fired()).await;
        assert!(matches!(result, Ok(Ok(()))), "signalled firing was lost");

        // consumed exactly once
        let again = tokio::time::timeout(Duration::from_secs(1), timer.fired()).await;
        assert!(again.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_discards_signalled_firing() {
        let mut timer = Timer::new(Duration::from_millis(10));
        let start = Instant::now();
        timer.start();
        tokio::time::sleep(Duration::from_millis(20)).await;
        timer.arm(Duration::from_millis(100));

        timer.fired().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_when_unarmed_is_noop() {
        let mut timer = Timer::new(Duration::from_millis(10));
        timer.disarm();
        timer.disarm();
        timer.start();
        timer.fired().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_controls_timer() {
        let mut timer = Timer::new(Duration::from_millis(30));
        let handle = timer.handle();
        handle.start();
        assert!(timer.is_armed());
        timer.fired().await.unwrap();
        assert!(!handle.is_armed());
    }

    #[tokio::test]
    async fn test_shutdown_joins_worker() {
        let timer = Timer::new(Duration::from_millis(10));
        let handle = timer.handle();
        timer.shutdown().await;
        // arming a stopped timer is harmless
        handle.start();
    }
}
