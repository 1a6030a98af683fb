//! Periodic meter sweep
//!
//! Each poll starts with the drive current. Zero drive current means the
//! radio is receiving and only the S-meter is read; otherwise the transmit
//! meters are read one after another:
//!
//! ```text
//! IDD = 0:  IDD -> SIG
//! IDD > 0:  IDD -> ALC -> COMP -> PWR -> SWR
//! ```
//!
//! When the chain ends the caller reports the samples and then calls
//! [`MeterSweep::rearm`], so sweeps never overlap.

use cat_protocol::{Meter, ProtocolError, RadioEvent};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{trace, warn};

use crate::client::CatClient;
use crate::error::Result;
use crate::events::MeterSample;
use crate::timer::TimerHandle;

/// Meter read after `meter` in a transmit sweep
fn next_tx_meter(meter: Meter) -> Option<Meter> {
    match meter {
        Meter::Idd => Some(Meter::Alc),
        Meter::Alc => Some(Meter::Comp),
        Meter::Comp => Some(Meter::Pwr),
        Meter::Pwr => Some(Meter::Swr),
        Meter::Swr | Meter::Sig => None,
    }
}

/// Meter-read chain driven by the poll timer
#[derive(Debug)]
pub struct MeterSweep {
    poll: TimerHandle,
    awaiting: Option<Meter>,
    /// Samples kept for the report; the drive current is only kept when
    /// transmitting
    samples: Vec<MeterSample>,
}

impl MeterSweep {
    pub fn new(poll: TimerHandle) -> Self {
        Self {
            poll,
            awaiting: None,
            samples: Vec::with_capacity(5),
        }
    }

    pub fn is_active(&self) -> bool {
        self.awaiting.is_some()
    }

    /// Schedule the next sweep once a finished one has been reported
    pub fn rearm(&self) {
        self.poll.start();
    }

    /// Poll timer fired: start a sweep
    pub async fn on_poll<T>(&mut self, client: &mut CatClient<T>) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        if self.is_active() {
            warn!("meter poll while a sweep is still running, skipping");
            return Ok(());
        }
        self.samples.clear();
        self.request(Meter::Idd, client).await
    }

    /// Feed a meter reply. Returns the finished sample set when the chain
    /// ends; the poll timer stays idle until [`MeterSweep::rearm`].
    pub async fn on_sample<T>(
        &mut self,
        event: &RadioEvent,
        client: &mut CatClient<T>,
    ) -> Result<Option<Vec<MeterSample>>>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let RadioEvent::MeterSample { meter, raw } = *event else {
            return Err(ProtocolError::Unsolicited(event.kind()).into());
        };
        if self.awaiting != Some(meter) {
            return Err(ProtocolError::UnexpectedMeter {
                expected: self.awaiting,
                actual: meter,
            }
            .into());
        }
        trace!("meter {} = {}", meter.name(), raw);

        let next = if meter == Meter::Idd && raw == 0 {
            Some(Meter::Sig)
        } else {
            self.samples.push(MeterSample { meter, raw });
            next_tx_meter(meter)
        };

        match next {
            Some(next) => {
                self.request(next, client).await?;
                Ok(None)
            }
            None => {
                self.awaiting = None;
                Ok(Some(std::mem::take(&mut self.samples)))
            }
        }
    }

    async fn request<T>(&mut self, meter: Meter, client: &mut CatClient<T>) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        client.get_meter(meter).await?;
        self.awaiting = Some(meter);
        Ok(())
    }
}
