//! Multi-step CAT operations
//!
//! Some operator requests need the radio's current state before they can
//! issue a set command: tuning reads the frequency, stepping the filter
//! reads the width, logging reads frequency then mode. The sequencer holds
//! the one operation in flight and advances it as replies arrive.
//!
//! Only one operation may be in flight. [`OperationSequencer::start`]
//! answers [`Admission::Busy`] instead of queueing a second one.

use std::sync::Arc;

use cat_protocol::{Direction, OperatingMode, ProtocolError, RadioEvent};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::band_plan::BandPlan;
use crate::client::CatClient;
use crate::contest::{Contest, QsoDraft};
use crate::error::Result;
use crate::events::format_frequency;

/// An operation the operator asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledOperation {
    /// Tune by a signed offset; zero means jump to the band's lower edge
    FrequencyAdjust(i32),
    BandwidthStep(Direction),
    LogQso(QsoDraft),
}

/// Whether [`OperationSequencer::start`] accepted the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Started,
    Busy,
}

#[derive(Debug)]
enum Stage {
    AdjustFrequency(i32),
    StepBandwidth(Direction),
    LogAwaitingFrequency(QsoDraft),
    LogAwaitingMode { draft: QsoDraft, frequency_hz: u32 },
}

/// Target frequency after applying `delta` to `current`, clamped to the
/// edges of the band containing `current`. A zero delta selects the lower
/// edge. `None` if no band contains `current`.
pub fn adjusted_frequency(plan: &dyn BandPlan, current: u32, delta: i32) -> Option<u32> {
    let band = plan.band_for(current)?;
    let (min, max) = plan.limits(band)?;
    if delta == 0 {
        return Some(min);
    }
    let target = i64::from(current) + i64::from(delta);
    Some(target.clamp(i64::from(min), i64::from(max)) as u32)
}

/// Runs one compound operation at a time
pub struct OperationSequencer {
    stage: Option<Stage>,
    band_plan: Arc<dyn BandPlan>,
    last_frequency: Option<u32>,
    last_mode: Option<OperatingMode>,
}

impl OperationSequencer {
    pub fn new(band_plan: Arc<dyn BandPlan>) -> Self {
        Self {
            stage: None,
            band_plan,
            last_frequency: None,
            last_mode: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.stage.is_some()
    }

    /// Most recent frequency read from or written to the radio
    pub fn last_frequency(&self) -> Option<u32> {
        self.last_frequency
    }

    /// Most recent mode read from the radio
    pub fn last_mode(&self) -> Option<OperatingMode> {
        self.last_mode
    }

    /// Issue the first query of `op`
    pub async fn start<T>(
        &mut self,
        op: ScheduledOperation,
        client: &mut CatClient<T>,
    ) -> Result<Admission>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        if self.is_busy() {
            debug!("refusing {:?}, {:?} still pending", op, self.stage);
            return Ok(Admission::Busy);
        }

        let stage = match op {
            ScheduledOperation::FrequencyAdjust(delta) => {
                client.get_frequency().await?;
                Stage::AdjustFrequency(delta)
            }
            ScheduledOperation::BandwidthStep(direction) => {
                client.get_bandwidth().await?;
                Stage::StepBandwidth(direction)
            }
            ScheduledOperation::LogQso(draft) => {
                client.get_frequency().await?;
                Stage::LogAwaitingFrequency(draft)
            }
        };
        self.stage = Some(stage);
        Ok(Admission::Started)
    }

    /// Advance the pending operation with a frequency, mode or bandwidth
    /// reply. Returns status lines for the operator.
    ///
    /// A reply the pending operation is not waiting for is a protocol error.
    pub async fn on_event<T>(
        &mut self,
        event: &RadioEvent,
        client: &mut CatClient<T>,
        contest: &mut Contest,
    ) -> Result<Vec<String>>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        match event {
            RadioEvent::Frequency(hz) => self.last_frequency = Some(*hz),
            RadioEvent::Mode(mode) => self.last_mode = Some(*mode),
            _ => {}
        }

        match (self.stage.take(), event) {
            (Some(Stage::AdjustFrequency(delta)), RadioEvent::Frequency(hz)) => {
                let target = adjusted_frequency(self.band_plan.as_ref(), *hz, delta)
                    .ok_or_else(|| {
                        ProtocolError::Unencodable(format!("no band contains {hz} Hz"))
                    })?;
                client.set_frequency(target).await?;
                self.last_frequency = Some(target);
                Ok(vec![format!("Frequency: {}", format_frequency(target))])
            }
            (Some(Stage::StepBandwidth(direction)), RadioEvent::Bandwidth(hz)) => {
                let target = client.widths().step(*hz, direction);
                client.set_bandwidth(target).await?;
                Ok(vec![format!("Bandwidth: {} Hz", target)])
            }
            (Some(Stage::LogAwaitingFrequency(draft)), RadioEvent::Frequency(hz)) => {
                client.get_mode().await?;
                self.stage = Some(Stage::LogAwaitingMode {
                    draft,
                    frequency_hz: *hz,
                });
                Ok(Vec::new())
            }
            (Some(Stage::LogAwaitingMode { draft, frequency_hz }), RadioEvent::Mode(mode)) => {
                contest.record(draft, frequency_hz, *mode)
            }
            (stage, event) => {
                debug!("reply {:?} does not advance {:?}", event, stage);
                Err(ProtocolError::Unsolicited(event.kind()).into())
            }
        }
    }
}


#[cfg(test)]
mod proptest_tests {
    use cat_protocol::Band;
    use proptest::prelude::*;

    use super::*;
    use crate::band_plan::StaticBandPlan;

    const BANDS: [Band; 11] = [
        Band::M160,
        Band::M80,
        Band::M40,
        Band::M30,
        Band::M20,
        Band::M17,
        Band::M15,
        Band::M12,
        Band::M10,
        Band::M6,
        Band::Gen,
    ];

    /// A frequency somewhere inside one of the plan's bands
    fn in_some_band() -> impl Strategy<Value = u32> {
        (prop::sample::select(BANDS.to_vec()), 0.0f64..=1.0).prop_map(|(band, frac)| {
            let (min, max) = StaticBandPlan::iaru_region1().limits(band).unwrap();
            min + (f64::from(max - min) * frac) as u32
        })
    }

    proptest! {
        #[test]
        fn adjusted_frequency_stays_in_band(
            current in in_some_band(),
            delta in -1_000_000i32..=1_000_000,
        ) {
            prop_assume!(delta != 0);
            let plan = StaticBandPlan::iaru_region1();
            let band = plan.band_for(current).unwrap();
            let (min, max) = plan.limits(band).unwrap();

            let target = adjusted_frequency(&plan, current, delta).unwrap();
            prop_assert!((min..=max).contains(&target));
            let unclamped = i64::from(current) + i64::from(delta);
            if (i64::from(min)..=i64::from(max)).contains(&unclamped) {
                prop_assert_eq!(i64::from(target), unclamped);
            }
        }

        #[test]
        fn reset_selects_band_minimum(current in in_some_band()) {
            let plan = StaticBandPlan::iaru_region1();
            let band = plan.band_for(current).unwrap();
            let (min, _) = plan.limits(band).unwrap();
            prop_assert_eq!(adjusted_frequency(&plan, current, 0), Some(min));
        }
    }
}
