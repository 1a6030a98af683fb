//! CAT client with reply correlation
//!
//! The radio answers queries strictly in order and without transaction
//! ids, so the client keeps a FIFO of the reply kinds it is waiting for.
//! Every query pushes its kind before the bytes go out; every decoded reply
//! must match the head of the queue. The reply timeout is armed whenever
//! the queue goes from empty to non-empty and disarmed when it drains.

use std::collections::VecDeque;

use cat_protocol::yaesu_ascii::YaesuAsciiCodec;
use cat_protocol::{
    Band, CatCommand, EncodeCommand, EventKind, FanMode, Meter, OperatingMode, ProtocolCodec,
    ProtocolError, RadioEvent, WidthTable,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::{EngineError, Result};
use crate::timer::TimerHandle;

const READ_BUF_SIZE: usize = 1024;

/// Request/response client over an async byte stream
pub struct CatClient<T> {
    io: T,
    codec: YaesuAsciiCodec,
    expected: VecDeque<EventKind>,
    timeout: TimerHandle,
    read_buf: Box<[u8; READ_BUF_SIZE]>,
}

impl<T> CatClient<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a client that arms `timeout` while replies are outstanding
    pub fn new(io: T, widths: WidthTable, timeout: TimerHandle) -> Self {
        Self {
            io,
            codec: YaesuAsciiCodec::with_widths(widths),
            expected: VecDeque::new(),
            timeout,
            read_buf: Box::new([0u8; READ_BUF_SIZE]),
        }
    }

    /// Reply kinds still outstanding, oldest first
    pub fn expected(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.expected.iter().copied()
    }

    pub fn has_outstanding(&self) -> bool {
        !self.expected.is_empty()
    }

    pub fn widths(&self) -> &WidthTable {
        self.codec.widths()
    }

    pub async fn get_meter(&mut self, meter: Meter) -> Result<()> {
        self.send(CatCommand::GetMeter(meter)).await
    }

    pub async fn get_frequency(&mut self) -> Result<()> {
        self.send(CatCommand::GetFrequency).await
    }

    pub async fn set_frequency(&mut self, hz: u32) -> Result<()> {
        self.send(CatCommand::SetFrequency(hz)).await
    }

    pub async fn get_mode(&mut self) -> Result<()> {
        self.send(CatCommand::GetMode).await
    }

    pub async fn set_mode(&mut self, mode: OperatingMode) -> Result<()> {
        self.send(CatCommand::SetMode(mode)).await
    }

    pub async fn get_bandwidth(&mut self) -> Result<()> {
        self.send(CatCommand::GetWidth).await
    }

    /// Set the filter width; `hz` must be an entry of the width table
    pub async fn set_bandwidth(&mut self, hz: u32) -> Result<()> {
        let index = self.codec.widths().index_for_hz(hz).ok_or_else(|| {
            ProtocolError::Unencodable(format!("{hz} Hz is not a selectable width"))
        })?;
        self.send(CatCommand::SetWidth(index)).await
    }

    pub async fn set_band(&mut self, band: Band) -> Result<()> {
        self.send(CatCommand::SetBand(band)).await
    }

    pub async fn set_fan_mode(&mut self, mode: FanMode) -> Result<()> {
        self.send(CatCommand::SetFanMode(mode)).await
    }

    pub async fn swap_vfo(&mut self) -> Result<()> {
        self.send(CatCommand::SwapVfo).await
    }

    pub async fn zero_in(&mut self) -> Result<()> {
        self.send(CatCommand::ZeroIn).await
    }

    async fn send(&mut self, cmd: CatCommand) -> Result<()> {
        if let Some(kind) = cmd.expected_reply() {
            if self.expected.is_empty() {
                self.timeout.start();
            }
            self.expected.push_back(kind);
            debug!("expecting {:?} reply ({} outstanding)", kind, self.expected.len());
        }

        let bytes = cmd.encode();
        trace!("CAT >> {}", String::from_utf8_lossy(&bytes));
        self.io.write_all(&bytes).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Read whatever the radio sent and decode every complete frame.
    ///
    /// The whole batch is decoded before any reply is matched against the
    /// queue. Cancel safe: nothing is consumed until the read completes.
    pub async fn read(&mut self) -> Result<Vec<RadioEvent>> {
        let n = self.io.read(&mut self.read_buf[..]).await?;
        if n == 0 {
            return Err(EngineError::LinkClosed);
        }
        trace!("CAT << {}", String::from_utf8_lossy(&self.read_buf[..n]));
        self.codec.push_bytes(&self.read_buf[..n]);

        let mut events = Vec::new();
        while let Some(frame) = self.codec.next_frame() {
            let event = self.codec.decode(&frame).map_err(ProtocolError::from)?;
            events.push(event);
        }
        self.codec.check_overrun().map_err(ProtocolError::from)?;

        for event in &events {
            self.match_reply(event)?;
        }
        Ok(events)
    }

    fn match_reply(&mut self, event: &RadioEvent) -> Result<()> {
        if let RadioEvent::ProtocolError(message) = event {
            return Err(ProtocolError::Rejected(message.clone()).into());
        }

        let actual = event.kind();
        match self.expected.front() {
            None => return Err(ProtocolError::Unsolicited(actual).into()),
            Some(&expected) if expected != actual => {
                return Err(ProtocolError::UnexpectedReply { expected, actual }.into());
            }
            Some(_) => {}
        }

        self.expected.pop_front();
        if self.expected.is_empty() {
            self.timeout.disarm();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cat_protocol::ParseError;
    use tokio::io::{duplex, DuplexStream};

    use super::*;
    use crate::timer::Timer;

    fn client() -> (CatClient<DuplexStream>, DuplexStream, Timer) {
        let timer = Timer::new(Duration::from_millis(2000));
        let (ours, theirs) = duplex(1024);
        (
            CatClient::new(ours, WidthTable::default(), timer.handle()),
            theirs,
            timer,
        )
    }

    async fn read_sent(radio: &mut DuplexStream, len: usize) -> String {
        let mut buf = vec![0u8; len];
        radio.read_exact(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_get_pushes_expectation_and_arms_timeout() {
        let (mut cat, mut radio, timer) = client();
        assert!(!timer.is_armed());

        cat.get_frequency().await.unwrap();
        assert_eq!(read_sent(&mut radio, 3).await, "FA;");
        assert_eq!(cat.expected().collect::<Vec<_>>(), vec![EventKind::Frequency]);
        assert!(timer.is_armed());

        cat.get_mode().await.unwrap();
        assert_eq!(
            cat.expected().collect::<Vec<_>>(),
            vec![EventKind::Frequency, EventKind::Mode]
        );
    }

    #[tokio::test]
    async fn test_set_commands_expect_nothing() {
        let (mut cat, mut radio, timer) = client();
        cat.set_frequency(7_030_000).await.unwrap();
        cat.swap_vfo().await.unwrap();
        cat.zero_in().await.unwrap();
        assert_eq!(read_sent(&mut radio, 18).await, "FA007030000;SV;ZI;");
        assert!(!cat.has_outstanding());
        assert!(!timer.is_armed());
    }

    #[tokio::test]
    async fn test_replies_drain_queue_and_disarm() {
        let (mut cat, mut radio, timer) = client();
        cat.get_frequency().await.unwrap();
        cat.get_mode().await.unwrap();

        radio.write_all(b"FA014074000;MD0C;").await.unwrap();
        let events = cat.read().await.unwrap();
        assert_eq!(
            events,
            vec![
                RadioEvent::Frequency(14_074_000),
                RadioEvent::Mode(OperatingMode::DataU)
            ]
        );
        assert!(!cat.has_outstanding());
        assert!(!timer.is_armed());
    }

    #[tokio::test]
    async fn test_partial_reply_keeps_timeout_armed() {
        let (mut cat, mut radio, timer) = client();
        cat.get_meter(Meter::Idd).await.unwrap();

        radio.write_all(b"RM70").await.unwrap();
        assert!(cat.read().await.unwrap().is_empty());
        assert!(timer.is_armed());

        radio.write_all(b"00;").await.unwrap();
        let events = cat.read().await.unwrap();
        assert_eq!(
            events,
            vec![RadioEvent::MeterSample {
                meter: Meter::Idd,
                raw: 0
            }]
        );
        assert!(!timer.is_armed());
    }

    #[tokio::test]
    async fn test_mismatched_reply_is_fatal() {
        let (mut cat, mut radio, _timer) = client();
        cat.get_frequency().await.unwrap();
        radio.write_all(b"MD02;").await.unwrap();

        let err = cat.read().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Protocol(ProtocolError::UnexpectedReply {
                expected: EventKind::Frequency,
                actual: EventKind::Mode
            })
        ));
    }

    #[tokio::test]
    async fn test_unsolicited_reply_is_fatal() {
        let (mut cat, mut radio, _timer) = client();
        radio.write_all(b"FA007000000;").await.unwrap();
        let err = cat.read().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Protocol(ProtocolError::Unsolicited(EventKind::Frequency))
        ));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_fatal() {
        let (mut cat, mut radio, _timer) = client();
        cat.get_frequency().await.unwrap();
        radio.write_all(b"FA7000000;").await.unwrap();
        assert!(matches!(
            cat.read().await.unwrap_err(),
            EngineError::Protocol(ProtocolError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_command_is_fatal() {
        let (mut cat, mut radio, _timer) = client();
        cat.get_mode().await.unwrap();
        radio.write_all(b"?;").await.unwrap();
        assert!(matches!(
            cat.read().await.unwrap_err(),
            EngineError::Protocol(ProtocolError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_unterminated_noise_is_fatal() {
        let (mut cat, mut radio, _timer) = client();
        cat.get_frequency().await.unwrap();
        radio.write_all(&[b'x'; 300]).await.unwrap();

        let err = loop {
            match cat.read().await {
                Ok(events) => assert!(events.is_empty()),
                Err(e) => break e,
            }
        };
        assert!(matches!(
            err,
            EngineError::Protocol(ProtocolError::Parse(ParseError::Overrun(_)))
        ));
    }

    #[tokio::test]
    async fn test_eof_is_link_loss() {
        let (mut cat, radio, _timer) = client();
        drop(radio);
        assert!(matches!(cat.read().await, Err(EngineError::LinkClosed)));
    }

    #[tokio::test]
    async fn test_set_bandwidth_encodes_index() {
        let (mut cat, mut radio, _timer) = client();
        cat.set_bandwidth(2400).await.unwrap();
        assert_eq!(read_sent(&mut radio, 6).await, "SH014;");

        assert!(matches!(
            cat.set_bandwidth(2450).await,
            Err(EngineError::Protocol(ProtocolError::Unencodable(_)))
        ));
    }
}
