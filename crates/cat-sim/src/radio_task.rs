//! Virtual radio actor task
//!
//! Owns a [`VirtualRadio`] and serves it over an async stream. The task uses
//! a select! loop to:
//! - Apply control commands (meter readings, silence, injected bytes)
//! - Read CAT commands from the stream and write the replies back
//! - Stop on shutdown, channel close or stream close

use std::io;

use cat_protocol::Meter;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::VirtualRadio;

/// Commands that can be sent to a virtual radio actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VirtualRadioCommand {
    /// Set the raw reading a meter reports
    SetMeter(Meter, u8),
    /// Switch between receive and transmit meter readings
    SetTransmitting(bool),
    /// Stop (or resume) answering queries
    SetSilent(bool),
    /// Write raw bytes to the stream as if the radio sent them unasked
    Inject(Vec<u8>),
    /// Shutdown the virtual radio actor
    Shutdown,
}

/// Run the virtual radio actor task
///
/// Returns the radio when the task ends, so callers can inspect its final
/// state.
pub async fn run_virtual_radio_task<S>(
    mut stream: S,
    mut radio: VirtualRadio,
    mut cmd_rx: mpsc::Receiver<VirtualRadioCommand>,
) -> io::Result<VirtualRadio>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 1024];
    let mut commands_open = true;

    info!("Starting virtual radio task for {}", radio.id());

    loop {
        tokio::select! {
            biased;

            // control commands first so they apply before the bytes that follow them
            cmd = cmd_rx.recv(), if commands_open => {
                match cmd {
                    Some(VirtualRadioCommand::SetMeter(meter, raw)) => radio.set_meter(meter, raw),
                    Some(VirtualRadioCommand::SetTransmitting(tx)) => radio.set_transmitting(tx),
                    Some(VirtualRadioCommand::SetSilent(silent)) => radio.set_silent(silent),
                    Some(VirtualRadioCommand::Inject(bytes)) => {
                        radio.inject(bytes);
                        flush_output(&mut stream, &mut radio).await?;
                    }
                    Some(VirtualRadioCommand::Shutdown) => {
                        info!("Shutdown requested for virtual radio {}", radio.id());
                        break;
                    }
                    None => {
                        // keep serving the stream without a controller
                        debug!("Command channel closed for virtual radio {}", radio.id());
                        commands_open = false;
                    }
                }
            }

            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual radio stream closed for {}", radio.id());
                        break;
                    }
                    Ok(n) => {
                        radio.process_bytes(&buf[..n]);
                        flush_output(&mut stream, &mut radio).await?;
                    }
                    Err(e) => {
                        warn!("Virtual radio {} stream error: {}", radio.id(), e);
                        return Err(e);
                    }
                }
            }
        }
    }

    info!("Virtual radio task ended: {}", radio.state_summary());
    Ok(radio)
}

async fn flush_output<S>(stream: &mut S, radio: &mut VirtualRadio) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    if !radio.has_output() {
        return Ok(());
    }
    while let Some(bytes) = radio.take_output() {
        stream.write_all(&bytes).await?;
    }
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;

    use super::*;

    async fn read_reply(stream: &mut tokio::io::DuplexStream, len: usize) -> String {
        let mut buf = vec![0u8; len];
        tokio::time::timeout(Duration::from_millis(100), stream.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_virtual_radio_answers_queries() {
        let (mut link, radio_stream) = tokio::io::duplex(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_virtual_radio_task(
            radio_stream,
            VirtualRadio::new("Test"),
            cmd_rx,
        ));

        link.write_all(b"FA;").await.unwrap();
        assert_eq!(read_reply(&mut link, 12).await, "FA014025000;");

        link.write_all(b"FA007012000;MD0;").await.unwrap();
        assert_eq!(read_reply(&mut link, 5).await, "MD03;");

        cmd_tx.send(VirtualRadioCommand::Shutdown).await.unwrap();
        let radio = task.await.unwrap().unwrap();
        assert_eq!(radio.frequency_hz(), 7_012_000);
    }

    #[tokio::test]
    async fn test_meter_commands_and_injection() {
        let (mut link, radio_stream) = tokio::io::duplex(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_virtual_radio_task(
            radio_stream,
            VirtualRadio::new("Test"),
            cmd_rx,
        ));

        cmd_tx
            .send(VirtualRadioCommand::SetMeter(Meter::Sig, 7))
            .await
            .unwrap();
        link.write_all(b"RM1;").await.unwrap();
        assert_eq!(read_reply(&mut link, 7).await, "RM1007;");

        cmd_tx
            .send(VirtualRadioCommand::Inject(b"?;".to_vec()))
            .await
            .unwrap();
        assert_eq!(read_reply(&mut link, 2).await, "?;");

        drop(link);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_task_survives_dropped_controller() {
        let (mut link, radio_stream) = tokio::io::duplex(1024);
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let task = tokio::spawn(run_virtual_radio_task(
            radio_stream,
            VirtualRadio::new("Test"),
            cmd_rx,
        ));
        drop(cmd_tx);

        link.write_all(b"SH0;").await.unwrap();
        assert_eq!(read_reply(&mut link, 6).await, "SH014;");

        drop(link);
        assert!(task.await.unwrap().is_ok());
    }
}
