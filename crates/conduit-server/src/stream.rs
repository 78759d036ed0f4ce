//! Line-delimited server loop

use crate::Dispatcher;
use conduit_config::TransportConfig;
use conduit_protocol::Payload;
use conduit_transport::{encode_frame, Frame, FrameReader};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Serve newline-delimited JSON-RPC from `reader`, writing replies to
/// `writer`, until the reader reaches end of stream.
///
/// Each line is dispatched as raw text, so a line that is not JSON gets a
/// parse error reply. Lines are handled concurrently; replies are written
/// one whole line at a time in completion order.
pub async fn serve_stream<R, W, C>(
    reader: R,
    writer: W,
    dispatcher: &Dispatcher<C>,
    context: Option<&C>,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    serve_stream_with_config(reader, writer, dispatcher, context, &TransportConfig::default()).await
}

pub async fn serve_stream_with_config<R, W, C>(
    reader: R,
    mut writer: W,
    dispatcher: &Dispatcher<C>,
    context: Option<&C>,
    config: &TransportConfig,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut frames = FrameReader::new(reader, config.max_frame_bytes);
    let mut in_flight = FuturesUnordered::new();
    let mut reading = true;
    debug!("Serving stream");

    loop {
        tokio::select! {
            frame = frames.next_frame(), if reading => match frame? {
                None => {
                    debug!(pending = in_flight.len(), "Input closed");
                    reading = false;
                }
                Some(Frame::Oversized(len)) => warn!(len, "Dropping oversized request line"),
                Some(frame) if frame.is_blank() => {}
                Some(Frame::Line(line)) => in_flight.push(dispatcher.handle(line, context)),
            },
            Some(reply) = in_flight.next(), if !in_flight.is_empty() => {
                if let Some(payload) = reply {
                    write_reply(&mut writer, &payload, config.max_frame_bytes).await?;
                }
            },
            else => break,
        }
    }

    writer.flush().await?;
    debug!("Stream closed");
    Ok(())
}

async fn write_reply<W>(writer: &mut W, payload: &Payload, limit: usize) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match encode_frame(payload, limit) {
        Ok(line) => {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        Err(e) => {
            warn!(error = %e, "Dropping reply that cannot be framed");
            Ok(())
        }
    }
}
