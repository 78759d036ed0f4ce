//! Newline-delimited JSON over byte streams
//!
//! [`LineTransport`] writes one payload per line and spawns a reader task
//! that decodes each inbound line and hands it to the [`Inbound`] callback.
//! Undecodable or oversized lines are logged and dropped.

use crate::codec::{decode_frame, encode_frame, Frame, FrameReader};
use crate::{Inbound, Transport, TransportError};
use async_trait::async_trait;
use conduit_config::TransportConfig;
use conduit_protocol::Payload;
use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// How long a child process gets to exit on its own after its stdin closes.
const CHILD_EXIT_GRACE: Duration = Duration::from_millis(500);

pub struct LineTransport {
    writer: Mutex<Option<BoxedWriter>>,
    max_frame_bytes: usize,
    cancel: CancellationToken,
    reader: parking_lot::Mutex<Option<JoinHandle<()>>>,
    child: Mutex<Option<Child>>,
}

impl LineTransport {
    /// Build over a reader/writer pair with default limits. Must be called
    /// inside a Tokio runtime.
    pub fn new<R, W>(reader: R, writer: W, inbound: Inbound) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_config(reader, writer, inbound, &TransportConfig::default())
    }

    pub fn with_config<R, W>(reader: R, writer: W, inbound: Inbound, config: &TransportConfig) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::start(reader, writer, inbound, config, None)
    }

    fn start<R, W>(reader: R, writer: W, inbound: Inbound, config: &TransportConfig, child: Option<Child>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(read_loop(
            FrameReader::new(reader, config.max_frame_bytes),
            inbound,
            cancel.clone(),
        ));
        debug!(max_frame_bytes = config.max_frame_bytes, "Line transport started");

        Self {
            writer: Mutex::new(Some(Box::new(writer))),
            max_frame_bytes: config.max_frame_bytes,
            cancel,
            reader: parking_lot::Mutex::new(Some(handle)),
            child: Mutex::new(child),
        }
    }

    /// Spawn `program` and talk to it over its stdin/stdout. Its stderr is
    /// inherited.
    pub fn spawn_process<I, S>(program: impl AsRef<OsStr>, args: I, inbound: Inbound) -> Result<Self, TransportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self::spawn_process_with_config(program, args, inbound, &TransportConfig::default())
    }

    pub fn spawn_process_with_config<I, S>(
        program: impl AsRef<OsStr>,
        args: I,
        inbound: Inbound,
        config: &TransportConfig,
    ) -> Result<Self, TransportError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = program.as_ref();
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        debug!(program = ?program, pid = ?child.id(), "Spawned child process");

        Ok(Self::start(stdout, stdin, inbound, config, Some(child)))
    }
}

fn missing_pipe(name: &str) -> TransportError {
    TransportError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("child process {} is not available", name),
    ))
}

async fn read_loop<R>(mut frames: FrameReader<R>, inbound: Inbound, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = frames.next_frame() => next,
        };

        match next {
            Ok(Some(frame @ Frame::Line(_))) if frame.is_blank() => continue,
            Ok(Some(Frame::Line(line))) => match decode_frame(&line) {
                Ok(value) => {
                    trace!(bytes = line.len(), "Received frame");
                    inbound.deliver(value);
                }
                Err(e) => warn!(error = %e, "Dropping undecodable inbound frame"),
            },
            Ok(Some(Frame::Oversized(len))) => {
                warn!(len, "Dropping oversized inbound frame");
            }
            Ok(None) => {
                debug!("Line transport reached end of stream");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Line transport read failed");
                break;
            }
        }
    }
}

#[async_trait]
impl Transport for LineTransport {
    async fn send(&self, payload: Payload) -> Result<(), TransportError> {
        let line = encode_frame(&payload, self.max_frame_bytes)?;
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn stop(&self) {
        self.cancel.cancel();

        let reader = self.reader.lock().take();
        if let Some(reader) = reader {
            let _ = reader.await;
        }

        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "Writer shutdown failed");
            }
        }

        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(CHILD_EXIT_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "Child process exited"),
                Ok(Err(e)) => warn!(error = %e, "Failed to wait for child process"),
                Err(_) => {
                    warn!("Child process did not exit, killing it");
                    let _ = child.kill().await;
                }
            }
        }

        debug!("Line transport stopped");
    }
}
