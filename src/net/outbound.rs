//! Fire-and-forget outbound writes.
//!
//! The driver thread submits whole frames into an unbounded channel; a writer
//! task on the I/O resource group writes and flushes them in order. Dropping
//! the sending side lets the writer drain what is queued and then close the
//! write half.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ClientError, ClientResult};
use crate::net::connection::ClientId;
use crate::observability::metrics;

/// Anything that accepts outbound frames.
pub trait FrameSink {
    /// Queue one outbound write. Does not wait for it to hit the wire.
    fn submit(&self, frame: Vec<u8>) -> ClientResult<()>;
}

/// Handle to the writer task of an installed pipeline.
#[derive(Debug)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    writer: JoinHandle<()>,
}

impl Outbound {
    /// Spawn the writer task. Must be called from within the resource group.
    pub fn spawn<W>(client_id: ClientId, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(client_id, writer, rx));
        Self { tx, writer }
    }

    /// Stop accepting frames and return the writer so the caller can wait for the drain.
    pub fn close(self) -> JoinHandle<()> {
        drop(self.tx);
        self.writer
    }
}

impl FrameSink for Outbound {
    fn submit(&self, frame: Vec<u8>) -> ClientResult<()> {
        self.tx.send(frame).map_err(|_| ClientError::ConnectionClosed)
    }
}

async fn write_loop<W>(client_id: ClientId, mut writer: W, mut rx: mpsc::UnboundedReceiver<Vec<u8>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        let written = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            tracing::warn!(client_id = %client_id, error = %e, "Outbound write failed");
            return;
        }

        tracing::trace!(client_id = %client_id, bytes = frame.len(), "Frame written");
        metrics::record_write(frame.len());
    }

    if let Err(e) = writer.shutdown().await {
        tracing::debug!(client_id = %client_id, error = %e, "Closing write half failed");
    }
}
