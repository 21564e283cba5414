//! Per-connection inbound reader.
//!
//! # Responsibilities
//! - Drain the read half of the connection
//! - Count inbound units (frames or raw bytes)
//! - Settle the threshold-received signal once the configured count is reached
//!
//! The lifecycle never inspects inbound bytes; it only hands this reader the
//! threshold promise and count when the pipeline is installed.

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::InboundUnit;
use crate::error::{ClientError, ClientResult};
use crate::lifecycle::shutdown::ShutdownListener;
use crate::lifecycle::signal::CompletionSignal;
use crate::net::connection::ClientId;
use crate::observability::metrics;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Length of the frame header used by `FrameUnits`.
pub const FRAME_HEADER_LEN: usize = 8;

/// Offset of the big-endian u16 total length inside the header.
const LENGTH_FIELD_OFFSET: usize = 2;

/// Turns a stream of chunks into a count of complete units.
pub trait UnitCounter: Send {
    /// Consume a chunk and return how many units it completed.
    fn feed(&mut self, chunk: &[u8]) -> ClientResult<usize>;
}

/// Every byte is a unit.
#[derive(Debug, Default)]
pub struct ByteUnits;

impl UnitCounter for ByteUnits {
    fn feed(&mut self, chunk: &[u8]) -> ClientResult<usize> {
        Ok(chunk.len())
    }
}

/// Length-prefixed frames: an 8-byte header whose bytes 2..4 hold the total
/// frame length (header included), big-endian.
#[derive(Debug, Default)]
pub struct FrameUnits {
    pending: Vec<u8>,
}

impl UnitCounter for FrameUnits {
    fn feed(&mut self, chunk: &[u8]) -> ClientResult<usize> {
        self.pending.extend_from_slice(chunk);

        let mut complete = 0;
        let mut consumed = 0;
        loop {
            let rest = &self.pending[consumed..];
            if rest.len() < FRAME_HEADER_LEN {
                break;
            }
            let field = [rest[LENGTH_FIELD_OFFSET], rest[LENGTH_FIELD_OFFSET + 1]];
            let length = u16::from_be_bytes(field) as usize;
            if length < FRAME_HEADER_LEN {
                return Err(ClientError::Framing(length));
            }
            if rest.len() < length {
                break;
            }
            consumed += length;
            complete += 1;
        }

        self.pending.drain(..consumed);
        Ok(complete)
    }
}

pub fn counter_for(unit: InboundUnit) -> Box<dyn UnitCounter> {
    match unit {
        InboundUnit::Frames => Box::new(FrameUnits::default()),
        InboundUnit::Bytes => Box::new(ByteUnits),
    }
}

/// Running count against the configured threshold.
#[derive(Debug)]
pub struct ThresholdWatch {
    expected: usize,
    received: usize,
    signal: CompletionSignal<()>,
}

impl ThresholdWatch {
    pub fn new(expected: usize, signal: CompletionSignal<()>) -> Self {
        Self {
            expected,
            received: 0,
            signal,
        }
    }

    /// Called at install time. A zero threshold has nothing to wait for.
    pub fn arm(&self) {
        if self.expected == 0 {
            self.signal.fulfill(());
        }
    }

    pub fn record(&mut self, units: usize) {
        if units == 0 {
            return;
        }
        self.received = self.received.saturating_add(units);
        metrics::record_units_received(units);
        if self.received >= self.expected && self.signal.fulfill(()) {
            tracing::info!(
                received = self.received,
                expected = self.expected,
                "Receive threshold reached"
            );
        }
    }

    /// Fail the signal unless it already settled.
    pub fn fail(&self, error: ClientError) {
        self.signal.fail(error);
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn expected(&self) -> usize {
        self.expected
    }
}

/// Reads until the peer closes, an error occurs or shutdown is triggered.
pub struct InboundReader {
    client_id: ClientId,
    counter: Box<dyn UnitCounter>,
    threshold: ThresholdWatch,
    shutdown: ShutdownListener,
}

impl InboundReader {
    pub fn new(
        client_id: ClientId,
        counter: Box<dyn UnitCounter>,
        threshold: ThresholdWatch,
        shutdown: ShutdownListener,
    ) -> Self {
        Self {
            client_id,
            counter,
            threshold,
            shutdown,
        }
    }

    pub async fn run<R>(mut self, mut reader: R)
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let read = tokio::select! {
                read = reader.read(&mut buf) => read,
                _ = self.shutdown.recv() => {
                    tracing::trace!(
                        client_id = %self.client_id,
                        "Inbound reader stopped by shutdown"
                    );
                    self.threshold.fail(ClientError::Disconnected);
                    return;
                }
            };

            match read {
                Ok(0) => {
                    tracing::debug!(
                        client_id = %self.client_id,
                        received = self.threshold.received(),
                        "Peer closed the connection"
                    );
                    self.threshold.fail(ClientError::PeerClosed {
                        received: self.threshold.received(),
                        expected: self.threshold.expected(),
                    });
                    return;
                }
                Ok(n) => {
                    tracing::trace!(client_id = %self.client_id, bytes = n, "Inbound chunk");
                    match self.counter.feed(&buf[..n]) {
                        Ok(units) => self.threshold.record(units),
                        Err(e) => {
                            tracing::warn!(
                                client_id = %self.client_id,
                                error = %e,
                                "Dropping inbound stream"
                            );
                            self.threshold.fail(e);
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(client_id = %self.client_id, error = %e, "Inbound read failed");
                    self.threshold.fail(ClientError::Inbound(Arc::new(e)));
                    return;
                }
            }
        }
    }
}
