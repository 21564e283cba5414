//! Scripted payload phase.
//!
//! Drains the payload source into one buffer and submits it as a single
//! outbound write, then closes the source. The payload-sent signal means
//! "the scripted part is over", so it also succeeds when there is no source.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ClientError, ClientResult};
use crate::lifecycle::signal::CompletionSignal;
use crate::net::outbound::FrameSink;

/// Where the scripted bytes come from.
pub enum PayloadSource {
    File { path: PathBuf, file: File },
    Reader(Box<dyn Read + Send>),
}

impl PayloadSource {
    /// Open a file-backed source.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(PayloadSource::File { path, file })
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        PayloadSource::Reader(Box::new(reader))
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_reader(Cursor::new(bytes.into()))
    }

    fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            PayloadSource::File { file, .. } => Box::new(file),
            PayloadSource::Reader(reader) => reader,
        }
    }
}

impl std::fmt::Debug for PayloadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadSource::File { path, .. } => f.debug_struct("File").field("path", path).finish(),
            PayloadSource::Reader(_) => f.write_str("Reader"),
        }
    }
}

/// Runs the payload phase once.
#[derive(Debug)]
pub struct PayloadLoader {
    source: Option<PayloadSource>,
}

impl PayloadLoader {
    pub fn new(source: Option<PayloadSource>) -> Self {
        Self { source }
    }

    /// Send the payload and settle `payload_sent`.
    ///
    /// Returns the number of bytes submitted, or `None` when there was no source.
    pub fn run(
        self,
        sink: &dyn FrameSink,
        payload_sent: &CompletionSignal<()>,
    ) -> ClientResult<Option<usize>> {
        let Some(source) = self.source else {
            tracing::debug!("No payload configured");
            payload_sent.fulfill(());
            return Ok(None);
        };

        tracing::debug!(source = ?source, "Loading payload");
        let mut buffer = Vec::new();
        let read = source.into_reader().read_to_end(&mut buffer);
        if let Err(e) = read {
            let err = ClientError::Payload(Arc::new(e));
            tracing::error!(error = %err, "Payload phase failed");
            payload_sent.fail(err.clone());
            return Err(err);
        }

        let len = buffer.len();
        if let Err(err) = sink.submit(buffer) {
            tracing::error!(error = %err, "Payload phase failed");
            payload_sent.fail(err.clone());
            return Err(err);
        }

        tracing::info!(bytes = len, "Payload sent");
        payload_sent.fulfill(());
        Ok(Some(len))
    }
}
