//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io::{BufReader, Cursor, Read};
use std::net::SocketAddr;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

use scripted_client::{ClientHandle, ClientResult, ScriptedClient, Target};

/// Upper bound for any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(10);

/// What the mock server does with its single connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerScript {
    /// Bytes written to the client right after accept (or handshake).
    pub greeting: &'static [u8],
    /// Close the connection right after the greeting instead of reading.
    pub hang_up: bool,
}

/// Mock server that accepts one connection and records everything it reads.
pub struct RecordingServer {
    pub addr: SocketAddr,
    received: oneshot::Receiver<Vec<u8>>,
}

impl RecordingServer {
    /// Plain TCP server.
    pub async fn plain(script: ServerScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, received) = oneshot::channel();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let _ = tx.send(serve(socket, script).await);
        });

        Self { addr, received }
    }

    /// TLS server presenting `identity`.
    pub async fn secured(identity: &TestIdentity, script: ServerScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let acceptor = identity.acceptor();
        let (tx, received) = oneshot::channel();

        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let received = match acceptor.accept(socket).await {
                Ok(stream) => serve(stream, script).await,
                Err(_) => Vec::new(),
            };
            let _ = tx.send(received);
        });

        Self { addr, received }
    }

    /// Server that accepts and immediately drops the connection.
    pub async fn hang_up_on_accept() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });
        addr
    }

    pub fn target(&self) -> Target {
        Target::new("127.0.0.1", self.addr.port())
    }

    /// Everything the server read before the client closed.
    pub async fn received(self) -> Vec<u8> {
        tokio::time::timeout(WAIT, self.received)
            .await
            .expect("server never finished")
            .expect("server task dropped")
    }
}

async fn serve<S>(mut stream: S, script: ServerScript) -> Vec<u8>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if !script.greeting.is_empty() {
        stream.write_all(script.greeting).await.unwrap();
        stream.flush().await.unwrap();
    }
    if script.hang_up {
        let _ = stream.shutdown().await;
        return Vec::new();
    }

    // A TLS peer may vanish without close_notify; keep what was read.
    let mut received = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => received.extend_from_slice(&buf[..n]),
        }
    }
    received
}

/// Self-signed certificate for `localhost`.
pub struct TestIdentity {
    cert: CertificateDer<'static>,
    key: Vec<u8>,
    pub cert_pem: String,
}

impl TestIdentity {
    pub fn generate() -> Self {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        Self {
            cert: certified.cert.der().clone(),
            key: certified.key_pair.serialize_der(),
            cert_pem: certified.cert.pem(),
        }
    }

    fn acceptor(&self) -> TlsAcceptor {
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key.clone()));
        let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![self.cert.clone()], key)
            .unwrap();
        TlsAcceptor::from(Arc::new(config))
    }

    /// Write the certificate to a temp file usable as a CA bundle.
    pub fn write_ca_file(&self, name: &str) -> std::path::PathBuf {
        let file = format!("scripted-client-{}-{}.pem", name, std::process::id());
        let path = std::env::temp_dir().join(file);
        std::fs::write(&path, &self.cert_pem).unwrap();
        path
    }
}

/// Console fed line by line from the test. Dropping the feeder ends input.
pub struct ScriptedConsole {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: Cursor<Vec<u8>>,
}

impl ScriptedConsole {
    pub fn new() -> (mpsc::Sender<Vec<u8>>, BufReader<Self>) {
        let (tx, rx) = mpsc::channel();
        let console = Self {
            rx,
            pending: Cursor::new(Vec::new()),
        };
        (tx, BufReader::new(console))
    }
}

impl Read for ScriptedConsole {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            let n = Read::read(&mut self.pending, buf)?;
            if n > 0 {
                return Ok(n);
            }
            match self.rx.recv() {
                Ok(chunk) => self.pending = Cursor::new(chunk),
                Err(_) => return Ok(0),
            }
        }
    }
}

/// Console that replays fixed input and then reports end-of-input.
pub fn console(input: &str) -> Cursor<Vec<u8>> {
    Cursor::new(input.as_bytes().to_vec())
}

/// Plain client for `target` whose console is `input`.
pub fn client(target: Target, payload: Option<&[u8]>, input: &str) -> ScriptedClient {
    let payload = payload.map(scripted_client::PayloadSource::from_bytes);
    let mut client = ScriptedClient::new(target, payload);
    client.set_console(console(input));
    client
}

/// Join the driver thread without blocking the test runtime.
pub async fn join(handle: ClientHandle) -> ClientResult<()> {
    tokio::time::timeout(WAIT, tokio::task::spawn_blocking(move || handle.join()))
        .await
        .expect("driver thread never finished")
        .expect("join task panicked")
}
