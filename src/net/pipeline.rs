//! Pipeline selection and installation.
//!
//! A pipeline is chosen once, before the connect attempt, from the security
//! mode. Both variants end up with the same shape: an inbound reader task
//! counting units and an [`Outbound`] writer. The secured variant only gets
//! there after a successful TLS handshake.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;

use crate::error::{ClientError, ClientResult};
use crate::lifecycle::shutdown::ShutdownListener;
use crate::lifecycle::signal::CompletionSignal;
use crate::net::connection::{ClientId, SecurityMode, Target};
use crate::net::inbound::{InboundReader, ThresholdWatch, UnitCounter};
use crate::net::outbound::Outbound;
use crate::net::tls;

/// TLS inputs for the secured pipeline.
#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    /// Name used for SNI and verification. Defaults to the target host.
    pub server_name: Option<String>,
    /// PEM file with trusted roots. `None` accepts any server certificate.
    pub ca_cert_path: Option<std::path::PathBuf>,
}

/// Connection-handling strategy.
pub enum Pipeline {
    Plain,
    Secured {
        connector: TlsConnector,
        server_name: ServerName<'static>,
    },
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pipeline::Plain => f.write_str("Plain"),
            Pipeline::Secured { server_name, .. } => f
                .debug_struct("Secured")
                .field("server_name", server_name)
                .finish_non_exhaustive(),
        }
    }
}

/// Everything the installed pipeline owns for the connection's lifetime.
pub struct PipelineContext {
    pub client_id: ClientId,
    pub target: Target,
    pub connected: CompletionSignal<()>,
    pub threshold: ThresholdWatch,
    pub counter: Box<dyn UnitCounter>,
    pub shutdown: ShutdownListener,
}

impl Pipeline {
    /// Pick the strategy for `mode`.
    pub fn select(
        mode: SecurityMode,
        settings: &TlsSettings,
        target: &Target,
    ) -> ClientResult<Self> {
        match mode {
            SecurityMode::Plain => Ok(Pipeline::Plain),
            SecurityMode::Secured => {
                let name = settings.server_name.as_deref().unwrap_or(target.host());
                Ok(Pipeline::Secured {
                    connector: tls::build_connector(settings.ca_cert_path.as_deref())?,
                    server_name: tls::server_name(name)?,
                })
            }
        }
    }

    /// Attach the pipeline to a freshly connected stream.
    ///
    /// Settles `connected` either way: success once the transport is usable,
    /// failure if the handshake does not complete.
    pub async fn install(self, stream: TcpStream, ctx: PipelineContext) -> ClientResult<Outbound> {
        match self {
            Pipeline::Plain => Ok(attach(stream, ctx)),
            Pipeline::Secured {
                connector,
                server_name,
            } => match connector.connect(server_name, stream).await {
                Ok(tls_stream) => {
                    tracing::debug!(client_id = %ctx.client_id, "TLS handshake complete");
                    Ok(attach(tls_stream, ctx))
                }
                Err(e) => {
                    let err = ClientError::handshake(&ctx.target, e);
                    ctx.connected.fail(err.clone());
                    Err(err)
                }
            },
        }
    }
}

fn attach<S>(stream: S, ctx: PipelineContext) -> Outbound
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let PipelineContext {
        client_id,
        target,
        connected,
        threshold,
        counter,
        shutdown,
    } = ctx;

    let (read_half, write_half) = tokio::io::split(stream);
    threshold.arm();
    connected.fulfill(());
    tracing::info!(client_id = %client_id, target = %target, "Connected");

    let reader = InboundReader::new(client_id, counter, threshold, shutdown);
    tokio::spawn(reader.run(read_half));
    Outbound::spawn(client_id, write_half)
}
