//! TLS client configuration for the secured pipeline.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{self, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_rustls::TlsConnector;

use crate::error::{ClientError, ClientResult};

fn provider() -> Arc<CryptoProvider> {
    Arc::new(crypto::ring::default_provider())
}

/// Build a connector.
///
/// With a CA file the server certificate is verified against it. Without one
/// any certificate is accepted, which is what a test client pointed at a
/// self-signed switch usually needs.
pub fn build_connector(ca_cert_path: Option<&Path>) -> ClientResult<TlsConnector> {
    let provider = provider();
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientError::TlsConfig(e.to_string()))?;

    let config = match ca_cert_path {
        Some(path) => builder
            .with_root_certificates(load_roots(path)?)
            .with_no_client_auth(),
        None => {
            tracing::warn!(
                "No CA certificate configured, server certificates will not be verified"
            );
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
                .with_no_client_auth()
        }
    };

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Load PEM certificates from `path` into a root store.
pub fn load_roots(path: &Path) -> ClientResult<RootCertStore> {
    let file = File::open(path).map_err(|e| {
        ClientError::TlsConfig(format!("cannot open CA file {}: {}", path.display(), e))
    })?;

    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
        let cert = cert.map_err(|e| {
            ClientError::TlsConfig(format!("invalid PEM in {}: {}", path.display(), e))
        })?;
        roots
            .add(cert)
            .map_err(|e| ClientError::TlsConfig(e.to_string()))?;
    }

    if roots.is_empty() {
        return Err(ClientError::TlsConfig(format!(
            "no certificates found in {}",
            path.display()
        )));
    }

    tracing::debug!(path = %path.display(), roots = roots.len(), "Loaded CA certificates");
    Ok(roots)
}

/// Parse the name presented for SNI and certificate checks. IP literals are accepted.
pub fn server_name(name: &str) -> ClientResult<ServerName<'static>> {
    ServerName::try_from(name.to_string())
        .map_err(|_| ClientError::TlsConfig(format!("invalid server name '{}'", name)))
}

/// Skips chain validation but still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
