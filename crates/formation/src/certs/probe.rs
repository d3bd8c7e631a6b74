//! Unverified TLS handshake that captures a server's certificate chain.
//!
//! Joiners in self-signed mode have no CA to trust yet. They connect to the
//! bootstrap host, accept whatever it presents and keep the chain as their
//! trust anchor for the admin client.

use formation_core::{FormationError, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, WebPkiSupportedAlgorithms};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
struct AcceptAnyServer {
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for AcceptAnyServer {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

fn tls_error(e: impl std::fmt::Display) -> FormationError {
    FormationError::Certificate(format!("TLS probe: {e}"))
}

fn handshake(host: &str, port: u16, timeout: Duration) -> Result<Vec<Vec<u8>>> {
    let provider = rustls::crypto::ring::default_provider();
    let verifier = AcceptAnyServer {
        algorithms: provider.signature_verification_algorithms,
    };
    let config = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_safe_default_protocol_versions()
        .map_err(tls_error)?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();

    let server_name = ServerName::try_from(host.to_string()).map_err(tls_error)?;
    let mut connection = ClientConnection::new(Arc::new(config), server_name).map_err(tls_error)?;

    let connect_error = |e: std::io::Error| FormationError::Connection(format!("{host}:{port}: {e}"));
    let address = (host, port)
        .to_socket_addrs()
        .map_err(connect_error)?
        .next()
        .ok_or_else(|| FormationError::Connection(format!("{host}: no address")))?;
    let mut socket = TcpStream::connect_timeout(&address, timeout).map_err(connect_error)?;
    socket.set_read_timeout(Some(timeout)).map_err(connect_error)?;
    socket.set_write_timeout(Some(timeout)).map_err(connect_error)?;

    while connection.is_handshaking() {
        connection.complete_io(&mut socket).map_err(connect_error)?;
    }

    let chain: Vec<Vec<u8>> = connection
        .peer_certificates()
        .unwrap_or_default()
        .iter()
        .map(|cert| cert.as_ref().to_vec())
        .collect();
    if chain.is_empty() {
        return Err(tls_error("server presented no certificate"));
    }
    Ok(chain)
}

/// Handshake with `host:port` without verifying it and return the DER
/// certificates it presented, leaf first.
pub async fn fetch_peer_chain(host: &str, port: u16, timeout: Duration) -> Result<Vec<Vec<u8>>> {
    let target = host.to_string();
    let chain = tokio::task::spawn_blocking(move || handshake(&target, port, timeout))
        .await
        .map_err(|e| FormationError::Internal(e.to_string()))??;

    debug!(host, port, certificates = chain.len(), "captured peer chain");
    Ok(chain)
}

/// PEM encoding of a DER certificate chain
pub fn encode_chain(chain: &[Vec<u8>]) -> String {
    let blocks: Vec<pem::Pem> = chain
        .iter()
        .map(|der| pem::Pem::new("CERTIFICATE", der.clone()))
        .collect();
    pem::encode_many(&blocks)
}
