//! TLS certificate expiry probe
//!
//! Connects to `host[:port]`, completes a TLS handshake and reads the
//! `notAfter` of the leaf certificate. The chain is checked against the native
//! roots but never rejected: expired and privately signed certificates still
//! report their expiry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{WebPkiSupportedAlgorithms, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument, trace, warn};

use super::ProbeResult;
use crate::Status;

const DEFAULT_TLS_PORT: u16 = 443;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Days below which a certificate is a problem
pub const PROBLEM_DAYS: i64 = 7;

/// Days below which a certificate is a warning
pub const WARNING_DAYS: i64 = 30;

/// Map days until expiry to a status
pub fn classify_expiry(days_until_expiry: i64) -> Status {
    if days_until_expiry < PROBLEM_DAYS {
        Status::Problem
    } else if days_until_expiry < WARNING_DAYS {
        Status::Warning
    } else {
        Status::Healthy
    }
}

/// Reduce an address to `(host, port)`
pub fn parse_target(address: &str) -> (String, u16) {
    let trimmed = address.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let authority = without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme);

    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (authority.to_string(), DEFAULT_TLS_PORT),
        },
        None => (authority.to_string(), DEFAULT_TLS_PORT),
    }
}

/// Accepts every chain, logging the ones the native roots do not trust
#[derive(Debug)]
struct ExpiryVerifier {
    trusted: Option<Arc<WebPkiServerVerifier>>,
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for ExpiryVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if let Some(trusted) = &self.trusted {
            if let Err(e) = trusted.verify_server_cert(
                end_entity,
                intermediates,
                server_name,
                ocsp_response,
                now,
            ) {
                debug!("{server_name:?}: certificate not trusted: {e}");
            }
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}

/// Certificate probe with a reusable TLS connector
#[derive(Clone)]
pub struct CertificateProbe {
    connector: TlsConnector,
    timeout: Duration,
}

impl std::fmt::Debug for CertificateProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateProbe")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CertificateProbe {
    /// Build a probe that checks chains against the platform's native roots
    pub fn new(timeout: Duration) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());

        let mut roots = rustls::RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for error in &native.errors {
            debug!("skipping native certificate: {error}");
        }
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        trace!("loaded {added} native root certificates ({ignored} ignored)");

        let trusted = if roots.is_empty() {
            warn!("no native root certificates found, chains will not be checked");
            None
        } else {
            Some(
                WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
                    .build()
                    .context("failed to build certificate verifier")?,
            )
        };
        let verifier = ExpiryVerifier {
            trusted,
            algorithms: provider.signature_verification_algorithms,
        };

        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .context("failed to select TLS protocol versions")?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            timeout,
        })
    }

    #[instrument(skip(self))]
    pub async fn probe(&self, address: &str) -> ProbeResult {
        let (host, port) = parse_target(address);

        let days = match tokio::time::timeout(self.timeout, self.days_until_expiry(&host, port))
            .await
        {
            Ok(Ok(days)) => days,
            Ok(Err(e)) => {
                warn!("{host}:{port}: certificate check failed: {e:#}");
                return ProbeResult::new(Status::Problem, format!("{host} - error connecting"));
            }
            Err(_) => {
                warn!("{host}:{port}: certificate check timed out after {:?}", self.timeout);
                return ProbeResult::new(Status::Problem, format!("{host} - error connecting"));
            }
        };

        ProbeResult::new(
            classify_expiry(days),
            format!("{host} expiring in {days} days"),
        )
    }

    async fn days_until_expiry(&self, host: &str, port: u16) -> Result<i64> {
        let server_name =
            ServerName::try_from(host.to_string()).context("invalid server name")?;

        let tcp = TcpStream::connect((host, port))
            .await
            .context("TCP connect failed")?;
        let tls = self
            .connector
            .connect(server_name, tcp)
            .await
            .context("TLS handshake failed")?;

        let (_, session) = tls.get_ref();
        let leaf = session
            .peer_certificates()
            .and_then(|certs| certs.first())
            .context("server presented no certificate")?;

        let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref())
            .map_err(|e| anyhow::anyhow!("invalid certificate: {e}"))?;

        let not_after = cert.validity().not_after.timestamp();
        Ok((not_after - Utc::now().timestamp()) / SECONDS_PER_DAY)
    }
}
