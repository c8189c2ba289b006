//! Probes - one network check against one address
//!
//! Probes never fail: every outcome, including connection errors, is mapped
//! to a [`Status`] and a human-readable message.

pub mod certificate;
pub mod http;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ProbeConfig;
use crate::{ServiceType, Status};

/// Outcome of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: Status,
    pub message: String,
}

impl ProbeResult {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Runs the probe matching a service type
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, service_type: ServiceType, address: &str) -> ProbeResult;
}

/// Prober performing real network I/O
#[derive(Debug, Clone)]
pub struct NetworkProber {
    client: reqwest::Client,
    certificate: certificate::CertificateProbe,
}

impl NetworkProber {
    pub fn new(config: ProbeConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout))
            .build()?;

        Ok(Self {
            client,
            certificate: certificate::CertificateProbe::new(Duration::from_secs(
                config.certificate_timeout,
            ))?,
        })
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, service_type: ServiceType, address: &str) -> ProbeResult {
        match service_type {
            ServiceType::Http => http::probe_http(&self.client, address, http::Scheme::Http).await,
            ServiceType::Https => {
                http::probe_http(&self.client, address, http::Scheme::Https).await
            }
            ServiceType::TlsCertificate => self.certificate.probe(address).await,
        }
    }
}
