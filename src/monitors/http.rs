use tracing::{instrument, trace, warn};

use super::ProbeResult;
use crate::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn prefix(&self) -> &'static str {
        match self {
            Scheme::Http => "http://",
            Scheme::Https => "https://",
        }
    }

    fn other_prefix(&self) -> &'static str {
        match self {
            Scheme::Http => "https://",
            Scheme::Https => "http://",
        }
    }
}

/// Rewrite an address so that it uses `scheme` and has no trailing slash
pub fn normalize_url(address: &str, scheme: Scheme) -> String {
    let trimmed = address.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    if let Some(rest) = trimmed.strip_prefix(scheme.other_prefix()) {
        format!("{}{rest}", scheme.prefix())
    } else if trimmed.starts_with(scheme.prefix()) {
        trimmed.to_string()
    } else {
        format!("{}{trimmed}", scheme.prefix())
    }
}

/// GET the address and classify the response
///
/// Only `200` counts as healthy. The client's timeout bounds the request.
#[instrument(skip(client))]
pub async fn probe_http(client: &reqwest::Client, address: &str, scheme: Scheme) -> ProbeResult {
    let url = normalize_url(address, scheme);
    trace!("probing {url}");

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("{url}: error connecting: {e}");
            return ProbeResult::new(Status::Problem, format!("{url} - error connecting"));
        }
    };

    let status = response.status();
    let message = format!("{url} - {status}");

    if status == reqwest::StatusCode::OK {
        ProbeResult::new(Status::Healthy, message)
    } else {
        ProbeResult::new(Status::Problem, message)
    }
}
