//! Health probe logic.
//!
//! Performs one bounded HTTP GET against the health endpoint and folds every
//! outcome, including transport failures, into a [`ProbeResult`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bridge_core::{BridgeConfig, ProbeResult};
use http::Method;
use tracing::debug;

use crate::client;

/// Boxed future returned by [`Prober::probe`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = ProbeResult> + Send + 'a>>;

/// Source of probe results: injected into the monitor for testability.
///
/// Implementations never fail: every error is reported as
/// [`ProbeResult::Failed`].
pub trait Prober: Send + Sync {
    fn probe(&self) -> ProbeFuture<'_>;
}

/// Probes an HTTP health endpoint for a boolean availability field.
#[derive(Debug, Clone)]
pub struct HttpProber {
    url: String,
    availability_field: String,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(
        url: impl Into<String>,
        availability_field: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            availability_field: availability_field.into(),
            timeout,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.endpoint_url(),
            config.availability_field.clone(),
            config.request_timeout(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Prober for HttpProber {
    fn probe(&self) -> ProbeFuture<'_> {
        Box::pin(http_probe(&self.url, &self.availability_field, self.timeout))
    }
}

/// Perform an HTTP health probe against `url`.
///
/// Returns `Reported` when a 2xx JSON body carries a boolean
/// `availability_field`, and `Failed` for connection errors, timeouts,
/// non-2xx statuses, and malformed bodies.
pub async fn http_probe(url: &str, availability_field: &str, timeout: Duration) -> ProbeResult {
    let reply = match tokio::time::timeout(timeout, client::send(Method::GET, url, None)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            debug!(error = %e, %url, "health probe failed");
            return ProbeResult::failed(e.to_string());
        }
        Err(_) => {
            debug!(%url, ?timeout, "health probe timed out");
            return ProbeResult::failed("timeout");
        }
    };

    if !reply.status.is_success() {
        debug!(status = %reply.status, %url, "health probe non-2xx");
        return ProbeResult::failed(format!("unexpected status {}", reply.status.as_u16()));
    }

    match availability_from_body(&reply.body, availability_field) {
        Ok(availability) => ProbeResult::available(availability),
        Err(message) => {
            debug!(%url, %message, "health probe body rejected");
            ProbeResult::failed(message)
        }
    }
}

/// Extract the boolean availability flag from a JSON health body.
fn availability_from_body(body: &[u8], field: &str) -> Result<bool, String> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| format!("malformed body: {e}"))?;
    match value.get(field) {
        Some(serde_json::Value::Bool(flag)) => Ok(*flag),
        Some(other) => Err(format!("field {field:?} is not a boolean: {other}")),
        None => Err(format!("missing field {field:?}")),
    }
}
