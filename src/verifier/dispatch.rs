//! Multi-host validation race.
//!
//! One verification issues the same signed query to every configured host
//! concurrently. Each host attempt produces exactly one terminal event into a
//! channel; the single consumer loop below is the resolution gate, so at most
//! one outcome ever reaches the caller. Events arriving after resolution are
//! never received, and the losing tasks are aborted, which drops their
//! in-flight requests and closes the connections.

use std::time::Duration;

use tokio::{sync::mpsc, time};
use tracing::{debug, info_span, warn, Instrument};
use url::Url;

use super::Verifier;
use crate::{
    error::Error,
    otp::Otp,
    wsapi::response::{self, Disposition, ValidationResponse},
};

/// The single terminal event of one host attempt.
enum AttemptEvent {
    /// A response body arrived and still needs classification.
    Body(String),
    /// The host's TLS certificate failed verification.
    Certificate(String),
    /// Connection-level failure; the host is exhausted.
    Transport(String),
    /// The per-host timer fired; the half-open connection was torn down.
    TimedOut,
}

/// Race the query against every configured host.
///
/// Authoritative answers (success or any definitive failure) resolve the race
/// immediately. A `replayed_request` answer withdraws that host and the race
/// keeps waiting on the others. Transport failures and per-host timeouts are
/// absorbed; once every host is exhausted without an authoritative answer the
/// whole race fails with [`Error::ConnectionTimeout`].
pub(crate) async fn dispatch(
    verifier: &Verifier,
    query: &str,
    otp: &Otp,
) -> Result<ValidationResponse, Error> {
    let (tx, mut rx) = mpsc::channel(verifier.endpoints.len());
    let mut attempts = Vec::with_capacity(verifier.endpoints.len());

    for endpoint in &verifier.endpoints {
        let url = format!("{endpoint}?{query}");
        let http = verifier.http.clone();
        let timeout = verifier.config.timeout;
        let tx = tx.clone();
        let span = info_span!("wsapi.verify", http.method = "GET", url = %endpoint);

        attempts.push(tokio::spawn(
            async move {
                let event = attempt(&http, &url, timeout).await;
                // The receiver is gone once the race is resolved.
                let _ = tx.send(event).await;
            }
            .instrument(span),
        ));
    }
    drop(tx);

    let outcome = loop {
        let Some(event) = rx.recv().await else {
            // Every host exhausted without an authoritative answer.
            break Err(Error::ConnectionTimeout(verifier.config.timeout));
        };

        match event {
            AttemptEvent::Body(body) => {
                let parsed = match response::parse(&body) {
                    Ok(parsed) => parsed,
                    Err(e) => break Err(e),
                };

                match response::classify(
                    parsed,
                    otp,
                    verifier.credential.key_bytes(),
                    verifier.credential.client_id(),
                ) {
                    Disposition::Success(response) => break Ok(response),
                    Disposition::Failure(e) => break Err(e),
                    Disposition::Transient => {
                        debug!("host reported replayed_request, waiting on the remaining hosts");
                    }
                }
            }
            AttemptEvent::Certificate(detail) => break Err(Error::InvalidCertificate(detail)),
            AttemptEvent::Transport(detail) => warn!("host attempt failed: {detail}"),
            AttemptEvent::TimedOut => debug!("host attempt timed out"),
        }
    };

    for attempt in &attempts {
        attempt.abort();
    }

    outcome
}

async fn attempt(http: &reqwest::Client, url: &str, timeout: Duration) -> AttemptEvent {
    let request = async { http.get(url).send().await?.text().await };

    match time::timeout(timeout, request).await {
        Ok(Ok(body)) => AttemptEvent::Body(body),
        Ok(Err(e)) if is_certificate_error(&e) => AttemptEvent::Certificate(e.to_string()),
        Ok(Err(e)) => AttemptEvent::Transport(e.to_string()),
        Err(_) => AttemptEvent::TimedOut,
    }
}

fn is_certificate_error(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);

    while let Some(current) = source {
        if current
            .to_string()
            .to_ascii_lowercase()
            .contains("certificate")
        {
            return true;
        }
        source = current.source();
    }

    false
}

/// Resolve a host base URL into the full verification endpoint.
/// # Errors
/// Returns an error if `host` cannot be parsed, has no host component, or
/// uses an unsupported scheme.
pub(crate) fn endpoint_url(host: &str, path: &str) -> Result<String, Error> {
    let url = Url::parse(host)
        .map_err(|e| Error::Configuration(format!("error parsing host URL {host}: {e}")))?;

    let scheme = url.scheme();

    let hostname = url
        .host()
        .ok_or_else(|| Error::Configuration(format!("error parsing host URL {host}: no host specified")))?
        .to_owned();

    let port = match url.port() {
        Some(port) => port,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => {
                return Err(Error::Configuration(format!(
                    "error parsing host URL {host}: unsupported scheme {scheme}"
                )))
            }
        },
    };

    let endpoint_url = format!("{scheme}://{hostname}:{port}{path}");

    debug!("endpoint URL: {}", endpoint_url);

    Ok(endpoint_url)
}
