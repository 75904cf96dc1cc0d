use std::time::Duration;
use thiserror::Error;

/// Terminal outcomes of a verification. None of these are retried internally;
/// the only absorbed condition is the transient `replayed_request` status,
/// which withdraws a single host from the race without resolving it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("signature verification failed - expected = {expected}, got = {actual}")]
    SignatureVerification { expected: String, actual: String },

    #[error("invalid client id: {0}")]
    InvalidClient(String),

    #[error("validation server returned status: {0}")]
    StatusCode(String),

    #[error("invalid TLS certificate: {0}")]
    InvalidCertificate(String),

    #[error("connection timed out after {} seconds", .0.as_secs())]
    ConnectionTimeout(Duration),

    #[error("OTP chain exceeded the allowed time window: {elapsed} ticks elapsed, maximum is {max_window}")]
    TimeWindowReached { elapsed: u64, max_window: u64 },

    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}
