//! Concurrent verification engine.
//!
//! [`Verifier`] owns the credential, the injected configuration, and one HTTP
//! client shared by every attempt. A single [`Verifier::verify`] races the
//! signed query against every configured host; chains go through
//! [`Verifier::verify_chain`], which validates tokens one at a time in order.

pub(crate) mod chain;
pub(crate) mod dispatch;

use std::time::Duration;

use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretSlice};

use crate::{
    error::Error,
    otp::Otp,
    wsapi::{query, query::SyncLevel, response::ValidationResponse, API_PATH},
};

/// Default validation server pool.
pub const DEFAULT_HOSTS: [&str; 5] = [
    "api.yubico.com",
    "api2.yubico.com",
    "api3.yubico.com",
    "api4.yubico.com",
    "api5.yubico.com",
];

/// Default per-host connection timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default maximum elapsed generation time between the first and last OTP of
/// a chain, in the server's 0.125 second tick units.
pub const DEFAULT_MAX_TIME_WINDOW: u64 = 40;

/// Client id plus optional shared API key. Immutable once constructed and
/// shared read-only by every request issued through it.
#[derive(Debug)]
pub struct Credential {
    client_id: String,
    key: Option<SecretSlice<u8>>,
}

impl Credential {
    /// A credential without a shared key; requests go out unsigned and
    /// response signatures are not checked.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            key: None,
        }
    }

    /// A credential with the base64 encoded API key as issued by the
    /// validation service.
    /// # Errors
    /// Returns an error if the key is not valid base64.
    pub fn with_key(client_id: impl Into<String>, api_key: &str) -> Result<Self, Error> {
        let key = Base64::decode_vec(api_key)
            .map_err(|e| Error::Configuration(format!("invalid API key encoding: {e}")))?;

        Ok(Self {
            client_id: client_id.into(),
            key: Some(key.into()),
        })
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn key_bytes(&self) -> Option<&[u8]> {
        self.key.as_ref().map(ExposeSecret::expose_secret)
    }
}

/// Verifier configuration. All values have documented defaults; pass a
/// customized copy to [`Verifier::new`] to override them.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URLs of the validation hosts, e.g. `https://api.yubico.com`.
    pub hosts: Vec<String>,
    /// Per-host connection timeout; also forwarded to the server as the
    /// `timeout` query parameter (in seconds).
    pub timeout: Duration,
    /// Maximum elapsed generation time across a chain, in 0.125 second ticks.
    pub max_time_window: u64,
    /// Sync level sent with every request; `None` lets the server decide.
    pub sync_level: Option<SyncLevel>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts: DEFAULT_HOSTS
                .iter()
                .map(|host| format!("https://{host}"))
                .collect(),
            timeout: DEFAULT_TIMEOUT,
            max_time_window: DEFAULT_MAX_TIME_WINDOW,
            sync_level: Some(SyncLevel::Percent(75)),
        }
    }
}

/// Validates OTP tokens against the configured server pool.
#[derive(Debug)]
pub struct Verifier {
    pub(crate) credential: Credential,
    pub(crate) config: Config,
    pub(crate) endpoints: Vec<String>,
    pub(crate) http: reqwest::Client,
}

impl Verifier {
    /// Build a verifier from a credential and configuration.
    /// # Errors
    /// Returns an error if the host list is empty, a host URL cannot be
    /// parsed, or the HTTP client cannot be constructed.
    pub fn new(credential: Credential, config: Config) -> Result<Self, Error> {
        if config.hosts.is_empty() {
            return Err(Error::Configuration(
                "at least one validation host is required".to_string(),
            ));
        }

        let endpoints = config
            .hosts
            .iter()
            .map(|host| dispatch::endpoint_url(host, API_PATH))
            .collect::<Result<Vec<_>, _>>()?;

        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            credential,
            config,
            endpoints,
            http,
        })
    }

    /// Verify a single OTP token against the server pool.
    ///
    /// Resolves with the first authoritative answer; exactly one outcome is
    /// delivered per call.
    ///
    /// # Errors
    /// Returns the terminal error classified from the winning response, or
    /// [`Error::ConnectionTimeout`] once every host is exhausted.
    pub async fn verify(&self, otp: &str) -> Result<ValidationResponse, Error> {
        let otp = Otp::new(otp)?;
        self.verify_token(&otp).await
    }

    /// Verify an ordered chain of OTPs generated by one device.
    ///
    /// Tokens are verified strictly in order; the elapsed generation time
    /// between the first and last token must stay within the configured
    /// window.
    ///
    /// # Errors
    /// Returns a configuration error before any network I/O if fewer than two
    /// tokens are given or their device ids differ; otherwise the first
    /// failing token's error, or [`Error::TimeWindowReached`].
    pub async fn verify_chain(&self, otps: &[String]) -> Result<(), Error> {
        chain::verify_chain(self, otps).await
    }

    pub(crate) async fn verify_token(&self, otp: &Otp) -> Result<ValidationResponse, Error> {
        let nonce = query::nonce();
        let query = query::build_query(
            self.credential.client_id(),
            self.credential.key_bytes(),
            otp,
            &nonce,
            true,
            self.config.sync_level,
            Some(self.config.timeout.as_secs()),
        )?;

        dispatch::dispatch(self, &query, otp).await
    }
}
