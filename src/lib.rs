//! # Konfirmi (hardware OTP validation client)
//!
//! `konfirmi` validates one-time-password tokens generated by hardware
//! authentication devices against a pool of redundant validation servers
//! (protocol v2.0). Requests are signed and response signatures verified with
//! a shared API key when one is configured.
//!
//! ## Validation Race
//!
//! A single verification fans the same signed query out to every configured
//! host concurrently and resolves on the first authoritative answer. Losing
//! connections are actively cancelled. A server reporting `replayed_request`
//! (another replica already answered an equivalent request) withdraws from the
//! race without resolving it.
//!
//! ## Chain Verification
//!
//! Two or more tokens known to come from one physical device can be verified
//! as a chain: tokens are validated strictly in order, the device id prefix
//! must match across all of them, and the elapsed generation time between the
//! first and last token is bounded by a configurable window.
//!
//! ## Signatures
//!
//! Query parameters are canonicalized by sorting the full `name=value` pairs
//! as opaque strings, HMAC-SHA1 signed with the decoded API key, and base64
//! encoded. The validation servers canonicalize the same way on their side.

pub mod cli;
pub mod error;
pub mod otp;
pub mod verifier;
pub mod wsapi;

pub use error::Error;
pub use otp::Otp;
pub use verifier::{Config, Credential, Verifier};
pub use wsapi::query::SyncLevel;
pub use wsapi::response::{Status, ValidationResponse};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
