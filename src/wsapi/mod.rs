//! Wire types and helpers for the validation protocol v2.0.
//!
//! Outbound: [`query`] builds the canonical query string and [`signature`]
//! signs it. Inbound: [`response`] parses the newline-separated body, checks
//! the echoed OTP and the response signature, and classifies the reported
//! status. Both directions share the canonicalization in [`signature`], which
//! must match the server byte for byte for signatures to agree.

pub mod query;
pub mod response;
pub mod signature;

/// Fixed verification path on every validation host.
pub const API_PATH: &str = "/wsapi/2.0/verify";
