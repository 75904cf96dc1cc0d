use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::Error;

type HmacSha1 = Hmac<Sha1>;

/// Sign a query string with the decoded API key.
///
/// The parameter pairs are sorted as whole `name=value` tokens, not by key
/// alone; the validation servers canonicalize the same way.
///
/// # Errors
/// Returns an error if the key cannot be used as an HMAC key.
pub fn sign(query: &str, key: &[u8]) -> Result<String, Error> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| Error::Configuration(format!("invalid signing key: {e}")))?;

    mac.update(canonicalize(query).as_bytes());

    Ok(Base64::encode_string(&mac.finalize().into_bytes()))
}

/// Check a received signature against a freshly computed one.
/// # Errors
/// Returns an error if the key cannot be used as an HMAC key.
pub fn verify(query: &str, key: &[u8], signature: &str) -> Result<bool, Error> {
    Ok(sign(query, key)? == signature)
}

fn canonicalize(query: &str) -> String {
    let mut pairs: Vec<&str> = query.split('&').collect();
    pairs.sort_unstable();
    pairs.join("&")
}
