use std::fmt;

use crate::error::Error;

/// Number of leading characters that identify the issuing device. The suffix
/// changes with every generation; the prefix does not.
pub const DEVICE_ID_LEN: usize = 12;

/// A one-time-password token emitted by a hardware device.
///
/// Construction validates the token shape so that [`Otp::device_id`] is total
/// for every value of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Otp {
    token: String,
}

impl Otp {
    /// Validate and wrap a raw token string.
    /// # Errors
    /// Returns an error if the token is shorter than the device id prefix or
    /// contains characters outside the token alphabet.
    pub fn new(token: &str) -> Result<Self, Error> {
        if token.len() < DEVICE_ID_LEN {
            return Err(Error::Configuration(format!(
                "OTP must be at least {DEVICE_ID_LEN} characters long, got {}",
                token.len()
            )));
        }

        if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Configuration(
                "OTP contains characters outside the token alphabet".to_string(),
            ));
        }

        Ok(Self {
            token: token.to_string(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// The fixed-length prefix identifying the issuing device.
    #[must_use]
    pub fn device_id(&self) -> &str {
        // Token alphabet is ASCII, so slicing by bytes is safe here.
        &self.token[..DEVICE_ID_LEN]
    }
}

impl fmt::Display for Otp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}
