//! Sequential chain verification.
//!
//! Tokens from one device are validated strictly in order, one at a time;
//! the device enforces a per-key use counter server side, so submitting them
//! concurrently would race against that check. The first and last confirmed
//! generation timestamps are carried in an explicit accumulator and compared
//! against the configured window only after the last token succeeds.

use tracing::debug;

use super::Verifier;
use crate::{error::Error, otp::Otp};

/// Timestamps accumulated across chain steps, in 0.125 second ticks.
#[derive(Debug, Default)]
struct ChainProgress {
    first: Option<u64>,
    last: Option<u64>,
}

impl ChainProgress {
    fn record(&mut self, timestamp: u64) {
        if self.first.is_none() {
            self.first = Some(timestamp);
        }
        self.last = Some(timestamp);
    }

    fn elapsed(&self) -> u64 {
        match (self.first, self.last) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            _ => 0,
        }
    }
}

pub(crate) async fn verify_chain(verifier: &Verifier, otps: &[String]) -> Result<(), Error> {
    if otps.len() < 2 {
        return Err(Error::Configuration(
            "chain verification requires at least two OTPs".to_string(),
        ));
    }

    let tokens = otps
        .iter()
        .map(|raw| Otp::new(raw))
        .collect::<Result<Vec<_>, _>>()?;

    // Device identity must be consistent before any network I/O happens.
    if let Some((first, rest)) = tokens.split_first() {
        let device_id = first.device_id();
        for token in rest {
            if token.device_id() != device_id {
                return Err(Error::Configuration(format!(
                    "OTPs contain different device ids: {device_id} and {}",
                    token.device_id()
                )));
            }
        }
    }

    let mut progress = ChainProgress::default();

    for token in &tokens {
        let response = verifier.verify_token(token).await?;

        let timestamp = response.timestamp().ok_or_else(|| {
            Error::Protocol("response is missing the timestamp attribute".to_string())
        })?;
        progress.record(timestamp);

        debug!(device_id = token.device_id(), timestamp, "chain step validated");
    }

    let elapsed = progress.elapsed();
    if elapsed > verifier.config.max_time_window {
        return Err(Error::TimeWindowReached {
            elapsed,
            max_window: verifier.config.max_time_window,
        });
    }

    Ok(())
}
