use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::{
    cli::actions::Action,
    verifier::{Config, Credential, Verifier},
};

/// Handle the verify action
/// # Errors
/// Returns an error if the token (or chain) fails validation.
pub async fn handle(action: Action) -> Result<()> {
    let Action::Verify {
        client_id,
        api_key,
        hosts,
        timeout,
        max_time_window,
        sync_level,
        otps,
    } = action;

    let credential = match api_key {
        Some(key) => Credential::with_key(client_id, &key)?,
        None => Credential::new(client_id),
    };

    let mut config = Config::default();
    if let Some(hosts) = hosts {
        config.hosts = hosts;
    }
    config.timeout = Duration::from_secs(timeout);
    config.max_time_window = max_time_window;
    if let Some(sync_level) = sync_level {
        config.sync_level = Some(sync_level);
    }

    let verifier = Verifier::new(credential, config)?;

    match otps.as_slice() {
        [otp] => {
            let response = verifier.verify(otp).await?;
            info!(status = %response.status(), "validation server accepted the token");
            println!("OK, the supplied token is valid");
        }
        _ => {
            verifier.verify_chain(&otps).await?;
            println!("OK, all {} supplied tokens are valid", otps.len());
        }
    }

    Ok(())
}
