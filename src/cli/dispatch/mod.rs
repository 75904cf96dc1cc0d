use crate::cli::actions::Action;
use crate::wsapi::query::SyncLevel;
use anyhow::Result;

/// Translate parsed arguments into an action.
/// # Errors
/// Returns an error if a required argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Verify {
        client_id: matches
            .get_one::<String>("client-id")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --client-id"))?,
        api_key: matches.get_one::<String>("api-key").cloned(),
        hosts: matches
            .get_many::<String>("host")
            .map(|hosts| hosts.cloned().collect()),
        timeout: matches.get_one::<u64>("timeout").copied().unwrap_or(10),
        max_time_window: matches
            .get_one::<u64>("max-time-window")
            .copied()
            .unwrap_or(40),
        sync_level: matches.get_one::<SyncLevel>("sync-level").copied(),
        otps: matches
            .get_many::<String>("otp")
            .map(|otps| otps.cloned().collect())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: otp"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    const OTP: &str = "vvegefendfulhrrihgvibljnnnbikjhnbrtfjlkltvvg";

    #[test]
    fn test_handler_builds_verify_action() {
        let matches = commands::new().get_matches_from(vec![
            "konfirmi",
            "--client-id",
            "1234",
            "--api-key",
            "a2V5MTIzNA==",
            "--timeout",
            "15",
            OTP,
            OTP,
        ]);

        let action = handler(&matches).expect("handler should succeed");

        let Action::Verify {
            client_id,
            api_key,
            hosts,
            timeout,
            max_time_window,
            sync_level,
            otps,
        } = action;

        assert_eq!(client_id, "1234");
        assert_eq!(api_key, Some("a2V5MTIzNA==".to_string()));
        assert_eq!(hosts, None);
        assert_eq!(timeout, 15);
        assert_eq!(max_time_window, 40);
        assert_eq!(sync_level, None);
        assert_eq!(otps, vec![OTP.to_string(), OTP.to_string()]);
    }
}
