pub mod verify;

use crate::wsapi::query::SyncLevel;

#[derive(Debug)]
pub enum Action {
    Verify {
        client_id: String,
        api_key: Option<String>,
        hosts: Option<Vec<String>>,
        timeout: u64,
        max_time_window: u64,
        sync_level: Option<SyncLevel>,
        otps: Vec<String>,
    },
}
