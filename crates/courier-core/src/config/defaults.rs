//! Default value functions used by serde for config deserialization.

pub fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

pub fn default_request_timeout() -> u64 {
    15
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_poll_timeout() -> u64 {
    30
}

pub fn default_poll_limit() -> u32 {
    100
}

pub fn default_backoff_initial_ms() -> u64 {
    500
}

pub fn default_backoff_max_secs() -> u64 {
    30
}

pub fn default_channel_capacity() -> usize {
    100
}

pub fn default_db_path() -> String {
    "~/.courier/data/offset.db".to_string()
}
