//! Process-level configuration, loaded from a JSON file path given on the
//! command line. Kept separate from `opcua_core::config::Configuration`
//! (the keyed runtime map the core consults for protocol limits) — this is
//! only the handful of settings the binary itself needs before it can
//! build a core.

use std::fs;

use serde_derive::Deserialize;

#[derive(Deserialize)]
pub struct ServerConfig {
    pub channel_id: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_timeout_ms() -> u64 {
    120_000
}

impl Default for ServerConfig {
    fn default() -> ServerConfig {
        ServerConfig { channel_id: 1, log_level: default_log_level(), session_timeout_ms: default_session_timeout_ms() }
    }
}

impl ServerConfig {
    pub fn from_file(path: &str) -> Result<ServerConfig, serde_json::Error> {
        let file = fs::File::open(path).expect("error opening config file");
        serde_json::from_reader(file)
    }
}
