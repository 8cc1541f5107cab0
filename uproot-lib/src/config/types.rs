use serde::Deserialize;
use std::net::Ipv4Addr;

/// Logging configuration.
///
/// `level` is a `tracing_subscriber::EnvFilter` directive string; `RUST_LOG`
/// always takes precedence when set, matching `uproot::init_tracing`.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, rename = "showTarget")]
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), show_target: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Heartbeat cadence and optional miss-escalation threshold.
#[derive(Debug, Deserialize, Clone)]
pub struct HeartbeatConfig {
    #[serde(default = "default_heartbeat_interval", rename = "intervalSecs")]
    pub interval_secs: u64,
    /// Consecutive missed heartbeat responses before the heartbeat loop logs
    /// an error and stops. `None` preserves the reference behavior of never
    /// escalating.
    #[serde(default, rename = "missThreshold")]
    pub miss_threshold: Option<u32>,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_secs: default_heartbeat_interval(), miss_threshold: None }
    }
}

fn default_heartbeat_interval() -> u64 {
    2
}

/// TUN interface naming and the UE address assigned to it.
#[derive(Debug, Deserialize, Clone)]
pub struct TunConfig {
    #[serde(default = "default_tun_name")]
    pub name: String,
    #[serde(default = "default_ue_address", rename = "ueAddress")]
    pub ue_address: String,
}

impl Default for TunConfig {
    fn default() -> Self {
        Self { name: default_tun_name(), ue_address: default_ue_address() }
    }
}

fn default_tun_name() -> String {
    "uproot0".to_string()
}

fn default_ue_address() -> String {
    "172.250.0.42/24".to_string()
}

/// Fixed TEIDs for the single emulated session.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct TeidsConfig {
    #[serde(default = "default_teid_local")]
    pub local: u32,
    #[serde(default = "default_teid_remote")]
    pub remote: u32,
}

impl Default for TeidsConfig {
    fn default() -> Self {
        Self { local: default_teid_local(), remote: default_teid_remote() }
    }
}

fn default_teid_local() -> u32 {
    0x10
}

fn default_teid_remote() -> u32 {
    0x01
}

/// Parsed `ueAddress` (address, CIDR prefix length).
pub fn parse_ue_address(s: &str) -> Option<(Ipv4Addr, u8)> {
    let (addr, prefix) = s.split_once('/')?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    Some((addr, prefix))
}
