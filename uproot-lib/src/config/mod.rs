mod loader;
mod types;

pub use loader::load_from_path;
pub use types::{parse_ue_address, HeartbeatConfig, LoggingConfig, TeidsConfig, TunConfig};

use serde::Deserialize;
use std::net::Ipv4Addr;

/// Top-level configuration loaded from the YAML config file.
///
/// The four address/port fields are mandatory; everything else is an
/// optional, defaulted ambient section.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PFCP peer (the UPF's N4 address).
    #[serde(rename = "upfIP")]
    pub upf_ip: Ipv4Addr,
    /// PFCP peer port, typically 8805.
    #[serde(rename = "pfcpPort")]
    pub pfcp_port: u16,
    /// GTP-U peer (the UPF's N3 address).
    #[serde(rename = "upfN3IP")]
    pub upf_n3_ip: Ipv4Addr,
    /// Local address bound for GTP-U.
    #[serde(rename = "gnbIP")]
    pub gnb_ip: Ipv4Addr,

    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub tun: TunConfig,
    #[serde(default)]
    pub teids: TeidsConfig,
}
