use std::fs;
use std::path::Path;

use crate::config::{parse_ue_address, Config};
use crate::error::{Result, UprootError};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| UprootError::Config(format!("failed to read config file: {e}")))?;
    let cfg: Config = serde_norway::from_str(&txt)
        .map_err(|e| UprootError::Config(format!("failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> Result<()> {
    if cfg.pfcp_port == 0 {
        return Err(UprootError::Config("pfcpPort must be non-zero".to_string()));
    }

    if parse_ue_address(&cfg.tun.ue_address).is_none() {
        return Err(UprootError::Config(format!(
            "invalid tun.ueAddress: {}",
            cfg.tun.ue_address
        )));
    }

    if let Some(threshold) = cfg.heartbeat.miss_threshold {
        if threshold == 0 {
            return Err(UprootError::Config(
                "heartbeat.missThreshold must be non-zero when set".to_string(),
            ));
        }
    }

    Ok(())
}
