#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use uproot_lib::{init_tracing, load_from_path, NetlinkOps, TunDevice};
use uproot_net::{LinuxNetlink, LinuxTun};

#[derive(Parser, Debug)]
#[command(author, version, about = "Minimal 5G user-plane endpoint (gNB/UE emulator)")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "./uproot.yml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            // Logging isn't configured yet without a parsed config; this is
            // the one message this binary ever prints outside tracing.
            eprintln!("failed to load configuration from {:?}: {err}", cli.config);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg.logging);
    info!(config = ?cli.config, upf_ip = %cfg.upf_ip, pfcp_port = cfg.pfcp_port, "configuration loaded");

    let tun: Arc<dyn TunDevice> = match LinuxTun::open(&cfg.tun.name) {
        Ok(tun) => Arc::new(tun),
        Err(err) => {
            error!(%err, interface = %cfg.tun.name, "failed to open TUN device");
            std::process::exit(1);
        }
    };

    let netlink: Arc<dyn NetlinkOps> = match LinuxNetlink::new() {
        Ok(netlink) => Arc::new(netlink),
        Err(err) => {
            error!(%err, "failed to open netlink route socket");
            std::process::exit(1);
        }
    };

    if let Err(err) = uproot_lib::run(&cfg, tun, netlink).await {
        error!(%err, "uproot exited with error");
        std::process::exit(1);
    }
}
