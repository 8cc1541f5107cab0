//! Wires the PFCP client and GTP-U tunnel together, brings the TUN
//! interface up, and runs until an OS termination signal arrives.

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::capability::{NetlinkOps, TunDevice};
use crate::codec::pfcp::SessionParams;
use crate::config::{parse_ue_address, Config};
use crate::error::{Result, UprootError};
use crate::gtpu::GtpuTunnel;
use crate::pfcp::PfcpClient;

/// Brings the TUN interface up, establishes the PFCP session, and runs the
/// GTP-U forwarding loops and heartbeat task until a termination signal
/// arrives. Returns once everything has shut down cleanly.
pub async fn run(cfg: &Config, tun: Arc<dyn TunDevice>, netlink: Arc<dyn NetlinkOps>) -> Result<()> {
    let (ue_addr, prefix_len) = parse_ue_address(&cfg.tun.ue_address)
        .ok_or_else(|| UprootError::Config(format!("invalid tun.ueAddress: {}", cfg.tun.ue_address)))?;

    netlink
        .assign_address(&cfg.tun.name, ue_addr, prefix_len)
        .await
        .map_err(|e| UprootError::TunSetup(e.to_string()))?;
    netlink
        .set_link_up(&cfg.tun.name)
        .await
        .map_err(|e| UprootError::TunSetup(e.to_string()))?;
    info!(interface = %cfg.tun.name, %ue_addr, prefix_len, "TUN interface configured");

    let pfcp = PfcpClient::connect(cfg.upf_ip, cfg.pfcp_port).await?;
    let session = SessionParams {
        local_addr: pfcp.local_addr(),
        ue_address: ue_addr,
        upf_n3_ip: cfg.upf_n3_ip,
        gnb_ip: cfg.gnb_ip,
        teid_local: cfg.teids.local,
        teid_remote: cfg.teids.remote,
    };
    pfcp.establish(&session).await?;
    let pfcp = Arc::new(pfcp);

    let tunnel = GtpuTunnel::new(cfg.gnb_ip, cfg.upf_n3_ip, tun, cfg.teids.local, cfg.teids.remote).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let heartbeat_cfg = cfg.heartbeat.clone();
    let heartbeat_shutdown = shutdown_rx.clone();
    let heartbeat_pfcp = pfcp.clone();
    let heartbeat_task = tokio::spawn(async move {
        heartbeat_pfcp.run_heartbeat_loop(&heartbeat_cfg, heartbeat_shutdown).await;
    });

    let uplink_shutdown = shutdown_rx.clone();
    let downlink_shutdown = shutdown_rx.clone();
    let tunnel = Arc::new(tunnel);
    let uplink_tunnel = tunnel.clone();
    let downlink_tunnel = tunnel.clone();
    let uplink_task = tokio::spawn(async move { uplink_tunnel.run_uplink(uplink_shutdown).await });
    let downlink_task = tokio::spawn(async move { downlink_tunnel.run_downlink(downlink_shutdown).await });

    wait_for_termination().await;
    info!("termination signal received, shutting down");
    let _ = shutdown_tx.send(true);

    let _ = heartbeat_task.await;
    let _ = uplink_task.await;
    let _ = downlink_task.await;

    let tunnel_result = tunnel.close();
    let pfcp_result = pfcp.close();

    match (&tunnel_result, &pfcp_result) {
        (Ok(()), Ok(())) => Ok(()),
        _ => {
            let mut messages = Vec::new();
            if let Err(err) = &tunnel_result {
                messages.push(format!("gtpu tunnel: {err}"));
            }
            if let Err(err) = &pfcp_result {
                messages.push(format!("pfcp client: {err}"));
            }
            let combined = messages.join("; ");
            warn!(error = %combined, "error while closing down");
            Err(UprootError::Shutdown(combined))
        }
    }
}

async fn wait_for_termination() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(err) => {
            warn!(error = %err, "failed to install SIGTERM handler, falling back to SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
