//! PFCP control-plane client: discovers a local address, performs the
//! association-setup and session-establishment handshake, then runs a
//! background heartbeat loop.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::codec::pfcp::{
    build_association_setup_request, build_heartbeat_request, build_session_establishment_request,
    decode, ie, message_type, parse_cause, SessionParams,
};
use crate::config::HeartbeatConfig;
use crate::error::{Result, UprootError};

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch.
const NTP_UNIX_EPOCH_OFFSET_SECS: u64 = 2_208_988_800;
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// An established PFCP session with the UPF: the bound socket, the local
/// address it discovered, and the monotonic sequence counter for requests.
pub struct PfcpClient {
    socket: UdpSocket,
    local_addr: Ipv4Addr,
    recovery_timestamp: u32,
    sequence: AtomicU32,
}

impl PfcpClient {
    /// Discovers the local source address used to reach `upf_ip` via a
    /// throwaway UDP `connect`, then binds the real PFCP socket to it.
    pub async fn connect(upf_ip: Ipv4Addr, upf_port: u16) -> Result<Self> {
        let probe = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        probe.connect((upf_ip, upf_port)).await?;
        let local_addr = match probe.local_addr()? {
            SocketAddr::V4(addr) => *addr.ip(),
            SocketAddr::V6(_) => {
                return Err(UprootError::PfcpTransport(
                    "kernel chose an IPv6 local address for an IPv4 peer".to_string(),
                ))
            }
        };
        drop(probe);

        let socket = UdpSocket::bind((local_addr, 0)).await?;
        socket.connect((upf_ip, upf_port)).await?;
        info!(%local_addr, %upf_ip, upf_port, "PFCP: bound local socket");

        Ok(Self {
            socket,
            local_addr,
            recovery_timestamp: unix_to_ntp(SystemTime::now()),
            sequence: AtomicU32::new(0),
        })
    }

    /// The address discovered by [`PfcpClient::connect`].
    pub fn local_addr(&self) -> Ipv4Addr {
        self.local_addr
    }

    /// Closes the PFCP UDP socket.
    ///
    /// `tokio::net::UdpSocket` closes its file descriptor on drop and has no
    /// fallible close in safe code, and `uproot-lib` forbids `unsafe` so it
    /// can't duplicate `LinuxTun::close`'s raw `libc::close`. This exists so
    /// `orchestrator::run` can aggregate the PFCP and GTP-U shutdown results
    /// uniformly, regardless of which side ever gains a fallible close.
    pub fn close(&self) -> Result<()> {
        Ok(())
    }

    fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Sends `request` and waits for the next PFCP message of type `expect`,
    /// discarding malformed datagrams, mismatched message types, and read
    /// timeouts (each logged) until one matches.
    async fn send_and_await(&self, request: &[u8], expect: u8) -> Result<Vec<u8>> {
        self.socket.send(request).await?;
        let mut buf = vec![0u8; 2048];
        loop {
            let n = match timeout(READ_TIMEOUT, self.socket.recv(&mut buf)).await {
                Ok(result) => result?,
                Err(_elapsed) => {
                    warn!(timeout = ?READ_TIMEOUT, "PFCP read timed out, retrying");
                    continue;
                }
            };
            let Some(msg) = decode(&buf[..n]) else {
                debug!("dropping malformed PFCP datagram");
                continue;
            };
            if msg.message_type != expect {
                debug!(got = msg.message_type, want = expect, "ignoring unexpected PFCP message type");
                continue;
            }
            return Ok(msg.body.to_vec());
        }
    }

    /// Runs association setup followed by session establishment. Returns an
    /// error if either response is not accepted.
    pub async fn establish(&self, session: &SessionParams) -> Result<()> {
        info!("PFCP: association setup");
        let assoc_req =
            build_association_setup_request(self.local_addr, self.recovery_timestamp, self.next_sequence());
        let assoc_resp =
            self.send_and_await(&assoc_req, message_type::ASSOCIATION_SETUP_RESPONSE).await?;
        require_accepted(parse_cause(&assoc_resp), "association setup")?;
        info!("PFCP: association established");

        info!("PFCP: session establishment");
        let est_req = build_session_establishment_request(session, self.next_sequence());
        let est_resp = self
            .send_and_await(&est_req, message_type::SESSION_ESTABLISHMENT_RESPONSE)
            .await?;
        require_accepted(parse_cause(&est_resp), "session establishment")?;
        info!("PFCP: session established");

        Ok(())
    }

    /// Sends a Heartbeat Request every `cfg.interval_secs` until `shutdown`
    /// fires. If `cfg.miss_threshold` is set, that many consecutive
    /// unanswered heartbeats stop the loop (the datapath is left running).
    pub async fn run_heartbeat_loop(&self, cfg: &HeartbeatConfig, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs));
        let mut consecutive_misses = 0u32;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("PFCP: heartbeat loop stopping on shutdown");
                    return;
                }
            }

            let req = build_heartbeat_request(self.recovery_timestamp, self.next_sequence());
            match self.send_heartbeat_once(&req).await {
                Ok(true) => consecutive_misses = 0,
                Ok(false) => {
                    consecutive_misses += 1;
                    warn!(consecutive_misses, "PFCP heartbeat response not received in time");
                }
                Err(err) => {
                    consecutive_misses += 1;
                    warn!(error = %err, consecutive_misses, "PFCP heartbeat send/receive failed");
                }
            }

            if consecutive_misses > 0 {
                if let Some(threshold) = cfg.miss_threshold {
                    if consecutive_misses >= threshold {
                        error!(
                            consecutive_misses,
                            threshold, "PFCP heartbeat exceeded miss threshold, stopping heartbeat loop"
                        );
                        return;
                    }
                }
            }
        }
    }

    /// Sends one Heartbeat Request and waits, once, up to [`READ_TIMEOUT`]
    /// for a matching Heartbeat Response. Unlike [`PfcpClient::send_and_await`],
    /// this does not retry past a timeout — a timeout or a non-matching
    /// message both count as a miss for the caller's escalation counter,
    /// matching "reads the next inbound message" rather than "reads until
    /// the right one arrives".
    async fn send_heartbeat_once(&self, request: &[u8]) -> Result<bool> {
        self.socket.send(request).await?;
        let mut buf = vec![0u8; 2048];
        match timeout(READ_TIMEOUT, self.socket.recv(&mut buf)).await {
            Ok(result) => {
                let n = result?;
                match decode(&buf[..n]) {
                    Some(msg) if msg.message_type == message_type::HEARTBEAT_RESPONSE => Ok(true),
                    Some(msg) => {
                        debug!(got = msg.message_type, "received non-heartbeat message while awaiting heartbeat response");
                        Ok(false)
                    }
                    None => {
                        debug!("dropping malformed datagram while awaiting heartbeat response");
                        Ok(false)
                    }
                }
            }
            Err(_elapsed) => Ok(false),
        }
    }
}

fn require_accepted(cause: Option<u8>, step: &str) -> Result<()> {
    match cause {
        Some(ie::CAUSE_REQUEST_ACCEPTED) => Ok(()),
        other => Err(UprootError::PfcpProtocol(format!("{step} rejected, cause = {other:?}"))),
    }
}

fn unix_to_ntp(time: SystemTime) -> u32 {
    let unix_secs = time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    (unix_secs + NTP_UNIX_EPOCH_OFFSET_SECS) as u32
}
