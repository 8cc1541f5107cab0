//! GTP-U data-plane tunnel: forwards packets between a TUN device and a UDP
//! socket connected to the UPF's N3 address.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::capability::TunDevice;
use crate::codec::gtpu::{decode_tpdu, encode_tpdu};
use crate::error::Result;

/// Maximum IP packet size this tunnel forwards; plenty of headroom over a
/// typical 1500-byte MTU interface.
const MAX_PACKET_LEN: usize = 2000;
const GTPU_HEADER_LEN: usize = 8;

/// Owns the UDP socket and TUN handle for one UE's data path and runs the
/// uplink/downlink forwarding loops.
pub struct GtpuTunnel {
    socket: UdpSocket,
    tun: Arc<dyn TunDevice>,
    teid_local: u32,
    teid_remote: u32,
}

impl GtpuTunnel {
    /// Binds a UDP socket to `(gnb_ip, 2152)` connected to `(upf_n3_ip,
    /// 2152)`. `tun` must already have its address assigned and be up.
    pub async fn new(
        gnb_ip: Ipv4Addr,
        upf_n3_ip: Ipv4Addr,
        tun: Arc<dyn TunDevice>,
        teid_local: u32,
        teid_remote: u32,
    ) -> Result<Self> {
        const GTPU_PORT: u16 = 2152;
        let socket = UdpSocket::bind((gnb_ip, GTPU_PORT)).await?;
        socket.connect((upf_n3_ip, GTPU_PORT)).await?;
        Ok(Self::from_socket(socket, tun, teid_local, teid_remote))
    }

    /// Builds a tunnel around an already-bound, already-connected UDP
    /// socket. Exposed for callers (and tests) that need a socket bound to
    /// something other than the fixed `2152` port.
    pub fn from_socket(
        socket: UdpSocket,
        tun: Arc<dyn TunDevice>,
        teid_local: u32,
        teid_remote: u32,
    ) -> Self {
        Self { socket, tun, teid_local, teid_remote }
    }

    /// Reads IP packets from the TUN device and forwards them as GTP-U
    /// T-PDUs to the UPF. Runs until cancelled.
    pub async fn run_uplink(&self, mut shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; GTPU_HEADER_LEN + MAX_PACKET_LEN];

        loop {
            if shutdown.has_changed().unwrap_or(false) {
                return;
            }

            let tun = self.tun.clone();
            let read = tokio::task::spawn_blocking(move || {
                let mut payload_buf = vec![0u8; MAX_PACKET_LEN];
                tun.recv(&mut payload_buf).map(|n| (payload_buf, n))
            })
            .await;

            let (payload, n) = match read {
                Ok(Ok(pair)) => pair,
                Ok(Err(err)) => {
                    warn!(error = %err, "uplink TUN read error");
                    continue;
                }
                Err(join_err) => {
                    warn!(error = %join_err, "uplink read task panicked");
                    continue;
                }
            };
            if n == 0 {
                warn!("uplink TUN read returned zero bytes");
                continue;
            }

            let total = encode_tpdu(&mut buf, self.teid_remote, &payload[..n]);
            if let Err(err) = self.socket.send(&buf[..total]).await {
                warn!(error = %err, "uplink GTP-U send error");
            }
        }
    }

    /// Reads GTP-U datagrams from the UPF and writes the inner IP payload of
    /// accepted T-PDUs to the TUN device. Runs until cancelled.
    pub async fn run_downlink(&self, mut shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; GTPU_HEADER_LEN + MAX_PACKET_LEN];

        loop {
            if shutdown.has_changed().unwrap_or(false) {
                return;
            }

            let n = match self.socket.recv(&mut buf).await {
                Ok(n) => n,
                Err(err) => {
                    // Corrects a latent defect in the reference implementation,
                    // whose read-error branch fell through into a write of a
                    // stale/short buffer instead of retrying immediately.
                    warn!(error = %err, "downlink GTP-U read error");
                    continue;
                }
            };

            let Some(decoded) = decode_tpdu(&buf[..n]) else {
                debug!("dropping non-T-PDU or malformed downlink datagram");
                continue;
            };

            if decoded.teid != self.teid_local {
                debug!(teid = decoded.teid, expected = self.teid_local, "dropping downlink datagram with unexpected TEID");
                continue;
            }

            let payload = buf[decoded.payload_start..n].to_vec();
            let tun = self.tun.clone();
            let write = tokio::task::spawn_blocking(move || tun.send(&payload)).await;
            match write {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => warn!(error = %err, "downlink TUN write error"),
                Err(join_err) => warn!(error = %join_err, "downlink write task panicked"),
            }
        }
    }

    /// Closes the UDP socket's peer binding and the TUN device, aggregating
    /// any error from the latter (the socket itself closes on drop).
    pub fn close(&self) -> Result<()> {
        self.tun.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::codec::gtpu::{FLAGS_V1_NO_OPTIONS, MSG_TYPE_TPDU};

    /// An in-memory `TunDevice` for tests: `recv` yields queued packets (one
    /// per call, blocking briefly if the queue is empty), `send` appends to
    /// a captured list.
    struct FakeTun {
        inbound: Mutex<VecDeque<Vec<u8>>>,
        outbound: Mutex<Vec<Vec<u8>>>,
    }

    impl FakeTun {
        fn with_inbound(packets: Vec<Vec<u8>>) -> Self {
            Self { inbound: Mutex::new(packets.into()), outbound: Mutex::new(Vec::new()) }
        }
    }

    impl TunDevice for FakeTun {
        fn recv(&self, buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                if let Some(packet) = self.inbound.lock().unwrap().pop_front() {
                    buf[..packet.len()].copy_from_slice(&packet);
                    return Ok(packet.len());
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }

        fn send(&self, buf: &[u8]) -> std::io::Result<usize> {
            self.outbound.lock().unwrap().push(buf.to_vec());
            Ok(buf.len())
        }

        fn close(&self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn connected_pair() -> (UdpSocket, UdpSocket) {
        let a = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        let b = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        a.connect(b.local_addr().unwrap()).await.unwrap();
        b.connect(a.local_addr().unwrap()).await.unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn uplink_encodes_tun_packet_as_tpdu_with_teid_remote() {
        let (tunnel_socket, peer_socket) = connected_pair().await;
        let payload = b"uplink ip packet".to_vec();
        let tun = Arc::new(FakeTun::with_inbound(vec![payload.clone()]));
        let tunnel = GtpuTunnel::from_socket(tunnel_socket, tun, 0x10, 0x01);
        let (_tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move { tunnel.run_uplink(rx).await });

        let mut buf = vec![0u8; 64];
        let n = tokio::time::timeout(Duration::from_secs(2), peer_socket.recv(&mut buf))
            .await
            .expect("received a datagram before timeout")
            .unwrap();

        assert_eq!(buf[0], FLAGS_V1_NO_OPTIONS);
        assert_eq!(buf[1], MSG_TYPE_TPDU);
        assert_eq!(u32::from_be_bytes(buf[4..8].try_into().unwrap()), 0x01);
        assert_eq!(&buf[8..n], payload.as_slice());

        task.abort();
    }

    #[tokio::test]
    async fn downlink_drops_wrong_teid_and_delivers_matching_teid() {
        let (tunnel_socket, peer_socket) = connected_pair().await;
        let tun = Arc::new(FakeTun::with_inbound(vec![]));
        let tunnel = GtpuTunnel::from_socket(tunnel_socket, tun.clone(), 0x10, 0x01);
        let (_tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move { tunnel.run_downlink(rx).await });

        let payload = b"downlink ip packet".to_vec();
        let mut wrong_teid = vec![0u8; 8 + payload.len()];
        crate::codec::gtpu::write_header(&mut wrong_teid, 0xDEAD, payload.len() as u16);
        wrong_teid[8..].copy_from_slice(&payload);
        peer_socket.send(&wrong_teid).await.unwrap();

        let mut correct = vec![0u8; 8 + payload.len()];
        crate::codec::gtpu::write_header(&mut correct, 0x10, payload.len() as u16);
        correct[8..].copy_from_slice(&payload);
        peer_socket.send(&correct).await.unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            if tun.outbound.lock().unwrap().len() == 1 {
                break;
            }
            assert!(std::time::Instant::now() < deadline, "downlink packet never delivered");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let delivered = tun.outbound.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0], payload);

        task.abort();
    }
}
