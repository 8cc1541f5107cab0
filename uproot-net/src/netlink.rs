//! Linux netlink operations (address assignment, link up) via `rtnetlink`.

use std::net::{IpAddr, Ipv4Addr};

use futures_util::TryStreamExt;
use rtnetlink::Handle;
use tracing::debug;

use uproot_lib::{BoxFuture, NetError, NetlinkOps};

/// A netlink route socket connection, kept alive by a background task.
pub struct LinuxNetlink {
    handle: Handle,
}

impl LinuxNetlink {
    /// Opens a netlink route socket and spawns the connection's driver task.
    pub fn new() -> Result<Self, NetError> {
        let (connection, handle, _messages) =
            rtnetlink::new_connection().map_err(|e| NetError::Netlink(e.to_string()))?;
        tokio::spawn(connection);
        Ok(Self { handle })
    }

    async fn link_index(&self, interface: &str) -> Result<u32, NetError> {
        let mut links = self.handle.link().get().match_name(interface.to_string()).execute();
        match links.try_next().await.map_err(|e| NetError::Netlink(e.to_string()))? {
            Some(msg) => Ok(msg.header.index),
            None => Err(NetError::Netlink(format!("interface {interface} not found"))),
        }
    }
}

impl NetlinkOps for LinuxNetlink {
    fn assign_address<'a>(
        &'a self,
        interface: &'a str,
        addr: Ipv4Addr,
        prefix_len: u8,
    ) -> BoxFuture<'a, Result<(), NetError>> {
        Box::pin(async move {
            let index = self.link_index(interface).await?;
            debug!(interface, %addr, prefix_len, "assigning address");
            self.handle
                .address()
                .add(index, IpAddr::V4(addr), prefix_len)
                .execute()
                .await
                .map_err(|e| NetError::Netlink(e.to_string()))
        })
    }

    fn set_link_up<'a>(&'a self, interface: &'a str) -> BoxFuture<'a, Result<(), NetError>> {
        Box::pin(async move {
            let index = self.link_index(interface).await?;
            debug!(interface, "bringing link up");
            self.handle
                .link()
                .set(index)
                .up()
                .execute()
                .await
                .map_err(|e| NetError::Netlink(e.to_string()))
        })
    }
}
