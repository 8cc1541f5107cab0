//! Capability traits separating platform-specific, unsafe-touching IO from
//! the protocol logic in this crate. Concrete implementations live in the
//! companion `uproot-net` crate, which is where `unsafe` is allowed to live.

use std::future::Future;
use std::io;
use std::net::Ipv4Addr;
use std::pin::Pin;

use thiserror::Error;

/// Errors raised by a [`NetlinkOps`] implementation.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("netlink error: {0}")]
    Netlink(String),
}

/// A boxed, `Send` future, used to keep [`NetlinkOps`] object-safe without
/// pulling in an async-trait macro for two methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Blocking read/write access to a TUN device carrying raw IP packets.
///
/// Methods are synchronous; callers on an async runtime are expected to run
/// them via `spawn_blocking`, matching how the real file descriptor behaves.
pub trait TunDevice: Send + Sync {
    /// Reads one packet into `buf`, returning the number of bytes read.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
    /// Writes one packet. Returns the number of bytes written.
    fn send(&self, buf: &[u8]) -> io::Result<usize>;
    /// Releases the underlying file descriptor. Idempotent.
    fn close(&self) -> io::Result<()>;
}

/// Address and link-state operations needed to bring a TUN interface up.
pub trait NetlinkOps: Send + Sync {
    /// Assigns `addr/prefix_len` to `interface`.
    fn assign_address<'a>(
        &'a self,
        interface: &'a str,
        addr: Ipv4Addr,
        prefix_len: u8,
    ) -> BoxFuture<'a, Result<(), NetError>>;

    /// Brings `interface` up (`IFF_UP`).
    fn set_link_up<'a>(&'a self, interface: &'a str) -> BoxFuture<'a, Result<(), NetError>>;
}
