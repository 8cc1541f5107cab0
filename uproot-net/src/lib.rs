//! Linux-specific capability implementations: a TUN device and the netlink
//! calls needed to bring it up. This is the one crate in the workspace
//! allowed to use `unsafe`.

mod netlink;
mod tun;

pub use netlink::LinuxNetlink;
pub use tun::LinuxTun;
