//! Linux TUN device: opens `/dev/net/tun`, creates an `IFF_TUN | IFF_NO_PI`
//! interface, and implements blocking read/write on the resulting fd.

use std::ffi::c_void;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};

use uproot_lib::TunDevice;

const TUN_DEV_PATH: &str = "/dev/net/tun";
const IF_NAMESIZE: usize = 16;
const IFF_TUN: libc::c_short = 0x0001;
const IFF_NO_PI: libc::c_short = 0x1000;

#[repr(C)]
struct IfReqCreate {
    name: [libc::c_char; IF_NAMESIZE],
    flags: libc::c_short,
    _pad: [u8; 22],
}

// TUNSETIFF is `_IOW('T', 202, int)` in the kernel headers; the argument
// actually passed is a `struct ifreq *`, not an `int` — the ioctl number is
// fixed from `sizeof(int)` regardless of the true argument type, a
// historical quirk of the TUN/TAP ioctl interface.
nix::ioctl_write_ptr!(tunsetiff, b'T', 202, IfReqCreate);

/// A TUN device file descriptor, owned and closed exactly once.
pub struct LinuxTun {
    fd: RawFd,
    closed: AtomicBool,
}

impl LinuxTun {
    /// Opens `/dev/net/tun` and creates (or attaches to) interface `name`.
    pub fn open(name: &str) -> io::Result<Self> {
        if name.len() >= IF_NAMESIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "interface name too long"));
        }

        let file = OpenOptions::new().read(true).write(true).open(TUN_DEV_PATH)?;

        let mut ifreq = IfReqCreate { name: [0; IF_NAMESIZE], flags: IFF_TUN | IFF_NO_PI, _pad: [0; 22] };
        for (dst, src) in ifreq.name.iter_mut().zip(name.as_bytes()) {
            *dst = *src as libc::c_char;
        }

        // SAFETY: `file`'s fd is open for the duration of this call and
        // `ifreq` is laid out to match the fields of the kernel's
        // `struct ifreq` that TUNSETIFF reads and writes.
        unsafe { tunsetiff(file.as_raw_fd(), &ifreq) }.map_err(io::Error::from)?;

        // Take ownership of the fd directly so `File`'s `Drop` doesn't race
        // with our own `close`.
        let fd = file.into_raw_fd();
        Ok(Self { fd, closed: AtomicBool::new(false) })
    }
}

impl TunDevice for LinuxTun {
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for writes of `buf.len()` bytes for the
        // duration of the call; `self.fd` is open for reading until closed.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: `buf` is valid for reads of `buf.len()` bytes; `self.fd`
        // is open for writing until closed.
        let n = unsafe { libc::write(self.fd, buf.as_ptr() as *const c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // SAFETY: `self.fd` was opened by `open` above and has not been
        // closed yet (guarded by `closed`).
        let res = unsafe { libc::close(self.fd) };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for LinuxTun {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
