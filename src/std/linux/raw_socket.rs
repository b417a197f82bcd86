//! A non-blocking `AF_PACKET` raw socket bound to one interface, filtered to the EtherCAT
//! ethertype.

use crate::frame::ETHERCAT_ETHERTYPE;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

#[repr(C)]
struct Ifreq {
    ifr_name: [libc::c_char; libc::IF_NAMESIZE],
    ifr_ifindex: libc::c_int,
}

pub struct RawSocketDesc {
    fd: RawFd,
}

impl RawSocketDesc {
    pub fn new(name: &str) -> io::Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW | libc::SOCK_NONBLOCK,
                (ETHERCAT_ETHERTYPE as u16).to_be() as i32,
            )
        };

        if fd == -1 {
            return Err(io::Error::last_os_error());
        }

        let mut sock = Self { fd };
        sock.bind_interface(name)?;

        Ok(sock)
    }

    fn bind_interface(&mut self, name: &str) -> io::Result<()> {
        let mut ifreq = Ifreq {
            ifr_name: [0; libc::IF_NAMESIZE],
            ifr_ifindex: 0,
        };

        for (dst, src) in ifreq.ifr_name.iter_mut().zip(name.as_bytes()) {
            *dst = *src as libc::c_char;
        }

        let index = unsafe {
            if libc::ioctl(self.fd, libc::SIOCGIFINDEX, &mut ifreq as *mut Ifreq) == -1 {
                return Err(io::Error::last_os_error());
            }
            ifreq.ifr_ifindex
        };

        let sockaddr = libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: (ETHERCAT_ETHERTYPE as u16).to_be(),
            sll_ifindex: index,
            sll_hatype: 1,
            sll_pkttype: 0,
            sll_halen: 6,
            sll_addr: [0; 8],
        };

        let res = unsafe {
            libc::bind(
                self.fd,
                &sockaddr as *const libc::sockaddr_ll as *const libc::sockaddr,
                core::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };

        if res == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Non-blocking read of one frame. `Ok(0)` means nothing was waiting.
    pub fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len =
            unsafe { libc::recv(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) };

        if len == -1 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(0);
            }
            return Err(err);
        }

        Ok(len as usize)
    }

    pub fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len =
            unsafe { libc::send(self.fd, buf.as_ptr() as *const libc::c_void, buf.len(), 0) };

        if len == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(len as usize)
    }
}

impl AsRawFd for RawSocketDesc {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for RawSocketDesc {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
