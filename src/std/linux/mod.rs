//! A [`LinkDevice`] backed by a Linux `AF_PACKET` raw socket.

mod raw_socket;

use self::raw_socket::RawSocketDesc;
use crate::error::Error;
use crate::fmt;
use crate::link::{LinkDevice, LinkStats};

/// One reference link device: a raw socket bound to a single network interface.
///
/// Other backends (`io_uring`, `xdp`, Windows `pcap`) are intentionally not carried over; this
/// system specifies exactly one trait boundary and one reference implementation behind it (see
/// DESIGN.md).
pub struct LinuxLinkDevice {
    socket: RawSocketDesc,
    stats: LinkStats,
}

impl LinuxLinkDevice {
    /// Open a raw socket bound to `interface`, filtered to the EtherCAT ethertype.
    pub fn new(interface: &str) -> Result<Self, Error> {
        let socket = RawSocketDesc::new(interface).map_err(|e| {
            fmt::error!("failed to open raw socket on interface: {}", e);
            Error::LinkDown
        })?;

        Ok(Self {
            socket,
            stats: LinkStats::default(),
        })
    }
}

impl LinkDevice for LinuxLinkDevice {
    fn transmit(&mut self, frame: &[u8]) -> Result<usize, Error> {
        match self.socket.send(frame) {
            Ok(n) => {
                self.stats.frames_sent += 1;
                Ok(n)
            }
            Err(e) => {
                fmt::error!("send failed: {}", e);
                self.stats.send_errors += 1;
                Err(Error::LinkDown)
            }
        }
    }

    fn receive_into(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.socket.recv(buf) {
            Ok(0) => Ok(0),
            Ok(n) => {
                self.stats.frames_received += 1;
                Ok(n)
            }
            Err(e) => {
                fmt::error!("receive failed: {}", e);
                self.stats.receive_errors += 1;
                Err(Error::LinkDown)
            }
        }
    }

    fn link_up(&self) -> bool {
        // The socket is bound at construction time; a down link surfaces as send/receive
        // errors rather than a separate carrier check here.
        true
    }

    fn stats(&self) -> LinkStats {
        self.stats
    }
}
