//! Process data domains: a logically-addressed slice of the PDI shared by a group of slaves,
//! exchanged with one `LRW` datagram per cycle.

use crate::command::Command;
use crate::datagram::{Datagram, DatagramState, MAX_PAYLOAD as MAX_DATAGRAM_PAYLOAD};
use crate::engine::Engine;
use crate::error::{Error, Item};
use crate::pdi::{PdiOffset, PdiSegment};

/// Upper bound on one domain's logical image. A domain datagram rides in a single frame
/// alongside the master FSM's own housekeeping datagrams, so it shares the datagram payload cap.
pub const MAX_DOMAIN_SIZE: usize = MAX_DATAGRAM_PAYLOAD;

/// Upper bound on how many slaves can be registered into one domain.
pub const MAX_DOMAIN_SLAVES: usize = 64;

/// Where one slave's process data lives inside a domain's image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DomainEntry {
    position: u16,
    segment_start: usize,
    segment_end: usize,
}

/// A logically-addressed process data image, exchanged with slaves mapped into it via one `LRW`
/// datagram per [`Domain::queue`]/[`Domain::process`] pair.
///
/// Grounded on the logical addressing scheme `maindevice.rs`'s `Client` uses for its PDI group
/// exchange: one `LRW` covering every slave's FMMU-mapped region, working counter compared
/// against the number of slaves mapped in.
pub struct Domain {
    logical_address: u32,
    image: heapless::Vec<u8, MAX_DOMAIN_SIZE>,
    datagram: Datagram,
    working_counter: u16,
    entries: heapless::Vec<DomainEntry, MAX_DOMAIN_SLAVES>,
}

impl Domain {
    pub fn new(logical_address: u32) -> Self {
        Self {
            logical_address,
            image: heapless::Vec::new(),
            datagram: Datagram::new(),
            working_counter: 0,
            entries: heapless::Vec::new(),
        }
    }

    /// Extend this domain's image by `size` bytes for one slave, advancing `offset` the way a
    /// slave's FMMU mapping advances the shared PDI accumulator, and return the byte range the
    /// caller should map that slave's FMMU onto.
    pub fn register_slave(&mut self, position: u16, size: usize, offset: &mut PdiOffset) -> Result<PdiSegment, Error> {
        if self.image.len() + size > MAX_DOMAIN_SIZE {
            return Err(Error::BufferTooSmall {
                capacity: MAX_DOMAIN_SIZE,
                required: self.image.len() + size,
            });
        }

        let start = self.image.len();
        for _ in 0..size {
            self.image.push(0).map_err(|_| Error::OutOfMemory)?;
        }
        let end = self.image.len();

        self.entries
            .push(DomainEntry {
                position,
                segment_start: start,
                segment_end: end,
            })
            .map_err(|_| Error::OutOfMemory)?;

        *offset = offset.increment(size as u16);

        Ok(PdiSegment { bytes: start..end })
    }

    /// The byte range within this domain's image belonging to the slave at `position`, if one
    /// was registered.
    pub fn segment(&self, position: u16) -> Option<PdiSegment> {
        self.entries
            .iter()
            .find(|e| e.position == position)
            .map(|e| PdiSegment {
                bytes: e.segment_start..e.segment_end,
            })
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    pub fn working_counter(&self) -> u16 {
        self.working_counter
    }

    /// Expected working counter for a full, healthy exchange: one count per mapped slave.
    pub fn expected_working_counter(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Build and queue this domain's `LRW` datagram for the next send.
    pub fn queue(&mut self, link: u8, engine: &Engine) -> Result<(), Error> {
        self.datagram.init(link, Command::lrw(self.logical_address), &self.image);
        engine.queue(&mut self.datagram)
    }

    /// Pull the reply out of this domain's datagram after a `send()`/`receive()` round trip,
    /// copying the exchanged image back and returning the working counter observed.
    ///
    /// Returns [`Error::Again`] if the datagram hasn't resolved yet (still `Queued`/`Sent`), so a
    /// caller polling across cycles can distinguish "not ready" from a real failure.
    pub fn process(&mut self) -> Result<u16, Error> {
        match self.datagram.state() {
            DatagramState::Received => {
                let len = self.image.len().min(self.datagram.payload().len());
                self.image[..len].copy_from_slice(&self.datagram.payload()[..len]);
                self.working_counter = self.datagram.working_counter;
                Ok(self.working_counter)
            }
            DatagramState::TimedOut | DatagramState::Errored => Err(Error::NotFound {
                item: Item::Domain,
                index: None,
            }),
            _ => Err(Error::Again),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_slave_grows_image_and_wkc() {
        let mut domain = Domain::new(0);
        let mut offset = PdiOffset::default();

        let seg_a = domain.register_slave(0, 4, &mut offset).unwrap();
        let seg_b = domain.register_slave(1, 2, &mut offset).unwrap();

        assert_eq!(seg_a.bytes, 0..4);
        assert_eq!(seg_b.bytes, 4..6);
        assert_eq!(domain.image().len(), 6);
        assert_eq!(offset.start_address, 6);
        assert_eq!(domain.expected_working_counter(), 2);
        assert_eq!(domain.segment(1), Some(seg_b));
    }

    #[test]
    fn process_rejects_unreceived_datagram() {
        let mut domain = Domain::new(0);
        assert!(matches!(domain.process(), Err(Error::Again)));
    }
}
