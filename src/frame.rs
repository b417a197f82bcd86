//! Wire encode/decode for whole EtherCAT frames: the 2-byte frame header plus a chain of
//! datagrams, each with its own 10-byte header and trailing 2-byte working counter.

use crate::command::Command;
use crate::datagram::Datagram;
use crate::error::{Error, PduError, PduValidationError};
use crate::wire::{read_bits_u16, write_bits_u16, WireRead, WireWrite};

/// EtherCAT over raw Ethernet ethertype (ETG1000.4).
pub const ETHERCAT_ETHERTYPE: u16 = 0x88a4;

/// Minimum total Ethernet frame payload (header + datagrams), per 802.3.
pub const ETHERNET_MIN_FRAME: usize = 46;

const FRAME_HEADER_LEN: usize = 2;
const DATAGRAM_HEADER_LEN: usize = 10;
const WORKING_COUNTER_LEN: usize = 2;

/// Per-datagram header fields, before/after the payload.
struct DatagramHeader {
    command_code: u8,
    index: u8,
    address: [u8; 4],
    len: u16,
    more_follows: bool,
    circulating: bool,
    irq: u16,
}

impl DatagramHeader {
    fn pack(&self, buf: &mut [u8]) -> Result<(), Error> {
        if buf.len() < DATAGRAM_HEADER_LEN {
            return Err(Error::Pdu(PduError::TooLong));
        }

        buf[0] = self.command_code;
        buf[1] = self.index;
        buf[2..6].copy_from_slice(&self.address);

        let mut len_word = write_bits_u16(0, 0, 11, self.len);
        len_word = write_bits_u16(len_word, 14, 1, self.circulating as u16);
        len_word = write_bits_u16(len_word, 15, 1, self.more_follows as u16);
        len_word.pack_to_slice(&mut buf[6..8])?;

        self.irq.pack_to_slice(&mut buf[8..10])?;

        Ok(())
    }

    fn unpack(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < DATAGRAM_HEADER_LEN {
            return Err(Error::Pdu(PduError::Decode));
        }

        let command_code = buf[0];
        let index = buf[1];
        let mut address = [0u8; 4];
        address.copy_from_slice(&buf[2..6]);

        let len_word = u16::unpack_from_slice(&buf[6..8])?;
        let len = read_bits_u16(len_word, 0, 11);
        let circulating = read_bits_u16(len_word, 14, 1) != 0;
        let more_follows = read_bits_u16(len_word, 15, 1) != 0;

        let irq = u16::unpack_from_slice(&buf[8..10])?;

        Ok(Self {
            command_code,
            index,
            address,
            len,
            more_follows,
            circulating,
            irq,
        })
    }
}

/// Pack as many `Queued` datagrams as fit under `mtu` into one frame, marking each `Sent`.
///
/// Returns the number of bytes written and the number of datagrams consumed. The caller (the
/// engine's `send()`) is responsible for leaving datagrams that didn't fit for the next frame.
pub fn pack_frame(buf: &mut [u8], datagrams: &mut [&mut Datagram]) -> Result<(usize, usize), Error> {
    if buf.len() < FRAME_HEADER_LEN {
        return Err(Error::Pdu(PduError::TooLong));
    }

    let mut offset = FRAME_HEADER_LEN;
    let mut packed = 0usize;
    let mut last_header_pos: Option<usize> = None;

    for dg in datagrams.iter_mut() {
        let needed = DATAGRAM_HEADER_LEN + dg.payload().len() + WORKING_COUNTER_LEN;

        if offset + needed > buf.len() {
            break;
        }

        let header_pos = offset;

        let mut addr = [0u8; 4];
        dg.command.pack_address(&mut addr)?;

        let header = DatagramHeader {
            command_code: dg.command.code(),
            index: dg.index,
            address: addr,
            len: dg.payload().len() as u16,
            more_follows: false,
            circulating: false,
            irq: 0,
        };

        header.pack(&mut buf[offset..offset + DATAGRAM_HEADER_LEN])?;
        offset += DATAGRAM_HEADER_LEN;

        buf[offset..offset + dg.payload().len()].copy_from_slice(dg.payload());
        offset += dg.payload().len();

        // Working counter slot, zeroed until a reply fills it in.
        buf[offset..offset + WORKING_COUNTER_LEN].copy_from_slice(&[0, 0]);
        offset += WORKING_COUNTER_LEN;

        if let Some(prev) = last_header_pos {
            let prev_len = u16::unpack_from_slice(&buf[prev + 6..prev + 8])?;
            let with_more = write_bits_u16(prev_len, 15, 1, 1);
            with_more.pack_to_slice(&mut buf[prev + 6..prev + 8])?;
        }

        last_header_pos = Some(header_pos);
        packed += 1;
    }

    let frame_len = write_bits_u16(0, 0, 11, (offset - FRAME_HEADER_LEN) as u16);
    let frame_len = write_bits_u16(frame_len, 12, 4, 0x1);
    frame_len.pack_to_slice(&mut buf[0..2])?;

    if offset < ETHERNET_MIN_FRAME {
        for b in &mut buf[offset..ETHERNET_MIN_FRAME] {
            *b = 0;
        }
        offset = ETHERNET_MIN_FRAME;
    }

    Ok((offset, packed))
}

/// One parsed datagram reply, as found inside a received frame.
pub struct ReceivedDatagram<'a> {
    pub command_code: u8,
    pub index: u8,
    pub address: [u8; 4],
    pub payload: &'a [u8],
    pub working_counter: u16,
}

/// Iterator over the datagrams chained inside one received frame's payload.
pub struct FrameReader<'a> {
    buf: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> FrameReader<'a> {
    /// Validate the frame header and build a reader over its datagram chain.
    pub fn new(buf: &'a [u8]) -> Result<Self, Error> {
        if buf.len() < FRAME_HEADER_LEN {
            return Err(Error::Corrupted(PduValidationError::LengthMismatch {
                declared: 0,
                actual: buf.len(),
            }));
        }

        let header = u16::unpack_from_slice(&buf[0..2])?;
        let declared = read_bits_u16(header, 0, 11) as usize;
        let actual = buf.len() - FRAME_HEADER_LEN;

        if declared > actual {
            return Err(Error::Corrupted(PduValidationError::LengthMismatch {
                declared,
                actual,
            }));
        }

        Ok(Self {
            buf: &buf[FRAME_HEADER_LEN..FRAME_HEADER_LEN + declared],
            offset: 0,
            done: false,
        })
    }
}

impl<'a> Iterator for FrameReader<'a> {
    type Item = Result<ReceivedDatagram<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.buf.len() {
            return None;
        }

        let header = match DatagramHeader::unpack(&self.buf[self.offset..]) {
            Ok(h) => h,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let payload_start = self.offset + DATAGRAM_HEADER_LEN;
        let payload_end = payload_start + header.len as usize;
        let wc_end = payload_end + WORKING_COUNTER_LEN;

        if wc_end > self.buf.len() {
            self.done = true;
            return Some(Err(Error::Corrupted(PduValidationError::LengthMismatch {
                declared: header.len as usize,
                actual: self.buf.len().saturating_sub(payload_start),
            })));
        }

        let payload = &self.buf[payload_start..payload_end];
        let working_counter = match u16::unpack_from_slice(&self.buf[payload_end..wc_end]) {
            Ok(wc) => wc,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        if !header.more_follows {
            self.done = true;
        }

        self.offset = wc_end;

        Some(Ok(ReceivedDatagram {
            command_code: header.command_code,
            index: header.index,
            address: header.address,
            payload,
            working_counter,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;

    #[test]
    fn single_datagram_roundtrip() {
        let mut dg = Datagram::new();
        dg.init(0, Command::fprd(0x1001, 0x0130), &[0xaa, 0xbb, 0xcc, 0xdd]);
        dg.index = 7;

        let mut buf = [0u8; 64];
        let (len, packed) = pack_frame(&mut buf, &mut [&mut dg]).unwrap();
        assert_eq!(packed, 1);
        assert!(len >= ETHERNET_MIN_FRAME);

        let mut reader = FrameReader::new(&buf[..len]).unwrap();
        let reply = reader.next().unwrap().unwrap();

        assert_eq!(reply.command_code, Command::fprd(0, 0).code());
        assert_eq!(reply.index, 7);
        assert_eq!(reply.payload, &[0xaa, 0xbb, 0xcc, 0xdd]);
        assert!(reader.next().is_none());
    }

    #[test]
    fn two_datagrams_chain_more_follows() {
        let mut a = Datagram::new();
        a.init(0, Command::fprd(1, 0), &[1, 2]);
        a.index = 1;

        let mut b = Datagram::new();
        b.init(0, Command::fprd(2, 0), &[3, 4]);
        b.index = 2;

        let mut buf = [0u8; 64];
        let (len, packed) = pack_frame(&mut buf, &mut [&mut a, &mut b]).unwrap();
        assert_eq!(packed, 2);

        let replies: Vec<_> = FrameReader::new(&buf[..len])
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].payload, &[1, 2]);
        assert_eq!(replies[1].payload, &[3, 4]);
    }

    #[test]
    fn pads_to_minimum_frame_size() {
        let mut dg = Datagram::new();
        dg.init(0, Command::brd(0), &[]);

        let mut buf = [0u8; ETHERNET_MIN_FRAME + 16];
        let (len, _) = pack_frame(&mut buf, &mut [&mut dg]).unwrap();

        assert_eq!(len, ETHERNET_MIN_FRAME);
    }
}
