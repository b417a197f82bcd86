//! Sequential SII category reader.
//!
//! Walks a category's data a chunk at a time through whatever [`EepromAccess`](crate::eeprom::EepromAccess)
//! implementation the caller supplies, buffering one raw SII read's worth of bytes so repeated
//! small reads don't always round-trip to the slave.

use crate::eeprom::EepromAccess;
use crate::error::{EepromError, Error};

/// EEPROM section reader.
///
/// Controls an internal pointer to sequentially read data from a section in a slave's EEPROM.
pub struct EepromSectionReader<'a, A> {
    access: &'a mut A,

    /// Start address, in words. EEPROM is structured as 16 bit words, so address strides must be
    /// halved to step correctly.
    start: u16,

    /// Category length in bytes. The maximum number of bytes this reader will return.
    len: u16,

    /// Number of bytes read so far.
    byte_count: u16,

    buffered: heapless::Vec<u8, 8>,
}

impl<'a, A> EepromSectionReader<'a, A>
where
    A: EepromAccess,
{
    /// Read an arbitrary chunk of the EEPROM given a known start address and length, bypassing
    /// category lookup.
    pub fn start_at(access: &'a mut A, address: u16, len_bytes: u16) -> Self {
        Self {
            access,
            len: len_bytes,
            byte_count: 0,
            start: address,
            buffered: heapless::Vec::new(),
        }
    }

    fn fill(&mut self) -> Result<(), Error> {
        if !self.buffered.is_empty() {
            return Ok(());
        }

        let chunk = self.access.read_sii_raw(self.start)?;
        self.start += (chunk.len() / 2) as u16;

        self.buffered = heapless::Vec::new();
        let _ = self.buffered.extend_from_slice(&chunk);

        Ok(())
    }

    /// Read the next byte from the EEPROM, or `None` once the section is exhausted.
    pub fn next(&mut self) -> Result<Option<u8>, Error> {
        if self.byte_count >= self.len {
            return Ok(None);
        }

        self.fill()?;

        let Some(byte) = self.buffered.first().copied() else {
            return Ok(None);
        };

        self.buffered.remove(0);
        self.byte_count += 1;

        Ok(Some(byte))
    }

    /// Skip a given number of bytes.
    pub fn skip(&mut self, skip: u16) -> Result<(), Error> {
        for _ in 0..skip {
            self.next()?;
        }

        Ok(())
    }

    /// Try reading the next byte in the current section, erroring on overrun.
    pub fn try_next(&mut self) -> Result<u8, Error> {
        self.next()?.ok_or(Error::Eeprom(EepromError::SectionOverrun))
    }

    /// Attempt to read exactly `N` bytes, erroring if the section runs out first.
    pub fn take_vec_exact<const N: usize>(&mut self) -> Result<heapless::Vec<u8, N>, Error> {
        self.take_vec_len_exact(N)
    }

    /// Read up to `N` bytes, returning `None` if the section runs out before filling the buffer.
    pub fn take_vec<const N: usize>(&mut self) -> Result<Option<heapless::Vec<u8, N>>, Error> {
        self.take_vec_len(N)
    }

    /// Try to take `len` bytes, erroring if `N` is too small or the section runs out first.
    pub fn take_vec_len_exact<const N: usize>(&mut self, len: usize) -> Result<heapless::Vec<u8, N>, Error> {
        self.take_vec_len(len)?.ok_or(Error::Eeprom(EepromError::SectionUnderrun))
    }

    /// Try to take `len` bytes, erroring if `N` is too small. Returns `None` if the section runs
    /// out before filling the buffer.
    pub fn take_vec_len<const N: usize>(&mut self, len: usize) -> Result<Option<heapless::Vec<u8, N>>, Error> {
        let mut buf: heapless::Vec<u8, N> = heapless::Vec::new();
        let mut count = 0;

        loop {
            if count >= len {
                return Ok(Some(buf));
            }

            if buf.is_full() {
                return Err(Error::Eeprom(EepromError::SectionOverrun));
            }

            match self.next()? {
                Some(byte) => {
                    // SAFETY: checked not full above.
                    unsafe { buf.push_unchecked(byte) };
                    count += 1;
                }
                None => return Ok(None),
            }
        }
    }

    pub fn remaining_bytes(&self) -> u16 {
        self.len.saturating_sub(self.byte_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;

    struct FakeEeprom {
        words: heapless::Vec<[u8; 8], 64>,
        reads: RefCell<usize>,
    }

    impl EepromAccess for FakeEeprom {
        fn read_sii_raw(&mut self, word_address: u16) -> Result<[u8; 8], Error> {
            *self.reads.borrow_mut() += 1;
            self.words
                .get(usize::from(word_address) / 4)
                .copied()
                .ok_or(Error::Eeprom(EepromError::SectionOverrun))
        }
    }

    fn fake(words: &[[u8; 8]]) -> FakeEeprom {
        let mut v = heapless::Vec::new();
        for w in words {
            let _ = v.push(*w);
        }
        FakeEeprom {
            words: v,
            reads: RefCell::new(0),
        }
    }

    #[test]
    fn reads_bytes_across_chunk_boundary() {
        let mut dev = fake(&[[1, 2, 3, 4, 5, 6, 7, 8]]);
        let mut reader = EepromSectionReader::start_at(&mut dev, 0, 5);

        let bytes: heapless::Vec<u8, 5> = reader.take_vec_exact().unwrap();
        assert_eq!(&bytes[..], &[1, 2, 3, 4, 5]);
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn skip_advances_without_returning_bytes() {
        let mut dev = fake(&[[1, 2, 3, 4, 5, 6, 7, 8]]);
        let mut reader = EepromSectionReader::start_at(&mut dev, 0, 8);

        reader.skip(2).unwrap();
        assert_eq!(reader.try_next().unwrap(), 3);
    }

    #[test]
    fn take_vec_len_underrun_errors() {
        let mut dev = fake(&[[1, 2, 3, 4, 5, 6, 7, 8]]);
        let mut reader = EepromSectionReader::start_at(&mut dev, 0, 2);

        let result: Result<heapless::Vec<u8, 4>, Error> = reader.take_vec_len_exact(4);
        assert!(result.is_err());
    }
}
