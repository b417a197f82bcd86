//! Slave Information Interface (SII) EEPROM access.
//!
//! The SII is read a word at a time through registers `0x0502`-`0x050f`: write a control/address
//! word, poll until the busy flag clears, read the data register back. [`Eeprom`] drives that
//! protocol synchronously over whatever [`RegisterIo`] the caller supplies, and walks the
//! category list defined in ETG1000.6 Table 17 to find `General`/`SyncManager`/`Fmmu`/PDO data.

mod reader;
pub mod types;

use crate::error::{EepromError, Error};
use crate::register::RegisterAddress;
use crate::wire::WireRead;
use core::str::FromStr;

use self::reader::EepromSectionReader;
use self::types::{
    CategoryType, FmmuEx, FmmuUsage, MailboxConfig, Pdo, PdoEntry, SiiCategory, SiiControl,
    SiiGeneral, SiiReadSize, SiiRequest, SyncManager, RX_PDO_RANGE, TX_PDO_RANGE,
};

const SII_FIRST_SECTION_START: u16 = 0x0040u16;

/// Blocking register access a slave must provide for SII reads to ride on.
///
/// Grounded on the single FPRD/FPWR round trip a live master performs against one station: no
/// queueing, no retries beyond what the caller already does for any other register access.
pub trait RegisterIo {
    fn read_register(&mut self, address: u16, len: usize) -> Result<heapless::Vec<u8, 8>, Error>;
    fn write_register(&mut self, address: u16, data: &[u8]) -> Result<(), Error>;
}

/// The lower-level chunked SII read the section reader pulls from. Implemented below for any
/// [`Eeprom`] wrapping a [`RegisterIo`], so the reader never has to know about the SII protocol.
pub trait EepromAccess {
    fn read_sii_raw(&mut self, word_address: u16) -> Result<[u8; 8], Error>;
}

pub struct Eeprom<'a, A> {
    io: &'a mut A,
}

impl<'a, A> Eeprom<'a, A>
where
    A: RegisterIo,
{
    pub fn new(io: &'a mut A) -> Self {
        Self { io }
    }

    fn wait_not_busy(&mut self) -> Result<SiiControl, Error> {
        for _ in 0..1000 {
            let raw = self.io.read_register(RegisterAddress::SiiControl.into(), 2)?;
            let control = SiiControl::unpack_from_slice(&raw)?;

            if !control.busy {
                return Ok(control);
            }
        }

        Err(Error::Timeout)
    }

    pub fn device_name<const N: usize>(&mut self) -> Result<Option<heapless::String<N>>, Error> {
        let general = self.general()?;
        self.find_string(general.name_string_idx)
    }

    pub fn general(&mut self) -> Result<SiiGeneral, Error> {
        let category = self
            .find_eeprom_category_start(CategoryType::General)?
            .ok_or(Error::Eeprom(EepromError::NoCategory))?;

        let mut reader = EepromSectionReader::start_at(self, category.start, category.len_words * 2);
        let buf: heapless::Vec<u8, { SiiGeneral::LEN }> = reader.take_vec_exact()?;

        SiiGeneral::parse(&buf)
    }

    /// Fixed SII word address of the mailbox configuration block, ETG2010 Table 2.
    const MAILBOX_CONFIG_WORD_ADDRESS: u16 = 0x0018;

    pub fn mailbox_config(&mut self) -> Result<MailboxConfig, Error> {
        let mut reader = EepromSectionReader::start_at(
            self,
            Self::MAILBOX_CONFIG_WORD_ADDRESS,
            MailboxConfig::LEN as u16,
        );

        let buf: heapless::Vec<u8, { MailboxConfig::LEN }> = reader.take_vec_exact()?;
        MailboxConfig::parse(&buf)
    }

    pub fn sync_managers(&mut self) -> Result<heapless::Vec<SyncManager, 8>, Error> {
        let mut sync_managers = heapless::Vec::new();

        let Some(category) = self.find_eeprom_category_start(CategoryType::SyncManager)? else {
            return Ok(sync_managers);
        };

        let mut reader = EepromSectionReader::start_at(self, category.start, category.len_words * 2);

        while let Some(bytes) = reader.take_vec::<{ SyncManager::LEN }>()? {
            let sm = SyncManager::parse(&bytes)?;
            sync_managers
                .push(sm)
                .map_err(|_| Error::BufferTooSmall { capacity: 8, required: sync_managers.len() + 1 })?;
        }

        Ok(sync_managers)
    }

    /// Per-FMMU usage hint byte, ETG1000.6 Table 22.
    pub fn fmmus(&mut self) -> Result<heapless::Vec<FmmuUsage, 16>, Error> {
        let mut fmmus = heapless::Vec::new();

        let Some(category) = self.find_eeprom_category_start(CategoryType::Fmmu)? else {
            return Ok(fmmus);
        };

        let num_fmmus = category.len_words * 2;
        let mut reader = EepromSectionReader::start_at(self, category.start, category.len_words * 2);

        for _ in 0..num_fmmus {
            let byte = reader.try_next()?;
            fmmus
                .push(FmmuUsage::from(byte))
                .map_err(|_| Error::BufferTooSmall { capacity: 16, required: fmmus.len() + 1 })?;
        }

        Ok(fmmus)
    }

    /// Extended FMMU-to-sync-manager mapping, ETG1020 Table 10.
    pub fn fmmu_mappings(&mut self) -> Result<heapless::Vec<FmmuEx, 16>, Error> {
        let mut mappings = heapless::Vec::new();

        let Some(category) = self.find_eeprom_category_start(CategoryType::FmmuExtended)? else {
            return Ok(mappings);
        };

        let mut reader = EepromSectionReader::start_at(self, category.start, category.len_words * 2);

        while let Some(bytes) = reader.take_vec::<3>()? {
            if bytes.len() < 3 {
                return Err(Error::Eeprom(EepromError::Decode));
            }
            let raw = [bytes[0], bytes[1], bytes[2]];
            mappings
                .push(FmmuEx::parse(&raw))
                .map_err(|_| Error::BufferTooSmall { capacity: 16, required: mappings.len() + 1 })?;
        }

        Ok(mappings)
    }

    fn pdos(&mut self, category: CategoryType, valid_range: core::ops::RangeInclusive<u16>) -> Result<heapless::Vec<Pdo, 16>, Error> {
        let mut pdos = heapless::Vec::new();

        let Some(category) = self.find_eeprom_category_start(category)? else {
            return Ok(pdos);
        };

        let mut reader = EepromSectionReader::start_at(self, category.start, category.len_words * 2);

        while let Some(header) = reader.take_vec::<{ Pdo::HEADER_LEN }>()? {
            let mut pdo = Pdo::parse(&header)?;

            if !valid_range.contains(&pdo.index) {
                return Err(Error::Eeprom(EepromError::Decode));
            }

            for _ in 0..pdo.num_entries {
                let bytes: heapless::Vec<u8, { PdoEntry::LEN }> = reader.take_vec_exact()?;
                let entry = PdoEntry::parse(&bytes)?;

                pdo.entries
                    .push(entry)
                    .map_err(|_| Error::BufferTooSmall { capacity: 16, required: pdo.entries.len() + 1 })?;
            }

            pdos.push(pdo).map_err(|_| Error::BufferTooSmall { capacity: 16, required: pdos.len() + 1 })?;
        }

        Ok(pdos)
    }

    /// Transmit PDOs (from the slave's perspective) - inputs to the master.
    pub fn txpdos(&mut self) -> Result<heapless::Vec<Pdo, 16>, Error> {
        self.pdos(CategoryType::TxPdo, TX_PDO_RANGE)
    }

    /// Receive PDOs (from the slave's perspective) - outputs from the master.
    pub fn rxpdos(&mut self) -> Result<heapless::Vec<Pdo, 16>, Error> {
        self.pdos(CategoryType::RxPdo, RX_PDO_RANGE)
    }

    fn find_string<const N: usize>(&mut self, search_index: u8) -> Result<Option<heapless::String<N>>, Error> {
        if search_index == 0 {
            return Ok(None);
        }

        let search_index = search_index - 1;

        let Some(category) = self.find_eeprom_category_start(CategoryType::Strings)? else {
            return Ok(None);
        };

        let mut reader = EepromSectionReader::start_at(self, category.start, category.len_words * 2);

        let num_strings = reader.try_next()?;

        if search_index >= num_strings {
            return Ok(None);
        }

        for _ in 0..search_index {
            let string_len = reader.try_next()?;
            reader.skip(u16::from(string_len))?;
        }

        let string_len = reader.try_next()?;
        let bytes: heapless::Vec<u8, N> = reader.take_vec_len_exact(usize::from(string_len))?;

        let s = core::str::from_utf8(&bytes).map_err(|_| Error::Eeprom(EepromError::Decode))?;
        let s = heapless::String::<N>::from_str(s).map_err(|_| Error::Eeprom(EepromError::Decode))?;

        Ok(Some(s))
    }

    fn find_eeprom_category_start(&mut self, category: CategoryType) -> Result<Option<SiiCategory>, Error> {
        let mut start = SII_FIRST_SECTION_START;

        loop {
            let chunk = self.read_sii_raw(start)?;
            let category_type = CategoryType::from(u16::from_le_bytes([chunk[0], chunk[1]]));
            let data_len = u16::from_le_bytes([chunk[2], chunk[3]]);

            start += 2;

            match category_type {
                cat if cat == category => {
                    return Ok(Some(SiiCategory {
                        category: cat,
                        start,
                        len_words: data_len,
                    }))
                }
                CategoryType::End => return Ok(None),
                _ => (),
            }

            start += data_len;
        }
    }
}

impl<A> EepromAccess for Eeprom<'_, A>
where
    A: RegisterIo,
{
    fn read_sii_raw(&mut self, eeprom_address: u16) -> Result<[u8; 8], Error> {
        let status = self.wait_not_busy()?;

        if status.has_error() {
            let reset = status.error_reset();
            self.io
                .write_register(RegisterAddress::SiiControl.into(), &reset.as_array())?;
        }

        let setup = SiiRequest::read(eeprom_address);
        self.io
            .write_register(RegisterAddress::SiiControl.into(), &setup.as_array())?;

        self.wait_not_busy()?;

        let mut data = [0u8; 8];

        match status.read_size {
            SiiReadSize::Octets4 => {
                let chunk1 = self.io.read_register(RegisterAddress::SiiData.into(), 4)?;
                data[0..4].copy_from_slice(&chunk1);

                let setup = SiiRequest::read(eeprom_address + (chunk1.len() / 2) as u16);
                self.io
                    .write_register(RegisterAddress::SiiControl.into(), &setup.as_array())?;
                self.wait_not_busy()?;

                let chunk2 = self.io.read_register(RegisterAddress::SiiData.into(), 4)?;
                data[4..8].copy_from_slice(&chunk2);
            }
            SiiReadSize::Octets8 => {
                let chunk = self.io.read_register(RegisterAddress::SiiData.into(), 8)?;
                data.copy_from_slice(&chunk);
            }
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WireWrite;

    struct FakeSlave {
        eeprom: heapless::Vec<u8, 256>,
        sii_control: SiiControl,
        sii_address: u16,
    }

    impl FakeSlave {
        fn new(eeprom: &[u8]) -> Self {
            let mut buf = heapless::Vec::new();
            let _ = buf.extend_from_slice(eeprom);
            Self {
                eeprom: buf,
                sii_control: SiiControl::default(),
                sii_address: 0,
            }
        }
    }

    impl RegisterIo for FakeSlave {
        fn read_register(&mut self, address: u16, len: usize) -> Result<heapless::Vec<u8, 8>, Error> {
            let mut out = heapless::Vec::new();

            if address == u16::from(RegisterAddress::SiiControl) {
                let mut buf = [0u8; 2];
                let _ = self.sii_control.pack_to_slice(&mut buf);
                let _ = out.extend_from_slice(&buf);
            } else if address == u16::from(RegisterAddress::SiiData) {
                let byte_addr = usize::from(self.sii_address) * 2;
                for i in 0..len {
                    let _ = out.push(self.eeprom.get(byte_addr + i).copied().unwrap_or(0));
                }
            }

            Ok(out)
        }

        fn write_register(&mut self, address: u16, data: &[u8]) -> Result<(), Error> {
            if address == u16::from(RegisterAddress::SiiControl) {
                self.sii_control = SiiControl::unpack_from_slice(&data[0..2])?;
                if data.len() >= 4 {
                    self.sii_address = u16::from_le_bytes([data[2], data[3]]);
                }
            }

            Ok(())
        }
    }

    #[test]
    fn category_walk_finds_end() {
        // Nop category (len 0), then End.
        let mut eeprom = heapless::Vec::<u8, 256>::new();
        for _ in 0..0x40 {
            let _ = eeprom.push(0);
        }
        let _ = eeprom.extend_from_slice(&0xffffu16.to_le_bytes());
        let _ = eeprom.extend_from_slice(&0u16.to_le_bytes());

        let mut slave = FakeSlave::new(&eeprom);
        let mut eeprom_api = Eeprom::new(&mut slave);

        assert_eq!(
            eeprom_api.find_eeprom_category_start(CategoryType::General).unwrap(),
            None
        );
    }
}
