//! Mailbox gateway: routes a raw mailbox frame addressed to station 0 into the master's synthetic
//! object dictionary instead of onto the wire.
//!
//! Every EtherCAT master that exposes a character-device mailbox gateway (ETG8200) answers a
//! fixed set of CoE objects about slaves it already knows without round-tripping to hardware;
//! this is that answer table. ioctl/character-device marshalling around it is out of scope.

use crate::mailbox::coe::abort_code::CoeAbortCode;
use crate::mailbox::coe::{CoeHeader, CoeService, SubIndex};
use crate::slave::Slave;

/// `0x8000+i` per-slave info object: subindex 0 is the entry count, the rest mirror the fields
/// an `ecrt_master_get_slave_info` call would expose.
fn slave_info(slave: &Slave, sub_index: u8) -> Result<heapless::Vec<u8, 32>, CoeAbortCode> {
    let mut out = heapless::Vec::new();

    match sub_index {
        0 => {
            let _ = out.push(35);
        }
        1 => {
            let _ = out.extend_from_slice(&slave.station_address.to_le_bytes());
            let _ = out.extend_from_slice(&0u16.to_le_bytes());
        }
        2 => {
            let _ = out.extend_from_slice(&slave.order);
        }
        3 => {
            let _ = out.extend_from_slice(&slave.name);
        }
        4 => {
            let _ = out.extend_from_slice(&slave.identity.device_type.to_le_bytes());
        }
        5 => {
            let _ = out.extend_from_slice(&slave.identity.vendor_id.to_le_bytes());
        }
        6 => {
            let _ = out.extend_from_slice(&slave.identity.product_code.to_le_bytes());
        }
        7 => {
            let _ = out.extend_from_slice(&slave.identity.revision.to_le_bytes());
        }
        8 => {
            let _ = out.extend_from_slice(&slave.identity.serial.to_le_bytes());
        }
        33 => {
            let _ = out.extend_from_slice(&slave.rx_mailbox_size.to_le_bytes());
        }
        34 => {
            let _ = out.extend_from_slice(&slave.tx_mailbox_size.to_le_bytes());
        }
        35 => {
            let _ = out.push(slave.ports_up << 4);
        }
        9..=32 => return Err(CoeAbortCode::TransferFailed),
        _ => return Err(CoeAbortCode::SubIndexNotFound),
    }

    Ok(out)
}

/// `0xA000+i` AL state object: subindex 0=entry count, 1=current state, 2=requested state (write).
fn slave_al_state(slave: &Slave, sub_index: u8) -> Result<heapless::Vec<u8, 32>, CoeAbortCode> {
    let mut out = heapless::Vec::new();

    match sub_index {
        0 => {
            let _ = out.push(2);
        }
        1 | 2 => {
            let _ = out.extend_from_slice(&u16::from(slave.al_state.as_u8()).to_le_bytes());
        }
        _ => return Err(CoeAbortCode::SubIndexNotFound),
    }

    Ok(out)
}

/// `0xF000` modular device profile answers: fixed constants, no slave data involved.
fn modular_device_profile(sub_index: u8) -> Result<heapless::Vec<u8, 32>, CoeAbortCode> {
    let mut out = heapless::Vec::new();

    match sub_index {
        1 => {
            let _ = out.extend_from_slice(&0x0001u16.to_le_bytes());
        }
        2 => {
            let _ = out.extend_from_slice(&4080u16.to_le_bytes());
        }
        3 => {
            let _ = out.extend_from_slice(&0x0000_00FFu32.to_le_bytes());
        }
        _ => return Err(CoeAbortCode::SubIndexNotFound),
    }

    Ok(out)
}

/// `0xF020+k` slave-list object: subindex 0 is how many slaves fall in this group of 255; others
/// answer with that slave's (position, address offset).
fn slave_list(slaves: &[Slave], group: u16, sub_index: u8) -> Result<heapless::Vec<u8, 32>, CoeAbortCode> {
    let start = usize::from(group) * 255;
    let mut out = heapless::Vec::new();

    if sub_index == 0 {
        let remaining = slaves.len().saturating_sub(start).min(255);
        let _ = out.push(remaining as u8);
        return Ok(out);
    }

    let idx = start + usize::from(sub_index) - 1;
    let slave = slaves.get(idx).ok_or(CoeAbortCode::NotFound)?;

    let _ = out.extend_from_slice(&(idx as u16).to_le_bytes());
    let _ = out.extend_from_slice(&slave.station_address.to_le_bytes());

    Ok(out)
}

/// Answer a synthetic SDO upload addressed to station 0.
///
/// Returns the expedited/normal payload on success, or the abort code to reflect back to the
/// requester otherwise.
pub fn answer_upload(slaves: &[Slave], index: u16, access: SubIndex) -> Result<heapless::Vec<u8, 32>, CoeAbortCode> {
    let sub_index = access.sub_index();

    match index {
        0x1000 => {
            let mut out = heapless::Vec::new();
            let _ = out.extend_from_slice(&0u32.to_le_bytes());
            Ok(out)
        }
        0x8000..=0x8FFF => {
            let slave = slaves
                .get(usize::from(index - 0x8000))
                .ok_or(CoeAbortCode::NotFound)?;
            slave_info(slave, sub_index)
        }
        0xA000..=0xAFFF => {
            let slave = slaves
                .get(usize::from(index - 0xA000))
                .ok_or(CoeAbortCode::NotFound)?;
            slave_al_state(slave, sub_index)
        }
        0xF000 => modular_device_profile(sub_index),
        0xF020..=0xF0FF => slave_list(slaves, index - 0xF020, sub_index),
        _ => Err(CoeAbortCode::NotFound),
    }
}

/// Answer a synthetic SDO download (only the `0xA000+i` requested-state write is accepted).
pub fn answer_download(slaves: &mut [Slave], index: u16, access: SubIndex, data: &[u8]) -> Result<(), CoeAbortCode> {
    let sub_index = access.sub_index();

    if !(0xA000..=0xAFFF).contains(&index) || sub_index != 2 {
        return Err(CoeAbortCode::UnsupportedAccess);
    }

    if data.len() != 2 {
        return Err(CoeAbortCode::DataLengthMismatch);
    }

    let slave = slaves
        .get_mut(usize::from(index - 0xA000))
        .ok_or(CoeAbortCode::NotFound)?;

    let requested = u16::from_le_bytes([data[0], data[1]]);
    slave.requested_al_state = Some(requested);

    Ok(())
}

#[allow(unused)]
fn _types_used(_: CoeHeader, _: CoeService) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modular_device_profile_fixed_answers() {
        let out = modular_device_profile(2).unwrap();
        assert_eq!(u16::from_le_bytes([out[0], out[1]]), 4080);
    }

    #[test]
    fn unknown_index_is_not_found() {
        assert_eq!(answer_upload(&[], 0x1234, SubIndex::Complete), Err(CoeAbortCode::NotFound));
    }
}
