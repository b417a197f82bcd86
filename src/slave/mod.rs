//! Per-slave state: identity, addressing, AL state, and the mailbox inboxes the engine's receive
//! path fills directly (see `mailbox::dispatch_received`).

pub mod sii;

use crate::al_control::AlState;
use crate::mailbox::Inbox;

pub use sii::SiiCache;

/// Mailbox buffer capacities. Sized for the common expedited/segmented SDO and single-block SoE
/// traffic this master drives; a slave with larger mailbox data falls back to the raw datagram
/// buffer via the dispatch miss path in `mailbox::dispatch_received`.
pub const MAILBOX_COE_CAPACITY: usize = 256;
pub const MAILBOX_FOE_CAPACITY: usize = 512;
pub const MAILBOX_SOE_CAPACITY: usize = 256;
pub const MAILBOX_VOE_CAPACITY: usize = 256;
pub const MAILBOX_MBG_CAPACITY: usize = 64;

/// EoE tunnelled-Ethernet frame capacity, large enough for one full untagged Ethernet frame.
pub const EOE_CAPACITY: usize = 1536;

/// Slave identity, read once from the SII during the scan phase (ETG1000.6 Table 21 / the fixed
/// SII header at word 0x0008).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlaveIdentity {
    pub vendor_id: u32,
    pub product_code: u32,
    pub revision: u32,
    pub serial: u32,
    pub device_type: u32,
}

/// Port state, one per physical EtherCAT port (ETG1000.4 Table 34, DL status register).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Port {
    pub link_up: bool,
    pub loop_closed: bool,
    pub signal_detected: bool,
}

/// Distributed clock data for one slave: propagation delay and the per-port receive-time
/// snapshots used to compute it, ETG1000.4 Table 60.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlaveDc {
    pub supported: bool,
    pub has_64bit: bool,
    pub receive_times: [u32; 4],
    pub propagation_delay_ns: u32,
}

/// A single EtherCAT slave as tracked by the master: auto-increment/configured addressing,
/// current AL state, topology, DC data, and the mailbox inboxes the receive path fills directly.
pub struct Slave {
    /// Position in the ring, assigned during the scan, used for auto-increment addressing.
    pub ring_position: u16,
    /// Configured (fixed) station address, ETG1000.4 Table 33.
    pub station_address: u16,
    /// Station alias programmed into the slave's EEPROM, if any.
    pub alias: u16,

    pub name: [u8; 32],
    pub order: [u8; 16],
    pub identity: SlaveIdentity,

    pub ports: [Port; 4],
    /// Bitmask of which ports are up, bit `n` for port `n`; mirrors the ETG8200 `0x8000:35`
    /// mailbox gateway answer layout.
    pub ports_up: u8,

    pub dc: SlaveDc,

    pub al_state: AlState,
    pub al_error: bool,
    /// Pending write to the slave's AL control register, requested through the mailbox gateway
    /// or a configuration step; cleared once the write has gone out.
    pub requested_al_state: Option<u16>,

    pub rx_mailbox_offset: u16,
    pub rx_mailbox_size: u16,
    pub tx_mailbox_offset: u16,
    pub tx_mailbox_size: u16,
    /// Offset of the Mailbox Gateway answer address relative to the slave's station address, if
    /// this slave acts as a gateway device (ETG8200).
    pub mbg_offset: Option<u16>,

    /// Set once this slave's mailbox configuration has been read and addresses above are valid;
    /// guards `mailbox::dispatch_received`'s match against slaves still in `Init`.
    pub valid_mbox_data: bool,

    pub mbox_coe: Inbox<MAILBOX_COE_CAPACITY>,
    pub mbox_foe: Inbox<MAILBOX_FOE_CAPACITY>,
    pub mbox_soe: Inbox<MAILBOX_SOE_CAPACITY>,
    pub mbox_voe: Inbox<MAILBOX_VOE_CAPACITY>,
    pub mbox_mbg: Inbox<MAILBOX_MBG_CAPACITY>,
    pub eoe_rx: Inbox<EOE_CAPACITY>,

    pub sii_cache: SiiCache,
}

impl Default for Slave {
    fn default() -> Self {
        Self {
            ring_position: 0,
            station_address: 0,
            alias: 0,
            name: [0; 32],
            order: [0; 16],
            identity: SlaveIdentity::default(),
            ports: [Port::default(); 4],
            ports_up: 0,
            dc: SlaveDc::default(),
            al_state: AlState::None,
            al_error: false,
            requested_al_state: None,
            rx_mailbox_offset: 0,
            rx_mailbox_size: 0,
            tx_mailbox_offset: 0,
            tx_mailbox_size: 0,
            mbg_offset: None,
            valid_mbox_data: false,
            mbox_coe: Inbox::default(),
            mbox_foe: Inbox::default(),
            mbox_soe: Inbox::default(),
            mbox_voe: Inbox::default(),
            mbox_mbg: Inbox::default(),
            eoe_rx: Inbox::default(),
            sii_cache: SiiCache::default(),
        }
    }
}

impl Slave {
    pub fn new(ring_position: u16, station_address: u16) -> Self {
        Self {
            ring_position,
            station_address,
            ..Default::default()
        }
    }

    /// Configure the mailbox addressing this slave will use once it reaches PreOp, from its SII
    /// mailbox config category.
    pub fn set_mailbox_config(&mut self, config: &crate::eeprom::types::MailboxConfig) {
        self.rx_mailbox_offset = config.receive_offset;
        self.rx_mailbox_size = config.receive_size;
        self.tx_mailbox_offset = config.send_offset;
        self.tx_mailbox_size = config.send_size;
        self.valid_mbox_data = config.receive_size > 0 && config.send_size > 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_slave_has_no_valid_mailbox() {
        let slave = Slave::new(0, 0x1001);
        assert!(!slave.valid_mbox_data);
        assert_eq!(slave.al_state, AlState::None);
    }

    #[test]
    fn mailbox_config_marks_valid() {
        let mut slave = Slave::new(0, 0x1001);
        let config = crate::eeprom::types::MailboxConfig {
            receive_offset: 0x1000,
            receive_size: 128,
            send_offset: 0x1080,
            send_size: 128,
            protocol: crate::eeprom::types::MailboxProtocols::COE,
        };

        slave.set_mailbox_config(&config);

        assert!(slave.valid_mbox_data);
        assert_eq!(slave.tx_mailbox_offset, 0x1080);
    }
}
