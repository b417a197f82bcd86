#![cfg_attr(not(feature = "std"), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

mod al_control;
mod al_status_code;
mod base_data_types;
mod command;
mod datagram;
mod eeprom;
pub mod engine;
pub mod error;
mod ethernet;
mod fmmu;
mod frame;
mod link;
pub mod mailbox;
mod pdi;
pub mod register;
mod ring;
pub mod slave;
mod sync_manager_channel;
mod wire;

#[cfg(feature = "std")]
pub mod domain;

#[cfg(feature = "std")]
pub mod fsm;

#[cfg(feature = "std")]
pub mod master;

#[cfg(feature = "std")]
pub mod phase;

#[cfg(feature = "std")]
pub mod request;

#[cfg(feature = "std")]
pub mod std;

pub use al_control::{AlControl, AlState};
pub use al_status_code::AlStatusCode;
pub use command::Command;
pub use datagram::{Datagram, DatagramState};
pub use engine::Engine;
pub use error::Error;
pub use link::{LinkDevice, LinkStats};
pub use pdi::{PdiOffset, PdiSegment};
pub use ring::ExternalRing;
pub use slave::Slave;

#[cfg(feature = "std")]
pub use domain::Domain;

#[cfg(feature = "std")]
pub use fsm::{MasterFsm, SlaveFsm};

#[cfg(feature = "std")]
pub use master::{Master, MasterConfig, Timeouts};

#[cfg(feature = "std")]
pub use phase::{Phase, PhaseController};

#[cfg(not(target_endian = "little"))]
compile_error!("only little-endian targets are supported, as wire values are cast to byte slices as-is");
