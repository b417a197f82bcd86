//! Per-slave and master state machines that advance the bus one cycle at a time.
//!
//! Both halves are `std`-only: the per-slave FSM owns request lists (`request::RequestList`),
//! and the master FSM blocks the worker thread during scan, neither of which the `no_std` core
//! needs.

pub mod master_fsm;
pub mod slave_fsm;

pub use master_fsm::MasterFsm;
pub use slave_fsm::SlaveFsm;
