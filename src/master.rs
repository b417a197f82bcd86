//! The application-facing master: owns the slave table, the process data domains, and the phase
//! controller, and exposes the request-submission surface the rest of the crate's FSMs service.
//!
//! Grounded on `maindevice.rs`'s `MainDevice`: one object the application holds an `Arc` to,
//! constructed over a link device and a set of timeouts, offering `init`/group-creation/SDO
//! calls as the single entry point into the stack.

use crate::datagram::Datagram;
use crate::domain::Domain;
use crate::engine::Engine;
use crate::error::{Error, Item};
use crate::fsm::{MasterFsm, SlaveFsm};
use crate::link::LinkDevice;
use crate::mailbox::coe::abort_code::CoeAbortCode;
use crate::mailbox::coe::SubIndex;
use crate::mailbox::gateway;
use crate::pdi::{PdiOffset, PdiSegment};
use crate::phase::{Phase, PhaseController};
use crate::request::{self, Request, RequestList};
use crate::slave::Slave;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

const LINK_ID: u8 = 0;

static START: OnceLock<quanta::Instant> = OnceLock::new();

/// Monotonic clock the engine times datagrams against, shared by every [`Master`] in the
/// process.
fn monotonic_now() -> Duration {
    let start = *START.get_or_init(quanta::Instant::now);
    quanta::Instant::now() - start
}

/// Per-phase timeouts and cycle timing the master is configured with.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub pdu: Duration,
    pub state_transition: Duration,
    pub mailbox_response: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            pdu: Duration::from_micros(500),
            state_transition: Duration::from_millis(5000),
            mailbox_response: Duration::from_millis(1000),
        }
    }
}

/// Master construction parameters.
#[derive(Debug, Clone, Copy)]
pub struct MasterConfig {
    pub timeouts: Timeouts,
    pub idle_cycle_period: Duration,
    pub fsm_cycle_period: Duration,
    pub mtu: usize,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            idle_cycle_period: Duration::from_millis(2),
            fsm_cycle_period: Duration::from_millis(1),
            mtu: 1500,
        }
    }
}

/// Everything the idle and FSM-only workers need exclusive access to for one cycle. Kept behind
/// a single mutex rather than one per field: a cycle always needs the whole set together, so
/// splitting the lock would only add contention without adding concurrency.
struct Core {
    slaves: Vec<Slave>,
    slave_fsms: Vec<SlaveFsm>,
    slave_datagrams: Vec<Datagram>,
    domains: Vec<Domain>,
    fsm: MasterFsm,
    fsm_datagram: Datagram,
}

/// The application's single entry point into the stack: scan/configure the bus, create process
/// data domains, exchange process data, and submit mailbox requests.
pub struct Master {
    core: Mutex<Core>,
    engine: Engine,
    link: Mutex<Box<dyn LinkDevice + Send>>,
    phase: PhaseController,
    config: MasterConfig,
}

impl Master {
    pub fn new(link: Box<dyn LinkDevice + Send>, config: MasterConfig) -> Arc<Self> {
        let engine = Engine::new(config.timeouts.pdu, monotonic_now);

        Arc::new(Self {
            core: Mutex::new(Core {
                slaves: Vec::new(),
                slave_fsms: Vec::new(),
                slave_datagrams: Vec::new(),
                domains: Vec::new(),
                fsm: MasterFsm::new(),
                fsm_datagram: Datagram::new(),
            }),
            engine,
            link: Mutex::new(link),
            phase: PhaseController::new(),
            config,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    /// Leave `Orphaned` and start scanning/configuring the bus on a background worker.
    pub fn start(self: &Arc<Self>) {
        let master = Arc::clone(self);
        let period = self.config.idle_cycle_period;
        self.phase.enter_idle(period, move || master.idle_cycle());
    }

    fn idle_cycle(&self) {
        let mut link = self.link.lock().expect("link mutex poisoned");
        let mut core = self.core.lock().expect("core mutex poisoned");
        let core = &mut *core;

        if let Err(e) = core.fsm.run_cycle(
            &self.engine,
            &mut **link,
            LINK_ID,
            &mut core.slaves,
            &mut core.slave_fsms,
            &mut core.slave_datagrams,
            &mut core.fsm_datagram,
        ) {
            crate::fmt::warn!("idle cycle: master FSM error: {:?}", e);
        }

        if let Err(e) = self.engine.send(&mut **link, self.config.mtu, LINK_ID) {
            crate::fmt::warn!("idle cycle: send failed: {:?}", e);
        }
        if let Err(e) = self.engine.receive(&mut **link, LINK_ID, &mut core.slaves) {
            crate::fmt::warn!("idle cycle: receive failed: {:?}", e);
        }
        self.engine.sweep_timeouts();
    }

    /// Hand the cyclic exchange to the application: every slave is requested into `PreOp`, then
    /// once any in-progress scan has drained, the idle worker is replaced with an FSM-only
    /// worker that keeps mailbox requests serviced while the application calls
    /// [`Master::send`]/[`Master::receive`] itself.
    pub fn activate(self: &Arc<Self>) {
        {
            let mut core = self.core.lock().expect("core mutex poisoned");
            core.fsm.set_allow_scan(false);
            for slave in core.slaves.iter_mut() {
                slave.requested_al_state = Some(crate::al_control::AlState::PreOp.as_u8() as u16);
            }
        }

        let scan_master = Arc::clone(self);
        let fsm_master = Arc::clone(self);
        let period = self.config.fsm_cycle_period;

        self.phase.enter_operation(
            period,
            move || scan_master.core.lock().expect("core mutex poisoned").fsm.scan_busy(),
            move || fsm_master.fsm_only_cycle(),
        );
    }

    /// FSM-only cycle run by the `Operation` worker: steps every slave's mailbox FSM and queues
    /// whatever datagram it produces, but never calls `send`/`receive` itself — the application
    /// owns that once it has taken over the cyclic exchange.
    fn fsm_only_cycle(&self) {
        let mut core = self.core.lock().expect("core mutex poisoned");
        let core = &mut *core;

        let len = core.slaves.len();
        for i in 0..len {
            let fsm = &mut core.slave_fsms[i];
            if !fsm.is_busy() && !fsm.ready_to_start(&core.slaves[i]) {
                continue;
            }
            if fsm.step(&mut core.slaves[i], &mut core.slave_datagrams[i]) {
                let _ = self.engine.queue(&mut core.slave_datagrams[i]);
            }
        }
    }

    /// Hand the cyclic exchange back to the idle worker. A no-op unless currently `Operation`.
    pub fn deactivate(self: &Arc<Self>) {
        {
            let mut core = self.core.lock().expect("core mutex poisoned");
            core.fsm.set_allow_scan(true);
            for slave in core.slaves.iter_mut() {
                slave.requested_al_state = Some(crate::al_control::AlState::PreOp.as_u8() as u16);
            }
        }

        let master = Arc::clone(self);
        let period = self.config.idle_cycle_period;
        self.phase.deactivate(period, move || master.idle_cycle());
    }

    /// Queue every domain's datagram and flush the send queue. Application-driven; used once the
    /// master is in `Operation`.
    pub fn send(&self) -> Result<usize, Error> {
        {
            let mut core = self.core.lock().expect("core mutex poisoned");
            let core = &mut *core;
            for domain in core.domains.iter_mut() {
                domain.queue(LINK_ID, &self.engine)?;
            }
        }

        let mut link = self.link.lock().expect("link mutex poisoned");
        self.engine.send(&mut **link, self.config.mtu, LINK_ID)
    }

    /// Poll for replies and sweep timed-out datagrams.
    pub fn receive(&self) -> Result<usize, Error> {
        let mut link = self.link.lock().expect("link mutex poisoned");
        let mut core = self.core.lock().expect("core mutex poisoned");
        let received = self.engine.receive(&mut **link, LINK_ID, &mut core.slaves)?;
        self.engine.sweep_timeouts();
        Ok(received)
    }

    pub fn slave_count(&self) -> usize {
        self.core.lock().expect("core mutex poisoned").slaves.len()
    }

    /// Create a new, empty process data domain at `logical_address`, returning its index.
    pub fn create_domain(&self, logical_address: u32) -> usize {
        let mut core = self.core.lock().expect("core mutex poisoned");
        core.domains.push(Domain::new(logical_address));
        core.domains.len() - 1
    }

    /// Map `size` bytes of `position`'s process data into `domain`, advancing `offset`.
    pub fn domain_register_slave(
        &self,
        domain: usize,
        position: u16,
        size: usize,
        offset: &mut PdiOffset,
    ) -> Result<PdiSegment, Error> {
        let mut core = self.core.lock().expect("core mutex poisoned");
        let domain = core.domains.get_mut(domain).ok_or(Error::NotFound {
            item: Item::Domain,
            index: Some(domain),
        })?;
        domain.register_slave(position, size, offset)
    }

    /// Pull a domain's exchanged image out after a `send()`/`receive()` round trip, returning the
    /// observed working counter.
    pub fn domain_process(&self, domain: usize) -> Result<u16, Error> {
        let mut core = self.core.lock().expect("core mutex poisoned");
        let domain = core.domains.get_mut(domain).ok_or(Error::NotFound {
            item: Item::Domain,
            index: Some(domain),
        })?;
        domain.process()
    }

    /// Copy a domain's current process data image out.
    pub fn domain_image(&self, domain: usize) -> Result<Vec<u8>, Error> {
        let core = self.core.lock().expect("core mutex poisoned");
        let domain = core.domains.get(domain).ok_or(Error::NotFound {
            item: Item::Domain,
            index: Some(domain),
        })?;
        Ok(domain.image().to_vec())
    }

    fn submit(&self, position: u16, mailbox: Mailbox, request: Request) -> Result<Arc<Request>, Error> {
        let request = Arc::new(request);
        let core = self.core.lock().expect("core mutex poisoned");
        let fsm = core.slave_fsms.get(position as usize).ok_or(Error::NotFound {
            item: Item::Slave,
            index: Some(position as usize),
        })?;
        let list: &RequestList = match mailbox {
            Mailbox::Coe => &fsm.coe,
            Mailbox::Soe => &fsm.soe,
            Mailbox::Foe => &fsm.foe,
        };
        list.push(Arc::clone(&request));
        Ok(request)
    }

    /// Submit an SDO upload and block until it completes, returning the uploaded bytes.
    pub fn sdo_upload(&self, position: u16, index: u16, sub_index: SubIndex, expected_len: usize) -> Result<heapless::Vec<u8, { crate::request::MAX_REQUEST_PAYLOAD }>, Error> {
        let request = request::coe::sdo_upload(position, index, sub_index, expected_len);
        self.submit(position, Mailbox::Coe, request)?.wait_result()
    }

    /// Submit a complete-access SDO upload.
    pub fn sdo_upload_complete(&self, position: u16, index: u16, expected_len: usize) -> Result<heapless::Vec<u8, { crate::request::MAX_REQUEST_PAYLOAD }>, Error> {
        let request = request::coe::sdo_upload_complete(position, index, expected_len);
        self.submit(position, Mailbox::Coe, request)?.wait_result()
    }

    /// Submit an SDO download and block until it completes.
    pub fn sdo_download(&self, position: u16, index: u16, sub_index: SubIndex, data: &[u8]) -> Result<(), Error> {
        let request = request::coe::sdo_download(position, index, sub_index, data)?;
        self.submit(position, Mailbox::Coe, request)?.wait_result().map(|_| ())
    }

    /// Submit an SoE IDN read and block until it completes.
    pub fn read_idn(&self, position: u16, drive_no: u8, idn: u16, expected_len: usize) -> Result<heapless::Vec<u8, { crate::request::MAX_REQUEST_PAYLOAD }>, Error> {
        let request = request::soe::read_idn(position, drive_no, idn, expected_len)?;
        self.submit(position, Mailbox::Soe, request)?.wait_result()
    }

    /// Submit an SoE IDN write and block until it completes.
    pub fn write_idn(&self, position: u16, drive_no: u8, idn: u16, data: &[u8]) -> Result<(), Error> {
        let request = request::soe::write_idn(position, drive_no, idn, data)?;
        self.submit(position, Mailbox::Soe, request)?.wait_result().map(|_| ())
    }

    /// Submit an FoE file read and block until it completes, returning the received file bytes.
    pub fn foe_read(&self, position: u16, filename: &[u8], expected_len: usize) -> Result<heapless::Vec<u8, { crate::request::MAX_REQUEST_PAYLOAD }>, Error> {
        let request = request::foe::read_file(position, filename, expected_len)?;
        self.submit(position, Mailbox::Foe, request)?.wait_result()
    }

    /// Answer a mailbox gateway upload (read) against the master's synthetic object dictionary,
    /// without touching the wire.
    pub fn gateway_upload(&self, index: u16, access: SubIndex) -> Result<heapless::Vec<u8, 32>, CoeAbortCode> {
        let core = self.core.lock().expect("core mutex poisoned");
        gateway::answer_upload(&core.slaves, index, access)
    }

    /// Answer a mailbox gateway download (write) against the master's synthetic object
    /// dictionary.
    pub fn gateway_download(&self, index: u16, access: SubIndex, data: &[u8]) -> Result<(), CoeAbortCode> {
        let mut core = self.core.lock().expect("core mutex poisoned");
        gateway::answer_download(&mut core.slaves, index, access, data)
    }
}

enum Mailbox {
    Coe,
    Soe,
    Foe,
}
