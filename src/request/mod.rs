//! Queued application requests (SDO, SoE) and their QUEUED -> BUSY -> SUCCESS/FAILURE lifecycle.
//!
//! Rather than a single blocking call per SDO/SoE operation, a request here is an object: the
//! application thread submits it and parks on a `Condvar`, a slave's FSM pops it from a
//! per-slave list and advances the protocol across as many cycles as it takes, then terminates it
//! and wakes the waiter. This is `std`-only: the wait-set needs real thread parking, unlike the
//! `no_std` core the datagram engine targets.

pub mod coe;
pub mod foe;
pub mod soe;

use crate::error::{Error, MailboxError};
use crate::mailbox::coe::abort_code::CoeAbortCode;
use std::sync::{Condvar, Mutex};

/// Maximum payload a request carries inline. Sized for expedited SDOs and single SoE IDN
/// elements; anything larger needs segmented transfer, which still lands here a chunk at a time.
pub const MAX_REQUEST_PAYLOAD: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Queued,
    Busy,
    Success,
    Failure,
}

/// What protocol operation a request performs, and against which object.
#[derive(Debug, Clone, Copy)]
pub enum RequestKind {
    SdoUpload { index: u16, sub_index: crate::mailbox::coe::SubIndex },
    SdoDownload { index: u16, sub_index: crate::mailbox::coe::SubIndex },
    SoeRead { drive_no: u8, idn: u16 },
    SoeWrite { drive_no: u8, idn: u16 },
    /// Read a file out of the slave over FoE. The filename travels in as the request's initial
    /// payload; the FSM overwrites it with the received file data on completion.
    FoeRead,
}

/// Terminal outcome recorded on a request once it leaves BUSY.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOutcome {
    pub abort_code: Option<CoeAbortCode>,
    pub protocol_error: Option<u16>,
}

/// A queued request. Shared between the submitting thread and the servicing FSM via `Arc`; the
/// `Mutex<RequestState>` plus `Condvar` pair implements a blocking wait-set for the request
/// queue/busy/terminal lifecycle.
#[derive(Debug)]
pub struct Request {
    pub kind: RequestKind,
    pub slave_position: u16,
    pub expected_len: usize,
    payload: Mutex<heapless::Vec<u8, MAX_REQUEST_PAYLOAD>>,
    state: Mutex<RequestState>,
    cond: Condvar,
    outcome: Mutex<RequestOutcome>,
}

impl Request {
    pub(crate) fn new(kind: RequestKind, slave_position: u16, expected_len: usize) -> Self {
        Self {
            kind,
            slave_position,
            expected_len,
            payload: Mutex::new(heapless::Vec::new()),
            state: Mutex::new(RequestState::Queued),
            cond: Condvar::new(),
            outcome: Mutex::new(RequestOutcome::default()),
        }
    }

    pub(crate) fn with_payload(
        kind: RequestKind,
        slave_position: u16,
        expected_len: usize,
        data: &[u8],
    ) -> Result<Self, Error> {
        let mut payload = heapless::Vec::new();
        payload
            .extend_from_slice(data)
            .map_err(|_| Error::BufferTooSmall {
                capacity: MAX_REQUEST_PAYLOAD,
                required: data.len(),
            })?;

        Ok(Self {
            kind,
            slave_position,
            expected_len,
            payload: Mutex::new(payload),
            state: Mutex::new(RequestState::Queued),
            cond: Condvar::new(),
            outcome: Mutex::new(RequestOutcome::default()),
        })
    }

    pub fn state(&self) -> RequestState {
        *self.state.lock().expect("request state lock poisoned")
    }

    pub fn payload(&self) -> heapless::Vec<u8, MAX_REQUEST_PAYLOAD> {
        self.payload.lock().expect("request payload lock poisoned").clone()
    }

    /// FSM side: claim this request if it is still `Queued`, moving it to `Busy`. Returns `false`
    /// if another FSM already claimed it (shouldn't happen for a per-slave FIFO, but keeps this
    /// safe to call speculatively).
    pub fn begin_service(&self) -> bool {
        let mut state = self.state.lock().expect("request state lock poisoned");
        if *state != RequestState::Queued {
            return false;
        }
        *state = RequestState::Busy;
        true
    }

    fn finish(&self, state: RequestState, outcome: RequestOutcome) {
        *self.outcome.lock().expect("request outcome lock poisoned") = outcome;
        *self.state.lock().expect("request state lock poisoned") = state;
        self.cond.notify_all();
    }

    /// FSM side: terminate with a successful result, replacing the payload with `data` (the
    /// uploaded value, or empty for a download/write).
    pub fn complete_success(&self, data: &[u8]) -> Result<(), Error> {
        let mut payload = heapless::Vec::new();
        payload
            .extend_from_slice(data)
            .map_err(|_| Error::BufferTooSmall {
                capacity: MAX_REQUEST_PAYLOAD,
                required: data.len(),
            })?;
        *self.payload.lock().expect("request payload lock poisoned") = payload;
        self.finish(RequestState::Success, RequestOutcome::default());
        Ok(())
    }

    /// FSM side: terminate a CoE request aborted by the slave.
    pub fn complete_aborted(&self, code: CoeAbortCode) {
        self.finish(
            RequestState::Failure,
            RequestOutcome {
                abort_code: Some(code),
                protocol_error: None,
            },
        );
    }

    /// FSM side: terminate an SoE (or other non-CoE) request with a protocol error code.
    pub fn complete_protocol_error(&self, code: u16) {
        self.finish(
            RequestState::Failure,
            RequestOutcome {
                abort_code: None,
                protocol_error: Some(code),
            },
        );
    }

    /// Application side: park until the request leaves QUEUED and then BUSY, returning the
    /// terminal state and its outcome. Corresponds to steps 3-5 of the submission sequence:
    /// there is no separate "interruptible while queued" signal path here (this crate doesn't
    /// model POSIX signal delivery into a blocked `Condvar::wait`), but a request still in
    /// QUEUED when dropped is simply never served, matching "remove and return interrupted".
    pub fn wait(&self) -> Result<(RequestState, RequestOutcome), Error> {
        let mut state = self.state.lock().expect("request state lock poisoned");
        while matches!(*state, RequestState::Queued | RequestState::Busy) {
            state = self.cond.wait(state).expect("request condvar poisoned");
        }
        let outcome = *self.outcome.lock().expect("request outcome lock poisoned");
        Ok((*state, outcome))
    }

    /// Application side: wait and translate a `Failure` outcome into an `Error`, a `Success`
    /// into the uploaded payload.
    pub fn wait_result(&self) -> Result<heapless::Vec<u8, MAX_REQUEST_PAYLOAD>, Error> {
        let (state, outcome) = self.wait()?;
        match state {
            RequestState::Success => Ok(self.payload()),
            RequestState::Failure => {
                if let Some(code) = outcome.abort_code {
                    Err(Error::Abort(code))
                } else if let Some(code) = outcome.protocol_error {
                    Err(Error::ProtocolError(code))
                } else {
                    Err(Error::Mailbox(MailboxError::ResponseInvalid {
                        index: 0,
                        sub_index: 0,
                    }))
                }
            }
            RequestState::Queued | RequestState::Busy => unreachable!("wait() only returns terminal states"),
        }
    }

    /// Reset a completed request back to `Queued` for reuse, e.g. the reusable handle returned
    /// by [`coe::create_sdo_request`]. Overwrites the payload with `data` for a fresh download,
    /// or clears it for a fresh upload.
    pub fn reset(&self, data: Option<&[u8]>) -> Result<(), Error> {
        let mut payload = heapless::Vec::new();
        if let Some(data) = data {
            payload
                .extend_from_slice(data)
                .map_err(|_| Error::BufferTooSmall {
                    capacity: MAX_REQUEST_PAYLOAD,
                    required: data.len(),
                })?;
        }
        *self.payload.lock().expect("request payload lock poisoned") = payload;
        *self.outcome.lock().expect("request outcome lock poisoned") = RequestOutcome::default();
        *self.state.lock().expect("request state lock poisoned") = RequestState::Queued;
        Ok(())
    }
}

/// Per-slave, per-protocol FIFO of pending requests. The master holds one of these per slave per
/// protocol (CoE, SoE); `pop_front` is how a slave's FSM picks up the next request to service.
pub struct RequestList {
    queue: Mutex<std::collections::VecDeque<std::sync::Arc<Request>>>,
}

impl Default for RequestList {
    fn default() -> Self {
        Self {
            queue: Mutex::new(std::collections::VecDeque::new()),
        }
    }
}

impl RequestList {
    pub fn push(&self, request: std::sync::Arc<Request>) {
        self.queue.lock().expect("request list lock poisoned").push_back(request);
    }

    /// FSM side: look at (without removing) the head request, if any, so the FSM can drive it
    /// across multiple cycles before popping it once it terminates.
    pub fn front(&self) -> Option<std::sync::Arc<Request>> {
        self.queue.lock().expect("request list lock poisoned").front().cloned()
    }

    /// Remove the head request once it has reached a terminal state.
    pub fn pop_front_if_done(&self) -> Option<std::sync::Arc<Request>> {
        let mut queue = self.queue.lock().expect("request list lock poisoned");
        match queue.front() {
            Some(r) if matches!(r.state(), RequestState::Success | RequestState::Failure) => queue.pop_front(),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().expect("request list lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::coe::SubIndex;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn begin_service_claims_once() {
        let req = Request::new(
            RequestKind::SdoUpload {
                index: 0x1018,
                sub_index: SubIndex::Index(1),
            },
            1,
            4,
        );

        assert!(req.begin_service());
        assert!(!req.begin_service());
        assert_eq!(req.state(), RequestState::Busy);
    }

    #[test]
    fn success_wakes_waiter_with_payload() {
        let req = Arc::new(Request::new(
            RequestKind::SdoUpload {
                index: 0x1018,
                sub_index: SubIndex::Index(1),
            },
            1,
            4,
        ));

        let waiter = {
            let req = req.clone();
            thread::spawn(move || req.wait_result())
        };

        assert!(req.begin_service());
        req.complete_success(&[0x02, 0x00, 0x00, 0x00]).unwrap();

        let result = waiter.join().unwrap().unwrap();
        assert_eq!(&result[..], &[0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn abort_surfaces_as_error() {
        let req = Request::new(
            RequestKind::SdoDownload {
                index: 0x6060,
                sub_index: SubIndex::Index(0),
            },
            2,
            1,
        );

        req.begin_service();
        req.complete_aborted(CoeAbortCode::NotFound);

        let err = req.wait_result().unwrap_err();
        assert_eq!(err, Error::Abort(CoeAbortCode::NotFound));
    }

    #[test]
    fn request_list_fifo_order() {
        let list = RequestList::default();
        let a = Arc::new(Request::new(RequestKind::SoeRead { drive_no: 0, idn: 0x71 }, 9, 4));
        let b = Arc::new(Request::new(RequestKind::SoeRead { drive_no: 0, idn: 0x72 }, 9, 4));

        list.push(a.clone());
        list.push(b.clone());

        assert_eq!(list.len(), 2);
        assert!(std::ptr::eq(list.front().unwrap().as_ref(), a.as_ref()));

        a.begin_service();
        a.complete_success(&[]).unwrap();
        let popped = list.pop_front_if_done().unwrap();
        assert!(std::ptr::eq(popped.as_ref(), a.as_ref()));
        assert!(std::ptr::eq(list.front().unwrap().as_ref(), b.as_ref()));
    }
}
