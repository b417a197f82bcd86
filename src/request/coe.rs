//! Application-facing constructors for CoE SDO requests: ad-hoc `sdo_upload`/`sdo_download` calls
//! plus the reusable handle resolving the `slave_config_create_sdo_request` open question.

use crate::error::Error;
use crate::mailbox::coe::SubIndex;
use crate::request::{Request, RequestKind};

/// Build an SDO upload request. `expected_len` is the caller's buffer size, used by the FSM to
/// decide whether the transfer can stay expedited or must segment.
pub fn sdo_upload(slave_position: u16, index: u16, sub_index: SubIndex, expected_len: usize) -> Request {
    Request::new(
        RequestKind::SdoUpload { index, sub_index },
        slave_position,
        expected_len,
    )
}

/// Build an SDO download request carrying `data` as the value to write.
pub fn sdo_download(
    slave_position: u16,
    index: u16,
    sub_index: SubIndex,
    data: &[u8],
) -> Result<Request, Error> {
    Request::with_payload(
        RequestKind::SdoDownload { index, sub_index },
        slave_position,
        data.len(),
        data,
    )
}

/// Complete-access variant of [`sdo_upload`]: reads every subindex of `index` as one transfer.
pub fn sdo_upload_complete(slave_position: u16, index: u16, expected_len: usize) -> Request {
    sdo_upload(slave_position, index, SubIndex::Complete, expected_len)
}

/// Complete-access variant of [`sdo_download`].
pub fn sdo_download_complete(slave_position: u16, index: u16, data: &[u8]) -> Result<Request, Error> {
    sdo_download(slave_position, index, SubIndex::Complete, data)
}

/// A reusable SDO request handle: validated once at construction, then filled with fresh data
/// and resubmitted via [`Request::reset`] for as many transfers as the application needs,
/// sharing the same QUEUED -> BUSY -> SUCCESS/FAILURE lifecycle as an ad-hoc call.
///
/// This is `slave_config_create_sdo_request` from the open question: the mailbox-size check
/// that would otherwise happen per-call happens once here, since the sync manager's mailbox
/// size doesn't change between resubmissions of the same handle.
#[derive(Debug)]
pub struct SdoRequestHandle {
    request: Request,
}

impl SdoRequestHandle {
    /// Construct a handle for `index`/`sub_index`, validating `expected_len` against the
    /// slave's tx-mailbox size up front. Used for repeated uploads or downloads of the same
    /// object, e.g. a periodically-polled SDO.
    pub fn create(
        slave_position: u16,
        index: u16,
        sub_index: SubIndex,
        expected_len: usize,
        mailbox_capacity: usize,
    ) -> Result<Self, Error> {
        if expected_len > mailbox_capacity {
            return Err(Error::BufferTooSmall {
                capacity: mailbox_capacity,
                required: expected_len,
            });
        }

        Ok(Self {
            request: Request::new(RequestKind::SdoUpload { index, sub_index }, slave_position, expected_len),
        })
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Resubmit as an upload: resets to QUEUED with an empty payload ready to be filled by the
    /// FSM.
    pub fn submit_upload(&self) -> Result<(), Error> {
        self.request.reset(None)
    }

    /// Resubmit as a download carrying `data`.
    pub fn submit_download(&self, data: &[u8]) -> Result<(), Error> {
        self.request.reset(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_request_targets_object() {
        let req = sdo_upload(1, 0x1018, SubIndex::Index(1), 4);
        match req.kind {
            RequestKind::SdoUpload { index, .. } => assert_eq!(index, 0x1018),
            _ => panic!("wrong kind"),
        }
    }

    #[test]
    fn download_request_carries_payload() {
        let req = sdo_download(1, 0x6060, SubIndex::Index(0), &[0x08]).unwrap();
        assert_eq!(&req.payload()[..], &[0x08]);
    }

    #[test]
    fn handle_rejects_oversized_expected_len() {
        let err = SdoRequestHandle::create(1, 0x1018, SubIndex::Index(1), 100, 64).unwrap_err();
        assert_eq!(
            err,
            Error::BufferTooSmall {
                capacity: 64,
                required: 100
            }
        );
    }

    #[test]
    fn handle_reusable_across_submissions() {
        let handle = SdoRequestHandle::create(1, 0x1018, SubIndex::Index(1), 4, 64).unwrap();

        handle.request().begin_service();
        handle.request().complete_success(&[1, 0, 0, 0]).unwrap();

        handle.submit_upload().unwrap();
        assert_eq!(
            handle.request().state(),
            crate::request::RequestState::Queued
        );
    }
}
