//! Application-facing constructors for SoE IDN requests.
//!
//! Grounded on `ec_soe_requests_example.c`'s call shape: a request names a drive number (0..=7)
//! and an IDN, and distinguishes a plain read from a write of a caller-supplied size.

use crate::error::Error;
use crate::request::{Request, RequestKind};

const MAX_DRIVE_NO: u8 = 7;

fn check_drive_no(drive_no: u8) -> Result<(), Error> {
    if drive_no > MAX_DRIVE_NO {
        return Err(Error::InvalidArgument);
    }
    Ok(())
}

/// Build an IDN read request for `drive_no`/`idn`.
pub fn read_idn(slave_position: u16, drive_no: u8, idn: u16, expected_len: usize) -> Result<Request, Error> {
    check_drive_no(drive_no)?;
    Ok(Request::new(
        RequestKind::SoeRead { drive_no, idn },
        slave_position,
        expected_len,
    ))
}

/// Build an IDN write request carrying `data`.
pub fn write_idn(slave_position: u16, drive_no: u8, idn: u16, data: &[u8]) -> Result<Request, Error> {
    check_drive_no(drive_no)?;
    Request::with_payload(RequestKind::SoeWrite { drive_no, idn }, slave_position, data.len(), data)
}

/// Reusable IDN request handle, analogous to [`super::coe::SdoRequestHandle`]: validates
/// `drive_no` once, then can be resubmitted as either a read or a write.
pub struct IdnRequestHandle {
    request: Request,
}

impl IdnRequestHandle {
    pub fn create(slave_position: u16, drive_no: u8, idn: u16, expected_len: usize) -> Result<Self, Error> {
        check_drive_no(drive_no)?;
        Ok(Self {
            request: Request::new(RequestKind::SoeRead { drive_no, idn }, slave_position, expected_len),
        })
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn submit_read(&self) -> Result<(), Error> {
        self.request.reset(None)
    }

    pub fn submit_write(&self, data: &[u8]) -> Result<(), Error> {
        self.request.reset(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_drive_no() {
        let err = read_idn(9, 8, 0x71, 4).unwrap_err();
        assert_eq!(err, Error::InvalidArgument);
    }

    #[test]
    fn read_request_targets_idn() {
        let req = read_idn(9, 0, 0x71, 4).unwrap();
        match req.kind {
            RequestKind::SoeRead { drive_no, idn } => {
                assert_eq!(drive_no, 0);
                assert_eq!(idn, 0x71);
            }
            _ => panic!("wrong kind"),
        }
    }

    #[test]
    fn write_request_carries_payload() {
        let req = write_idn(9, 0, 0x71, &[0x01, 0x02]).unwrap();
        assert_eq!(&req.payload()[..], &[0x01, 0x02]);
    }
}
