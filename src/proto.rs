//! Page-server wire protocol.
//!
//! Little-endian, packed, and stable: these layouts are shared with every
//! client implementation, so the field order below is load-bearing.
//!
//! ```text
//! request header (28 bytes)            response header (20 bytes)
//! ┌────────────┬──────┐               ┌────────────┬──────┐
//! │ magic      │ u32  │               │ magic      │ u32  │
//! │ version    │ u32  │               │ version    │ u32  │
//! │ cmd        │ u8   │               │ status     │ u8   │
//! │ reserved   │ 3×u8 │               │ reserved   │ 3×u8 │
//! │ offset     │ u64  │               │ length     │ u32  │
//! │ length     │ u32  │               │ reserved   │ u32  │
//! │ reserved   │ u32  │               └────────────┴──────┘
//! └────────────┴──────┘
//! ```
//!
//! READ carries no request body; the response carries `length` payload bytes.
//! WRITE carries `length` request payload bytes; the response is bare.
//! FLUSH/DISCARD/STAT are bare requests; STAT's response carries a 16-byte
//! [`StatBody`]. Reserved bytes are written as zero and ignored on receipt.

use bytes::{Buf, BufMut};
use thiserror::Error;

/// `"PAGE"` interpreted as a big-endian u32, on the wire little-endian.
pub const MAGIC: u32 = 0x5041_4745;
/// Protocol version spoken by this crate.
pub const VERSION: u32 = 1;
/// Size of [`RequestHeader`] on the wire.
pub const REQUEST_HEADER_LEN: usize = 28;
/// Size of [`ResponseHeader`] on the wire.
pub const RESPONSE_HEADER_LEN: usize = 20;
/// Size of [`StatBody`] on the wire.
pub const STAT_BODY_LEN: usize = 16;
/// Fixed page size reported by STAT.
pub const PAGE_SIZE: u32 = 4096;

/// Malformed or mismatched wire data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    #[error("bad magic 0x{0:08x}")]
    BadMagic(u32),
    #[error("unsupported version {0}")]
    BadVersion(u32),
    #[error("unknown command {0}")]
    UnknownCommand(u8),
    #[error("unknown status {0}")]
    UnknownStatus(u8),
    #[error("truncated header: {got} of {need} bytes")]
    Truncated { got: usize, need: usize },
}

/// Request commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Read = 1,
    Write = 2,
    Flush = 3,
    Discard = 4,
    Stat = 5,
}

impl Command {
    fn from_wire(raw: u8) -> Result<Self, ProtoError> {
        match raw {
            1 => Ok(Command::Read),
            2 => Ok(Command::Write),
            3 => Ok(Command::Flush),
            4 => Ok(Command::Discard),
            5 => Ok(Command::Stat),
            other => Err(ProtoError::UnknownCommand(other)),
        }
    }
}

/// Response status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    Error = 1,
    Eof = 2,
}

impl Status {
    fn from_wire(raw: u8) -> Result<Self, ProtoError> {
        match raw {
            0 => Ok(Status::Ok),
            1 => Ok(Status::Error),
            2 => Ok(Status::Eof),
            other => Err(ProtoError::UnknownStatus(other)),
        }
    }
}

/// Request header; `offset` and `length` are in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub cmd: Command,
    pub offset: u64,
    pub length: u32,
}

impl RequestHeader {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(MAGIC);
        buf.put_u32_le(VERSION);
        buf.put_u8(self.cmd as u8);
        buf.put_bytes(0, 3);
        buf.put_u64_le(self.offset);
        buf.put_u32_le(self.length);
        buf.put_bytes(0, 4);
    }

    pub fn decode(mut buf: impl Buf) -> Result<Self, ProtoError> {
        if buf.remaining() < REQUEST_HEADER_LEN {
            return Err(ProtoError::Truncated {
                got: buf.remaining(),
                need: REQUEST_HEADER_LEN,
            });
        }
        check_preamble(buf.get_u32_le(), buf.get_u32_le())?;
        let cmd = Command::from_wire(buf.get_u8())?;
        buf.advance(3);
        let offset = buf.get_u64_le();
        let length = buf.get_u32_le();
        buf.advance(4);
        Ok(Self {
            cmd,
            offset,
            length,
        })
    }
}

/// Response header; `length` is the payload size that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: Status,
    pub length: u32,
}

impl ResponseHeader {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(MAGIC);
        buf.put_u32_le(VERSION);
        buf.put_u8(self.status as u8);
        buf.put_bytes(0, 3);
        buf.put_u32_le(self.length);
        buf.put_bytes(0, 4);
    }

    pub fn decode(mut buf: impl Buf) -> Result<Self, ProtoError> {
        if buf.remaining() < RESPONSE_HEADER_LEN {
            return Err(ProtoError::Truncated {
                got: buf.remaining(),
                need: RESPONSE_HEADER_LEN,
            });
        }
        check_preamble(buf.get_u32_le(), buf.get_u32_le())?;
        let status = Status::from_wire(buf.get_u8())?;
        buf.advance(3);
        let length = buf.get_u32_le();
        buf.advance(4);
        Ok(Self { status, length })
    }
}

/// STAT response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatBody {
    pub total_size: u64,
    pub page_size: u32,
}

impl StatBody {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u64_le(self.total_size);
        buf.put_u32_le(self.page_size);
        buf.put_bytes(0, 4);
    }

    pub fn decode(mut buf: impl Buf) -> Result<Self, ProtoError> {
        if buf.remaining() < STAT_BODY_LEN {
            return Err(ProtoError::Truncated {
                got: buf.remaining(),
                need: STAT_BODY_LEN,
            });
        }
        let total_size = buf.get_u64_le();
        let page_size = buf.get_u32_le();
        buf.advance(4);
        Ok(Self {
            total_size,
            page_size,
        })
    }
}

fn check_preamble(magic: u32, version: u32) -> Result<(), ProtoError> {
    if magic != MAGIC {
        return Err(ProtoError::BadMagic(magic));
    }
    if version != VERSION {
        return Err(ProtoError::BadVersion(version));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_header_byte_image() {
        let header = RequestHeader {
            cmd: Command::Read,
            offset: 0x1122_3344_5566_7788,
            length: 0xAABB_CCDD,
        };
        let mut buf = Vec::new();
        header.encode(&mut buf);

        assert_eq!(buf.len(), REQUEST_HEADER_LEN);
        #[rustfmt::skip]
        assert_eq!(buf, vec![
            0x45, 0x47, 0x41, 0x50,             // magic "PAGE" little-endian
            0x01, 0x00, 0x00, 0x00,             // version
            0x01,                               // cmd = READ
            0x00, 0x00, 0x00,                   // reserved
            0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, // offset
            0xDD, 0xCC, 0xBB, 0xAA,             // length
            0x00, 0x00, 0x00, 0x00,             // reserved
        ]);
        assert_eq!(RequestHeader::decode(&buf[..]).unwrap(), header);
    }

    #[test]
    fn response_header_byte_image() {
        let header = ResponseHeader {
            status: Status::Eof,
            length: 4096,
        };
        let mut buf = Vec::new();
        header.encode(&mut buf);

        assert_eq!(buf.len(), RESPONSE_HEADER_LEN);
        #[rustfmt::skip]
        assert_eq!(buf, vec![
            0x45, 0x47, 0x41, 0x50,
            0x01, 0x00, 0x00, 0x00,
            0x02,                               // status = EOF
            0x00, 0x00, 0x00,
            0x00, 0x10, 0x00, 0x00,             // length = 4096
            0x00, 0x00, 0x00, 0x00,
        ]);
        assert_eq!(ResponseHeader::decode(&buf[..]).unwrap(), header);
    }

    #[test]
    fn stat_body_round_trip() {
        let body = StatBody {
            total_size: 1 << 30,
            page_size: PAGE_SIZE,
        };
        let mut buf = Vec::new();
        body.encode(&mut buf);
        assert_eq!(buf.len(), STAT_BODY_LEN);
        assert_eq!(StatBody::decode(&buf[..]).unwrap(), body);
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut buf = Vec::new();
        RequestHeader {
            cmd: Command::Flush,
            offset: 0,
            length: 0,
        }
        .encode(&mut buf);
        buf[0] = 0xFF;
        assert!(matches!(
            RequestHeader::decode(&buf[..]),
            Err(ProtoError::BadMagic(_))
        ));
    }

    #[test]
    fn decode_rejects_bad_version() {
        let mut buf = Vec::new();
        RequestHeader {
            cmd: Command::Flush,
            offset: 0,
            length: 0,
        }
        .encode(&mut buf);
        buf[4] = 9;
        assert_eq!(
            RequestHeader::decode(&buf[..]),
            Err(ProtoError::BadVersion(9))
        );
    }

    #[test]
    fn decode_rejects_unknown_command_and_status() {
        let mut buf = Vec::new();
        RequestHeader {
            cmd: Command::Stat,
            offset: 0,
            length: 0,
        }
        .encode(&mut buf);
        buf[8] = 0x77;
        assert_eq!(
            RequestHeader::decode(&buf[..]),
            Err(ProtoError::UnknownCommand(0x77))
        );

        let mut buf = Vec::new();
        ResponseHeader {
            status: Status::Ok,
            length: 0,
        }
        .encode(&mut buf);
        buf[8] = 0x77;
        assert_eq!(
            ResponseHeader::decode(&buf[..]),
            Err(ProtoError::UnknownStatus(0x77))
        );
    }

    #[test]
    fn decode_rejects_short_input() {
        let buf = [0u8; 10];
        assert_eq!(
            RequestHeader::decode(&buf[..]),
            Err(ProtoError::Truncated { got: 10, need: 28 })
        );
    }
}
