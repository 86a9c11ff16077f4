//! Blocking page-server client.
//!
//! One request/response round trip per call, over a persistent connection.
//! READ surfaces the server's OK/EOF distinction; every other command treats
//! anything but OK as a failure.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use thiserror::Error;
use tracing::debug;

use crate::proto::{
    Command, ProtoError, RequestHeader, ResponseHeader, StatBody, Status,
    RESPONSE_HEADER_LEN,
};

/// Failure talking to a page server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("i/o: {0}")]
    Io(#[from] io::Error),
    #[error("protocol: {0}")]
    Proto(#[from] ProtoError),
    #[error("server answered {0:?}")]
    Rejected(Status),
}

/// Connection to one page server.
///
/// # Example
///
/// ```no_run
/// use pagecache::pageserver::PageClient;
///
/// let mut client = PageClient::connect("127.0.0.1:8964")?;
/// client.write(0, b"hello pages")?;
/// client.flush()?;
/// let (_, data) = client.read(0, 11)?;
/// assert_eq!(&data, b"hello pages");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PageClient {
    stream: TcpStream,
}

impl PageClient {
    /// Connects to a page server.
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Reads up to `length` bytes at `offset`.
    ///
    /// Returns the status (`Ok`, or `Eof` past the end of the backing file)
    /// and the payload, which may be shorter than requested near the end.
    pub fn read(&mut self, offset: u64, length: u32) -> Result<(Status, Vec<u8>), ClientError> {
        let (header, payload) = self.roundtrip(
            RequestHeader {
                cmd: Command::Read,
                offset,
                length,
            },
            &[],
        )?;
        match header.status {
            Status::Ok | Status::Eof => Ok((header.status, payload)),
            Status::Error => Err(ClientError::Rejected(Status::Error)),
        }
    }

    /// Writes `data` at `offset`.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<(), ClientError> {
        let request = RequestHeader {
            cmd: Command::Write,
            offset,
            length: data.len() as u32,
        };
        let (header, _) = self.roundtrip(request, data)?;
        self.expect_ok(header.status)
    }

    /// Asks the server to fsync the backing file.
    pub fn flush(&mut self) -> Result<(), ClientError> {
        let (header, _) = self.roundtrip(
            RequestHeader {
                cmd: Command::Flush,
                offset: 0,
                length: 0,
            },
            &[],
        )?;
        self.expect_ok(header.status)
    }

    /// Discards `length` bytes at `offset`; the range reads back zeroed.
    pub fn discard(&mut self, offset: u64, length: u32) -> Result<(), ClientError> {
        let (header, _) = self.roundtrip(
            RequestHeader {
                cmd: Command::Discard,
                offset,
                length,
            },
            &[],
        )?;
        self.expect_ok(header.status)
    }

    /// Fetches backing-file size and page size.
    pub fn stat(&mut self) -> Result<StatBody, ClientError> {
        let (header, payload) = self.roundtrip(
            RequestHeader {
                cmd: Command::Stat,
                offset: 0,
                length: 0,
            },
            &[],
        )?;
        self.expect_ok(header.status)?;
        Ok(StatBody::decode(&payload[..])?)
    }

    fn expect_ok(&self, status: Status) -> Result<(), ClientError> {
        match status {
            Status::Ok => Ok(()),
            other => Err(ClientError::Rejected(other)),
        }
    }

    /// Sends one request (header + optional payload) and reads the full
    /// response.
    fn roundtrip(
        &mut self,
        request: RequestHeader,
        payload: &[u8],
    ) -> Result<(ResponseHeader, Vec<u8>), ClientError> {
        debug!(?request, payload = payload.len(), "request");
        let mut buf = Vec::with_capacity(crate::proto::REQUEST_HEADER_LEN + payload.len());
        request.encode(&mut buf);
        buf.extend_from_slice(payload);
        self.stream.write_all(&buf)?;

        let mut raw = [0u8; RESPONSE_HEADER_LEN];
        self.stream.read_exact(&mut raw)?;
        let header = ResponseHeader::decode(&raw[..])?;

        let mut body = vec![0u8; header.length as usize];
        self.stream.read_exact(&mut body)?;
        Ok((header, body))
    }
}
