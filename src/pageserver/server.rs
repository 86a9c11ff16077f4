//! Blocking TCP page server over a backing file.
//!
//! One accept loop, one thread per connection. Every request is a fixed-size
//! header, validated before it is acted on: bad magic, a version mismatch, an
//! unknown command, or a range that does not fit the backing file all tear
//! down the connection after at most one ERROR response. Backend I/O errors
//! answer ERROR but keep the connection alive.

use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::unix::fs::FileExt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::proto::{
    Command, ProtoError, RequestHeader, ResponseHeader, StatBody, Status, PAGE_SIZE,
    REQUEST_HEADER_LEN,
};

/// Zero-fill granularity for DISCARD.
const DISCARD_CHUNK: usize = 64 * 1024;

/// Why a connection was torn down.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("i/o: {0}")]
    Io(#[from] io::Error),
    #[error("protocol: {0}")]
    Proto(#[from] ProtoError),
    #[error("range {offset}+{length} outside backing file of {size} bytes")]
    OutOfBounds { offset: u64, length: u32, size: u64 },
}

/// TCP page server serving one backing file.
///
/// # Example
///
/// ```no_run
/// use pagecache::pageserver::PageServer;
///
/// let file = std::fs::OpenOptions::new()
///     .read(true)
///     .write(true)
///     .open("/var/lib/pages.img")?;
/// let server = PageServer::bind("0.0.0.0:8964".parse()?, file)?;
/// server.run()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PageServer {
    listener: TcpListener,
    file: Arc<File>,
}

impl PageServer {
    /// Binds the listener; the file must be open for reading and writing.
    pub fn bind(addr: SocketAddr, file: File) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            file: Arc::new(file),
        })
    }

    /// Address the server is actually listening on (resolves port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, one service thread each.
    pub fn run(self) -> io::Result<()> {
        info!(addr = %self.listener.local_addr()?, "page server listening");
        for conn in self.listener.incoming() {
            match conn {
                Ok(stream) => {
                    if let Ok(peer) = stream.peer_addr() {
                        debug!(%peer, "client connected");
                    }
                    let file = Arc::clone(&self.file);
                    std::thread::spawn(move || match serve_connection(&file, stream) {
                        Ok(()) => debug!("client disconnected"),
                        Err(err) => debug!(%err, "connection closed"),
                    });
                },
                Err(err) => warn!(%err, "accept failed"),
            }
        }
        Ok(())
    }
}

/// Request loop for one connection. Returning (with or without an error)
/// drops the stream and closes the connection.
fn serve_connection(file: &File, mut stream: TcpStream) -> Result<(), ServerError> {
    loop {
        let mut raw = [0u8; REQUEST_HEADER_LEN];
        match stream.read_exact(&mut raw) {
            Ok(()) => {},
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        let request = match RequestHeader::decode(&raw[..]) {
            Ok(request) => request,
            Err(err) => {
                let _ = send_response(&mut stream, Status::Error, &[]);
                return Err(err.into());
            },
        };

        let size = file.metadata()?.len();
        if let Err(err) = validate_range(&request, size) {
            let _ = send_response(&mut stream, Status::Error, &[]);
            return Err(err);
        }

        match request.cmd {
            Command::Read => handle_read(file, &mut stream, &request, size)?,
            Command::Write => handle_write(file, &mut stream, &request)?,
            Command::Flush => handle_flush(file, &mut stream)?,
            Command::Discard => handle_discard(file, &mut stream, &request)?,
            Command::Stat => handle_stat(&mut stream, size)?,
        }
    }
}

/// Range sanity per command. Reads are allowed to run off the end (they
/// shorten, or answer EOF); writes and discards must fit the file.
fn validate_range(request: &RequestHeader, size: u64) -> Result<(), ServerError> {
    let end = request
        .offset
        .checked_add(u64::from(request.length))
        .ok_or(ServerError::OutOfBounds {
            offset: request.offset,
            length: request.length,
            size,
        })?;
    match request.cmd {
        Command::Write | Command::Discard if end > size => Err(ServerError::OutOfBounds {
            offset: request.offset,
            length: request.length,
            size,
        }),
        _ => Ok(()),
    }
}

fn handle_read(
    file: &File,
    stream: &mut TcpStream,
    request: &RequestHeader,
    size: u64,
) -> Result<(), ServerError> {
    debug!(offset = request.offset, length = request.length, "READ");
    if request.offset >= size {
        return send_response(stream, Status::Eof, &[]);
    }
    let available = (size - request.offset).min(u64::from(request.length)) as usize;
    let mut payload = vec![0u8; available];
    match file.read_exact_at(&mut payload, request.offset) {
        Ok(()) => send_response(stream, Status::Ok, &payload),
        Err(err) => {
            warn!(%err, "backing read failed");
            send_response(stream, Status::Error, &[])
        },
    }
}

fn handle_write(
    file: &File,
    stream: &mut TcpStream,
    request: &RequestHeader,
) -> Result<(), ServerError> {
    debug!(offset = request.offset, length = request.length, "WRITE");
    let mut payload = vec![0u8; request.length as usize];
    stream.read_exact(&mut payload)?;
    match file.write_all_at(&payload, request.offset) {
        Ok(()) => send_response(stream, Status::Ok, &[]),
        Err(err) => {
            warn!(%err, "backing write failed");
            send_response(stream, Status::Error, &[])
        },
    }
}

fn handle_flush(file: &File, stream: &mut TcpStream) -> Result<(), ServerError> {
    debug!("FLUSH");
    match file.sync_all() {
        Ok(()) => send_response(stream, Status::Ok, &[]),
        Err(err) => {
            warn!(%err, "fsync failed");
            send_response(stream, Status::Error, &[])
        },
    }
}

/// Zero-fills the range. Readers cannot tell this apart from a punched hole,
/// and it keeps the server portable.
fn handle_discard(
    file: &File,
    stream: &mut TcpStream,
    request: &RequestHeader,
) -> Result<(), ServerError> {
    debug!(offset = request.offset, length = request.length, "DISCARD");
    let zeros = [0u8; DISCARD_CHUNK];
    let mut offset = request.offset;
    let mut remaining = request.length as usize;
    while remaining > 0 {
        let step = remaining.min(DISCARD_CHUNK);
        if let Err(err) = file.write_all_at(&zeros[..step], offset) {
            warn!(%err, "discard failed");
            return send_response(stream, Status::Error, &[]);
        }
        offset += step as u64;
        remaining -= step;
    }
    send_response(stream, Status::Ok, &[])
}

fn handle_stat(stream: &mut TcpStream, size: u64) -> Result<(), ServerError> {
    debug!("STAT");
    let mut body = Vec::with_capacity(crate::proto::STAT_BODY_LEN);
    StatBody {
        total_size: size,
        page_size: PAGE_SIZE,
    }
    .encode(&mut body);
    send_response(stream, Status::Ok, &body)
}

fn send_response(
    stream: &mut TcpStream,
    status: Status,
    payload: &[u8],
) -> Result<(), ServerError> {
    let mut buf = Vec::with_capacity(crate::proto::RESPONSE_HEADER_LEN + payload.len());
    ResponseHeader {
        status,
        length: payload.len() as u32,
    }
    .encode(&mut buf);
    buf.extend_from_slice(payload);
    stream.write_all(&buf)?;
    Ok(())
}
