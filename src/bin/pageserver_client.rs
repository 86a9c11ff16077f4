//! Protocol test client for the page server.
//!
//! Drives single commands against a running server, plus a `smoke` mode that
//! exercises the whole command set and verifies the data path end to end.

use std::net::IpAddr;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pagecache::pageserver::PageClient;
use pagecache::proto::Status;

#[derive(Debug, Parser)]
#[command(name = "pageserver-client", about = "Poke a running page server")]
struct Args {
    /// Server address.
    #[arg(short, long, default_value = "127.0.0.1")]
    addr: IpAddr,

    /// Server port.
    #[arg(short, long, default_value_t = 8964)]
    port: u16,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Read a range and hex-dump it.
    Read { offset: u64, length: u32 },
    /// Write a UTF-8 string at an offset.
    Write { offset: u64, data: String },
    /// Ask the server to fsync.
    Flush,
    /// Zero out a range.
    Discard { offset: u64, length: u32 },
    /// Print backing-file size and page size.
    Stat,
    /// Exercise every command and verify the data path.
    Smoke,
}

fn hexdump(data: &[u8]) {
    for (row, chunk) in data.chunks(16).enumerate() {
        let bytes: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        println!("{:08x}  {}", row * 16, bytes.join(" "));
    }
}

fn run(args: &Args) -> Result<(), String> {
    let mut client = PageClient::connect((args.addr, args.port))
        .map_err(|err| format!("cannot connect to {}:{}: {err}", args.addr, args.port))?;

    match &args.cmd {
        Cmd::Read { offset, length } => {
            let (status, data) = client
                .read(*offset, *length)
                .map_err(|err| err.to_string())?;
            println!("status {status:?}, {} bytes", data.len());
            hexdump(&data);
        },
        Cmd::Write { offset, data } => {
            client
                .write(*offset, data.as_bytes())
                .map_err(|err| err.to_string())?;
            println!("wrote {} bytes at {offset}", data.len());
        },
        Cmd::Flush => {
            client.flush().map_err(|err| err.to_string())?;
            println!("flushed");
        },
        Cmd::Discard { offset, length } => {
            client
                .discard(*offset, *length)
                .map_err(|err| err.to_string())?;
            println!("discarded {length} bytes at {offset}");
        },
        Cmd::Stat => {
            let stat = client.stat().map_err(|err| err.to_string())?;
            println!(
                "total_size {} bytes, page_size {} bytes",
                stat.total_size, stat.page_size
            );
        },
        Cmd::Smoke => smoke(&mut client)?,
    }
    Ok(())
}

/// Write/read/flush/discard/stat pass with verification, against offset 0.
fn smoke(client: &mut PageClient) -> Result<(), String> {
    let stat = client.stat().map_err(|err| format!("stat: {err}"))?;
    println!("stat: {} bytes, page {}", stat.total_size, stat.page_size);
    if stat.total_size < 2 * u64::from(stat.page_size) {
        return Err("backing file too small for smoke test (need 2 pages)".into());
    }

    let pattern: Vec<u8> = (0..stat.page_size).map(|i| (i % 251) as u8).collect();
    client
        .write(0, &pattern)
        .map_err(|err| format!("write: {err}"))?;
    client.flush().map_err(|err| format!("flush: {err}"))?;

    let (status, data) = client
        .read(0, stat.page_size)
        .map_err(|err| format!("read: {err}"))?;
    if status != Status::Ok || data != pattern {
        return Err("read-back mismatch after write".into());
    }

    client
        .discard(0, stat.page_size)
        .map_err(|err| format!("discard: {err}"))?;
    let (_, zeroed) = client
        .read(0, stat.page_size)
        .map_err(|err| format!("read after discard: {err}"))?;
    if zeroed.iter().any(|&b| b != 0) {
        return Err("discarded range did not read back zeroed".into());
    }

    let (status, tail) = client
        .read(stat.total_size, 16)
        .map_err(|err| format!("read at end: {err}"))?;
    if status != Status::Eof || !tail.is_empty() {
        return Err("read past end did not answer EOF".into());
    }

    println!("smoke test passed");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default = if args.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        },
    }
}
