//! TCP page server over a flat backing file.
//!
//! The backing file is either reused (it must already exist) or created with
//! an explicit `--size`; mixing the two is refused so a stale image is never
//! silently truncated or grown.

use std::fs::OpenOptions;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagecache::pageserver::PageServer;

#[derive(Debug, Parser)]
#[command(name = "pageserver", about = "Serve a backing file over the page protocol")]
struct Args {
    /// Backing file path.
    #[arg(short, long)]
    file: PathBuf,

    /// Size for a newly created backing file, e.g. 64M or 8G.
    ///
    /// Required when the file does not exist yet; refused when it does.
    #[arg(short, long, value_parser = parse_size)]
    size: Option<u64>,

    /// Listen port.
    #[arg(short, long, default_value_t = 8964)]
    port: u16,

    /// Listen address.
    #[arg(short, long, default_value = "0.0.0.0")]
    addr: IpAddr,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

/// Parses `N[K|M|G]` into bytes.
fn parse_size(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let (digits, unit) = match input.char_indices().last() {
        Some((idx, suffix)) if suffix.is_ascii_alphabetic() => {
            let unit = match suffix.to_ascii_uppercase() {
                'K' => 1u64 << 10,
                'M' => 1 << 20,
                'G' => 1 << 30,
                _ => return Err(format!("unknown size suffix '{suffix}'")),
            };
            (&input[..idx], unit)
        },
        _ => (input, 1),
    };
    let count: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size '{input}'"))?;
    count
        .checked_mul(unit)
        .ok_or_else(|| format!("size '{input}' overflows"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(args: &Args) -> Result<(), String> {
    let exists = args.file.exists();
    match (exists, args.size) {
        (true, Some(_)) => {
            return Err(format!(
                "{} already exists; --size only applies to new files",
                args.file.display()
            ));
        },
        (false, None) => {
            return Err(format!(
                "{} does not exist; pass --size to create it",
                args.file.display()
            ));
        },
        _ => {},
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(!exists)
        .open(&args.file)
        .map_err(|err| format!("cannot open {}: {err}", args.file.display()))?;
    if let Some(size) = args.size {
        file.set_len(size)
            .map_err(|err| format!("cannot size {}: {err}", args.file.display()))?;
        info!(path = %args.file.display(), size, "created backing file");
    }

    let addr = SocketAddr::new(args.addr, args.port);
    let server =
        PageServer::bind(addr, file).map_err(|err| format!("cannot listen on {addr}: {err}"))?;
    info!(%addr, file = %args.file.display(), "serving");
    server.run().map_err(|err| format!("server failed: {err}"))
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        },
    }
}
