//! Log server/viewer binary, grounded on `uclog.py`'s `__main__`.
//!
//! In server mode (`-s`, or the default with a local display), opens the
//! device's serial link and forwards its per-port and "log" mux frames
//! onto the TCP ports a [`sbl_mux::LogClient`] connects to. In client mode
//! (`-c`) it's a standalone viewer. ELF-symbol log decoding (`-e FILE`) is
//! accepted for CLI compatibility but not implemented — it's an explicit
//! external boundary (spec.md §1); records are rendered raw instead.

use clap::Parser;
use sbl_mux::log_link::{HostPort, LogClient, LogServer};
use sbl_mux::transport::SerialPort;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};

#[derive(Parser)]
#[command(name = "sbl-log", about = "SBL mux log server/viewer")]
struct Args {
    /// Serial device to use when connecting to the target (server mode).
    #[arg(long)]
    target: Option<String>,
    /// host[:base] to use when serving/connecting over TCP.
    #[arg(long)]
    host: Option<String>,
    /// Baud rate; configuring the actual serial line is an external step.
    #[arg(long, default_value_t = 1_000_000)]
    baudrate: u32,
    /// Server-only mode: forward frames, no local display.
    #[arg(short = 's')]
    server_only: bool,
    /// Client mode: connect to a running server and display its log channel.
    #[arg(short = 'c')]
    client: bool,
    /// ELF file(s) to use for symbol decoding (accepted, not implemented).
    #[arg(short = 'e')]
    elf: Vec<String>,
}

/// Opens a serial device path as a plain file. Baud rate, parity and
/// line-discipline setup are left to the caller (e.g. `stty` beforehand);
/// the actual serial transport is an external collaborator (spec.md §1).
struct FileSerial(File);

impl Read for FileSerial {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}
impl Write for FileSerial {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
impl SerialPort for FileSerial {
    fn reconnect(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "reconnect requires a real serial device"))
    }
}

fn parse_hostport(h: Option<&str>) -> HostPort {
    match h {
        None => HostPort::default(),
        Some(s) => match s.split_once(':') {
            Some((host, base)) => {
                let host = if host.is_empty() { sbl_mux::frame::DEFAULT_HOST.to_string() } else { host.to_string() };
                let base = base.parse().unwrap_or(sbl_mux::frame::DEFAULT_BASE_PORT);
                HostPort::new(host, base)
            }
            None => HostPort::new(s.to_string(), sbl_mux::frame::DEFAULT_BASE_PORT),
        },
    }
}

fn run_client(hostport: HostPort) -> anyhow::Result<()> {
    let client = LogClient::connect(hostport)?;
    let mut buf = [0u8; 4096];
    loop {
        let n = client.log_channel.read(&mut buf)?;
        if n > 0 {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            println!("[{now}] {}", hex::encode(&buf[..n]));
        }
    }
}

fn run_server(args: &Args) -> anyhow::Result<()> {
    if !args.elf.is_empty() {
        log::warn!("ELF symbol decoding was requested but is not implemented; showing raw records");
    }
    if args.baudrate != 1_000_000 {
        log::info!("baud rate {} must be configured on the device before sbl-log attaches", args.baudrate);
    }
    let target = args.target.as_ref().ok_or_else(|| anyhow::anyhow!("server mode requires --target"))?;
    let serial = OpenOptions::new().read(true).write(true).open(target)?;
    let hostport = parse_hostport(args.host.as_deref());
    let server = LogServer::new(Box::new(FileSerial(serial)), hostport)?;
    let handles = server.spawn_forwarders();

    if !args.server_only {
        let mut buf = [0u8; 4096];
        loop {
            match server.log_channel.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => io::stdout().write_all(&buf[..n])?,
                Err(e) => log::warn!("log channel read error: {e}"),
            }
        }
    }

    for h in handles {
        let _ = h.join();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.client {
        run_client(parse_hostport(args.host.as_deref()))
    } else {
        run_server(&args)
    }
}
