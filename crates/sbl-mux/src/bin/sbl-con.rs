//! Interactive console binary, grounded on `uccon.py`.
//!
//! Connects to logical port 0 (the console stream) either directly over a
//! serial device (`--target`) or through a running [`sbl_mux::LogServer`]
//! over TCP (`--host`). Forwards stdin bytes to the device and prints
//! whatever comes back. Raw terminal mode (`tty.setraw`/`termios`) is left
//! to the caller, e.g. `stty raw -echo` before invoking this binary — an
//! explicit external boundary, matching [`sbl_mux::console`]'s contract.

use clap::Parser;
use sbl_mux::console::CONSOLE_PORT;
use sbl_mux::log_link::{HostPort, LogClient};
use sbl_mux::router::MuxRouter;
use sbl_mux::transport::{SerialPort, Transport, TransportHandle};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sbl-con", about = "Interactive console over the mux link")]
struct Args {
    /// Serial device to use when connecting directly to the target.
    #[arg(long)]
    target: Option<String>,
    /// host[:base] to use when connecting to a running log server.
    #[arg(long)]
    host: Option<String>,
}

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

/// The two ways `uccon.py` can reach the console stream: a direct serial
/// target (raw COBS framing over one logical port), or a server's per-port
/// TCP listener (already demuxed on the wire).
enum Link {
    Direct(MuxRouter),
    Server(std::sync::Arc<TransportHandle>),
}

impl Link {
    fn transport(&self) -> std::sync::Arc<TransportHandle> {
        match self {
            Link::Direct(router) => router.transport(),
            Link::Server(handle) => handle.clone(),
        }
    }

    fn send(&self, data: &[u8]) -> io::Result<()> {
        match self {
            Link::Direct(router) => router
                .stream(CONSOLE_PORT)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "console port not configured"))?
                .tx(data),
            Link::Server(handle) => handle.write(data),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let link = if let Some(target) = &args.target {
        let serial = OpenOptions::new().read(true).write(true).open(target)?;
        let handle = TransportHandle::new(Transport::Serial { port: Box::new(FileSerial(serial)), last_send: std::time::Instant::now() });
        Link::Direct(MuxRouter::new(handle, CONSOLE_PORT + 1, |_event| {}))
    } else {
        let hostport = match &args.host {
            Some(s) => match s.split_once(':') {
                Some((h, p)) => HostPort::new(h.to_string(), p.parse().unwrap_or(sbl_mux::frame::DEFAULT_BASE_PORT)),
                None => HostPort::new(s.clone(), sbl_mux::frame::DEFAULT_BASE_PORT),
            },
            None => HostPort::default(),
        };
        let client = LogClient::connect(hostport)?;
        let handle = client
            .port_channel(CONSOLE_PORT)
            .ok_or_else(|| anyhow::anyhow!("console port unavailable"))?;
        Link::Server(handle)
    };

    let reader_transport = link.transport();
    let reader = std::thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader_transport.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    let _ = io::stdout().write_all(&buf[..n]);
                    let _ = io::stdout().flush();
                }
                Err(e) => {
                    log::warn!("console link read error: {e}");
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
    });

    let mut stdin = io::stdin();
    let mut byte = [0u8; 1];
    loop {
        if stdin.read(&mut byte)? == 0 {
            break;
        }
        if byte[0] == 0x03 {
            break; // Ctrl-C
        }
        link.send(&byte)?;
    }

    drop(reader);
    Ok(())
}
