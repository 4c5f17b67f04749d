//! Log server/client/viewer, grounded on `uclog.py`'s `LogServer`,
//! `LogClient`, `LogClientServer` and `log_server_active` auto-probe.
//!
//! A `LogServer` sits on the device side of the serial link, demuxing the
//! device's mux frames into `LOG_PORT_MAX` TCP listeners (one per logical
//! port at `base+1+i`) plus a "log" channel at `base`. A `LogClient` is the
//! viewer/tool side: it connects to those same ports. When no server is
//! reachable and the caller hasn't pinned a serial device, [`probe_server`]
//! decides whether to treat a host as an active server or fall back to a
//! direct serial connection (spec.md §4.H, last paragraph).

use crate::frame::{DEFAULT_BASE_PORT, DEFAULT_HOST, LOG_PORT_MAX, POLL_INTERVAL};
use crate::router::{MuxRouter, RouterEvent};
use crate::transport::{spawn_reader, SerialPort, Transport, TransportHandle};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// A single decoded, timestamped log line ready for display, mirroring
/// `LogDisplay`'s two shapes: a raw `(count, ts, target, addr, frame)`
/// tuple (no ELF decoder available) or a decoded `(count, ts, level,
/// file, line, text)` record. ELF-symbol decoding itself is an explicit
/// external boundary (spec.md §1); this type only carries what a decoder
/// produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Raw { target: u8, addr: u32, frame: Vec<u8> },
    Decoded { level: String, file: String, line: u32, text: String },
}

/// Decodes a raw mux "log" record (target, address, body) into structured
/// lines. Decoding symbol tables out of an ELF binary is out of scope
/// (spec.md §1); implementors of this trait supply that externally.
pub trait LogDecoder: Send + Sync {
    fn target(&self) -> u8;
    fn decode(&self, target: u8, addr: u32, body: &[u8]) -> Option<LogLine>;
}

/// Host/base-port pair a [`LogServer`]/[`LogClient`] pair rendezvous on,
/// mirroring `uclog.py`'s `hostport()`.
#[derive(Debug, Clone)]
pub struct HostPort {
    pub host: String,
    pub base: u16,
}

impl Default for HostPort {
    fn default() -> Self {
        HostPort { host: DEFAULT_HOST.to_string(), base: DEFAULT_BASE_PORT }
    }
}

impl HostPort {
    pub fn new(host: impl Into<String>, base: u16) -> Self {
        HostPort { host: host.into(), base }
    }

    fn port_addr(&self, offset: u16) -> std::io::Result<SocketAddr> {
        (self.host.as_str(), self.base + offset)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved"))
    }
}

/// Probes whether a `LogServer` is already listening on `hostport` for
/// every port in `0..n_ports`, per `uclog.py`'s `log_server_active`: a
/// short connect attempt to each port, true only if all succeed.
pub fn probe_server(hostport: &HostPort, n_ports: u8, grace: Duration) -> bool {
    for i in 0..n_ports {
        let addr = match hostport.port_addr(1 + i as u16) {
            Ok(a) => a,
            Err(_) => return false,
        };
        match TcpStream::connect_timeout(&addr, grace) {
            Ok(_) => continue,
            Err(_) => return false,
        }
    }
    true
}

/// Device-side server: owns the serial transport and one `MuxRouter`,
/// plus one `TransportHandle` per logical port and one for the "log"
/// channel, each backed by a `Listen` transport at `base+1+i`/`base`.
pub struct LogServer {
    pub router: Arc<Mutex<MuxRouter>>,
    pub log_channel: Arc<TransportHandle>,
    port_channels: Vec<Arc<TransportHandle>>,
}

impl LogServer {
    /// `serial` is the already-open device link; `hostport` picks the TCP
    /// listener base. Ports `0..LOG_PORT_MAX` each get a forwarding
    /// listener; the log channel gets one more at `base`. "log"/error/
    /// image-hash events are forwarded onto the log channel as they arrive,
    /// matching `uclog.py`'s `Server` broadcasting the device's log traffic
    /// to every connected viewer.
    pub fn new(serial: Box<dyn SerialPort>, hostport: HostPort) -> std::io::Result<Self> {
        let serial_handle = TransportHandle::new(Transport::Serial { port: serial, last_send: std::time::Instant::now() });

        let mut port_channels = Vec::with_capacity(LOG_PORT_MAX as usize);
        for i in 0..LOG_PORT_MAX {
            let addr = hostport.port_addr(1 + i as u16)?;
            port_channels.push(TransportHandle::new(Transport::Listen { addr, conn: None }));
        }
        let log_addr = hostport.port_addr(0)?;
        let log_channel = TransportHandle::new(Transport::Listen { addr: log_addr, conn: None });

        let sink_channel = log_channel.clone();
        let router = MuxRouter::new(serial_handle, LOG_PORT_MAX, move |event| {
            let rendered = render_raw_event(&event);
            if let Err(e) = sink_channel.write(rendered.as_bytes()) {
                log::debug!("no log viewer attached: {e}");
            }
        });

        Ok(LogServer { router: Arc::new(Mutex::new(router)), log_channel, port_channels })
    }

    pub fn port_channel(&self, port: u8) -> Option<Arc<TransportHandle>> {
        self.port_channels.get(port as usize).cloned()
    }

    /// Spawns the background threads that keep this server running: one
    /// reading the serial link into the router, and one per logical port
    /// forwarding its queued outbound bytes onto that port's TCP listener.
    /// Mirrors `uclog.py`'s `Server.run` loop without its `select()` fan-in
    /// (each forwarder instead blocks on its own poll-interval read, per
    /// [`crate::transport`]'s design note).
    pub fn spawn_forwarders(&self) -> Vec<JoinHandle<()>> {
        let serial_transport = self.router.lock().unwrap().transport();
        let router_for_feed = self.router.clone();
        let mut handles = vec![spawn_reader(
            serial_transport,
            move |data| router_for_feed.lock().unwrap().feed(data),
            |_status| {},
        )];

        for (port, channel) in self.port_channels.iter().cloned().enumerate() {
            let router_for_port = self.router.clone();
            handles.push(spawn_reader(
                channel.clone(),
                move |data| {
                    let router = router_for_port.lock().unwrap();
                    if let Some(stream) = router.stream(port as u8) {
                        let _ = stream.tx(data);
                    }
                },
                |_status| {},
            ));

            // Drains the device's decoded frames for this port back out
            // onto its TCP listener, the other half of the forwarding that
            // `Server.run`'s single `select()` loop does in one pass.
            let router_for_drain = self.router.clone();
            let shutdown = channel.shutdown.clone();
            handles.push(std::thread::spawn(move || {
                while shutdown.is_alive() {
                    let payload = {
                        let router = router_for_drain.lock().unwrap();
                        router.stream(port as u8).and_then(|s| s.rx(POLL_INTERVAL))
                    };
                    if let Some(data) = payload {
                        if let Err(e) = channel.write(&data) {
                            log::debug!("port {port} has no viewer attached: {e}");
                        }
                    }
                }
            }));
        }
        handles
    }
}

/// Viewer/tool-side client: connects to a running [`LogServer`]'s ports.
pub struct LogClient {
    pub log_channel: std::sync::Arc<TransportHandle>,
    port_channels: Vec<std::sync::Arc<TransportHandle>>,
}

impl LogClient {
    pub fn connect(hostport: HostPort) -> std::io::Result<Self> {
        let mut port_channels = Vec::with_capacity(LOG_PORT_MAX as usize);
        for i in 0..LOG_PORT_MAX {
            let addr = hostport.port_addr(1 + i as u16)?;
            port_channels.push(TransportHandle::new(Transport::Connect { addr, conn: None }));
        }
        let log_addr = hostport.port_addr(0)?;
        let log_channel = TransportHandle::new(Transport::Connect { addr: log_addr, conn: None });
        Ok(LogClient { log_channel, port_channels })
    }

    pub fn port_channel(&self, port: u8) -> Option<std::sync::Arc<TransportHandle>> {
        self.port_channels.get(port as usize).cloned()
    }
}

/// Renders a [`RouterEvent`] the way `LogDisplay` prints a raw item when no
/// ELF decoder recognizes the target.
pub fn render_raw_event(event: &RouterEvent) -> String {
    match event {
        RouterEvent::ImageHash(digest) => format!("----- Image hash: {} -----", hex::encode(digest)),
        RouterEvent::Log(rec) => format!("{} {:#x} {}", rec.target, rec.addr, hex::encode(&rec.body)),
        RouterEvent::Error(payload) => format!("error: unrecognized frame {}", hex::encode(payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_fails_fast_when_nothing_listens() {
        let hp = HostPort::new("127.0.0.1", 1); // port 1 is privileged/unlikely bound
        assert!(!probe_server(&hp, 1, Duration::from_millis(50)));
    }

    #[test]
    fn render_raw_event_formats_image_hash() {
        let rendered = render_raw_event(&RouterEvent::ImageHash(vec![0xAB, 0xCD]));
        assert!(rendered.contains("abcd"));
    }
}
