//! Per-port receive queues and ingress dispatch.
//!
//! `uclog.py` represents `self.rx`/`self.tx` as a dict of callables that is
//! later replaced by a single callable and sometimes re-expanded (spec.md
//! §9's "dynamic attribute mutation" design note). This module instead
//! fixes two distinct, never-reassigned fields: an `ingress_sink` callback
//! invoked for "log"/"error" frames, and a `ports` map of fixed-kind
//! [`Stream`]s for the numbered logical channels.

use crate::frame::{dispatch, encode_port_frame, MuxFrame};
use crate::transport::TransportHandle;
use sbl_core::cobs;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

/// One logical port's receive queue plus a sender bound to `transport` for
/// egress. `rx`/`tx` mirror `StreamClient`'s public API (`tx`, `rx(timeout)`).
pub struct Stream {
    port: u8,
    transport: Arc<TransportHandle>,
    queue: Receiver<Vec<u8>>,
    sender: Sender<Vec<u8>>,
}

impl Stream {
    fn new(port: u8, transport: Arc<TransportHandle>) -> Self {
        let (sender, queue) = mpsc::channel();
        Stream { port, transport, queue, sender }
    }

    fn sink(&self) -> Sender<Vec<u8>> {
        self.sender.clone()
    }

    /// Writes `payload` to this port: COBS-encodes the port-tagged frame
    /// and brackets it with `0x00` delimiters on the shared transport.
    pub fn tx(&self, payload: &[u8]) -> std::io::Result<()> {
        let framed = encode_port_frame(self.port, payload);
        let encoded = cobs::encode(&framed);
        let mut out = Vec::with_capacity(encoded.len() + 2);
        out.push(0x00);
        out.extend_from_slice(&encoded);
        out.push(0x00);
        self.transport.write(&out)
    }

    /// Blocks up to `timeout` for the next inbound payload on this port,
    /// returning `None` on timeout (matches `StreamClient.rx(timeout)`).
    pub fn rx(&self, timeout: Duration) -> Option<Vec<u8>> {
        match self.queue.recv_timeout(timeout) {
            Ok(data) => Some(data),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

/// One "log" record delivered to the router's ingress sink: the decoder
/// target nibble, the full little-endian address, and the record body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub target: u8,
    pub addr: u32,
    pub body: Vec<u8>,
}

/// Demultiplexes inbound frames from one serial/TCP link into per-port
/// [`Stream`]s, a "log" sink, an "error" sink, and an image-hash callback.
/// Ingress delivery is direct callback invocation from the transport's I/O
/// thread (spec.md §5); callers must keep their callbacks cheap and
/// thread-safe.
pub struct MuxRouter {
    transport: Arc<TransportHandle>,
    ports: HashMap<u8, Stream>,
    ingress_sink: Box<dyn Fn(RouterEvent) + Send + Sync>,
    incoming: Vec<u8>,
}

/// Everything that isn't a plain numbered-port frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    Log(LogRecord),
    ImageHash(Vec<u8>),
    Error(Vec<u8>),
}

/// Frames longer than this are dropped rather than buffered indefinitely,
/// matching `CobsDecode`'s `1500 + 20`-byte cap in `uclog.py`.
const MAX_BUFFERED_FRAME: usize = 1500 + 20;

impl MuxRouter {
    /// Builds a router over `transport` for logical ports `0..n_ports`,
    /// delivering anything else to `ingress_sink`.
    pub fn new(transport: Arc<TransportHandle>, n_ports: u8, ingress_sink: impl Fn(RouterEvent) + Send + Sync + 'static) -> Self {
        let ports = (0..n_ports).map(|p| (p, Stream::new(p, transport.clone()))).collect();
        MuxRouter { transport, ports, ingress_sink: Box::new(ingress_sink), incoming: Vec::new() }
    }

    pub fn stream(&self, port: u8) -> Option<&Stream> {
        self.ports.get(&port)
    }

    pub fn transport(&self) -> Arc<TransportHandle> {
        self.transport.clone()
    }

    /// Feeds raw bytes off the wire: splits on `0x00` delimiters, COBS
    /// decodes each nonempty frame, and dispatches it. Corrupt frames are
    /// logged and discarded per spec.md §7, never propagated as an error.
    pub fn feed(&mut self, data: &[u8]) {
        self.incoming.extend_from_slice(data);
        if self.incoming.len() > MAX_BUFFERED_FRAME {
            log::warn!("mux ingress buffer overflow, truncating");
            self.incoming.truncate(MAX_BUFFERED_FRAME);
        }
        while let Some(pos) = self.incoming.iter().position(|&b| b == 0) {
            let frame_bytes: Vec<u8> = self.incoming.drain(..=pos).collect();
            let frame = &frame_bytes[..frame_bytes.len() - 1]; // drop trailing 0x00
            if frame.is_empty() {
                continue; // back-to-back zeros: an empty, ignored frame
            }
            match cobs::decode(frame) {
                Ok(decoded) => self.dispatch_frame(&decoded),
                Err(e) => log::warn!("dropping corrupt COBS frame: {e}"),
            }
        }
    }

    fn dispatch_frame(&self, decoded: &[u8]) {
        match dispatch(decoded) {
            Some(MuxFrame::Port { port, payload }) => {
                if let Some(stream) = self.ports.get(&port) {
                    if stream.sink().send(payload).is_err() {
                        log::debug!("port {port} receiver dropped");
                    }
                } else {
                    log::warn!("frame for unconfigured port {port}");
                }
            }
            Some(MuxFrame::ImageHash { digest }) => (self.ingress_sink)(RouterEvent::ImageHash(digest)),
            Some(MuxFrame::Log { target, addr, body }) => {
                (self.ingress_sink)(RouterEvent::Log(LogRecord { target, addr, body }))
            }
            Some(MuxFrame::Error { payload }) => (self.ingress_sink)(RouterEvent::Error(payload)),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{SerialPort, Transport};
    use std::io::{self, Read, Write};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    struct NullSerial;
    impl Read for NullSerial {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }
    impl Write for NullSerial {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
    impl SerialPort for NullSerial {
        fn reconnect(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn router(events: Arc<Mutex<Vec<RouterEvent>>>) -> MuxRouter {
        let transport = TransportHandle::new(Transport::Serial { port: Box::new(NullSerial), last_send: Instant::now() });
        MuxRouter::new(transport, 4, move |ev| events.lock().unwrap().push(ev))
    }

    #[test]
    fn feeds_port_frame_to_its_stream() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut r = router(events.clone());
        let framed = encode_port_frame(2, b"hi");
        let encoded = cobs::encode(&framed);
        let mut wire = vec![0u8];
        wire.extend_from_slice(&encoded);
        wire.push(0u8);
        r.feed(&wire);
        assert_eq!(r.stream(2).unwrap().rx(Duration::from_millis(10)), Some(b"hi".to_vec()));
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn ignores_back_to_back_zero_delimiters() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut r = router(events.clone());
        r.feed(&[0x00, 0x00, 0x00]);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn routes_image_hash_and_log_and_error_frames() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut r = router(events.clone());

        let digest = vec![0x11u8; 64];
        let hash_frame = encode_port_frame(63, &digest);
        let mut wire = vec![0x00];
        wire.extend_from_slice(&cobs::encode(&hash_frame));
        wire.push(0x00);
        r.feed(&wire);

        let mut log_frame = vec![0u8; 6];
        log_frame[0..4].copy_from_slice(&0x1000_0002u32.to_le_bytes());
        log_frame[4] = 2;
        log_frame[5] = 3;
        let mut wire2 = vec![0x00];
        wire2.extend_from_slice(&cobs::encode(&log_frame));
        wire2.push(0x00);
        r.feed(&wire2);

        let got = events.lock().unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0], RouterEvent::ImageHash(digest));
        match &got[1] {
            RouterEvent::Log(rec) => assert_eq!(rec.target, 1),
            other => panic!("expected log record, got {other:?}"),
        }
    }
}
