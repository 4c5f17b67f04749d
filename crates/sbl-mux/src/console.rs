//! Interactive console client, grounded on `uclog.py`'s `StreamClient` and
//! `uccon.py`'s usage of it with `cbor_wrap=False`.
//!
//! Raw-terminal handling (`tty.setraw`/`termios`) is an explicit external
//! boundary (spec.md §1): this type only implements the single-stream
//! `tx`/`rx(timeout)`/`txrx` contract over whichever transport the caller
//! already established (serial, or a `LogClient`/`LogClientServer` TCP
//! port). The thin `sbl-con` binary wires this to stdin/stdout.

use crate::frame::encode_port_frame;
use crate::router::MuxRouter;
use crate::transport::TransportHandle;
use sbl_core::cobs;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Which logical port carries the console stream. `uccon.py` uses stream 0.
pub const CONSOLE_PORT: u8 = 0;

/// A single cmd/response (or free-running byte) stream multiplexed over a
/// `MuxRouter`, exposing `tx`/`rx(timeout)`/`txrx` exactly as
/// `StreamClient` does, minus its optional CBOR wrapping (the console link
/// is raw bytes; CBOR wrapping is `uclog.py`'s "log" channel concern,
/// reused here verbatim as [`cbor_encode`]/[`cbor_decode`] for callers that
/// do want it).
pub struct ConsoleClient {
    port: u8,
    transport: Arc<TransportHandle>,
    inbound: Receiver<Vec<u8>>,
    inbound_tx: Sender<Vec<u8>>,
}

impl ConsoleClient {
    /// Attaches to `router`'s port `port` (defaults to [`CONSOLE_PORT`]).
    /// The caller is responsible for feeding the router from the
    /// transport's read thread; this type only owns the write path plus a
    /// queue the router's ingress callback can push into via
    /// [`ConsoleClient::inbound_sink`].
    pub fn new(router: &MuxRouter, port: u8) -> Self {
        let (inbound_tx, inbound) = mpsc::channel();
        ConsoleClient { port, transport: router.transport(), inbound, inbound_tx }
    }

    /// A clone-able sender the transport's reader thread can call directly
    /// for this port's bytes, bypassing `MuxRouter::feed`'s internal
    /// `Stream` when a caller wants console bytes delivered to exactly one
    /// client (`StreamClient.__enter__`'s raw, non-mux path).
    pub fn inbound_sink(&self) -> Sender<Vec<u8>> {
        self.inbound_tx.clone()
    }

    /// Sends raw bytes on the console stream.
    pub fn tx(&self, data: &[u8]) -> std::io::Result<()> {
        let framed = encode_port_frame(self.port, data);
        let encoded = cobs::encode(&framed);
        let mut out = Vec::with_capacity(encoded.len() + 2);
        out.push(0x00);
        out.extend_from_slice(&encoded);
        out.push(0x00);
        self.transport.write(&out)
    }

    /// Blocks up to `timeout` for the next inbound chunk, `None` on
    /// timeout, matching `StreamClient.rx(timeout=0.1)`'s default.
    pub fn rx(&self, timeout: Duration) -> Option<Vec<u8>> {
        self.inbound.recv_timeout(timeout).ok()
    }

    /// Sends `data` then waits up to `timeout` for a response.
    pub fn txrx(&self, data: &[u8], timeout: Duration) -> std::io::Result<Option<Vec<u8>>> {
        self.tx(data)?;
        Ok(self.rx(timeout))
    }
}

/// CBOR-wraps `value` the way `uclog.py`'s monkey-patched `cbor2.dumps`
/// does (`datetime_as_timestamp=True`), but as an explicit serializer
/// configuration passed at the call site instead of a process-global
/// mutation (spec.md §9 design note).
pub fn cbor_encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out)?;
    Ok(out)
}

pub fn cbor_decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, ciborium::de::Error<std::io::Error>> {
    ciborium::from_reader(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbor_round_trips_a_string() {
        let encoded = cbor_encode(&"hello".to_string()).unwrap();
        let decoded: String = cbor_decode(&encoded).unwrap();
        assert_eq!(decoded, "hello");
    }
}
