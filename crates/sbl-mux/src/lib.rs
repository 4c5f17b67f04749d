//! The mux/stream layer (spec.md component H): multiplexes logical
//! streams — a numbered console/data port per device service, plus a
//! distinguished "log" channel — onto a single COBS-framed byte link, and
//! demultiplexes the reverse direction.
//!
//! Grounded on `uclog.py`/`uccon.py`: [`transport`] replaces the source's
//! `Network`/`Serial`/`Server`/`Client` class hierarchy with a single
//! `Transport` enum; [`router`] replaces its mutable `rx`/`tx` dict
//! attributes with fixed `ingress_sink`/`ports` fields; [`log_link`] is
//! `LogServer`/`LogClient`/`log_server_active`; [`console`] is
//! `StreamClient`.

pub mod console;
pub mod frame;
pub mod log_link;
pub mod router;
pub mod transport;

pub use frame::{MuxFrame, IMAGE_HASH_PORT, LOG_PORT_MAX, LOG_TYPE_PORT};
pub use log_link::{HostPort, LogClient, LogDecoder, LogLine, LogServer};
pub use router::{LogRecord, MuxRouter, RouterEvent, Stream};
pub use transport::{LinkStatus, SerialPort, Shutdown, Transport, TransportHandle};
