//! Transport shims
//!
//! Each shim owns its sockets or serial ports, turns received bytes into
//! [`Frame`](crate::Frame)s, submits them to the engine and writes the encoded
//! response back on the same connection.
//!
//! | Shim | Framing | Bad frame |
//! |------|---------|-----------|
//! | [`tcp`] | MBAP, read by declared length | connection dropped |
//! | [`tls`] | MBAP inside a TLS session | connection dropped |
//! | [`rtu`] | one read = one frame, CRC16 | frame discarded, port kept |
//!
//! All shims stop at their next read once the shutdown token is cancelled
//! and run inside the server's task tracker.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::warn;

use crate::codec::ModbusCodec;
use crate::engine::Submitter;
use crate::frame::Frame;
use crate::protocol::ModbusException;

pub mod rtu;
pub(crate) mod tcp;
#[cfg(feature = "tls")]
pub(crate) mod tls;

/// Shared state handed to every listener and connection task
#[derive(Debug, Clone)]
pub(crate) struct ConnectionContext {
    pub submitter: Submitter,
    pub shutdown: CancellationToken,
    pub tasks: TaskTracker,
}

/// Encode a response for the wire.
///
/// A response too large for its envelope is replaced by a
/// `ServerDeviceFailure` exception, so the peer always gets a frame it can
/// parse. `None` only if even that cannot be encoded.
pub(crate) fn encode_response(response: &Frame, peer: &str) -> Option<Bytes> {
    match ModbusCodec::encode(response) {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            warn!("Response to {} not sendable: {}, answering device failure", peer, e);
            let mut failure = response.response();
            failure.set_exception(ModbusException::ServerDeviceFailure);
            ModbusCodec::encode(&failure)
                .map_err(|e| warn!("Exception response to {} not sendable: {}", peer, e))
                .ok()
        }
    }
}
