//! Modbus TCP shim
//!
//! Requests are read by MBAP length: the 7-byte header first, then exactly
//! `length - 1` more bytes. A header declaring an impossible length, or a
//! frame the codec rejects, ends the connection.

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, trace, warn};

use super::{encode_response, ConnectionContext};
use crate::codec::{format_hex_packet, ModbusCodec};
use crate::constants::{
    MAX_MBAP_LENGTH, MBAP_HEADER_LEN, MBAP_LENGTH_OFFSET, MIN_MBAP_LENGTH,
};
use crate::protocol::TransportKind;

/// Pause after a failed accept before trying again
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accept connections until shutdown, one task per connection.
pub(crate) async fn accept_loop(listener: TcpListener, ctx: ConnectionContext) {
    let local = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!("Modbus TCP listening on {}", local);

    loop {
        tokio::select! {
            biased;
            () = ctx.shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted TCP connection from {}", peer);
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                    }
                    ctx.tasks.spawn(serve_stream(stream, peer.to_string(), ctx.clone()));
                }
                Err(e) => {
                    warn!("Unable to accept connections on {}: {}", local, e);
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }

    info!("Modbus TCP listener on {} stopped", local);
}

/// Serve MBAP requests on one byte stream until EOF, error or shutdown.
///
/// Shared by plain TCP, TLS and [`ModbusServer::serve_connection`](crate::ModbusServer::serve_connection).
pub(crate) async fn serve_stream<S>(mut stream: S, peer: String, ctx: ConnectionContext)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let mut header = [0u8; MBAP_HEADER_LEN];
        tokio::select! {
            biased;
            () = ctx.shutdown.cancelled() => break,
            read = stream.read_exact(&mut header) => {
                if let Err(e) = read {
                    log_read_end(&peer, &e);
                    break;
                }
            }
        }

        let length = u16::from_be_bytes([header[4], header[5]]) as usize;
        if !(MIN_MBAP_LENGTH..=MAX_MBAP_LENGTH).contains(&length) {
            warn!(
                "Bad packet from {}: MBAP length {} out of range, dropping connection",
                peer, length
            );
            break;
        }

        let mut raw = vec![0u8; MBAP_LENGTH_OFFSET + length];
        raw[..MBAP_HEADER_LEN].copy_from_slice(&header);
        tokio::select! {
            biased;
            () = ctx.shutdown.cancelled() => break,
            read = stream.read_exact(&mut raw[MBAP_HEADER_LEN..]) => {
                if let Err(e) = read {
                    log_read_end(&peer, &e);
                    break;
                }
            }
        }

        let request = match ModbusCodec::decode(&raw, TransportKind::Tcp) {
            Ok(request) => request,
            Err(e) => {
                warn!("Bad packet from {}: {}, dropping connection", peer, e);
                break;
            }
        };

        let response = match ctx.submitter.submit(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request from {} not executed: {}", peer, e);
                break;
            }
        };

        let Some(encoded) = encode_response(&response, &peer) else {
            break;
        };
        trace!("TX to {}: {}", peer, format_hex_packet(&encoded));
        if let Err(e) = stream.write_all(&encoded).await {
            warn!("Write to {} failed: {}", peer, e);
            break;
        }
    }

    debug!("Connection {} closed", peer);
}

fn log_read_end(peer: &str, e: &std::io::Error) {
    if e.kind() == ErrorKind::UnexpectedEof {
        debug!("Peer {} disconnected", peer);
    } else {
        warn!("Read error from {}: {}", peer, e);
    }
}
