//! Modbus TCP over TLS
//!
//! Identical to the plain TCP shim once the handshake completes. A failed
//! handshake only ends that connection.

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_rustls::rustls::pki_types::pem::PemObject;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use super::tcp::serve_stream;
use super::ConnectionContext;
use crate::error::{ModbusError, ModbusResult};

/// Build a server-side TLS configuration from PEM files.
///
/// # Errors
///
/// [`ModbusError::Configuration`] when a PEM file is missing, unreadable or
/// holds no certificate; [`ModbusError::Tls`] when rustls rejects the
/// certificate and key pair.
pub fn load_tls_config(cert: &Path, key: &Path) -> ModbusResult<Arc<ServerConfig>> {
    let certs = CertificateDer::pem_file_iter(cert)
        .and_then(|certs| certs.collect::<Result<Vec<_>, _>>())
        .map_err(|e| {
            ModbusError::configuration(format!("certificate chain {}: {}", cert.display(), e))
        })?;
    if certs.is_empty() {
        return Err(ModbusError::configuration(format!(
            "no certificate found in {}",
            cert.display()
        )));
    }
    let key = PrivateKeyDer::from_pem_file(key).map_err(|e| {
        ModbusError::configuration(format!("private key {}: {}", key.display(), e))
    })?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    Ok(Arc::new(config))
}

/// Accept TLS connections until shutdown, one task per connection.
pub(crate) async fn accept_loop(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    ctx: ConnectionContext,
) {
    let acceptor = TlsAcceptor::from(config);
    let local = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    info!("Modbus TLS listening on {}", local);

    loop {
        tokio::select! {
            biased;
            () = ctx.shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted TLS connection from {}", peer);
                    let acceptor = acceptor.clone();
                    let conn_ctx = ctx.clone();
                    ctx.tasks.spawn(async move {
                        let handshake = tokio::select! {
                            biased;
                            () = conn_ctx.shutdown.cancelled() => return,
                            handshake = acceptor.accept(stream) => handshake,
                        };
                        match handshake {
                            Ok(tls) => serve_stream(tls, peer.to_string(), conn_ctx).await,
                            Err(e) => warn!("TLS handshake with {} failed: {}", peer, e),
                        }
                    });
                }
                Err(e) => {
                    warn!("Unable to accept TLS connections on {}: {}", local, e);
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }

    info!("Modbus TLS listener on {} stopped", local);
}
