//! # Modbus Server
//!
//! [`ModbusServer`] ties the pieces together: a register store, the function
//! table, the execution engine and any number of TCP, TLS and RTU endpoints.
//!
//! ## Lifecycle
//!
//! A server is `Running` from construction until [`ModbusServer::close`],
//! after which it is `Closed` for good and every operation returns
//! [`ModbusError::ServerClosed`].
//!
//! Close order:
//! 1. cancel the shutdown token: listeners stop accepting, connection and
//!    serial tasks stop at their next read
//! 2. wait for every transport task
//! 3. drain the request queue and join the worker
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voltage_modbus_server::{ModbusServer, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> voltage_modbus_server::ModbusResult<()> {
//!     let server = ModbusServer::new(Arc::new(MemoryStore::new(2)))?;
//!     let addr = server.listen_tcp("0.0.0.0:502").await?;
//!     println!("serving on {}", addr);
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.close().await
//! }
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn, Level};

use crate::codec::{format_hex_packet, ModbusCodec};
use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::error::{ModbusError, ModbusResult};
use crate::frame::Frame;
use crate::functions::{FunctionTable, HandlerOutcome};
use crate::protocol::{ModbusException, ModbusFunction};
use crate::store::RegisterStore;
use crate::transport::{rtu, tcp, ConnectionContext};

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Running,
    Closed,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Running => write!(f, "running"),
            ServerState::Closed => write!(f, "closed"),
        }
    }
}

/// Store and handler table, run by the engine worker
pub(crate) struct ServerCore {
    store: Arc<dyn RegisterStore>,
    functions: RwLock<FunctionTable>,
}

impl ServerCore {
    pub(crate) fn new(store: Arc<dyn RegisterStore>) -> Self {
        Self {
            store,
            functions: RwLock::new(FunctionTable::with_defaults()),
        }
    }

    /// Build the response for one request
    pub(crate) fn handle(&self, request: &Frame) -> Frame {
        debug!(
            "Handling slave={} FC={:02X} ({}), {} data bytes",
            request.slave_id,
            request.function,
            ModbusFunction::description(request.function),
            request.data.len()
        );

        // Release the table before running the handler
        let handler = self.functions.read().get(request.function);
        let (data, exception): HandlerOutcome = match handler {
            Some(handler) => handler(self.store.as_ref(), request),
            None => (Vec::new(), ModbusException::IllegalFunction),
        };

        let mut response = request.response();
        response.set_data(data);
        response.set_exception(exception);

        if !exception.is_success() {
            debug!(
                "Slave={} FC={:02X} answered with exception: {}",
                request.slave_id, request.function, exception
            );
        }
        if tracing::enabled!(Level::TRACE) {
            trace!(
                "request frame: {}; response frame: {}",
                hex_dump(request),
                hex_dump(&response)
            );
        }
        response
    }
}

fn hex_dump(frame: &Frame) -> String {
    ModbusCodec::encode(frame).map_or_else(|e| e.to_string(), |raw| format_hex_packet(&raw))
}

/// Modbus slave serving one register store over any number of endpoints.
pub struct ModbusServer {
    core: Arc<ServerCore>,
    /// `None` once closed
    engine: Mutex<Option<Engine>>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl ModbusServer {
    /// Create a running server around `store` with the built-in handlers.
    pub fn new(store: Arc<dyn RegisterStore>) -> ModbusResult<Self> {
        let core = Arc::new(ServerCore::new(store));
        let engine = {
            let core = Arc::clone(&core);
            Engine::start(move |request: &Frame| core.handle(request))?
        };
        info!(
            "Modbus server started with {} device(s)",
            core.store.device_count()
        );

        Ok(Self {
            core,
            engine: Mutex::new(Some(engine)),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        })
    }

    /// Create a running server with the store described by `config`.
    pub fn from_config(config: &ServerConfig) -> ModbusResult<Self> {
        Self::new(config.build_store())
    }

    /// Register store, for direct access outside the request path.
    ///
    /// Stays usable after close.
    pub fn store(&self) -> Arc<dyn RegisterStore> {
        Arc::clone(&self.core.store)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServerState {
        if self.engine.lock().is_some() {
            ServerState::Running
        } else {
            ServerState::Closed
        }
    }

    /// Install or replace the handler for a function code.
    ///
    /// Built-in handlers replaced this way lose the gateway guard unless the
    /// new handler is wrapped with [`gateway_guard`](crate::functions::gateway_guard).
    pub fn register_function<F>(&self, code: u8, handler: F) -> ModbusResult<()>
    where
        F: Fn(&dyn RegisterStore, &Frame) -> HandlerOutcome + Send + Sync + 'static,
    {
        self.ensure_running()?;
        self.core.functions.write().register(code, handler);
        debug!("Registered handler for FC={:02X}", code);
        Ok(())
    }

    /// Execute a request through the admission queue, as if it had arrived
    /// on a transport.
    pub async fn process(&self, request: Frame) -> ModbusResult<Frame> {
        let submitter = self
            .engine
            .lock()
            .as_ref()
            .and_then(Engine::submitter)
            .ok_or(ModbusError::ServerClosed)?;
        submitter.submit(request).await
    }

    /// Listen for Modbus TCP on `addr` and return the bound address.
    pub async fn listen_tcp(&self, addr: impl ToSocketAddrs) -> ModbusResult<SocketAddr> {
        let ctx = self.context()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            warn!("Failed to listen: {}", e);
            ModbusError::from(e)
        })?;
        let local = listener.local_addr()?;

        self.tasks.spawn(tcp::accept_loop(listener, ctx));
        Ok(local)
    }

    /// Listen for Modbus TCP over TLS on `addr` and return the bound address.
    #[cfg(feature = "tls")]
    pub async fn listen_tls(
        &self,
        addr: impl ToSocketAddrs,
        config: Arc<tokio_rustls::rustls::ServerConfig>,
    ) -> ModbusResult<SocketAddr> {
        let ctx = self.context()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            warn!("Failed to listen on TLS: {}", e);
            ModbusError::from(e)
        })?;
        let local = listener.local_addr()?;

        self.tasks
            .spawn(crate::transport::tls::accept_loop(listener, config, ctx));
        Ok(local)
    }

    /// Open a serial port and serve Modbus RTU on it.
    #[cfg(feature = "rtu")]
    pub fn listen_rtu(&self, config: &rtu::RtuConfig) -> ModbusResult<JoinHandle<()>> {
        self.ensure_running()?;
        let port = config.open()?;
        info!(
            "Modbus RTU listening on {} ({} baud)",
            config.path, config.baud_rate
        );
        self.serve_rtu(port, config.path.clone())
    }

    /// Serve Modbus RTU on an already opened serial stream.
    ///
    /// Must be called from within a Tokio runtime. The returned handle
    /// completes when the stream ends or the server closes.
    pub fn serve_rtu<P>(&self, port: P, name: impl Into<String>) -> ModbusResult<JoinHandle<()>>
    where
        P: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let ctx = self.context()?;
        Ok(self.tasks.spawn(rtu::serve(port, name.into(), ctx)))
    }

    /// Serve Modbus TCP framing on an already established byte stream.
    ///
    /// Must be called from within a Tokio runtime. The returned handle
    /// completes when the stream ends or the server closes.
    pub fn serve_connection<S>(
        &self,
        stream: S,
        peer: impl Into<String>,
    ) -> ModbusResult<JoinHandle<()>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let ctx = self.context()?;
        Ok(self.tasks.spawn(tcp::serve_stream(stream, peer.into(), ctx)))
    }

    /// Stop every endpoint, finish queued requests and stop the worker.
    pub async fn close(&self) -> ModbusResult<()> {
        let Some(mut engine) = self.engine.lock().take() else {
            return Err(ModbusError::ServerClosed);
        };
        info!("Closing Modbus server");

        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        debug!("All transport tasks finished");

        engine.drain().await?;
        info!("Modbus server closed");
        Ok(())
    }

    fn ensure_running(&self) -> ModbusResult<()> {
        match self.state() {
            ServerState::Running => Ok(()),
            ServerState::Closed => Err(ModbusError::ServerClosed),
        }
    }

    fn context(&self) -> ModbusResult<ConnectionContext> {
        let submitter = self
            .engine
            .lock()
            .as_ref()
            .and_then(Engine::submitter)
            .ok_or(ModbusError::ServerClosed)?;
        Ok(ConnectionContext {
            submitter,
            shutdown: self.shutdown.clone(),
            tasks: self.tasks.clone(),
        })
    }
}

impl fmt::Debug for ModbusServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModbusServer")
            .field("state", &self.state())
            .field("device_count", &self.core.store.device_count())
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl Drop for ModbusServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
