//! # Voltage Modbus Server - Modbus Slave over TCP, TLS and RTU
//!
//! **Author:** Evan Liu <liuyifanz.1996@gmail.com>
//! **License:** MIT
//!
//! Hosts one or more Modbus devices, each with its own coils, discrete
//! inputs, holding registers and input registers, and answers requests
//! arriving over Modbus TCP, Modbus TCP over TLS and Modbus RTU serial lines.
//!
//! ## Features
//!
//! - **Strictly ordered**: every request from every endpoint goes through one
//!   FIFO queue and one worker, so handlers never interleave
//! - **Pluggable storage**: in-memory or hex text files, behind one trait
//! - **Multi-device**: up to 255 devices; unknown ids get a gateway exception
//! - **Extensible**: replace any built-in handler or add new function codes
//! - **Clean shutdown**: listeners and ports close, in-flight requests finish
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Server |
//! |------|----------|--------|
//! | 0x01 | Read Coils | ✅ |
//! | 0x02 | Read Discrete Inputs | ✅ |
//! | 0x03 | Read Holding Registers | ✅ |
//! | 0x04 | Read Input Registers | ✅ |
//! | 0x05 | Write Single Coil | ✅ |
//! | 0x06 | Write Single Register | ✅ |
//! | 0x0F | Write Multiple Coils | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voltage_modbus_server::{ModbusServer, ModbusResult, RegisterStore, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let config = ServerConfig::new()
//!         .with_device_count(2)
//!         .with_file_storage("./file-slave");
//!     let server = ModbusServer::from_config(&config)?;
//!
//!     // Seed a register before clients connect
//!     server.store().save_holding_registers(1, vec![0, 0, 1, 65535, 2025])?;
//!
//!     server.listen_tcp("0.0.0.0:502").await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.close().await
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus protocol constants
pub mod constants;

/// Function codes, exception codes and shared protocol types
pub mod protocol;

/// Register and bit conversions
pub mod bytes;

/// Transport-independent request/response frame
pub mod frame;

/// TCP and RTU frame encoding and decoding
pub mod codec;

// ============================================================================
// Server modules
// ============================================================================

/// Register store trait and its memory and file backends
pub mod store;

/// Function code dispatch table and built-in handlers
pub mod functions;

/// Single-worker request queue
pub mod engine;

/// Server configuration
pub mod config;

/// Server control surface
pub mod server;

/// TCP, TLS and RTU endpoints
pub mod transport;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use voltage_modbus_server::tokio) ===
pub use tokio;

// === Core server API ===
pub use server::{ModbusServer, ServerState};

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Core types ===
pub use codec::ModbusCodec;
pub use frame::{Envelope, Frame};
pub use protocol::{ModbusException, ModbusFunction, SlaveId, TransportKind};

// === Storage & handlers ===
pub use config::{ServerConfig, StorageBackend};
pub use functions::{FunctionHandler, FunctionTable};
pub use store::{FileStore, MemoryStore, RegisterStore};

#[cfg(feature = "rtu")]
pub use transport::rtu::RtuConfig;
#[cfg(feature = "tls")]
pub use transport::tls::load_tls_config;

/// Modbus TCP default port
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!("Voltage Modbus Server v{} - Modbus slave by Evan Liu", VERSION)
}
