//! Error types for the Modbus server
//!
//! Protocol exceptions (illegal function, illegal address, ...) are *not*
//! errors: they are answered to the client as framed exception responses.
//! [`ModbusError`] covers everything else: malformed frames, storage faults,
//! transport I/O and server lifecycle problems.

use thiserror::Error;

/// Result alias used across the crate
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors raised by the codec, the register store, the engine and the transports
#[derive(Debug, Error)]
pub enum ModbusError {
    /// Underlying socket or file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame: bad MBAP header, wrong length or CRC mismatch
    #[error("Frame error: {message}")]
    Frame { message: String },

    /// Register store backend fault
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Data that cannot be accepted (e.g. a region larger than the address space)
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Bad server or transport configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The execution engine stopped unexpectedly
    #[error("Engine error: {message}")]
    Engine { message: String },

    /// Operation attempted after [`close`](crate::ModbusServer::close)
    #[error("Server is closed")]
    ServerClosed,

    /// Serial port could not be opened or configured
    #[cfg(feature = "rtu")]
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// TLS handshake or certificate failure
    #[cfg(feature = "tls")]
    #[error("TLS error: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),
}

impl ModbusError {
    /// Create a frame (format) error
    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an engine error
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Whether this error is a frame format error.
    ///
    /// Serial transports discard such frames and keep listening.
    pub fn is_frame_error(&self) -> bool {
        matches!(self, Self::Frame { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModbusError::frame("CRC mismatch");
        assert_eq!(err.to_string(), "Frame error: CRC mismatch");
        assert!(err.is_frame_error());

        let err = ModbusError::storage("read file fail");
        assert_eq!(err.to_string(), "Storage error: read file fail");
        assert!(!err.is_frame_error());

        assert_eq!(ModbusError::ServerClosed.to_string(), "Server is closed");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ModbusError = io.into();
        assert!(matches!(err, ModbusError::Io(_)));
    }
}
