//! Modbus RTU shim
//!
//! Each read from the port is treated as one complete frame. Frames that
//! fail to decode (bad CRC, too short) are logged and discarded; the port
//! keeps listening. A read error or end of stream ends the loop.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

#[cfg(feature = "rtu")]
pub use self::config::RtuConfig;

use super::{encode_response, ConnectionContext};
use crate::codec::{format_hex_packet, ModbusCodec};
use crate::constants::SERIAL_READ_BUFFER_SIZE;
use crate::protocol::TransportKind;

/// Serve RTU requests on a serial stream until error, EOF or shutdown.
pub(crate) async fn serve<P>(mut port: P, name: String, ctx: ConnectionContext)
where
    P: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = [0u8; SERIAL_READ_BUFFER_SIZE];

    loop {
        let read = tokio::select! {
            biased;
            () = ctx.shutdown.cancelled() => break,
            read = port.read(&mut buffer) => read,
        };
        let received = match read {
            Ok(0) => {
                debug!("Serial port {} reached end of stream", name);
                break;
            }
            Ok(n) => &buffer[..n],
            Err(e) => {
                warn!("Serial read error on {}: {}", name, e);
                break;
            }
        };

        let request = match ModbusCodec::decode(received, TransportKind::Rtu) {
            Ok(request) => request,
            Err(e) => {
                warn!("Bad serial frame on {}: {}, discarding", name, e);
                continue;
            }
        };

        let response = match ctx.submitter.submit(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request on {} not executed: {}", name, e);
                break;
            }
        };

        let Some(encoded) = encode_response(&response, &name) else {
            break;
        };
        trace!("TX on {}: {}", name, format_hex_packet(&encoded));
        if let Err(e) = port.write_all(&encoded).await {
            warn!("Serial write on {} failed: {}", name, e);
            break;
        }
    }

    debug!("Serial port {} closed", name);
}

#[cfg(feature = "rtu")]
mod config {
    use std::time::Duration;

    use tokio_serial::{DataBits, Parity, SerialStream, StopBits};

    use crate::error::ModbusResult;

    /// Default line speed
    pub const DEFAULT_BAUD_RATE: u32 = 19200;

    /// Serial line settings for [`ModbusServer::listen_rtu`](crate::ModbusServer::listen_rtu).
    ///
    /// Defaults to 19200 baud, 8 data bits, even parity, 1 stop bit.
    ///
    /// ```rust,no_run
    /// use voltage_modbus_server::transport::rtu::RtuConfig;
    /// use tokio_serial::Parity;
    ///
    /// let config = RtuConfig::new("/dev/ttyUSB0")
    ///     .with_baud_rate(9600)
    ///     .with_parity(Parity::None);
    /// ```
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RtuConfig {
        pub path: String,
        pub baud_rate: u32,
        pub data_bits: DataBits,
        pub parity: Parity,
        pub stop_bits: StopBits,
        /// Driver read/write timeout, driver default when `None`
        pub timeout: Option<Duration>,
    }

    impl RtuConfig {
        pub fn new(path: impl Into<String>) -> Self {
            Self {
                path: path.into(),
                baud_rate: DEFAULT_BAUD_RATE,
                data_bits: DataBits::Eight,
                parity: Parity::Even,
                stop_bits: StopBits::One,
                timeout: None,
            }
        }

        pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
            self.baud_rate = baud_rate;
            self
        }

        pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
            self.data_bits = data_bits;
            self
        }

        pub fn with_parity(mut self, parity: Parity) -> Self {
            self.parity = parity;
            self
        }

        pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
            self.stop_bits = stop_bits;
            self
        }

        pub fn with_timeout(mut self, timeout: Duration) -> Self {
            self.timeout = Some(timeout);
            self
        }

        /// Open and configure the port
        pub fn open(&self) -> ModbusResult<SerialStream> {
            let mut builder = tokio_serial::new(&self.path, self.baud_rate)
                .data_bits(self.data_bits)
                .parity(self.parity)
                .stop_bits(self.stop_bits);
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }
            Ok(SerialStream::open(&builder)?)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_defaults_and_builders() {
            let config = RtuConfig::new("/dev/ttyS0");
            assert_eq!(config.baud_rate, 19200);
            assert_eq!(config.parity, Parity::Even);
            assert_eq!(config.data_bits, DataBits::Eight);

            let config = config.with_baud_rate(9600).with_parity(Parity::None);
            assert_eq!(config.baud_rate, 9600);
            assert_eq!(config.parity, Parity::None);
            assert_eq!(config.stop_bits, StopBits::One);
            assert_eq!(config.timeout, None);

            let config = config.with_timeout(Duration::from_millis(500));
            assert_eq!(config.timeout, Some(Duration::from_millis(500)));
        }

        #[test]
        fn test_open_missing_port_fails() {
            let config = RtuConfig::new("/dev/this-port-does-not-exist");
            assert!(config.open().is_err());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::server::ServerCore;
    use crate::store::{MemoryStore, RegisterStore};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use tokio_util::task::TaskTracker;

    fn context(engine: &Engine) -> ConnectionContext {
        ConnectionContext {
            submitter: engine.submitter().unwrap(),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    #[tokio::test]
    async fn test_bad_frame_then_good_frame() {
        let store = Arc::new(MemoryStore::new(1));
        store.save_holding_registers(1, vec![0x0102]).unwrap();
        let core = Arc::new(ServerCore::new(store));
        let engine = Engine::start(move |request: &crate::Frame| core.handle(request)).unwrap();

        // read holding register 0, first with a corrupted CRC
        let port = tokio_test::io::Builder::new()
            .read(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0B])
            .read(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A])
            .write(&ModbusCodec::encode(&crate::Frame::rtu(
                0x01,
                0x03,
                vec![0x02, 0x01, 0x02],
            ))
            .unwrap())
            .build();

        serve(port, "mock".into(), context(&engine)).await;
    }

    #[tokio::test]
    async fn test_short_read_is_discarded() {
        let engine = Engine::start(|request: &crate::Frame| request.response()).unwrap();
        // a truncated frame, then a full read of holding register 0
        let port = tokio_test::io::Builder::new()
            .read(&[0x01, 0x03])
            .read(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A])
            .write(&ModbusCodec::encode(&crate::Frame::rtu(0x01, 0x03, Vec::new())).unwrap())
            .build();

        serve(port, "mock".into(), context(&engine)).await;
    }
}
