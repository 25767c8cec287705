//! Voltage Modbus Server
//!
//! Runs a Modbus slave until Ctrl-C, then closes every endpoint and waits
//! for in-flight requests.
//!
//! Usage: cargo run --features cli --bin mbserver -- [OPTIONS]
//! Example: cargo run --features cli --bin mbserver -- --devices 4 --store-dir ./file-slave --tcp 0.0.0.0:5020

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voltage_modbus_server::{ModbusServer, ServerConfig, DEFAULT_TCP_PORT};
#[cfg(feature = "tls")]
use voltage_modbus_server::ModbusError;

/// Modbus server (slave) over TCP, TLS and RTU
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[clap(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of hosted devices (ids 1..=N, clamped to 1..=255)
    #[clap(short = 'd', long, default_value_t = 1, env = "MBSERVER_DEVICES")]
    devices: u8,

    /// Persist registers as hex files in this directory (in memory otherwise)
    #[clap(short = 's', long, env = "MBSERVER_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Modbus TCP listen address, repeatable
    #[clap(short = 't', long = "tcp", env = "MBSERVER_TCP", value_delimiter = ',')]
    tcp: Vec<String>,

    /// Modbus TCP over TLS listen address
    #[cfg(feature = "tls")]
    #[clap(long = "tls", env = "MBSERVER_TLS")]
    tls: Option<String>,

    /// PEM certificate chain for TLS
    #[cfg(feature = "tls")]
    #[clap(long, env = "MBSERVER_TLS_CERT")]
    tls_cert: Option<PathBuf>,

    /// PEM private key for TLS
    #[cfg(feature = "tls")]
    #[clap(long, env = "MBSERVER_TLS_KEY")]
    tls_key: Option<PathBuf>,

    /// Serial device for Modbus RTU, e.g. /dev/ttyUSB0
    #[cfg(feature = "rtu")]
    #[clap(long = "rtu", env = "MBSERVER_RTU")]
    rtu: Option<String>,

    /// Serial baud rate
    #[cfg(feature = "rtu")]
    #[clap(long, default_value_t = 19200, env = "MBSERVER_BAUD")]
    baud: u32,

    /// Serial parity
    #[cfg(feature = "rtu")]
    #[clap(long, value_enum, default_value = "even", env = "MBSERVER_PARITY")]
    parity: ParityArg,
}

#[cfg(feature = "rtu")]
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ParityArg {
    None,
    Even,
    Odd,
}

#[cfg(feature = "rtu")]
impl From<ParityArg> for tokio_serial::Parity {
    fn from(parity: ParityArg) -> Self {
        match parity {
            ParityArg::None => tokio_serial::Parity::None,
            ParityArg::Even => tokio_serial::Parity::Even,
            ParityArg::Odd => tokio_serial::Parity::Odd,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("{}", voltage_modbus_server::info());

    let mut config = ServerConfig::new().with_device_count(args.devices);
    if let Some(dir) = &args.store_dir {
        config = config.with_file_storage(dir);
    }
    let server = ModbusServer::from_config(&config)?;

    let mut endpoints = 0usize;
    for addr in &args.tcp {
        let bound = server.listen_tcp(addr.as_str()).await?;
        info!("Serving Modbus TCP on {}", bound);
        endpoints += 1;
    }

    #[cfg(feature = "tls")]
    if let Some(addr) = &args.tls {
        let (Some(cert), Some(key)) = (&args.tls_cert, &args.tls_key) else {
            return Err(ModbusError::configuration("--tls requires --tls-cert and --tls-key").into());
        };
        let bound = server
            .listen_tls(addr.as_str(), voltage_modbus_server::load_tls_config(cert, key)?)
            .await?;
        info!("Serving Modbus TLS on {}", bound);
        endpoints += 1;
    }

    #[cfg(feature = "rtu")]
    if let Some(path) = &args.rtu {
        let rtu = voltage_modbus_server::RtuConfig::new(path.as_str())
            .with_baud_rate(args.baud)
            .with_parity(args.parity.into());
        server.listen_rtu(&rtu)?;
        endpoints += 1;
    }

    if endpoints == 0 {
        let bound = server
            .listen_tcp(("0.0.0.0", DEFAULT_TCP_PORT))
            .await?;
        info!("Serving Modbus TCP on {}", bound);
    }

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    if let Err(e) = server.close().await {
        warn!("Shutdown incomplete: {}", e);
    }
    Ok(())
}
