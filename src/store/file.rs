//! File-persisted register store
//!
//! Layout: one directory per server, one file per device and region, named
//! `{slot}-{region}` (e.g. `2-holdingRegisters`). Each file holds the region's
//! raw bytes as lowercase hex text; registers are serialized big-endian
//! before hex encoding. Files may be shorter than the region: missing
//! elements read as zero, and a missing file reads as an all-zero region.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use super::{clamp_device_count, fit_region, resolve_slot, Region, RegisterStore};
use crate::bytes::{bytes_to_registers, registers_to_bytes};
use crate::constants::{DEFAULT_STORE_DIR, REGION_SIZE};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::SlaveId;

/// Register store persisted as hex text files.
///
/// # Example
///
/// ```rust,no_run
/// use voltage_modbus_server::store::{FileStore, RegisterStore};
///
/// let store = FileStore::new(2, "/var/lib/mbserver");
/// store.save_holding_registers(2, vec![0, 0, 1, 65535, 2025]).unwrap();
/// assert_eq!(store.holding_registers(2).unwrap()[4], 2025);
/// ```
#[derive(Debug)]
pub struct FileStore {
    device_count: u8,
    locks: Vec<RwLock<()>>,
    dir: PathBuf,
}

impl FileStore {
    /// Create a store for `device_count` devices (clamped to `[1, 255]`)
    /// rooted at `dir`. An empty path selects `./file-slave`.
    ///
    /// Nothing touches the filesystem until the first write.
    pub fn new(device_count: u8, dir: impl Into<PathBuf>) -> Self {
        let device_count = clamp_device_count(device_count);
        let mut dir = dir.into();
        if dir.as_os_str().is_empty() {
            dir = PathBuf::from(DEFAULT_STORE_DIR);
        }
        Self {
            device_count,
            locks: (0..device_count).map(|_| RwLock::new(())).collect(),
            dir,
        }
    }

    /// Storage directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `region` of the device `id` resolves to
    pub fn region_path(&self, id: SlaveId, region: Region) -> PathBuf {
        let slot = resolve_slot(id, self.device_count);
        self.dir.join(format!("{}-{}", slot + 1, region.name()))
    }

    fn load(&self, id: SlaveId, region: Region) -> ModbusResult<Vec<u8>> {
        let path = self.region_path(id, region);
        let _guard = self.locks[resolve_slot(id, self.device_count)].read();
        read_hex_file(&path)
    }

    fn store(&self, id: SlaveId, region: Region, bytes: &[u8]) -> ModbusResult<()> {
        let path = self.region_path(id, region);
        let _guard = self.locks[resolve_slot(id, self.device_count)].write();
        write_hex_file(&self.dir, &path, bytes)
    }

    fn load_bits(&self, id: SlaveId, region: Region) -> ModbusResult<Vec<u8>> {
        let bits = self.load(id, region)?;
        fit_persisted(bits, region)
    }

    fn load_registers(&self, id: SlaveId, region: Region) -> ModbusResult<Vec<u16>> {
        let bytes = self.load(id, region)?;
        fit_persisted(bytes_to_registers(&bytes), region)
    }

    fn store_bits(&self, id: SlaveId, region: Region, bits: Vec<u8>) -> ModbusResult<()> {
        check_len(bits.len(), region)?;
        self.store(id, region, &bits)
    }

    fn store_registers(&self, id: SlaveId, region: Region, registers: Vec<u16>) -> ModbusResult<()> {
        check_len(registers.len(), region)?;
        self.store(id, region, &registers_to_bytes(&registers))
    }
}

fn check_len(len: usize, region: Region) -> ModbusResult<()> {
    if len > REGION_SIZE {
        return Err(ModbusError::invalid_data(format!(
            "{} region holds {} elements (max {})",
            region, len, REGION_SIZE
        )));
    }
    Ok(())
}

fn fit_persisted<T: Copy + Default>(values: Vec<T>, region: Region) -> ModbusResult<Vec<T>> {
    fit_region(values, region)
        .map_err(|e| ModbusError::storage(format!("persisted {} region is corrupt: {}", region, e)))
}

fn read_hex_file(path: &Path) -> ModbusResult<Vec<u8>> {
    match fs::read(path) {
        Ok(content) => {
            if content.is_empty() {
                return Ok(Vec::new());
            }
            hex::decode(&content).map_err(|e| {
                ModbusError::storage(format!(
                    "hex decode file content fail: {}: {}",
                    path.display(),
                    e
                ))
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No persisted data at {}, using empty region", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(ModbusError::storage(format!(
            "read file fail: {}: {}",
            path.display(),
            e
        ))),
    }
}

fn write_hex_file(dir: &Path, path: &Path, bytes: &[u8]) -> ModbusResult<()> {
    fs::create_dir_all(dir).map_err(|e| {
        ModbusError::storage(format!("mkdir all fail: {}: {}", dir.display(), e))
    })?;
    // fs::write truncates any previous content
    fs::write(path, hex::encode(bytes)).map_err(|e| {
        ModbusError::storage(format!("write file content fail: {}: {}", path.display(), e))
    })
}

impl RegisterStore for FileStore {
    fn device_count(&self) -> u8 {
        self.device_count
    }

    fn discrete_inputs(&self, id: SlaveId) -> ModbusResult<Vec<u8>> {
        self.load_bits(id, Region::DiscreteInputs)
    }

    fn coils(&self, id: SlaveId) -> ModbusResult<Vec<u8>> {
        self.load_bits(id, Region::Coils)
    }

    fn holding_registers(&self, id: SlaveId) -> ModbusResult<Vec<u16>> {
        self.load_registers(id, Region::HoldingRegisters)
    }

    fn input_registers(&self, id: SlaveId) -> ModbusResult<Vec<u16>> {
        self.load_registers(id, Region::InputRegisters)
    }

    fn save_discrete_inputs(&self, id: SlaveId, bits: Vec<u8>) -> ModbusResult<()> {
        self.store_bits(id, Region::DiscreteInputs, bits)
    }

    fn save_coils(&self, id: SlaveId, bits: Vec<u8>) -> ModbusResult<()> {
        self.store_bits(id, Region::Coils, bits)
    }

    fn save_holding_registers(&self, id: SlaveId, registers: Vec<u16>) -> ModbusResult<()> {
        self.store_registers(id, Region::HoldingRegisters, registers)
    }

    fn save_input_registers(&self, id: SlaveId, registers: Vec<u16>) -> ModbusResult<()> {
        self.store_registers(id, Region::InputRegisters, registers)
    }
}
