//! Per-device register memory
//!
//! Every device owns four independent regions of [`REGION_SIZE`] elements:
//!
//! | Region | Element | Protocol access |
//! |--------|---------|-----------------|
//! | Coils | `u8` (0/1) | read/write |
//! | Discrete inputs | `u8` (0/1) | read |
//! | Holding registers | `u16` | read/write |
//! | Input registers | `u16` | read |
//!
//! Callers never hold a reference into a region: reads hand out a fresh copy
//! and writes replace the whole region. Both backends guard each device with
//! its own reader-writer lock.
//!
//! ## Device id resolution
//!
//! Inside reads and writes, ids above the configured count map to the last
//! device and ids below 1 map to device 1 (see [`resolve_slot`]).
//! [`RegisterStore::is_slave_id_valid`] is stricter and rejects both.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;

use crate::constants::{MAX_DEVICE_COUNT, REGION_SIZE};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::SlaveId;

/// Register region kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Coils,
    DiscreteInputs,
    HoldingRegisters,
    InputRegisters,
}

impl Region {
    /// Name used in persisted file names and log messages
    pub fn name(self) -> &'static str {
        match self {
            Region::Coils => "coils",
            Region::DiscreteInputs => "discreteInputs",
            Region::HoldingRegisters => "holdingRegisters",
            Region::InputRegisters => "inputRegisters",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage contract shared by the in-memory and file-persisted backends.
///
/// Reads return an independent copy of exactly [`REGION_SIZE`] elements.
/// Writes atomically replace the region; shorter input is zero-padded and
/// input longer than the address space is rejected.
pub trait RegisterStore: Send + Sync {
    /// Number of configured devices, in `[1, 255]`
    fn device_count(&self) -> u8;

    /// True iff `id` addresses a configured device (`1..=device_count`)
    fn is_slave_id_valid(&self, id: SlaveId) -> bool {
        id >= 1 && id <= self.device_count()
    }

    fn discrete_inputs(&self, id: SlaveId) -> ModbusResult<Vec<u8>>;

    fn coils(&self, id: SlaveId) -> ModbusResult<Vec<u8>>;

    fn holding_registers(&self, id: SlaveId) -> ModbusResult<Vec<u16>>;

    fn input_registers(&self, id: SlaveId) -> ModbusResult<Vec<u16>>;

    fn save_discrete_inputs(&self, id: SlaveId, bits: Vec<u8>) -> ModbusResult<()>;

    fn save_coils(&self, id: SlaveId, bits: Vec<u8>) -> ModbusResult<()>;

    fn save_holding_registers(&self, id: SlaveId, registers: Vec<u16>) -> ModbusResult<()>;

    fn save_input_registers(&self, id: SlaveId, registers: Vec<u16>) -> ModbusResult<()>;
}

/// Clamp a configured device count to `[1, 255]`.
pub fn clamp_device_count(count: u8) -> u8 {
    count.clamp(1, MAX_DEVICE_COUNT)
}

/// Map a device id onto a 0-based storage slot.
///
/// `id > device_count` uses the last device, `id < 1` uses device 1.
///
/// ```rust
/// use voltage_modbus_server::store::resolve_slot;
///
/// assert_eq!(resolve_slot(0, 4), 0);
/// assert_eq!(resolve_slot(1, 4), 0);
/// assert_eq!(resolve_slot(3, 4), 2);
/// assert_eq!(resolve_slot(200, 4), 3);
/// ```
pub fn resolve_slot(id: SlaveId, device_count: u8) -> usize {
    let device_count = clamp_device_count(device_count);
    if id > device_count {
        device_count as usize - 1
    } else if id < 1 {
        0
    } else {
        id as usize - 1
    }
}

/// Zero-pad a region to [`REGION_SIZE`], rejecting oversized input.
pub(crate) fn fit_region<T: Copy + Default>(mut values: Vec<T>, region: Region) -> ModbusResult<Vec<T>> {
    if values.len() > REGION_SIZE {
        return Err(ModbusError::invalid_data(format!(
            "{} region holds {} elements (max {})",
            region,
            values.len(),
            REGION_SIZE
        )));
    }
    values.resize(REGION_SIZE, T::default());
    Ok(values)
}
