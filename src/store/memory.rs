//! In-memory register store

use parking_lot::RwLock;

use super::{clamp_device_count, fit_region, resolve_slot, Region, RegisterStore};
use crate::constants::REGION_SIZE;
use crate::error::ModbusResult;
use crate::protocol::SlaveId;

/// Four regions of one device
#[derive(Debug, Clone)]
struct DeviceMemory {
    discrete_inputs: Vec<u8>,
    coils: Vec<u8>,
    holding_registers: Vec<u16>,
    input_registers: Vec<u16>,
}

impl DeviceMemory {
    fn new() -> Self {
        Self {
            discrete_inputs: vec![0; REGION_SIZE],
            coils: vec![0; REGION_SIZE],
            holding_registers: vec![0; REGION_SIZE],
            input_registers: vec![0; REGION_SIZE],
        }
    }
}

/// Register store kept entirely in memory.
///
/// All devices are allocated up front; each is guarded by its own
/// reader-writer lock.
///
/// # Example
///
/// ```rust
/// use voltage_modbus_server::store::{MemoryStore, RegisterStore};
///
/// let store = MemoryStore::new(2);
/// let mut registers = store.holding_registers(1).unwrap();
/// registers[5] = 6;
/// store.save_holding_registers(1, registers).unwrap();
///
/// assert_eq!(store.holding_registers(1).unwrap()[5], 6);
/// assert_eq!(store.holding_registers(2).unwrap()[5], 0);
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    device_count: u8,
    devices: Vec<RwLock<DeviceMemory>>,
}

impl MemoryStore {
    /// Allocate `device_count` devices (clamped to `[1, 255]`)
    pub fn new(device_count: u8) -> Self {
        let device_count = clamp_device_count(device_count);
        let devices = (0..device_count)
            .map(|_| RwLock::new(DeviceMemory::new()))
            .collect();
        Self {
            device_count,
            devices,
        }
    }

    fn device(&self, id: SlaveId) -> &RwLock<DeviceMemory> {
        &self.devices[resolve_slot(id, self.device_count)]
    }
}

impl RegisterStore for MemoryStore {
    fn device_count(&self) -> u8 {
        self.device_count
    }

    fn discrete_inputs(&self, id: SlaveId) -> ModbusResult<Vec<u8>> {
        Ok(self.device(id).read().discrete_inputs.clone())
    }

    fn coils(&self, id: SlaveId) -> ModbusResult<Vec<u8>> {
        Ok(self.device(id).read().coils.clone())
    }

    fn holding_registers(&self, id: SlaveId) -> ModbusResult<Vec<u16>> {
        Ok(self.device(id).read().holding_registers.clone())
    }

    fn input_registers(&self, id: SlaveId) -> ModbusResult<Vec<u16>> {
        Ok(self.device(id).read().input_registers.clone())
    }

    fn save_discrete_inputs(&self, id: SlaveId, bits: Vec<u8>) -> ModbusResult<()> {
        let bits = fit_region(bits, Region::DiscreteInputs)?;
        self.device(id).write().discrete_inputs = bits;
        Ok(())
    }

    fn save_coils(&self, id: SlaveId, bits: Vec<u8>) -> ModbusResult<()> {
        let bits = fit_region(bits, Region::Coils)?;
        self.device(id).write().coils = bits;
        Ok(())
    }

    fn save_holding_registers(&self, id: SlaveId, registers: Vec<u16>) -> ModbusResult<()> {
        let registers = fit_region(registers, Region::HoldingRegisters)?;
        self.device(id).write().holding_registers = registers;
        Ok(())
    }

    fn save_input_registers(&self, id: SlaveId, registers: Vec<u16>) -> ModbusResult<()> {
        let registers = fit_region(registers, Region::InputRegisters)?;
        self.device(id).write().input_registers = registers;
        Ok(())
    }
}
