//! # Function Dispatch
//!
//! Maps function codes to handlers. A handler receives the register store and
//! the decoded request, and returns the response payload together with an
//! exception code ([`ModbusException::Success`] for a normal reply).
//!
//! ## Built-in handlers
//!
//! | FC | Operation | Region |
//! |----|-----------|--------|
//! | 0x01 | Read coils | coils |
//! | 0x02 | Read discrete inputs | discrete inputs |
//! | 0x03 | Read holding registers | holding registers |
//! | 0x04 | Read input registers | input registers |
//! | 0x05 | Write single coil | coils |
//! | 0x06 | Write single register | holding registers |
//! | 0x0F | Write multiple coils | coils |
//! | 0x10 | Write multiple registers | holding registers |
//!
//! Every built-in is wrapped in a gateway guard: a request addressed to a
//! device id outside `1..=device_count` is answered with
//! [`ModbusException::GatewayPathUnavailable`] and the request data echoed.
//! Codes without a handler are answered with
//! [`ModbusException::IllegalFunction`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};

use crate::bytes::{pack_bits, read_u16_be, unpack_bits};
use crate::constants::*;
use crate::error::ModbusResult;
use crate::frame::Frame;
use crate::protocol::{ModbusException, ModbusFunction, SlaveId};
use crate::store::{Region, RegisterStore};

/// Handler result: response payload and exception code
pub type HandlerOutcome = (Vec<u8>, ModbusException);

/// Function handler shared between the table and the worker
pub type FunctionHandler =
    Arc<dyn Fn(&dyn RegisterStore, &Frame) -> HandlerOutcome + Send + Sync>;

/// Function code to handler table
#[derive(Clone, Default)]
pub struct FunctionTable {
    handlers: HashMap<u8, FunctionHandler>,
}

impl FunctionTable {
    /// Empty table; every code answers IllegalFunction
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the eight built-in handlers, each behind the gateway guard
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for function in ModbusFunction::ALL {
            let handler: fn(&dyn RegisterStore, &Frame) -> HandlerOutcome = match function {
                ModbusFunction::ReadCoils => read_coils,
                ModbusFunction::ReadDiscreteInputs => read_discrete_inputs,
                ModbusFunction::ReadHoldingRegisters => read_holding_registers,
                ModbusFunction::ReadInputRegisters => read_input_registers,
                ModbusFunction::WriteSingleCoil => write_single_coil,
                ModbusFunction::WriteSingleRegister => write_single_register,
                ModbusFunction::WriteMultipleCoils => write_multiple_coils,
                ModbusFunction::WriteMultipleRegisters => write_multiple_registers,
            };
            table
                .handlers
                .insert(function.code(), gateway_guard(handler));
        }
        table
    }

    /// Install or replace the handler for `code`
    pub fn register<F>(&mut self, code: u8, handler: F)
    where
        F: Fn(&dyn RegisterStore, &Frame) -> HandlerOutcome + Send + Sync + 'static,
    {
        self.handlers.insert(code, Arc::new(handler));
    }

    /// Handler registered for `code`
    pub fn get(&self, code: u8) -> Option<FunctionHandler> {
        self.handlers.get(&code).cloned()
    }

    /// Check if a handler is registered for `code`
    pub fn contains(&self, code: u8) -> bool {
        self.handlers.contains_key(&code)
    }

    /// Run the handler for the frame's function code.
    pub fn dispatch(&self, store: &dyn RegisterStore, frame: &Frame) -> HandlerOutcome {
        match self.handlers.get(&frame.function) {
            Some(handler) => handler(store, frame),
            None => (Vec::new(), ModbusException::IllegalFunction),
        }
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.handlers.keys().copied().collect();
        codes.sort_unstable();
        f.debug_struct("FunctionTable")
            .field("codes", &codes)
            .finish()
    }
}

/// Wrap a handler so it only runs for configured device ids.
///
/// Unknown ids get the request data echoed back with
/// [`ModbusException::GatewayPathUnavailable`].
pub fn gateway_guard<F>(handler: F) -> FunctionHandler
where
    F: Fn(&dyn RegisterStore, &Frame) -> HandlerOutcome + Send + Sync + 'static,
{
    Arc::new(move |store: &dyn RegisterStore, frame: &Frame| {
        if !store.is_slave_id_valid(frame.slave_id) {
            warn!(
                "Slave id {} not configured (devices 1..={}), answering gateway exception",
                frame.slave_id,
                store.device_count()
            );
            return (frame.data.clone(), ModbusException::GatewayPathUnavailable);
        }
        handler(store, frame)
    })
}

// ============================================================================
// Built-in handlers
// ============================================================================

fn short_payload(frame: &Frame, needed: usize) -> HandlerOutcome {
    warn!(
        "FC={:02X} payload too short: {} bytes (need {})",
        frame.function,
        frame.data.len(),
        needed
    );
    (Vec::new(), ModbusException::IllegalDataValue)
}

/// `start` and `quantity` from the first four payload bytes
fn addressing(data: &[u8]) -> Option<(usize, usize)> {
    let start = read_u16_be(data, 0)?;
    let quantity = read_u16_be(data, 2)?;
    Some((start as usize, quantity as usize))
}

fn in_bounds(start: usize, quantity: usize) -> bool {
    start as u32 + quantity as u32 <= REGION_SIZE as u32
}

/// Reads degrade to an all-zero region when the backend fails
fn or_zeroed<T: Copy + Default>(result: ModbusResult<Vec<T>>, frame: &Frame, region: Region) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(
            "Read {} of slave {} failed, serving zeros: {}",
            region, frame.slave_id, e
        );
        vec![T::default(); REGION_SIZE]
    })
}

fn device_failure(frame: &Frame, region: Region, e: impl fmt::Display) -> HandlerOutcome {
    error!(
        "Update {} of slave {} failed: {}",
        region, frame.slave_id, e
    );
    (Vec::new(), ModbusException::ServerDeviceFailure)
}

fn read_bit_region(
    store: &dyn RegisterStore,
    frame: &Frame,
    region: Region,
    load: impl Fn(&dyn RegisterStore, SlaveId) -> ModbusResult<Vec<u8>>,
) -> HandlerOutcome {
    let Some((start, quantity)) = addressing(&frame.data) else {
        return short_payload(frame, 4);
    };
    if !in_bounds(start, quantity) {
        return (Vec::new(), ModbusException::IllegalDataAddress);
    }

    let bits = or_zeroed(load(store, frame.slave_id), frame, region);
    let packed = pack_bits(&bits[start..start + quantity]);

    let mut response = Vec::with_capacity(1 + packed.len());
    response.push(packed.len() as u8);
    response.extend_from_slice(&packed);
    (response, ModbusException::Success)
}

fn read_register_region(
    store: &dyn RegisterStore,
    frame: &Frame,
    region: Region,
    load: impl Fn(&dyn RegisterStore, SlaveId) -> ModbusResult<Vec<u16>>,
) -> HandlerOutcome {
    let Some((start, quantity)) = addressing(&frame.data) else {
        return short_payload(frame, 4);
    };
    if !in_bounds(start, quantity) {
        return (Vec::new(), ModbusException::IllegalDataAddress);
    }

    let registers = or_zeroed(load(store, frame.slave_id), frame, region);

    let mut response = Vec::with_capacity(1 + quantity * 2);
    response.push((quantity * 2) as u8);
    for register in &registers[start..start + quantity] {
        response.extend_from_slice(&register.to_be_bytes());
    }
    (response, ModbusException::Success)
}

fn read_coils(store: &dyn RegisterStore, frame: &Frame) -> HandlerOutcome {
    read_bit_region(store, frame, Region::Coils, |s, id| s.coils(id))
}

fn read_discrete_inputs(store: &dyn RegisterStore, frame: &Frame) -> HandlerOutcome {
    read_bit_region(store, frame, Region::DiscreteInputs, |s, id| {
        s.discrete_inputs(id)
    })
}

fn read_holding_registers(store: &dyn RegisterStore, frame: &Frame) -> HandlerOutcome {
    read_register_region(store, frame, Region::HoldingRegisters, |s, id| {
        s.holding_registers(id)
    })
}

fn read_input_registers(store: &dyn RegisterStore, frame: &Frame) -> HandlerOutcome {
    read_register_region(store, frame, Region::InputRegisters, |s, id| {
        s.input_registers(id)
    })
}

// Write handlers never fall back to zeros: writing a zeroed region back
// would wipe whatever the backend failed to return.

fn write_single_coil(store: &dyn RegisterStore, frame: &Frame) -> HandlerOutcome {
    let Some((address, value)) = addressing(&frame.data) else {
        return short_payload(frame, 4);
    };

    let mut coils = match store.coils(frame.slave_id) {
        Ok(coils) => coils,
        Err(e) => return device_failure(frame, Region::Coils, e),
    };
    coils[address] = u8::from(value != 0);
    if let Err(e) = store.save_coils(frame.slave_id, coils) {
        return device_failure(frame, Region::Coils, e);
    }

    (frame.data[..4].to_vec(), ModbusException::Success)
}

fn write_single_register(store: &dyn RegisterStore, frame: &Frame) -> HandlerOutcome {
    let Some((address, value)) = addressing(&frame.data) else {
        return short_payload(frame, 4);
    };

    let mut registers = match store.holding_registers(frame.slave_id) {
        Ok(registers) => registers,
        Err(e) => return device_failure(frame, Region::HoldingRegisters, e),
    };
    registers[address] = value as u16;
    if let Err(e) = store.save_holding_registers(frame.slave_id, registers) {
        return device_failure(frame, Region::HoldingRegisters, e);
    }

    (frame.data[..4].to_vec(), ModbusException::Success)
}

fn write_multiple_coils(store: &dyn RegisterStore, frame: &Frame) -> HandlerOutcome {
    // start, quantity, byte count
    if frame.data.len() < 5 {
        return short_payload(frame, 5);
    }
    let Some((start, quantity)) = addressing(&frame.data) else {
        return short_payload(frame, 5);
    };
    if !in_bounds(start, quantity) {
        return (Vec::new(), ModbusException::IllegalDataAddress);
    }

    // Only the bits actually present are written
    let values = unpack_bits(&frame.data[5..], quantity);

    let mut coils = match store.coils(frame.slave_id) {
        Ok(coils) => coils,
        Err(e) => return device_failure(frame, Region::Coils, e),
    };
    coils[start..start + values.len()].copy_from_slice(&values);
    if let Err(e) = store.save_coils(frame.slave_id, coils) {
        return device_failure(frame, Region::Coils, e);
    }

    (frame.data[..4].to_vec(), ModbusException::Success)
}

fn write_multiple_registers(store: &dyn RegisterStore, frame: &Frame) -> HandlerOutcome {
    if frame.data.len() < 5 {
        return short_payload(frame, 5);
    }
    let Some((start, quantity)) = addressing(&frame.data) else {
        return short_payload(frame, 5);
    };

    let payload = &frame.data[5..];
    if payload.len() / 2 != quantity || !in_bounds(start, quantity) {
        return (Vec::new(), ModbusException::IllegalDataAddress);
    }

    let mut registers = match store.holding_registers(frame.slave_id) {
        Ok(registers) => registers,
        Err(e) => return device_failure(frame, Region::HoldingRegisters, e),
    };
    for (slot, word) in registers[start..start + quantity]
        .iter_mut()
        .zip(payload.chunks_exact(2))
    {
        *slot = u16::from_be_bytes([word[0], word[1]]);
    }
    if let Err(e) = store.save_holding_registers(frame.slave_id, registers) {
        return device_failure(frame, Region::HoldingRegisters, e);
    }

    (frame.data[..4].to_vec(), ModbusException::Success)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModbusError;
    use crate::store::MemoryStore;

    fn request(slave_id: u8, function: u8, data: Vec<u8>) -> Frame {
        Frame::tcp(1, slave_id, function, data)
    }

    fn dispatch(store: &dyn RegisterStore, function: u8, data: Vec<u8>) -> HandlerOutcome {
        FunctionTable::with_defaults().dispatch(store, &request(1, function, data))
    }

    #[test]
    fn test_read_coils_packs_lsb_first() {
        let store = MemoryStore::new(1);
        let mut coils = store.coils(1).unwrap();
        for address in [10, 11, 17, 18] {
            coils[address] = 1;
        }
        store.save_coils(1, coils).unwrap();

        let (data, exception) = dispatch(&store, FC_READ_COILS, vec![0x00, 0x0A, 0x00, 0x09]);
        assert_eq!(exception, ModbusException::Success);
        assert_eq!(data, vec![0x02, 0x83, 0x01]);
    }

    #[test]
    fn test_read_discrete_inputs_nonzero_is_set() {
        let store = MemoryStore::new(1);
        store.save_discrete_inputs(1, vec![0, 7, 0, 1]).unwrap();

        let (data, exception) =
            dispatch(&store, FC_READ_DISCRETE_INPUTS, vec![0x00, 0x00, 0x00, 0x04]);
        assert_eq!(exception, ModbusException::Success);
        assert_eq!(data, vec![0x01, 0x0A]);
    }

    #[test]
    fn test_write_then_read_holding_register() {
        let store = MemoryStore::new(1);

        let (data, exception) =
            dispatch(&store, FC_WRITE_SINGLE_REGISTER, vec![0x00, 0x05, 0x00, 0x06]);
        assert_eq!(exception, ModbusException::Success);
        assert_eq!(data, vec![0x00, 0x05, 0x00, 0x06]);

        let (data, exception) =
            dispatch(&store, FC_READ_HOLDING_REGISTERS, vec![0x00, 0x05, 0x00, 0x01]);
        assert_eq!(exception, ModbusException::Success);
        assert_eq!(data, vec![0x02, 0x00, 0x06]);
    }

    #[test]
    fn test_read_input_registers_big_endian() {
        let store = MemoryStore::new(1);
        store.save_input_registers(1, vec![0x1234, 0xABCD]).unwrap();

        let (data, _) = dispatch(&store, FC_READ_INPUT_REGISTERS, vec![0x00, 0x00, 0x00, 0x02]);
        assert_eq!(data, vec![0x04, 0x12, 0x34, 0xAB, 0xCD]);
    }

    #[test]
    fn test_read_past_address_space() {
        let store = MemoryStore::new(1);

        // 65535 + 1 ends exactly at the region boundary
        let (data, exception) = dispatch(&store, FC_READ_COILS, vec![0xFF, 0xFF, 0x00, 0x01]);
        assert_eq!(exception, ModbusException::Success);
        assert_eq!(data, vec![0x01, 0x00]);

        let (data, exception) =
            dispatch(&store, FC_READ_HOLDING_REGISTERS, vec![0xFF, 0xFF, 0x00, 0x02]);
        assert_eq!(exception, ModbusException::IllegalDataAddress);
        assert!(data.is_empty());
    }

    #[test]
    fn test_read_bits_past_address_space() {
        let store = MemoryStore::new(3);
        let table = FunctionTable::with_defaults();

        for slave_id in [1, 3] {
            for function in [FC_READ_COILS, FC_READ_DISCRETE_INPUTS] {
                let (data, exception) = table.dispatch(
                    &store,
                    &request(slave_id, function, vec![0xFF, 0xFF, 0x00, 0x02]),
                );
                assert_eq!(exception, ModbusException::IllegalDataAddress);
                assert!(data.is_empty());
            }
        }
    }

    #[test]
    fn test_write_multiple_coils_past_address_space() {
        let store = MemoryStore::new(1);
        let mut coils = vec![0u8; 65536];
        coils[65534] = 1;
        store.save_coils(1, coils).unwrap();

        // 16 coils from 65530
        let (data, exception) = dispatch(
            &store,
            FC_WRITE_MULTIPLE_COILS,
            vec![0xFF, 0xFA, 0x00, 0x10, 0x02, 0xFF, 0xFF],
        );
        assert_eq!(exception, ModbusException::IllegalDataAddress);
        assert!(data.is_empty());

        let coils = store.coils(1).unwrap();
        assert!(coils[65530..65534].iter().all(|&b| b == 0));
        assert_eq!(coils[65534], 1);
        assert_eq!(coils[65535], 0);
    }

    #[test]
    fn test_write_single_coil_normalizes_value() {
        let store = MemoryStore::new(1);

        let (data, exception) = dispatch(&store, FC_WRITE_SINGLE_COIL, vec![0x00, 0x03, 0xFF, 0x00]);
        assert_eq!(exception, ModbusException::Success);
        assert_eq!(data, vec![0x00, 0x03, 0xFF, 0x00]);
        assert_eq!(store.coils(1).unwrap()[3], 1);

        dispatch(&store, FC_WRITE_SINGLE_COIL, vec![0x00, 0x03, 0x00, 0x00]);
        assert_eq!(store.coils(1).unwrap()[3], 0);
    }

    #[test]
    fn test_write_multiple_coils() {
        let store = MemoryStore::new(1);

        // 10 coils from 20: 0b1100_1101, 0b01
        let (data, exception) = dispatch(
            &store,
            FC_WRITE_MULTIPLE_COILS,
            vec![0x00, 0x14, 0x00, 0x0A, 0x02, 0xCD, 0x01],
        );
        assert_eq!(exception, ModbusException::Success);
        assert_eq!(data, vec![0x00, 0x14, 0x00, 0x0A]);

        let coils = store.coils(1).unwrap();
        assert_eq!(&coils[20..31], &[1, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_write_multiple_coils_partial_payload() {
        let store = MemoryStore::new(1);
        store.save_coils(1, vec![1; 32]).unwrap();

        // 16 coils declared, one packed byte present
        let (_, exception) = dispatch(
            &store,
            FC_WRITE_MULTIPLE_COILS,
            vec![0x00, 0x00, 0x00, 0x10, 0x02, 0x00],
        );
        assert_eq!(exception, ModbusException::Success);

        let coils = store.coils(1).unwrap();
        assert!(coils[..8].iter().all(|&b| b == 0));
        assert!(coils[8..16].iter().all(|&b| b == 1));
    }

    #[test]
    fn test_write_multiple_registers() {
        let store = MemoryStore::new(1);

        let (data, exception) = dispatch(
            &store,
            FC_WRITE_MULTIPLE_REGISTERS,
            vec![0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02],
        );
        assert_eq!(exception, ModbusException::Success);
        assert_eq!(data, vec![0x00, 0x01, 0x00, 0x02]);
        assert_eq!(&store.holding_registers(1).unwrap()[..4], &[0, 10, 258, 0]);
    }

    #[test]
    fn test_write_multiple_registers_mismatch_leaves_region() {
        let store = MemoryStore::new(1);
        store.save_holding_registers(1, vec![7, 7, 7]).unwrap();

        // quantity 3, only two values
        let (data, exception) = dispatch(
            &store,
            FC_WRITE_MULTIPLE_REGISTERS,
            vec![0x00, 0x00, 0x00, 0x03, 0x04, 0x00, 0x01, 0x00, 0x02],
        );
        assert_eq!(exception, ModbusException::IllegalDataAddress);
        assert!(data.is_empty());
        assert_eq!(&store.holding_registers(1).unwrap()[..3], &[7, 7, 7]);
    }

    #[test]
    fn test_gateway_guard_echoes_request() {
        let store = MemoryStore::new(2);
        let table = FunctionTable::with_defaults();

        for slave_id in [0, 3, 255] {
            let frame = request(slave_id, FC_READ_COILS, vec![0x00, 0x00, 0x00, 0x01]);
            let (data, exception) = table.dispatch(&store, &frame);
            assert_eq!(exception, ModbusException::GatewayPathUnavailable);
            assert_eq!(data, frame.data);
        }

        let frame = request(2, FC_READ_COILS, vec![0x00, 0x00, 0x00, 0x01]);
        assert_eq!(table.dispatch(&store, &frame).1, ModbusException::Success);
    }

    #[test]
    fn test_unknown_function() {
        let store = MemoryStore::new(1);
        let (data, exception) = dispatch(&store, 0x2B, vec![0x0E, 0x01, 0x00]);
        assert_eq!(exception, ModbusException::IllegalFunction);
        assert!(data.is_empty());

        let empty = FunctionTable::new();
        let (_, exception) = empty.dispatch(&store, &request(1, FC_READ_COILS, vec![0; 4]));
        assert_eq!(exception, ModbusException::IllegalFunction);
    }

    #[test]
    fn test_short_payloads() {
        let store = MemoryStore::new(1);
        for function in [
            FC_READ_COILS,
            FC_READ_INPUT_REGISTERS,
            FC_WRITE_SINGLE_COIL,
            FC_WRITE_SINGLE_REGISTER,
        ] {
            let (data, exception) = dispatch(&store, function, vec![0x00, 0x01, 0x00]);
            assert_eq!(exception, ModbusException::IllegalDataValue, "FC={:02X}", function);
            assert!(data.is_empty());
        }

        let (_, exception) = dispatch(&store, FC_WRITE_MULTIPLE_REGISTERS, vec![0, 0, 0, 1]);
        assert_eq!(exception, ModbusException::IllegalDataValue);
    }

    #[test]
    fn test_register_replaces_builtin() {
        let store = MemoryStore::new(1);
        let mut table = FunctionTable::with_defaults();
        table.register(FC_READ_COILS, |_, _| (vec![0xAA], ModbusException::Success));
        table.register(0x41, |_, frame| (frame.data.clone(), ModbusException::Success));

        let (data, _) = table.dispatch(&store, &request(1, FC_READ_COILS, vec![0; 4]));
        assert_eq!(data, vec![0xAA]);
        let (data, _) = table.dispatch(&store, &request(1, 0x41, vec![1, 2]));
        assert_eq!(data, vec![1, 2]);
        assert!(table.contains(0x41));
    }

    /// Store whose writes always fail and whose reads fail on demand
    struct BrokenStore {
        inner: MemoryStore,
        fail_reads: bool,
    }

    impl RegisterStore for BrokenStore {
        fn device_count(&self) -> u8 {
            self.inner.device_count()
        }
        fn discrete_inputs(&self, id: u8) -> ModbusResult<Vec<u8>> {
            self.inner.discrete_inputs(id)
        }
        fn coils(&self, id: u8) -> ModbusResult<Vec<u8>> {
            if self.fail_reads {
                return Err(ModbusError::storage("disk gone"));
            }
            self.inner.coils(id)
        }
        fn holding_registers(&self, id: u8) -> ModbusResult<Vec<u16>> {
            if self.fail_reads {
                return Err(ModbusError::storage("disk gone"));
            }
            self.inner.holding_registers(id)
        }
        fn input_registers(&self, id: u8) -> ModbusResult<Vec<u16>> {
            self.inner.input_registers(id)
        }
        fn save_discrete_inputs(&self, _: u8, _: Vec<u8>) -> ModbusResult<()> {
            Err(ModbusError::storage("read-only"))
        }
        fn save_coils(&self, _: u8, _: Vec<u8>) -> ModbusResult<()> {
            Err(ModbusError::storage("read-only"))
        }
        fn save_holding_registers(&self, _: u8, _: Vec<u16>) -> ModbusResult<()> {
            Err(ModbusError::storage("read-only"))
        }
        fn save_input_registers(&self, _: u8, _: Vec<u16>) -> ModbusResult<()> {
            Err(ModbusError::storage("read-only"))
        }
    }

    #[test]
    fn test_write_fault_is_device_failure() {
        let store = BrokenStore {
            inner: MemoryStore::new(1),
            fail_reads: false,
        };

        let (data, exception) = dispatch(&store, FC_WRITE_SINGLE_REGISTER, vec![0, 1, 0, 2]);
        assert_eq!(exception, ModbusException::ServerDeviceFailure);
        assert!(data.is_empty());
    }

    #[test]
    fn test_read_fault_serves_zeros() {
        let store = BrokenStore {
            inner: MemoryStore::new(1),
            fail_reads: true,
        };

        let (data, exception) = dispatch(&store, FC_READ_HOLDING_REGISTERS, vec![0, 0, 0, 2]);
        assert_eq!(exception, ModbusException::Success);
        assert_eq!(data, vec![0x04, 0, 0, 0, 0]);

        let (_, exception) = dispatch(&store, FC_WRITE_SINGLE_COIL, vec![0, 0, 0xFF, 0]);
        assert_eq!(exception, ModbusException::ServerDeviceFailure);
    }
}
