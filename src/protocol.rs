//! Modbus protocol definitions shared by the codec, handlers and transports

use std::fmt;

use crate::constants::*;

/// Modbus slave/unit identifier
pub type SlaveId = u8;

/// Transport envelope a frame travels in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// MBAP header framing (plain TCP and TLS)
    Tcp,
    /// Slave id + PDU + CRC16 framing (serial line)
    Rtu,
}

/// Function codes with a built-in handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModbusFunction {
    ReadCoils,
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleCoils,
    WriteMultipleRegisters,
}

impl ModbusFunction {
    /// All built-in functions in code order
    pub const ALL: [ModbusFunction; 8] = [
        ModbusFunction::ReadCoils,
        ModbusFunction::ReadDiscreteInputs,
        ModbusFunction::ReadHoldingRegisters,
        ModbusFunction::ReadInputRegisters,
        ModbusFunction::WriteSingleCoil,
        ModbusFunction::WriteSingleRegister,
        ModbusFunction::WriteMultipleCoils,
        ModbusFunction::WriteMultipleRegisters,
    ];

    /// Wire function code
    pub fn code(self) -> u8 {
        match self {
            ModbusFunction::ReadCoils => FC_READ_COILS,
            ModbusFunction::ReadDiscreteInputs => FC_READ_DISCRETE_INPUTS,
            ModbusFunction::ReadHoldingRegisters => FC_READ_HOLDING_REGISTERS,
            ModbusFunction::ReadInputRegisters => FC_READ_INPUT_REGISTERS,
            ModbusFunction::WriteSingleCoil => FC_WRITE_SINGLE_COIL,
            ModbusFunction::WriteSingleRegister => FC_WRITE_SINGLE_REGISTER,
            ModbusFunction::WriteMultipleCoils => FC_WRITE_MULTIPLE_COILS,
            ModbusFunction::WriteMultipleRegisters => FC_WRITE_MULTIPLE_REGISTERS,
        }
    }

    /// Look up a built-in function by code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    /// Get human-readable function code description
    pub fn description(fc: u8) -> &'static str {
        match fc & !EXCEPTION_FLAG {
            FC_READ_COILS => "Read Coils",
            FC_READ_DISCRETE_INPUTS => "Read Discrete Inputs",
            FC_READ_HOLDING_REGISTERS => "Read Holding Registers",
            FC_READ_INPUT_REGISTERS => "Read Input Registers",
            FC_WRITE_SINGLE_COIL => "Write Single Coil",
            FC_WRITE_SINGLE_REGISTER => "Write Single Register",
            FC_WRITE_MULTIPLE_COILS => "Write Multiple Coils",
            FC_WRITE_MULTIPLE_REGISTERS => "Write Multiple Registers",
            _ => "Unknown Function",
        }
    }
}

impl From<ModbusFunction> for u8 {
    fn from(function: ModbusFunction) -> Self {
        function.code()
    }
}

/// Outcome of a handler invocation.
///
/// `Success` is an internal sentinel: it is never written to the wire. Every
/// other variant is serialized as the single payload byte of an exception
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModbusException {
    Success,
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    GatewayPathUnavailable,
}

impl ModbusException {
    /// Exception byte (0 for `Success`)
    pub fn code(self) -> u8 {
        match self {
            ModbusException::Success => 0,
            ModbusException::IllegalFunction => EXCEPTION_ILLEGAL_FUNCTION,
            ModbusException::IllegalDataAddress => EXCEPTION_ILLEGAL_DATA_ADDRESS,
            ModbusException::IllegalDataValue => EXCEPTION_ILLEGAL_DATA_VALUE,
            ModbusException::ServerDeviceFailure => EXCEPTION_SERVER_DEVICE_FAILURE,
            ModbusException::GatewayPathUnavailable => EXCEPTION_GATEWAY_PATH_UNAVAILABLE,
        }
    }

    /// Decode an exception byte
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ModbusException::Success),
            EXCEPTION_ILLEGAL_FUNCTION => Some(ModbusException::IllegalFunction),
            EXCEPTION_ILLEGAL_DATA_ADDRESS => Some(ModbusException::IllegalDataAddress),
            EXCEPTION_ILLEGAL_DATA_VALUE => Some(ModbusException::IllegalDataValue),
            EXCEPTION_SERVER_DEVICE_FAILURE => Some(ModbusException::ServerDeviceFailure),
            EXCEPTION_GATEWAY_PATH_UNAVAILABLE => Some(ModbusException::GatewayPathUnavailable),
            _ => None,
        }
    }

    pub fn is_success(self) -> bool {
        self == ModbusException::Success
    }
}

impl fmt::Display for ModbusException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModbusException::Success => "success",
            ModbusException::IllegalFunction => "illegal function",
            ModbusException::IllegalDataAddress => "illegal data address",
            ModbusException::IllegalDataValue => "illegal data value",
            ModbusException::ServerDeviceFailure => "server device failure",
            ModbusException::GatewayPathUnavailable => "gateway path unavailable",
        };
        f.write_str(name)
    }
}
