//! Modbus protocol constants based on official specification
//!
//! These constants are derived from the official Modbus specification:
//! - Maximum PDU size: 253 bytes (inherited from RS485 ADU limit of 256 bytes)
//! - Every register region spans the full 16-bit address space

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Modbus MBAP header length for TCP
/// Format: Transaction ID(2) + Protocol ID(2) + Length(2) + Unit ID(1) = 7 bytes
pub const MBAP_HEADER_LEN: usize = 7;

/// Bytes of the MBAP header that precede the span counted by the Length field
pub const MBAP_LENGTH_OFFSET: usize = 6;

/// Maximum PDU (Protocol Data Unit) size per Modbus specification
/// This is the fundamental limit inherited from RS485 implementation:
/// RS485 ADU (256 bytes) - Slave Address (1 byte) - CRC (2 bytes) = 253 bytes
pub const MAX_PDU_SIZE: usize = 253;

/// Maximum MBAP length field value (Unit ID + PDU)
/// Used for validating the Length field in MBAP header
/// = 1 (Unit ID) + 253 (Max PDU) = 254 bytes
pub const MAX_MBAP_LENGTH: usize = 1 + MAX_PDU_SIZE;

/// Minimum MBAP length field value: Unit ID + Function Code
pub const MIN_MBAP_LENGTH: usize = 2;

/// Largest data payload whose MBAP length field still fits in 16 bits
pub const MAX_TCP_DATA_LEN: usize = u16::MAX as usize - MIN_MBAP_LENGTH;

/// Smallest decodable TCP frame: MBAP header + function code
pub const MIN_TCP_FRAME_LEN: usize = MBAP_HEADER_LEN + 1;

/// Smallest decodable RTU frame: Slave ID + Function Code + CRC(2)
pub const MIN_RTU_FRAME_LEN: usize = 4;

/// RTU CRC length
pub const RTU_CRC_LEN: usize = 2;

/// Read buffer size for one serial datagram
///
/// Maximum RTU ADU is 256 bytes; 512 bytes provides a safety margin.
pub const SERIAL_READ_BUFFER_SIZE: usize = 512;

// ============================================================================
// Register Store Constants
// ============================================================================

/// Number of elements in every register region (full 16-bit address space)
pub const REGION_SIZE: usize = 65536;

/// Highest configurable device count (one byte of slave address)
pub const MAX_DEVICE_COUNT: u8 = 255;

/// Directory used by the file backend when none is configured
pub const DEFAULT_STORE_DIR: &str = "./file-slave";

/// Capacity of the engine admission queue
pub const REQUEST_QUEUE_CAPACITY: usize = 256;

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Coils (FC01)
pub const FC_READ_COILS: u8 = 0x01;

/// Read Discrete Inputs (FC02)
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers (FC04)
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// Write Single Coil (FC05)
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Write Multiple Coils (FC15)
pub const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;

/// Write Multiple Registers (FC16)
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Bit set on the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

// ============================================================================
// Modbus Exception Codes
// ============================================================================

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// Server Device Failure
pub const EXCEPTION_SERVER_DEVICE_FAILURE: u8 = 0x04;

/// Gateway Path Unavailable
pub const EXCEPTION_GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_constants() {
        assert_eq!(MBAP_HEADER_LEN, 7);
        assert_eq!(MBAP_LENGTH_OFFSET + 1, MBAP_HEADER_LEN);
        assert_eq!(MAX_PDU_SIZE, 253);
        assert_eq!(MAX_MBAP_LENGTH, 254);
        assert_eq!(MIN_TCP_FRAME_LEN, 8);
    }

    #[test]
    fn test_largest_frames_fit_read_buffer() {
        // TCP: header + PDU
        assert!(MBAP_LENGTH_OFFSET + MAX_MBAP_LENGTH <= SERIAL_READ_BUFFER_SIZE);
        // RTU: slave id + PDU + CRC
        assert!(1 + MAX_PDU_SIZE + RTU_CRC_LEN <= SERIAL_READ_BUFFER_SIZE);
    }

    #[test]
    fn test_region_covers_address_space() {
        assert_eq!(REGION_SIZE, u16::MAX as usize + 1);
    }
}
