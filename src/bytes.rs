//! # Byte Helpers for Modbus Payloads
//!
//! Conversions between the wire representation and the register store's
//! in-memory representation.
//!
//! ## Conventions
//!
//! - **Registers**: 16-bit words serialized big-endian (most significant byte first).
//!   For `[0x1234, 0xABCD]`: \[0x12, 0x34, 0xAB, 0xCD\]
//! - **Bits**: coils and discrete inputs are kept one byte per bit (0 or 1).
//!   On the wire they are packed LSB first: element `i` lands in bit `i % 8`
//!   of byte `i / 8`.

/// Read a big-endian `u16` at `offset`, if the slice is long enough.
#[inline]
pub fn read_u16_be(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Serialize registers big-endian.
///
/// # Example
///
/// ```rust
/// use voltage_modbus_server::bytes::registers_to_bytes;
///
/// assert_eq!(registers_to_bytes(&[0x1234, 0x0006]), vec![0x12, 0x34, 0x00, 0x06]);
/// ```
pub fn registers_to_bytes(registers: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(registers.len() * 2);
    for register in registers {
        bytes.extend_from_slice(&register.to_be_bytes());
    }
    bytes
}

/// Parse big-endian registers. A trailing odd byte is ignored.
pub fn bytes_to_registers(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Pack one-byte-per-bit values into wire bytes (nonzero = 1, LSB first).
///
/// # Example
///
/// ```rust
/// use voltage_modbus_server::bytes::pack_bits;
///
/// // elements 0, 1 and 7 set, then element 8 set
/// assert_eq!(pack_bits(&[1, 1, 0, 0, 0, 0, 0, 1, 1]), vec![0x83, 0x01]);
/// ```
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    let mut packed = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit != 0 {
            packed[i / 8] |= 1 << (i % 8);
        }
    }
    packed
}

/// Unpack at most `count` bits from wire bytes into one-byte-per-bit values.
///
/// Padding bits in the last byte are ignored. If `packed` holds fewer than
/// `count` bits, only the bits present are returned.
pub fn unpack_bits(packed: &[u8], count: usize) -> Vec<u8> {
    let available = count.min(packed.len() * 8);
    (0..available)
        .map(|i| (packed[i / 8] >> (i % 8)) & 0x01)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16_be() {
        let data = [0x00, 0x0A, 0x00, 0x09];
        assert_eq!(read_u16_be(&data, 0), Some(10));
        assert_eq!(read_u16_be(&data, 2), Some(9));
        assert_eq!(read_u16_be(&data, 3), None);
        assert_eq!(read_u16_be(&[], 0), None);
    }

    #[test]
    fn test_registers_big_endian() {
        let regs = [0x0000, 0x0001, 0xFFFF, 0x07E9];
        let bytes = registers_to_bytes(&regs);
        assert_eq!(bytes, vec![0x00, 0x00, 0x00, 0x01, 0xFF, 0xFF, 0x07, 0xE9]);
        assert_eq!(bytes_to_registers(&bytes), regs.to_vec());
    }

    #[test]
    fn test_bytes_to_registers_ignores_odd_byte() {
        assert_eq!(bytes_to_registers(&[0x12, 0x34, 0x56]), vec![0x1234]);
        assert!(bytes_to_registers(&[0x12]).is_empty());
    }

    #[test]
    fn test_pack_bits_lsb_first() {
        // coils 10, 11, 17, 18 read from address 10 with quantity 9
        let bits = [1, 1, 0, 0, 0, 0, 0, 1, 1];
        assert_eq!(pack_bits(&bits), vec![0b1000_0011, 0b0000_0001]);
        assert!(pack_bits(&[]).is_empty());
    }

    #[test]
    fn test_pack_bits_treats_nonzero_as_set() {
        assert_eq!(pack_bits(&[0xFF, 0, 2]), vec![0b0000_0101]);
    }

    #[test]
    fn test_unpack_bits_stops_at_count() {
        // padding bits 3..8 are set but must be ignored
        assert_eq!(unpack_bits(&[0b1111_1101], 3), vec![1, 0, 1]);
        assert_eq!(unpack_bits(&[0x01, 0x80], 16)[15], 1);
    }

    #[test]
    fn test_unpack_bits_short_input() {
        assert_eq!(unpack_bits(&[0xFF], 12).len(), 8);
        assert!(unpack_bits(&[], 4).is_empty());
    }
}
