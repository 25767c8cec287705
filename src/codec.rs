//! # Modbus Codec
//!
//! Converts raw transport buffers into [`Frame`]s and back.
//!
//! ## Envelopes
//!
//! | Transport | Layout |
//! |-----------|--------|
//! | TCP / TLS | `[tid:2][pid:2][len:2][unit:1][fc:1][data:len-2]` |
//! | RTU | `[unit:1][fc:1][data][crc16:2 LE]` |
//!
//! The rest of the server never looks at the transport again after decode.
//! Encoding always recomputes the MBAP length field or the CRC.

use bytes::{BufMut, Bytes, BytesMut};
use crc::{Crc, CRC_16_MODBUS};
use tracing::trace;

use crate::constants::*;
use crate::error::{ModbusError, ModbusResult};
use crate::frame::{Envelope, Frame};
use crate::protocol::TransportKind;

/// CRC calculator for RTU (poly 0xA001 reflected, init 0xFFFF)
const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Compute the RTU checksum of `data`
#[inline]
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Format raw bytes as hex string for packet logging
pub fn format_hex_packet(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Frame codec for both transports.
pub struct ModbusCodec;

impl ModbusCodec {
    /// Decode a received buffer.
    ///
    /// # Errors
    ///
    /// [`ModbusError::Frame`] when the MBAP header is inconsistent with the
    /// buffer or the RTU checksum does not match.
    ///
    /// # Example
    ///
    /// ```rust
    /// use voltage_modbus_server::{ModbusCodec, TransportKind};
    ///
    /// let raw = [0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD];
    /// let frame = ModbusCodec::decode(&raw, TransportKind::Rtu).unwrap();
    /// assert_eq!(frame.slave_id, 1);
    /// assert_eq!(frame.function, 0x03);
    /// assert_eq!(frame.data, vec![0x00, 0x00, 0x00, 0x0A]);
    /// ```
    pub fn decode(raw: &[u8], kind: TransportKind) -> ModbusResult<Frame> {
        trace!("Decoding {:?} frame: {}", kind, format_hex_packet(raw));
        match kind {
            TransportKind::Tcp => Self::decode_tcp(raw),
            TransportKind::Rtu => Self::decode_rtu(raw),
        }
    }

    /// Serialize a frame for its transport.
    ///
    /// # Errors
    ///
    /// [`ModbusError::Frame`] when a TCP payload is too large for the MBAP
    /// length field.
    pub fn encode(frame: &Frame) -> ModbusResult<Bytes> {
        match frame.envelope {
            Envelope::Tcp {
                transaction_id,
                protocol_id,
            } => {
                if frame.data.len() > MAX_TCP_DATA_LEN {
                    return Err(ModbusError::frame(format!(
                        "TCP payload of {} bytes exceeds the MBAP limit of {}",
                        frame.data.len(),
                        MAX_TCP_DATA_LEN
                    )));
                }
                let mut buf = BytesMut::with_capacity(MIN_TCP_FRAME_LEN + frame.data.len());
                buf.put_u16(transaction_id);
                buf.put_u16(protocol_id);
                // unit id + function code + data
                buf.put_u16((2 + frame.data.len()) as u16);
                buf.put_u8(frame.slave_id);
                buf.put_u8(frame.function);
                buf.put_slice(&frame.data);
                Ok(buf.freeze())
            }
            Envelope::Rtu => {
                let mut buf =
                    BytesMut::with_capacity(2 + frame.data.len() + RTU_CRC_LEN);
                buf.put_u8(frame.slave_id);
                buf.put_u8(frame.function);
                buf.put_slice(&frame.data);
                let crc = crc16(&buf);
                buf.put_u16_le(crc);
                Ok(buf.freeze())
            }
        }
    }

    fn decode_tcp(raw: &[u8]) -> ModbusResult<Frame> {
        if raw.len() < MIN_TCP_FRAME_LEN {
            return Err(ModbusError::frame(format!(
                "TCP frame too short: {} bytes (min {})",
                raw.len(),
                MIN_TCP_FRAME_LEN
            )));
        }

        let transaction_id = u16::from_be_bytes([raw[0], raw[1]]);
        let protocol_id = u16::from_be_bytes([raw[2], raw[3]]);
        let length = u16::from_be_bytes([raw[4], raw[5]]) as usize;

        if protocol_id != 0 {
            return Err(ModbusError::frame(format!(
                "Invalid protocol identifier: {:#06X}",
                protocol_id
            )));
        }
        if length < MIN_MBAP_LENGTH {
            return Err(ModbusError::frame(format!(
                "MBAP length {} below minimum {}",
                length, MIN_MBAP_LENGTH
            )));
        }

        let expected = MBAP_LENGTH_OFFSET + length;
        if raw.len() != expected {
            return Err(ModbusError::frame(format!(
                "Specified packet length does not match actual: expected {} bytes, got {}",
                expected,
                raw.len()
            )));
        }

        Ok(Frame {
            slave_id: raw[6],
            function: raw[7],
            data: raw[MIN_TCP_FRAME_LEN..].to_vec(),
            envelope: Envelope::Tcp {
                transaction_id,
                protocol_id,
            },
        })
    }

    fn decode_rtu(raw: &[u8]) -> ModbusResult<Frame> {
        if raw.len() < MIN_RTU_FRAME_LEN {
            return Err(ModbusError::frame(format!(
                "RTU frame too short: {} bytes (min {})",
                raw.len(),
                MIN_RTU_FRAME_LEN
            )));
        }

        let (body, crc_bytes) = raw.split_at(raw.len() - RTU_CRC_LEN);
        let received = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
        let computed = crc16(body);
        if received != computed {
            return Err(ModbusError::frame(format!(
                "CRC mismatch: received {:#06X}, computed {:#06X}",
                received, computed
            )));
        }

        Ok(Frame::rtu(body[0], body[1], body[2..].to_vec()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_crc16_known_vectors() {
        assert_eq!(crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A]), 0xCDC5);
        assert_eq!(crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]), 0x0A84);
    }

    #[test]
    fn test_decode_tcp() {
        let raw = [
            0x00, 0x2A, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x05, 0x00, 0x01,
        ];
        let frame = ModbusCodec::decode(&raw, TransportKind::Tcp).unwrap();

        assert_eq!(frame.slave_id, 1);
        assert_eq!(frame.function, 0x03);
        assert_eq!(frame.data, vec![0x00, 0x05, 0x00, 0x01]);
        assert_eq!(
            frame.envelope,
            Envelope::Tcp {
                transaction_id: 0x002A,
                protocol_id: 0
            }
        );
    }

    #[test]
    fn test_decode_tcp_short_buffer() {
        // declares 6 bytes after the length field, carries 5
        let raw = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x05, 0x00];
        let err = ModbusCodec::decode(&raw, TransportKind::Tcp).unwrap_err();
        assert!(err.is_frame_error());

        let err = ModbusCodec::decode(&[0x00, 0x01, 0x00], TransportKind::Tcp).unwrap_err();
        assert!(err.is_frame_error());
    }

    #[test]
    fn test_decode_tcp_trailing_bytes() {
        let raw = [0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x01, 0x03, 0xFF];
        assert!(ModbusCodec::decode(&raw, TransportKind::Tcp).is_err());
    }

    #[test]
    fn test_decode_tcp_rejects_protocol_id() {
        let raw = [0x00, 0x01, 0x00, 0x01, 0x00, 0x02, 0x01, 0x03];
        assert!(ModbusCodec::decode(&raw, TransportKind::Tcp).is_err());
    }

    #[test]
    fn test_decode_tcp_rejects_tiny_length() {
        let raw = [0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x01, 0x03];
        assert!(ModbusCodec::decode(&raw, TransportKind::Tcp).is_err());
    }

    #[test]
    fn test_encode_tcp_recomputes_length() {
        let mut frame = Frame::tcp(0xBEEF, 1, 0x03, vec![0x00, 0x05, 0x00, 0x01]);
        frame.set_data(vec![0x02, 0x00, 0x06]);

        let raw = ModbusCodec::encode(&frame).unwrap();
        assert_eq!(
            raw.as_ref(),
            &[0xBE, 0xEF, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03, 0x02, 0x00, 0x06]
        );
    }

    #[test]
    fn test_encode_tcp_payload_limit() {
        let largest = Frame::tcp(9, 1, 0x03, vec![0xAB; MAX_TCP_DATA_LEN]);
        let raw = ModbusCodec::encode(&largest).unwrap();
        assert_eq!(&raw[4..6], &[0xFF, 0xFF]);
        assert_eq!(ModbusCodec::decode(&raw, TransportKind::Tcp).unwrap(), largest);

        let oversized = Frame::tcp(9, 1, 0x03, vec![0xAB; MAX_TCP_DATA_LEN + 1]);
        let err = ModbusCodec::encode(&oversized).unwrap_err();
        assert!(err.is_frame_error());
    }

    #[test]
    fn test_decode_rtu() {
        let raw = [0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD];
        let frame = ModbusCodec::decode(&raw, TransportKind::Rtu).unwrap();
        assert_eq!(frame.slave_id, 1);
        assert_eq!(frame.function, 0x03);
        assert_eq!(frame.data, vec![0x00, 0x00, 0x00, 0x0A]);
        assert_eq!(frame.envelope, Envelope::Rtu);
    }

    #[test]
    fn test_decode_rtu_bad_crc() {
        let raw = [0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCE];
        let err = ModbusCodec::decode(&raw, TransportKind::Rtu).unwrap_err();
        assert!(err.is_frame_error());
        assert!(err.to_string().contains("CRC mismatch"));
    }

    #[test]
    fn test_decode_rtu_too_short() {
        assert!(ModbusCodec::decode(&[0x01, 0x03, 0x00], TransportKind::Rtu).is_err());
    }

    #[test]
    fn test_encode_rtu_appends_crc_little_endian() {
        let frame = Frame::rtu(0x01, 0x03, vec![0x00, 0x00, 0x00, 0x0A]);
        let raw = ModbusCodec::encode(&frame).unwrap();
        assert_eq!(
            raw.as_ref(),
            &[0x01, 0x03, 0x00, 0x00, 0x00, 0x0A, 0xC5, 0xCD]
        );
    }

    #[test]
    fn test_encode_rtu_exception() {
        let mut frame = Frame::rtu(0x11, 0x01, Vec::new());
        frame.set_exception(crate::protocol::ModbusException::IllegalFunction);
        let raw = ModbusCodec::encode(&frame).unwrap();

        assert_eq!(&raw[..3], &[0x11, 0x81, 0x01]);
        assert!(ModbusCodec::decode(&raw, TransportKind::Rtu).is_ok());
    }

    #[test]
    fn test_format_hex_packet() {
        assert_eq!(format_hex_packet(&[0x01, 0xAB, 0x00]), "01 AB 00");
        assert_eq!(format_hex_packet(&[]), "");
    }

    proptest! {
        #[test]
        fn prop_rtu_single_byte_corruption_detected(
            slave_id in any::<u8>(),
            function in any::<u8>(),
            data in proptest::collection::vec(any::<u8>(), 0..64),
            position in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let raw = ModbusCodec::encode(&Frame::rtu(slave_id, function, data)).unwrap();
            let mut corrupted = raw.to_vec();
            let index = position.index(corrupted.len());
            corrupted[index] ^= flip;

            prop_assert!(ModbusCodec::decode(&corrupted, TransportKind::Rtu).is_err());
        }

        #[test]
        fn prop_tcp_header_length_matches_buffer(
            transaction_id in any::<u16>(),
            slave_id in any::<u8>(),
            function in any::<u8>(),
            data in proptest::collection::vec(any::<u8>(), 0..252),
        ) {
            let raw = ModbusCodec::encode(&Frame::tcp(transaction_id, slave_id, function, data)).unwrap();
            let length = u16::from_be_bytes([raw[4], raw[5]]) as usize;
            prop_assert_eq!(raw.len(), MBAP_LENGTH_OFFSET + length);
        }
    }
}
