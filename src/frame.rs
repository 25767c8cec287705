//! Transport-independent Modbus frame
//!
//! A [`Frame`] is what the codec produces from a received buffer and what the
//! handlers consume. The only transport-specific part is the [`Envelope`],
//! which carries what the codec needs to re-encode a reply.

use crate::constants::EXCEPTION_FLAG;
use crate::protocol::{ModbusException, SlaveId, TransportKind};

/// Transport metadata needed only for re-encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    /// MBAP header fields echoed into the reply
    Tcp {
        transaction_id: u16,
        protocol_id: u16,
    },
    /// Serial line; the CRC is recomputed on encode
    Rtu,
}

/// Normalized request/response unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Addressed device
    pub slave_id: SlaveId,
    /// Function code (bit 7 set on exception responses)
    pub function: u8,
    /// Payload following the function code
    pub data: Vec<u8>,
    /// Transport envelope
    pub envelope: Envelope,
}

impl Frame {
    /// Create a frame for the TCP transport (protocol id 0)
    pub fn tcp(transaction_id: u16, slave_id: SlaveId, function: u8, data: Vec<u8>) -> Self {
        Self {
            slave_id,
            function,
            data,
            envelope: Envelope::Tcp {
                transaction_id,
                protocol_id: 0,
            },
        }
    }

    /// Create a frame for the RTU transport
    pub fn rtu(slave_id: SlaveId, function: u8, data: Vec<u8>) -> Self {
        Self {
            slave_id,
            function,
            data,
            envelope: Envelope::Rtu,
        }
    }

    /// Transport this frame belongs to
    pub fn transport(&self) -> TransportKind {
        match self.envelope {
            Envelope::Tcp { .. } => TransportKind::Tcp,
            Envelope::Rtu => TransportKind::Rtu,
        }
    }

    /// Derive an empty response: same slave id, function and envelope
    pub fn response(&self) -> Frame {
        Frame {
            slave_id: self.slave_id,
            function: self.function,
            data: Vec::new(),
            envelope: self.envelope,
        }
    }

    /// Replace the payload
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Turn this frame into an exception response.
    ///
    /// Sets bit 7 of the function code and replaces the payload with the
    /// exception byte. `Success` leaves the frame untouched.
    pub fn set_exception(&mut self, exception: ModbusException) {
        if exception.is_success() {
            return;
        }
        self.function |= EXCEPTION_FLAG;
        self.data = vec![exception.code()];
    }

    /// Check if exception response
    pub fn is_exception(&self) -> bool {
        self.function & EXCEPTION_FLAG != 0
    }

    /// Exception carried by this frame, `Success` for a normal frame.
    ///
    /// Unknown exception bytes are reported as `None`.
    pub fn exception(&self) -> Option<ModbusException> {
        if !self.is_exception() {
            return Some(ModbusException::Success);
        }
        self.data.first().copied().and_then(ModbusException::from_code)
    }
}
