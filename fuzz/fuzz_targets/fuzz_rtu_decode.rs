#![no_main]

use libfuzzer_sys::fuzz_target;
use voltage_modbus_server::{ModbusCodec, TransportKind};

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = ModbusCodec::decode(data, TransportKind::Rtu) {
        let encoded = ModbusCodec::encode(&frame).expect("decoded frame must encode");
        assert_eq!(encoded.as_ref(), data);
    }
});
