#![no_main]

use std::sync::OnceLock;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use voltage_modbus_server::{Frame, FunctionTable, MemoryStore, ModbusCodec};

#[derive(Debug, Arbitrary)]
struct Request {
    transaction_id: u16,
    slave_id: u8,
    function: u8,
    data: Vec<u8>,
}

static STORE: OnceLock<MemoryStore> = OnceLock::new();
static TABLE: OnceLock<FunctionTable> = OnceLock::new();

fuzz_target!(|request: Request| {
    let store = STORE.get_or_init(|| MemoryStore::new(4));
    let table = TABLE.get_or_init(FunctionTable::with_defaults);

    let frame = Frame::tcp(
        request.transaction_id,
        request.slave_id,
        request.function,
        request.data,
    );
    let (data, exception) = table.dispatch(store, &frame);

    let mut response = frame.response();
    response.set_data(data);
    response.set_exception(exception);
    let _ = ModbusCodec::encode(&response);
});
