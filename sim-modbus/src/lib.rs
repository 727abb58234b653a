//! A bit-exact Modbus/TCP server for function codes 0x03/0x06/0x10.

pub mod frame;
pub mod server;

pub use server::{ModbusError, ModbusServer};
