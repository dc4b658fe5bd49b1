//! Mock SPI peripherals for firmware running inside a hardware simulator.
//!
//! The simulation host connects over TCP and forwards every device access
//! as a framed request. Each request is handed to a [`Peripheral`], which
//! answers through the transaction buffer.

pub mod peripheral;
pub mod protocol;
pub mod server;
pub mod transaction;

pub use peripheral::{DeviceKind, EchoPeripheral, Mpu6500, Peripheral};
pub use protocol::{ProtocolCommand, ProtocolHandler, ProtocolResponse};
pub use transaction::{BufferTransaction, Connection, Phase, Request, SpiTransaction, TransactionError};
