//! Requests and bus transactions handed to a device by the simulation host.
//!
//! The host owns every object in here. A device only sees them for the
//! duration of one callback, which the `'a` borrow on [`Request`] enforces.

use thiserror::Error;

pub mod buffer;

pub use buffer::BufferTransaction;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("byte range {offset}..{end} exceeds transaction buffer of {len} bytes")]
    OutOfRange { offset: usize, end: usize, len: usize },
}

/// Phase of an SPI exchange. A transaction is in exactly one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Command,
    Data,
}

/// A bus transaction of unspecified capability.
///
/// Only SPI is modelled, other buses keep the default `None` downcast.
pub trait Connection {
    fn as_spi_mut(&mut self) -> Option<&mut dyn SpiTransaction> {
        None
    }
}

/// One SPI exchange over an implicit buffer laid out as
/// `[command bytes | data bytes]`.
pub trait SpiTransaction {
    fn is_command(&self) -> bool;
    fn is_data(&self) -> bool;
    fn command_length(&self) -> usize;
    fn data_length(&self) -> usize;

    /// Reads `len` bytes starting at `offset`.
    fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>, TransactionError>;

    /// Overwrites the buffer starting at `offset` with `data`.
    fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), TransactionError>;
}

/// One device access event.
pub struct Request<'a> {
    pub is_init: bool,
    pub is_read: bool,
    pub is_write: bool,
    pub connection: Option<&'a mut dyn Connection>,
}

impl<'a> Request<'a> {
    /// Passive initialization, fired once when the device is attached.
    pub fn init() -> Self {
        Self {
            is_init: true,
            is_read: false,
            is_write: false,
            connection: None,
        }
    }

    pub fn access(is_read: bool, is_write: bool, connection: &'a mut dyn Connection) -> Self {
        Self {
            is_init: false,
            is_read,
            is_write,
            connection: Some(connection),
        }
    }

    pub fn is_pure_init(&self) -> bool {
        self.is_init && !self.is_read && !self.is_write
    }

    /// Returns the carried transaction if it has the SPI capability.
    pub fn spi_transaction_mut(&mut self) -> Option<&mut dyn SpiTransaction> {
        match self.connection.as_mut() {
            Some(connection) => connection.as_spi_mut(),
            None => None,
        }
    }
}
