//! Test doubles shared by the device tests.

use std::cell::{Cell, RefCell};
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::transaction::{BufferTransaction, Connection, SpiTransaction, TransactionError};

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(Vec::new());
}

struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Installs the capturing logger and clears this thread's records.
///
/// Records are kept per thread so parallel tests don't see each other.
pub fn capture_logs() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

pub fn take_logs() -> Vec<(Level, String)> {
    RECORDS.with(|records| std::mem::take(&mut *records.borrow_mut()))
}

/// Wraps a [`BufferTransaction`] and records every accessor call.
pub struct RecordingTransaction {
    pub inner: BufferTransaction,
    pub queries: Cell<usize>,
    pub reads: RefCell<Vec<(usize, usize)>>,
    pub writes: Vec<(usize, Vec<u8>)>,
    pub downcasts: usize,
}

impl RecordingTransaction {
    pub fn new(inner: BufferTransaction) -> Self {
        Self {
            inner,
            queries: Cell::new(0),
            reads: RefCell::new(Vec::new()),
            writes: Vec::new(),
            downcasts: 0,
        }
    }

    pub fn untouched(&self) -> bool {
        self.downcasts == 0
            && self.queries.get() == 0
            && self.reads.borrow().is_empty()
            && self.writes.is_empty()
    }

    fn query(&self) {
        self.queries.set(self.queries.get() + 1);
    }
}

impl SpiTransaction for RecordingTransaction {
    fn is_command(&self) -> bool {
        self.query();
        self.inner.is_command()
    }

    fn is_data(&self) -> bool {
        self.query();
        self.inner.is_data()
    }

    fn command_length(&self) -> usize {
        self.query();
        self.inner.command_length()
    }

    fn data_length(&self) -> usize {
        self.query();
        self.inner.data_length()
    }

    fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>, TransactionError> {
        self.reads.borrow_mut().push((offset, len));
        self.inner.read_bytes(offset, len)
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), TransactionError> {
        self.writes.push((offset, data.to_vec()));
        self.inner.write_bytes(offset, data)
    }
}

impl Connection for RecordingTransaction {
    fn as_spi_mut(&mut self) -> Option<&mut dyn SpiTransaction> {
        self.downcasts += 1;
        Some(self)
    }
}

/// A connection of some other bus; never downcasts to SPI.
#[derive(Default)]
pub struct OpaqueConnection {
    pub downcasts: usize,
}

impl Connection for OpaqueConnection {
    fn as_spi_mut(&mut self) -> Option<&mut dyn SpiTransaction> {
        self.downcasts += 1;
        None
    }
}

/// Claims lengths that need not fit the wrapped buffer.
pub struct MisreportingTransaction {
    inner: BufferTransaction,
    command_length: usize,
    data_length: usize,
}

impl MisreportingTransaction {
    pub fn new(inner: BufferTransaction, command_length: usize, data_length: usize) -> Self {
        Self {
            inner,
            command_length,
            data_length,
        }
    }
}

impl SpiTransaction for MisreportingTransaction {
    fn is_command(&self) -> bool {
        self.inner.is_command()
    }

    fn is_data(&self) -> bool {
        self.inner.is_data()
    }

    fn command_length(&self) -> usize {
        self.command_length
    }

    fn data_length(&self) -> usize {
        self.data_length
    }

    fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>, TransactionError> {
        self.inner.read_bytes(offset, len)
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), TransactionError> {
        self.inner.write_bytes(offset, data)
    }
}

impl Connection for MisreportingTransaction {
    fn as_spi_mut(&mut self) -> Option<&mut dyn SpiTransaction> {
        Some(self)
    }
}
