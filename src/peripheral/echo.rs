use log::debug;

use super::Peripheral;
use crate::transaction::{Request, TransactionError};

/// Logs every SPI exchange and answers the data phase with the bytes it
/// just received.
pub struct EchoPeripheral {}

impl EchoPeripheral {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for EchoPeripheral {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for EchoPeripheral {
    fn name(&self) -> &str {
        "spi-echo"
    }

    fn handle(&mut self, request: &mut Request<'_>) -> Result<(), TransactionError> {
        if request.is_pure_init() {
            return Ok(());
        }

        let Some(transaction) = request.spi_transaction_mut() else {
            return Ok(());
        };

        if transaction.is_command() {
            let command = transaction.read_bytes(0, transaction.command_length())?;
            debug!("SPI command: {:x?}", command);
        } else if transaction.is_data() {
            let offset = transaction.command_length();
            let data = transaction.read_bytes(offset, transaction.data_length())?;
            debug!("SPI data received: {:x?}", data);
            transaction.write_bytes(offset, &data)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripheral::testing::{
        capture_logs, take_logs, MisreportingTransaction, OpaqueConnection, RecordingTransaction,
    };
    use crate::transaction::BufferTransaction;
    use log::Level;

    #[test]
    fn test_pure_init_is_silent() {
        capture_logs();
        let mut device = EchoPeripheral::new();
        let mut transaction = RecordingTransaction::new(BufferTransaction::data(&[0x01], &[0x02]));

        let mut request = Request::init();
        request.connection = Some(&mut transaction);
        device.handle(&mut request).unwrap();

        assert!(transaction.untouched());
        assert!(take_logs().is_empty());
    }

    #[test]
    fn test_command_phase_logs_without_writing() {
        capture_logs();
        let mut device = EchoPeripheral::new();
        let mut transaction = RecordingTransaction::new(BufferTransaction::command(&[0x9f, 0x00, 0x42]));

        let mut request = Request::access(true, true, &mut transaction);
        device.handle(&mut request).unwrap();

        assert_eq!(*transaction.reads.borrow(), vec![(0, 3)]);
        assert!(transaction.writes.is_empty());

        let logs = take_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].0, Level::Debug);
        assert_eq!(logs[0].1, "SPI command: [9f, 0, 42]");
    }

    #[test]
    fn test_data_phase_echoes_bytes() {
        capture_logs();
        let mut device = EchoPeripheral::new();
        let mut transaction =
            RecordingTransaction::new(BufferTransaction::data(&[0x03, 0x10], &[0xaa, 0xbb, 0xcc]));

        let mut request = Request::access(true, true, &mut transaction);
        device.handle(&mut request).unwrap();

        assert_eq!(*transaction.reads.borrow(), vec![(2, 3)]);
        assert_eq!(transaction.writes, vec![(2, vec![0xaa, 0xbb, 0xcc])]);
        assert_eq!(transaction.inner.as_bytes(), &[0x03, 0x10, 0xaa, 0xbb, 0xcc]);

        let logs = take_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].0, Level::Debug);
        assert_eq!(logs[0].1, "SPI data received: [aa, bb, cc]");
    }

    #[test]
    fn test_empty_command_phase() {
        capture_logs();
        let mut device = EchoPeripheral::new();
        let mut transaction = RecordingTransaction::new(BufferTransaction::command(&[]));

        let mut request = Request::access(false, true, &mut transaction);
        device.handle(&mut request).unwrap();

        assert_eq!(*transaction.reads.borrow(), vec![(0, 0)]);
        assert!(transaction.writes.is_empty());

        let logs = take_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].1, "SPI command: []");
    }

    #[test]
    fn test_empty_data_phase() {
        capture_logs();
        let mut device = EchoPeripheral::new();
        let mut transaction = RecordingTransaction::new(BufferTransaction::data(&[0x02, 0x00], &[]));

        let mut request = Request::access(true, false, &mut transaction);
        device.handle(&mut request).unwrap();

        assert_eq!(*transaction.reads.borrow(), vec![(2, 0)]);
        assert_eq!(transaction.writes, vec![(2, Vec::new())]);
        assert_eq!(transaction.inner.as_bytes(), &[0x02, 0x00]);

        let logs = take_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].1, "SPI data received: []");
    }

    #[test]
    fn test_echo_leaves_buffer_unchanged() {
        capture_logs();
        let mut device = EchoPeripheral::new();
        let payload: Vec<u8> = (0..=255).collect();
        let mut transaction = BufferTransaction::data(&[0x7f], &payload);
        let before = transaction.clone();

        for _ in 0..3 {
            let mut request = Request::access(true, false, &mut transaction);
            device.handle(&mut request).unwrap();
        }

        assert_eq!(transaction, before);
        assert_eq!(take_logs().len(), 3);
    }

    #[test]
    fn test_missing_or_foreign_connection_is_ignored() {
        capture_logs();
        let mut device = EchoPeripheral::new();

        let mut request = Request {
            is_init: false,
            is_read: true,
            is_write: false,
            connection: None,
        };
        device.handle(&mut request).unwrap();

        let mut connection = OpaqueConnection::default();
        let mut request = Request::access(false, true, &mut connection);
        device.handle(&mut request).unwrap();

        assert_eq!(connection.downcasts, 1);
        assert!(take_logs().is_empty());
    }

    #[test]
    fn test_init_with_access_falls_through_to_transaction() {
        capture_logs();
        let mut device = EchoPeripheral::new();
        let mut transaction = RecordingTransaction::new(BufferTransaction::command(&[0x05]));

        let mut request = Request::access(true, false, &mut transaction);
        request.is_init = true;
        device.handle(&mut request).unwrap();

        assert_eq!(*transaction.reads.borrow(), vec![(0, 1)]);
        assert_eq!(take_logs().len(), 1);
    }

    #[test]
    fn test_host_range_error_is_propagated() {
        capture_logs();
        let mut device = EchoPeripheral::new();
        let mut transaction = MisreportingTransaction::new(BufferTransaction::command(&[0x01]), 8, 0);

        let mut request = Request::access(true, false, &mut transaction);
        assert!(device.handle(&mut request).is_err());
        assert!(take_logs().is_empty());
    }
}
