use super::{Connection, Phase, SpiTransaction, TransactionError};

/// Host-side SPI transaction backed by an owned buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferTransaction {
    phase: Phase,
    command_length: usize,
    data_length: usize,
    buffer: Vec<u8>,
}

impl BufferTransaction {
    /// Zero-filled transaction with room for `command_length + data_length` bytes.
    pub fn new(phase: Phase, command_length: usize, data_length: usize) -> Self {
        Self {
            phase,
            command_length,
            data_length,
            buffer: vec![0; command_length + data_length],
        }
    }

    pub fn command(command: &[u8]) -> Self {
        Self {
            phase: Phase::Command,
            command_length: command.len(),
            data_length: 0,
            buffer: command.to_vec(),
        }
    }

    pub fn data(command: &[u8], data: &[u8]) -> Self {
        let mut buffer = Vec::with_capacity(command.len() + data.len());
        buffer.extend_from_slice(command);
        buffer.extend_from_slice(data);
        Self {
            phase: Phase::Data,
            command_length: command.len(),
            data_length: data.len(),
            buffer,
        }
    }

    /// Wraps a buffer whose first `command_length` bytes are the command.
    pub fn from_parts(phase: Phase, command_length: usize, buffer: Vec<u8>) -> Self {
        Self {
            phase,
            command_length,
            data_length: buffer.len().saturating_sub(command_length),
            buffer,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn data_bytes(&self) -> &[u8] {
        &self.buffer[self.command_length..]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<usize, TransactionError> {
        let end = offset.saturating_add(len);
        if end > self.buffer.len() {
            return Err(TransactionError::OutOfRange {
                offset,
                end,
                len: self.buffer.len(),
            });
        }
        Ok(end)
    }
}

impl SpiTransaction for BufferTransaction {
    fn is_command(&self) -> bool {
        self.phase == Phase::Command
    }

    fn is_data(&self) -> bool {
        self.phase == Phase::Data
    }

    fn command_length(&self) -> usize {
        self.command_length
    }

    fn data_length(&self) -> usize {
        self.data_length
    }

    fn read_bytes(&self, offset: usize, len: usize) -> Result<Vec<u8>, TransactionError> {
        let end = self.check_range(offset, len)?;
        Ok(self.buffer[offset..end].to_vec())
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) -> Result<(), TransactionError> {
        let end = self.check_range(offset, data.len())?;
        self.buffer[offset..end].copy_from_slice(data);
        Ok(())
    }
}

impl Connection for BufferTransaction {
    fn as_spi_mut(&mut self) -> Option<&mut dyn SpiTransaction> {
        Some(self)
    }
}
