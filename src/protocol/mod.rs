use anyhow::Result;

use crate::transaction::Phase;

pub const CMD_EVENT: u8 = 0x01;
pub const CMD_SPI: u8 = 0x02;
pub const CMD_RESP: u8 = 0x0b;

pub const FLAG_INIT: u8 = 0x01;
pub const FLAG_READ: u8 = 0x02;
pub const FLAG_WRITE: u8 = 0x04;

pub const PHASE_COMMAND: u8 = 0x00;
pub const PHASE_DATA: u8 = 0x01;

pub const EVENT_HEADER_LEN: usize = 2;
pub const SPI_HEADER_LEN: usize = 11;
pub const RESPONSE_HEADER_LEN: usize = 6;

/// Largest frame accepted from the host, header included.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFlags {
    pub is_init: bool,
    pub is_read: bool,
    pub is_write: bool,
}

impl RequestFlags {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            is_init: byte & FLAG_INIT != 0,
            is_read: byte & FLAG_READ != 0,
            is_write: byte & FLAG_WRITE != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut byte = 0;
        if self.is_init {
            byte |= FLAG_INIT;
        }
        if self.is_read {
            byte |= FLAG_READ;
        }
        if self.is_write {
            byte |= FLAG_WRITE;
        }
        byte
    }
}

#[derive(Debug)]
pub struct SpiHeader {
    pub control_bit: u8,
    pub flags: RequestFlags,
    pub phase: Phase,
    pub command_len: u32,
    pub data_len: u32,
}

#[derive(Debug)]
pub struct ResponseHeader {
    pub control_bit: u8,
    pub success: u8,
    pub total_len: u32,
}

impl SpiHeader {
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < SPI_HEADER_LEN {
            return Err(anyhow::anyhow!("Buffer too short for SPI header"));
        }
        let phase = match buf[2] {
            PHASE_COMMAND => Phase::Command,
            PHASE_DATA => Phase::Data,
            other => return Err(anyhow::anyhow!("Invalid SPI phase: 0x{:02x}", other)),
        };
        Ok(Self {
            control_bit: buf[0],
            flags: RequestFlags::from_byte(buf[1]),
            phase,
            command_len: u32::from_be_bytes(buf[3..7].try_into()?),
            data_len: u32::from_be_bytes(buf[7..11].try_into()?),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SPI_HEADER_LEN);
        bytes.push(self.control_bit);
        bytes.push(self.flags.to_byte());
        bytes.push(match self.phase {
            Phase::Command => PHASE_COMMAND,
            Phase::Data => PHASE_DATA,
        });
        bytes.extend_from_slice(&self.command_len.to_be_bytes());
        bytes.extend_from_slice(&self.data_len.to_be_bytes());
        bytes
    }

    pub fn payload_len(&self) -> usize {
        self.command_len as usize + self.data_len as usize
    }
}

impl ResponseHeader {
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < RESPONSE_HEADER_LEN {
            return Err(anyhow::anyhow!("Buffer too short for response header"));
        }
        Ok(Self {
            control_bit: buf[0],
            success: buf[1],
            total_len: u32::from_be_bytes(buf[2..6].try_into()?),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(RESPONSE_HEADER_LEN);
        bytes.push(self.control_bit);
        bytes.push(self.success);
        bytes.extend_from_slice(&self.total_len.to_be_bytes());
        bytes
    }
}

#[derive(Debug)]
pub enum ProtocolCommand {
    /// A request with no bus transaction attached.
    Event { flags: RequestFlags },
    Spi { header: SpiHeader, payload: Vec<u8> },
    Unknown(u8),
}

#[derive(Debug)]
pub enum ProtocolResponse {
    Done { header: ResponseHeader, payload: Vec<u8> },
    Error(String),
}

impl ProtocolResponse {
    /// Bytes sent back to the host. Errors go out as an empty failure frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ProtocolResponse::Done { header, payload } => {
                let mut bytes = header.to_bytes();
                bytes.extend_from_slice(payload);
                bytes
            }
            ProtocolResponse::Error(_) => ResponseHeader {
                control_bit: CMD_RESP,
                success: 1,
                total_len: RESPONSE_HEADER_LEN as u32,
            }
            .to_bytes(),
        }
    }
}

pub struct ProtocolHandler;

impl ProtocolHandler {
    /// Parses one frame from the front of `buf`.
    ///
    /// Returns `None` until the whole frame has arrived, otherwise the
    /// command and the number of bytes it occupied.
    pub fn parse_command(buf: &[u8]) -> Result<Option<(ProtocolCommand, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        match buf[0] {
            CMD_EVENT => {
                if buf.len() < EVENT_HEADER_LEN {
                    return Ok(None);
                }
                let flags = RequestFlags::from_byte(buf[1]);
                Ok(Some((ProtocolCommand::Event { flags }, EVENT_HEADER_LEN)))
            }
            CMD_SPI => {
                if buf.len() < SPI_HEADER_LEN {
                    return Ok(None);
                }
                let header = SpiHeader::from_bytes(buf)?;
                let frame_len = SPI_HEADER_LEN + header.payload_len();
                if frame_len > MAX_FRAME_SIZE {
                    return Err(anyhow::anyhow!(
                        "Frame of {} bytes exceeds limit of {}",
                        frame_len,
                        MAX_FRAME_SIZE
                    ));
                }
                if buf.len() < frame_len {
                    return Ok(None);
                }
                let payload = buf[SPI_HEADER_LEN..frame_len].to_vec();
                Ok(Some((ProtocolCommand::Spi { header, payload }, frame_len)))
            }
            cmd => Ok(Some((ProtocolCommand::Unknown(cmd), 1))),
        }
    }

    pub fn create_response(payload: Vec<u8>) -> ProtocolResponse {
        let header = ResponseHeader {
            control_bit: CMD_RESP,
            success: 0,
            total_len: (RESPONSE_HEADER_LEN + payload.len()) as u32,
        };
        ProtocolResponse::Done { header, payload }
    }

    pub fn create_error_response(error: String) -> ProtocolResponse {
        ProtocolResponse::Error(error)
    }

    /// Encodes an SPI frame the way a host sends it.
    pub fn encode_spi(flags: RequestFlags, phase: Phase, command: &[u8], data: &[u8]) -> Vec<u8> {
        let header = SpiHeader {
            control_bit: CMD_SPI,
            flags,
            phase,
            command_len: command.len() as u32,
            data_len: data.len() as u32,
        };
        let mut bytes = header.to_bytes();
        bytes.extend_from_slice(command);
        bytes.extend_from_slice(data);
        bytes
    }

    pub fn encode_event(flags: RequestFlags) -> Vec<u8> {
        vec![CMD_EVENT, flags.to_byte()]
    }
}
