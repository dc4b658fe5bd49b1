//! MPU-6500 register map (Register Map and Descriptions, rev 2.1).

pub const REGISTER_COUNT: usize = 128;

pub const WHO_AM_I_VALUE: u8 = 0x70;
pub const PWR_MGMT_1_RESET: u8 = 0x41;

/// Bit 7 of the address byte selects a read.
pub const READ_FLAG: u8 = 0x80;
pub const ADDRESS_MASK: u8 = 0x7f;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    SampleRateDivider = 0x19,
    Configuration = 0x1a,
    GyroConfiguration = 0x1b,
    AccelConfiguration = 0x1c,
    AccelXOutHigh = 0x3b,
    AccelXOutLow = 0x3c,
    AccelYOutHigh = 0x3d,
    AccelYOutLow = 0x3e,
    AccelZOutHigh = 0x3f,
    AccelZOutLow = 0x40,
    TempOutHigh = 0x41,
    TempOutLow = 0x42,
    GyroXOutHigh = 0x43,
    GyroXOutLow = 0x44,
    GyroYOutHigh = 0x45,
    GyroYOutLow = 0x46,
    GyroZOutHigh = 0x47,
    GyroZOutLow = 0x48,
    PowerManagement1 = 0x6b,
    PowerManagement2 = 0x6c,
    WhoAmI = 0x75,
}

impl Register {
    pub fn from_address(address: u8) -> Option<Self> {
        use Register::*;
        let register = match address {
            0x19 => SampleRateDivider,
            0x1a => Configuration,
            0x1b => GyroConfiguration,
            0x1c => AccelConfiguration,
            0x3b => AccelXOutHigh,
            0x3c => AccelXOutLow,
            0x3d => AccelYOutHigh,
            0x3e => AccelYOutLow,
            0x3f => AccelZOutHigh,
            0x40 => AccelZOutLow,
            0x41 => TempOutHigh,
            0x42 => TempOutLow,
            0x43 => GyroXOutHigh,
            0x44 => GyroXOutLow,
            0x45 => GyroYOutHigh,
            0x46 => GyroYOutLow,
            0x47 => GyroZOutHigh,
            0x48 => GyroZOutLow,
            0x6b => PowerManagement1,
            0x6c => PowerManagement2,
            0x75 => WhoAmI,
            _ => return None,
        };
        Some(register)
    }

    pub fn address(self) -> u8 {
        self as u8
    }

    /// Sensor outputs and the identity register ignore writes.
    pub fn is_read_only(self) -> bool {
        matches!(self.address(), 0x3b..=0x48 | 0x75)
    }
}

/// Formats an address for log lines, by name when the map knows it.
pub fn describe(address: u8) -> String {
    match Register::from_address(address) {
        Some(register) => format!("{:?}", register),
        None => format!("0x{:02x}", address),
    }
}
