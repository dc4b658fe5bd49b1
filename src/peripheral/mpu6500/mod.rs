//! InvenSense MPU-6500 six-axis IMU, seen from its SPI port.
//!
//! The first byte of a transmission is the register address, with bit 7
//! selecting a read. Every following byte reads or writes the current
//! register and then advances it, so bursts walk the register file.
//! Sensor outputs come from injected samples instead of real motion.

use log::{debug, warn};

use super::Peripheral;
use crate::transaction::{Request, SpiTransaction, TransactionError};

pub mod registers;

use registers::{
    describe, Register, ADDRESS_MASK, PWR_MGMT_1_RESET, READ_FLAG, REGISTER_COUNT, WHO_AM_I_VALUE,
};

const ACCEL_OUT: std::ops::RangeInclusive<u8> = 0x3b..=0x40;
const TEMP_OUT: std::ops::RangeInclusive<u8> = 0x41..=0x42;
const GYRO_OUT: std::ops::RangeInclusive<u8> = 0x43..=0x48;

/// 1 g on the Z axis at the default ±2 g full scale.
const DEFAULT_ACCELERATION: [i16; 3] = [0, 0, 16384];
/// Roughly room temperature in raw sensor units.
const DEFAULT_TEMPERATURE_RAW: i16 = 8500;

pub struct Mpu6500 {
    registers: [u8; REGISTER_COUNT],
    current_register: u8,
    is_read_operation: bool,
    is_first_byte: bool,
    acceleration: [i16; 3],
    angular_rate: [i16; 3],
    temperature_raw: i16,
}

impl Mpu6500 {
    pub fn new() -> Self {
        let mut device = Self {
            registers: [0; REGISTER_COUNT],
            current_register: 0,
            is_read_operation: false,
            is_first_byte: true,
            acceleration: DEFAULT_ACCELERATION,
            angular_rate: [0; 3],
            temperature_raw: DEFAULT_TEMPERATURE_RAW,
        };
        device.reset_registers();
        device
    }

    fn reset_registers(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.registers[Register::WhoAmI.address() as usize] = WHO_AM_I_VALUE;
        self.registers[Register::PowerManagement1.address() as usize] = PWR_MGMT_1_RESET;
        self.current_register = 0;
        self.is_read_operation = false;
        self.is_first_byte = true;
    }

    /// Raw accelerometer output for X, Y and Z.
    pub fn set_acceleration(&mut self, x: i16, y: i16, z: i16) {
        self.acceleration = [x, y, z];
    }

    /// Raw gyroscope output for X, Y and Z.
    pub fn set_angular_rate(&mut self, x: i16, y: i16, z: i16) {
        self.angular_rate = [x, y, z];
    }

    pub fn set_temperature_raw(&mut self, raw: i16) {
        self.temperature_raw = raw;
    }

    /// Exchanges one byte on the bus and returns the device's answer.
    pub fn transmit(&mut self, data: u8) -> u8 {
        if self.is_first_byte {
            self.current_register = data & ADDRESS_MASK;
            self.is_read_operation = data & READ_FLAG != 0;
            self.is_first_byte = false;

            debug!(
                "SPI operation: {} register {}",
                if self.is_read_operation { "Read" } else { "Write" },
                describe(self.current_register)
            );
            return 0x00;
        }

        let address = self.current_register;
        self.current_register = self.current_register.wrapping_add(1);

        if self.is_read_operation {
            self.read_register(address)
        } else {
            self.write_register(address, data);
            0x00
        }
    }

    /// Chip select released; the next byte is an address again.
    pub fn finish_transmission(&mut self) {
        self.is_first_byte = true;
        debug!("SPI transmission finished");
    }

    pub fn read_register(&self, address: u8) -> u8 {
        if ACCEL_OUT.contains(&address) {
            return sample_byte(&self.acceleration, address - ACCEL_OUT.start());
        }
        if TEMP_OUT.contains(&address) {
            return sample_byte(&[self.temperature_raw], address - TEMP_OUT.start());
        }
        if GYRO_OUT.contains(&address) {
            return sample_byte(&self.angular_rate, address - GYRO_OUT.start());
        }
        if address == Register::WhoAmI.address() {
            return WHO_AM_I_VALUE;
        }

        match self.registers.get(address as usize) {
            Some(value) => *value,
            None => {
                warn!("Reading from undefined register {}", describe(address));
                0x00
            }
        }
    }

    pub fn write_register(&mut self, address: u8, value: u8) {
        if let Some(register) = Register::from_address(address) {
            if register.is_read_only() {
                warn!("Ignoring write to read-only register {:?}: 0x{:02x}", register, value);
                return;
            }
        }

        match self.registers.get_mut(address as usize) {
            Some(slot) => {
                *slot = value;
                debug!("Write to register {}: 0x{:02x}", describe(address), value);
            }
            None => warn!("Writing to undefined register {}", describe(address)),
        }
    }

    fn feed_command(&mut self, transaction: &dyn SpiTransaction) -> Result<(), TransactionError> {
        let command = transaction.read_bytes(0, transaction.command_length())?;
        for byte in command {
            self.transmit(byte);
        }
        Ok(())
    }

    fn exchange_data(&mut self, transaction: &mut dyn SpiTransaction) -> Result<(), TransactionError> {
        if self.is_first_byte {
            self.feed_command(transaction)?;
        }

        let offset = transaction.command_length();
        let data = transaction.read_bytes(offset, transaction.data_length())?;
        let response: Vec<u8> = data.into_iter().map(|byte| self.transmit(byte)).collect();
        transaction.write_bytes(offset, &response)
    }
}

impl Default for Mpu6500 {
    fn default() -> Self {
        Self::new()
    }
}

/// Big-endian byte `index` of a run of 16-bit samples.
fn sample_byte(samples: &[i16], index: u8) -> u8 {
    let index = index as usize;
    let bytes = samples[index / 2].to_be_bytes();
    bytes[index % 2]
}

impl Peripheral for Mpu6500 {
    fn name(&self) -> &str {
        "mpu6500"
    }

    fn reset(&mut self) {
        self.reset_registers();
    }

    fn handle(&mut self, request: &mut Request<'_>) -> Result<(), TransactionError> {
        if request.is_pure_init() {
            self.reset();
            return Ok(());
        }

        let Some(transaction) = request.spi_transaction_mut() else {
            return Ok(());
        };

        if transaction.is_command() {
            self.is_first_byte = true;
            self.feed_command(transaction)?;
        } else if transaction.is_data() {
            let result = self.exchange_data(transaction);
            // address phase re-arms on every exit
            self.finish_transmission();
            result?;
        }

        Ok(())
    }
}
