use crate::transaction::{Request, TransactionError};

pub mod echo;
pub mod mpu6500;

#[cfg(test)]
pub(crate) mod testing;

pub use echo::EchoPeripheral;
pub use mpu6500::Mpu6500;

/// A simulated device addressed by the host.
///
/// `handle` runs once per access event. Errors only come from the host's
/// transaction accessors and are passed through untouched.
pub trait Peripheral: Send {
    fn name(&self) -> &str;

    fn handle(&mut self, request: &mut Request<'_>) -> Result<(), TransactionError>;

    fn reset(&mut self) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum DeviceKind {
    /// Logs every exchange and echoes data bytes back
    Echo,
    /// InvenSense MPU-6500 IMU register model
    Mpu6500,
}

impl DeviceKind {
    pub fn build(self) -> Box<dyn Peripheral> {
        match self {
            DeviceKind::Echo => Box::new(EchoPeripheral::new()),
            DeviceKind::Mpu6500 => Box::new(Mpu6500::new()),
        }
    }
}
