use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

pub const MAX_7BIT_ADDRESS: u8 = 0x7F;

// Module implementations
pub mod i2c_sysfs; // SysfsI2cModule

/// Width of the register index sent ahead of every register access.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Bit8,
    Bit16,
}

impl AddressingMode {
    pub fn encode_register(self, register: u16) -> Result<Vec<u8>, I2CError> {
        match self {
            AddressingMode::Bit8 => {
                let index = u8::try_from(register).map_err(|_| I2CError::InvalidRegister(register))?;
                Ok(vec![index])
            }
            AddressingMode::Bit16 => Ok(register.to_be_bytes().to_vec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BusConfig {
    pub bus_id: u8,
    pub bus_speed_hz: u32,
    pub addressing_mode: AddressingMode,
    pub device_address: u8,
}

/// Lease on one device of one bus, handed out by [`I2cModule::request`].
///
/// Not `Clone`: giving it back through [`I2cModule::release`] consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct BusHandle {
    lease_id: Uuid,
}

impl BusHandle {
    pub(crate) fn new(lease_id: Uuid) -> Self {
        BusHandle { lease_id }
    }

    pub fn lease_id(&self) -> &Uuid {
        &self.lease_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum I2CError {
    InvalidConfig(String),
    BusNotFound(u8),
    LeaseNotFound,
    InvalidAddress(u16),
    InvalidRegister(u16),
    ChannelBusy(u8),
    HardwareError(String),
    DriverBound(u8, u8),
}

impl I2CError {
    /// Numeric code printed next to failed bus operations.
    pub fn code(&self) -> i32 {
        match self {
            I2CError::InvalidConfig(_) => -1,
            I2CError::BusNotFound(_) => -2,
            I2CError::LeaseNotFound => -3,
            I2CError::InvalidAddress(_) => -4,
            I2CError::InvalidRegister(_) => -5,
            I2CError::ChannelBusy(_) => -6,
            I2CError::HardwareError(_) => -7,
            I2CError::DriverBound(_, _) => -8,
        }
    }
}

impl Display for I2CError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            I2CError::InvalidConfig(msg) => format!("invalid config: {}", msg),
            I2CError::BusNotFound(bus_id) => format!("I2C bus {} does not exist", bus_id),
            I2CError::LeaseNotFound => format!("specified I2C handle is not open"),
            I2CError::InvalidAddress(device_address) => format!("invalid slave address: {}", device_address),
            I2CError::InvalidRegister(register) => format!("register 0x{:04x} does not fit the addressing mode", register),
            I2CError::ChannelBusy(bus_id) => format!("I2C bus {} is busy", bus_id),
            I2CError::HardwareError(msg) => format!("hardware error: {}", msg),
            I2CError::DriverBound(bus_id, address) => {
                format!("address 0x{:02x} on I2C bus {} is claimed by a kernel driver", address, bus_id)
            }
        })
    }
}

impl std::error::Error for I2CError {}

/// Register-level access to one device at a time.
pub trait I2cModule {
    fn name(&self) -> String;
    fn request(&self, config: &BusConfig) -> Result<BusHandle, I2CError>;
    fn read_register(&self, handle: &BusHandle, register: u16, length: u8) -> Result<Vec<u8>, I2CError>;
    fn write_register(&self, handle: &BusHandle, register: u16, data: &[u8], length: u8) -> Result<(), I2CError>;
    fn release(&self, handle: BusHandle) -> Result<(), I2CError>;
}
