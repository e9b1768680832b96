use super::{AddressingMode, BusConfig, BusHandle, I2CError, I2cModule, MAX_7BIT_ADDRESS};
use i2c_linux::I2c;
use log::debug;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fs::File,
    io::{Error, Read, Write},
    os::fd::AsRawFd,
    path::{Path, PathBuf},
};
use uuid::Uuid;

pub const DEFAULT_DEVICE_ROOT: &str = "/dev";
const EBUSY: i32 = 16;

// helper methods for interfacing with devices over I2C
pub fn write_register<T: Write + AsRawFd>(
    bus: &mut I2c<T>,
    register: &[u8],
    data: &[u8],
) -> Result<(), Error> {
    let mut frame = Vec::with_capacity(register.len() + data.len());
    frame.extend_from_slice(register);
    frame.extend_from_slice(data);
    bus.write_all(&frame)?;
    Ok(())
}

pub fn read_register<T: Read + Write + AsRawFd>(
    bus: &mut I2c<T>,
    register: &[u8],
    buf: &mut [u8],
) -> Result<(), Error> {
    bus.write_all(register)?;
    bus.read_exact(buf)?;
    Ok(())
}

fn sysfs_map_err(err: Error, default_err_msg: &str) -> I2CError {
    I2CError::HardwareError(format!("{}: {}", default_err_msg, err))
}

struct I2cInfo {
    bus_id: u8,
    device_address: u8,
    addressing_mode: AddressingMode,
    bus: I2c<File>,
}

/// I2C module backed by the `/dev/i2c-N` character devices.
pub struct SysfsI2cModule {
    device_root: PathBuf,
    owned_buses: Mutex<HashMap<Uuid, I2cInfo>>,
}

impl SysfsI2cModule {
    pub fn new<P: AsRef<Path>>(device_root: P) -> Self {
        SysfsI2cModule {
            device_root: device_root.as_ref().to_path_buf(),
            owned_buses: Mutex::new(HashMap::new()),
        }
    }

    fn device_path(&self, bus_id: u8) -> PathBuf {
        self.device_root.join(format!("i2c-{}", bus_id))
    }
}

impl Default for SysfsI2cModule {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_ROOT)
    }
}

impl I2cModule for SysfsI2cModule {
    fn name(&self) -> String {
        "i2c_sysfs".to_string()
    }

    fn request(&self, config: &BusConfig) -> Result<BusHandle, I2CError> {
        let bus_id = config.bus_id;
        let address = config.device_address;
        if address > MAX_7BIT_ADDRESS {
            return Err(I2CError::InvalidAddress(address as u16));
        }

        let mut owned_buses = self.owned_buses.lock();
        if owned_buses
            .values()
            .any(|info| info.bus_id == bus_id && info.device_address == address)
        {
            return Err(I2CError::ChannelBusy(bus_id));
        }

        let path = self.device_path(bus_id);
        if !path.exists() {
            return Err(I2CError::BusNotFound(bus_id));
        }

        let mut bus = I2c::from_path(&path)
            .map_err(|err| sysfs_map_err(err, &format!("Internal sysfs error while opening I2C bus {}", bus_id)))?;

        bus.smbus_set_slave_address(address as u16, false).map_err(|err| {
            if err.raw_os_error() == Some(EBUSY) {
                I2CError::DriverBound(bus_id, address)
            } else {
                sysfs_map_err(err, &format!("failed to select slave 0x{:02x} on I2C bus {}", address, bus_id))
            }
        })?;

        // i2c-dev has no per-client clock control, the adapter rate comes from the device tree
        debug!(
            "Opened {} for 0x{:02x}, requested {} Hz is left to the adapter",
            path.display(),
            address,
            config.bus_speed_hz
        );

        let lease_id = Uuid::new_v4();
        owned_buses.insert(
            lease_id,
            I2cInfo {
                bus_id,
                device_address: address,
                addressing_mode: config.addressing_mode,
                bus,
            },
        );
        Ok(BusHandle::new(lease_id))
    }

    fn read_register(&self, handle: &BusHandle, register: u16, length: u8) -> Result<Vec<u8>, I2CError> {
        if length == 0 {
            return Err(I2CError::InvalidConfig("register reads need a non-zero length".to_string()));
        }

        let mut owned_buses = self.owned_buses.lock();
        let info = owned_buses.get_mut(handle.lease_id()).ok_or(I2CError::LeaseNotFound)?;

        let index = info.addressing_mode.encode_register(register)?;
        let mut buf = vec![0u8; length as usize];
        read_register(&mut info.bus, &index, &mut buf).map_err(|err| {
            sysfs_map_err(err, &format!("failed to read register 0x{:04x} on I2C bus {}", register, info.bus_id))
        })?;
        Ok(buf)
    }

    fn write_register(&self, handle: &BusHandle, register: u16, data: &[u8], length: u8) -> Result<(), I2CError> {
        let length = length as usize;
        if length == 0 || length > data.len() {
            return Err(I2CError::InvalidConfig(format!(
                "write length {} does not fit a {} byte buffer",
                length,
                data.len()
            )));
        }

        let mut owned_buses = self.owned_buses.lock();
        let info = owned_buses.get_mut(handle.lease_id()).ok_or(I2CError::LeaseNotFound)?;

        let index = info.addressing_mode.encode_register(register)?;
        write_register(&mut info.bus, &index, &data[..length]).map_err(|err| {
            sysfs_map_err(err, &format!("failed to write register 0x{:04x} on I2C bus {}", register, info.bus_id))
        })
    }

    fn release(&self, handle: BusHandle) -> Result<(), I2CError> {
        match self.owned_buses.lock().remove(handle.lease_id()) {
            Some(info) => {
                debug!("Closed I2C bus {} lease {}", info.bus_id, handle.lease_id());
                Ok(())
            }
            None => Err(I2CError::LeaseNotFound),
        }
    }
}
