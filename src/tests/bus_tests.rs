use crate::bus::i2c_sysfs::SysfsI2cModule;
use crate::bus::{AddressingMode, BusConfig, BusHandle, I2CError, I2cModule};
use std::env;
use uuid::Uuid;

fn missing_root() -> std::path::PathBuf {
    env::temp_dir().join(format!("cw2015-missing-{}", Uuid::new_v4()))
}

fn bus_config(bus_id: u8, device_address: u8) -> BusConfig {
    BusConfig {
        bus_id,
        bus_speed_hz: 2000,
        addressing_mode: AddressingMode::Bit8,
        device_address,
    }
}

#[test]
fn encode_register_8bit() {
    assert_eq!(AddressingMode::Bit8.encode_register(0x08), Ok(vec![0x08]));
    assert_eq!(AddressingMode::Bit8.encode_register(0xFF), Ok(vec![0xFF]));
    assert_eq!(
        AddressingMode::Bit8.encode_register(0x100),
        Err(I2CError::InvalidRegister(0x100))
    );
}

#[test]
fn encode_register_16bit() {
    assert_eq!(AddressingMode::Bit16.encode_register(0x08), Ok(vec![0x00, 0x08]));
    assert_eq!(AddressingMode::Bit16.encode_register(0x1234), Ok(vec![0x12, 0x34]));
}

#[test]
fn error_codes_are_distinct() {
    let errors = [
        I2CError::InvalidConfig(String::new()),
        I2CError::BusNotFound(0),
        I2CError::LeaseNotFound,
        I2CError::InvalidAddress(0),
        I2CError::InvalidRegister(0),
        I2CError::ChannelBusy(0),
        I2CError::HardwareError(String::new()),
        I2CError::DriverBound(0, 0),
    ];

    let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
    assert!(codes.iter().all(|c| *c < 0));
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), errors.len());
}

#[test]
fn request_missing_bus() {
    let module = SysfsI2cModule::new(missing_root());
    assert_eq!(
        module.request(&bus_config(1, 0x62)),
        Err(I2CError::BusNotFound(1))
    );
}

#[test]
fn request_rejects_8bit_address() {
    let module = SysfsI2cModule::new(missing_root());
    assert_eq!(
        module.request(&bus_config(1, 0xC4)),
        Err(I2CError::InvalidAddress(0xC4))
    );
}

#[test]
fn unknown_lease() {
    let module = SysfsI2cModule::new(missing_root());

    let handle = BusHandle::new(Uuid::new_v4());
    assert_eq!(module.read_register(&handle, 0x0, 1), Err(I2CError::LeaseNotFound));
    assert_eq!(
        module.write_register(&handle, 0x8, &[0xFF], 1),
        Err(I2CError::LeaseNotFound)
    );
    assert_eq!(module.release(handle), Err(I2CError::LeaseNotFound));
}

#[test]
fn invalid_access_lengths() {
    let module = SysfsI2cModule::new(missing_root());

    let handle = BusHandle::new(Uuid::new_v4());
    assert!(matches!(
        module.read_register(&handle, 0x0, 0),
        Err(I2CError::InvalidConfig(_))
    ));
    assert!(matches!(
        module.write_register(&handle, 0x8, &[0xFF], 2),
        Err(I2CError::InvalidConfig(_))
    ));
}
