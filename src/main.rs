mod bus;
mod config;
mod cw2015;
mod platform;

#[cfg(test)]
mod tests;

use bus::i2c_sysfs::SysfsI2cModule;
use config::Configuration;
use log::{error, LevelFilter};
use platform::DeviceTreePlatform;
use simple_logger::SimpleLogger;
use std::{error::Error, process::ExitCode};

// -1 as seen by the parent process
const EXIT_FAILURE_CODE: u8 = 255;

fn run() -> Result<(), Box<dyn Error>> {
    let configuration = Configuration::load()?;
    let module = SysfsI2cModule::new(&configuration.device_root);
    cw2015::test_platform(&DeviceTreePlatform::new(), &module, &configuration)?;
    Ok(())
}

fn exit_status(result: Result<(), Box<dyn Error>>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) => {
            error!("cw2015_i2c_test: {}", e);
            EXIT_FAILURE_CODE
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Info).env().init() {
        eprintln!("Failed to initialize logger: {}", e);
    }

    ExitCode::from(exit_status(run()))
}
