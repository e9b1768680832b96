use crate::bus::{BusConfig, BusHandle, I2CError, I2cModule};
use crate::config::Configuration;
use crate::platform::{Platform, PlatformSource};
use log::{debug, error, info, warn};
use std::fmt::Display;

pub const CW2015_DEVICE_ADDRESS: u8 = 0x62;
pub const CW2015_BUS_SPEED_HZ: u32 = 2000;

pub const REG_VERSION: u16 = 0x0;
pub const REG_CONFIG: u16 = 0x8;

pub const EXPECTED_VERSION: u8 = 0x6F;
pub const CONFIG_TEST_VALUE: u8 = 0xFF;

const TEST_NAME: &str = "i2c_test_cw2015";
const KERNEL_DRIVER: &str = "cw201x";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStep {
    Request,
    ReadVersion,
    ReadConfig,
    WriteConfig,
    ReadBackConfig,
    Release,
}

impl Display for TestStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TestStep::Request => "request",
            TestStep::ReadVersion => "read version register",
            TestStep::ReadConfig => "read configuration register",
            TestStep::WriteConfig => "write configuration register",
            TestStep::ReadBackConfig => "read back configuration register",
            TestStep::Release => "release",
        })
    }
}

#[derive(Debug, PartialEq)]
pub enum TestError {
    Io { step: TestStep, error: I2CError },
    VersionMismatch { expected: u8, actual: u8 },
}

impl Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&match self {
            TestError::Io { step, error } => format!("{} failed ({}): {}", step, error.code(), error),
            TestError::VersionMismatch { expected, actual } => format!(
                "wrong chip version, expected 0x{:02x}, got 0x{:02x}",
                expected, actual
            ),
        })
    }
}

impl std::error::Error for TestError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    Idle,
    Acquired,
    RegistersValidated,
    Failed,
    Released,
    Done,
}

/// Register values observed during a run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TestReport {
    pub version: Option<u8>,
    pub config_before: Option<u8>,
    pub config_after: Option<u8>,
}

/// One pass of the CW2015 register check against a single bus/address.
pub struct Cw2015Test<'a, B: I2cModule + ?Sized> {
    bus: &'a B,
    config: BusConfig,
    state: TestState,
    report: TestReport,
}

impl<'a, B: I2cModule + ?Sized> Cw2015Test<'a, B> {
    pub fn new(bus: &'a B, config: BusConfig) -> Self {
        Cw2015Test {
            bus,
            config,
            state: TestState::Idle,
            report: TestReport::default(),
        }
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    pub fn report(&self) -> &TestReport {
        &self.report
    }

    pub fn run(&mut self) -> Result<TestReport, TestError> {
        info!("TEST: {} starting", TEST_NAME);
        let result = self.run_sequence();
        self.transition(TestState::Done);

        match &result {
            Ok(_) => info!("TEST: {} succeeded", TEST_NAME),
            Err(_) => info!("TEST: {} failed", TEST_NAME),
        }

        result
    }

    fn transition(&mut self, next: TestState) {
        debug!("{}: {:?} -> {:?}", TEST_NAME, self.state, next);
        self.state = next;
    }

    fn run_sequence(&mut self) -> Result<TestReport, TestError> {
        let handle = match self.bus.request(&self.config) {
            Ok(handle) => handle,
            Err(error) => {
                error!(
                    "Failed to request I2C {}@0x{:02x} ({})",
                    self.config.bus_id,
                    self.config.device_address,
                    error.code()
                );
                if let Some(hint) = driver_unbind_hint(&error) {
                    warn!("Unbind the kernel driver first: {}", hint);
                }
                return Err(TestError::Io { step: TestStep::Request, error });
            }
        };
        self.transition(TestState::Acquired);

        let outcome = self.exercise_registers(&handle);
        self.transition(match outcome {
            Ok(_) => TestState::RegistersValidated,
            Err(_) => TestState::Failed,
        });

        let released = self.bus.release(handle);
        self.transition(TestState::Released);
        if let Err(error) = released {
            error!(
                "Failed to release I2C {}@0x{:02x} ({})",
                self.config.bus_id,
                self.config.device_address,
                error.code()
            );
            return Err(TestError::Io { step: TestStep::Release, error });
        }

        outcome.map(|_| self.report.clone())
    }

    // I/O errors return early; a version mismatch only sets the outcome
    fn exercise_registers(&mut self, handle: &BusHandle) -> Result<(), TestError> {
        info!("Reading version register...");
        let version = self.read_byte(handle, TestStep::ReadVersion, REG_VERSION)?;
        self.report.version = Some(version);

        let mut outcome = Ok(());
        if version != EXPECTED_VERSION {
            error!(
                "{}: Wrong chip version read, expected 0x{:02x}, got 0x{:02x}",
                TEST_NAME, EXPECTED_VERSION, version
            );
            outcome = Err(TestError::VersionMismatch {
                expected: EXPECTED_VERSION,
                actual: version,
            });
        } else {
            info!("CW2015 version: 0x{:02x}", version);
        }

        info!("Reading configuration register...");
        self.report.config_before = Some(self.read_byte(handle, TestStep::ReadConfig, REG_CONFIG)?);

        info!("Writing configuration register...");
        self.bus
            .write_register(handle, REG_CONFIG, &[CONFIG_TEST_VALUE], 1)
            .map_err(|error| self.io_failure("write", TestStep::WriteConfig, REG_CONFIG, error))?;
        info!("OK");

        // logged only, the written value is not asserted
        info!("Reading configuration register...");
        self.report.config_after = Some(self.read_byte(handle, TestStep::ReadBackConfig, REG_CONFIG)?);

        outcome
    }

    fn read_byte(&self, handle: &BusHandle, step: TestStep, register: u16) -> Result<u8, TestError> {
        let data = self
            .bus
            .read_register(handle, register, 1)
            .map_err(|error| self.io_failure("read", step, register, error))?;

        let value = match data.first() {
            Some(value) => *value,
            None => {
                let error = I2CError::HardwareError("register read returned no data".to_string());
                return Err(self.io_failure("read", step, register, error));
            }
        };

        info!("OK - val=0x{:02x}", value);
        Ok(value)
    }

    fn io_failure(&self, action: &str, step: TestStep, register: u16, error: I2CError) -> TestError {
        error!(
            "Failed to {} I2C {}@0x{:02x} register 0x{:04x} ({})",
            action,
            self.config.bus_id,
            self.config.device_address,
            register,
            error.code()
        );
        TestError::Io { step, error }
    }
}

/// Shell command that frees the gauge address, only when a kernel driver holds it.
pub fn driver_unbind_hint(error: &I2CError) -> Option<String> {
    match error {
        I2CError::DriverBound(bus_id, address) => Some(format!(
            "echo {}-{:04x} > /sys/bus/i2c/drivers/{}/unbind",
            bus_id, address, KERNEL_DRIVER
        )),
        _ => None,
    }
}

/// Runs the register check when the board carries a CW2015, skips it otherwise.
///
/// Returns the report of the run, or `None` when the platform was skipped.
pub fn test_platform<B: I2cModule + ?Sized>(
    platform_source: &dyn PlatformSource,
    bus: &B,
    configuration: &Configuration,
) -> Result<Option<TestReport>, TestError> {
    let platform = platform_source.get_current_platform();
    let bus_id = match platform.bus_id() {
        Some(bus_id) => bus_id,
        None => {
            info!(
                "Platform {} is not one of {}, skipping {}",
                platform,
                Platform::known()
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                TEST_NAME
            );
            return Ok(None);
        }
    };

    debug!("Testing {} on {} bus {} via {}", TEST_NAME, platform, bus_id, bus.name());
    let mut test = Cw2015Test::new(bus, configuration.bus_config(bus_id));
    let result = test.run();

    let report = test.report();
    debug!(
        "{}: version {:02x?}, config {:02x?} -> {:02x?}",
        TEST_NAME, report.version, report.config_before, report.config_after
    );
    result.map(Some)
}
