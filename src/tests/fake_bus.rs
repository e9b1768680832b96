use crate::bus::{BusConfig, BusHandle, I2CError, I2cModule};
use crate::platform::{Platform, PlatformSource};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Request(u8, u8),
    Read(u16),
    Write(u16, Vec<u8>),
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeOp {
    Request,
    Read(u16),
    Write(u16),
    Release,
}

pub struct FakeBus {
    registers: Mutex<HashMap<u16, u8>>,
    failures: HashMap<FakeOp, I2CError>,
    lease: Mutex<Option<Uuid>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBus {
    pub fn new() -> Self {
        FakeBus {
            registers: Mutex::new(HashMap::new()),
            failures: HashMap::new(),
            lease: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_register(self, register: u16, value: u8) -> Self {
        self.registers.lock().insert(register, value);
        self
    }

    pub fn fail_on(mut self, op: FakeOp, error: I2CError) -> Self {
        self.failures.insert(op, error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn release_count(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Release).count()
    }

    pub fn is_leased(&self) -> bool {
        self.lease.lock().is_some()
    }

    fn check(&self, op: FakeOp) -> Result<(), I2CError> {
        match self.failures.get(&op) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn check_lease(&self, handle: &BusHandle) -> Result<(), I2CError> {
        match *self.lease.lock() {
            Some(ref id) if id == handle.lease_id() => Ok(()),
            _ => Err(I2CError::LeaseNotFound),
        }
    }
}

impl I2cModule for FakeBus {
    fn name(&self) -> String {
        "fake".to_string()
    }

    fn request(&self, config: &BusConfig) -> Result<BusHandle, I2CError> {
        self.calls.lock().push(Call::Request(config.bus_id, config.device_address));
        self.check(FakeOp::Request)?;

        let mut lease = self.lease.lock();
        if lease.is_some() {
            return Err(I2CError::ChannelBusy(config.bus_id));
        }

        let id = Uuid::new_v4();
        *lease = Some(id);
        Ok(BusHandle::new(id))
    }

    fn read_register(&self, handle: &BusHandle, register: u16, length: u8) -> Result<Vec<u8>, I2CError> {
        self.calls.lock().push(Call::Read(register));
        self.check_lease(handle)?;
        self.check(FakeOp::Read(register))?;

        let value = self.registers.lock().get(&register).copied().unwrap_or(0);
        Ok(vec![value; length as usize])
    }

    fn write_register(&self, handle: &BusHandle, register: u16, data: &[u8], length: u8) -> Result<(), I2CError> {
        let data = &data[..length as usize];
        self.calls.lock().push(Call::Write(register, data.to_vec()));
        self.check_lease(handle)?;
        self.check(FakeOp::Write(register))?;

        self.registers.lock().insert(register, data[0]);
        Ok(())
    }

    fn release(&self, handle: BusHandle) -> Result<(), I2CError> {
        self.calls.lock().push(Call::Release);
        self.check_lease(&handle)?;
        self.check(FakeOp::Release)?;

        *self.lease.lock() = None;
        Ok(())
    }
}

pub struct FakePlatform(pub Platform);

impl PlatformSource for FakePlatform {
    fn get_current_platform(&self) -> Platform {
        self.0
    }
}
