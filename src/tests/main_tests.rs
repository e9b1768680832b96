use crate::config::ConfigError;
use crate::cw2015::{TestError, EXPECTED_VERSION};
use crate::{exit_status, EXIT_FAILURE_CODE};

#[test]
fn success_exits_zero() {
    assert_eq!(exit_status(Ok(())), 0);
}

#[test]
fn failure_exits_minus_one() {
    let mismatch = TestError::VersionMismatch {
        expected: EXPECTED_VERSION,
        actual: 0x42,
    };
    assert_eq!(exit_status(Err(Box::new(mismatch))), EXIT_FAILURE_CODE);

    let config = ConfigError::InvalidEntry("bus_speed_hz must be greater than zero".to_string());
    assert_eq!(exit_status(Err(Box::new(config))), EXIT_FAILURE_CODE);

    assert_eq!(EXIT_FAILURE_CODE as i8, -1);
}
