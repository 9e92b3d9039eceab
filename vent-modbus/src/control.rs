use std::ops::RangeInclusive;

use log::{info, warn};

use crate::{ControlError, FanMode, SharedBus, FAN_MODE_REGISTER};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ControlStats {
    pub writes_issued: u64,
    pub writes_failed: u64,
    pub rejected: u64,
}

/// Applies actuator commands to a single holding register.
pub struct ControlChannel {
    bus: SharedBus,
    register: u16,
    accepted: RangeInclusive<u16>,
    stats: ControlStats,
}

impl ControlChannel {
    pub fn new(bus: SharedBus, register: u16, accepted: RangeInclusive<u16>) -> Self {
        Self {
            bus,
            register,
            accepted,
            stats: ControlStats::default(),
        }
    }

    /// The fan mode actuator of a DV10 unit.
    pub fn fan_mode(bus: SharedBus) -> Self {
        Self::new(bus, FAN_MODE_REGISTER, FanMode::ACCEPTED)
    }

    pub fn register(&self) -> u16 {
        self.register
    }

    pub fn stats(&self) -> ControlStats {
        self.stats
    }

    /// Validate `code` and write it with a single transaction.
    ///
    /// The write outcome is returned as reported by the bus.
    pub async fn set_actuator(&mut self, code: u16) -> Result<(), ControlError> {
        if !self.accepted.contains(&code) {
            self.stats.rejected += 1;
            warn!(
                "Rejected actuator command. code={code} accepted={:?}",
                self.accepted
            );
            return Err(ControlError::InvalidCommand(code));
        }

        self.stats.writes_issued += 1;
        let result = {
            let mut bus = self.bus.lock().await;
            bus.write_register(self.register, code).await
        };

        match result {
            Ok(()) => {
                match FanMode::try_from(code) {
                    Ok(mode) if self.register == FAN_MODE_REGISTER => {
                        info!("Fan mode set. mode={}", mode.describe())
                    }
                    _ => info!("Actuator set. register={} code={code}", self.register),
                }
                Ok(())
            }
            Err(e) => {
                self.stats.writes_failed += 1;
                warn!(
                    "Actuator write failed. register={} code={code} error={e}",
                    self.register
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mock::MockTransceiver, Bus, DeviceError};

    #[tokio::test]
    async fn out_of_range_code_issues_no_write() {
        let mock = MockTransceiver::new();
        let mut control = ControlChannel::fan_mode(Bus::new(mock.clone()).shared());

        assert_eq!(
            control.set_actuator(4).await,
            Err(ControlError::InvalidCommand(4))
        );
        assert!(mock.writes().is_empty());
        assert_eq!(control.stats().rejected, 1);
    }

    #[tokio::test]
    async fn accepted_codes_write_once_each() {
        let mock = MockTransceiver::new();
        let mut control = ControlChannel::fan_mode(Bus::new(mock.clone()).shared());

        for code in 0..=3 {
            assert_eq!(control.set_actuator(code).await, Ok(()));
        }
        assert_eq!(
            mock.writes(),
            vec![(367, 0), (367, 1), (367, 2), (367, 3)]
        );
        assert_eq!(control.stats().writes_issued, 4);
    }

    #[tokio::test]
    async fn write_failure_is_reported_verbatim() {
        let mock = MockTransceiver::new();
        mock.fail_writes(Some(DeviceError::SlaveDeviceFailure));
        let mut control = ControlChannel::fan_mode(Bus::new(mock.clone()).shared());

        assert_eq!(
            control.set_actuator(2).await,
            Err(ControlError::Device(DeviceError::SlaveDeviceFailure))
        );
        assert_eq!(mock.writes().len(), 1);
        assert_eq!(
            control.stats(),
            ControlStats {
                writes_issued: 1,
                writes_failed: 1,
                rejected: 0
            }
        );
    }
}
