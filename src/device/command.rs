//! Actuator command frames.
//!
//! Frame format (written to the peripheral in one call):
//! ```text
//! ┌────────────┬────────────┐
//! │ actuator   │ duration   │
//! │ u8         │ u8         │
//! └────────────┴────────────┘
//! ```
//! Duration is in driver-defined units and is passed through untouched.

use crate::types::{Error, Result};

/// Size of one command frame on the wire.
pub const FRAME_SIZE: usize = 2;

/// Outputs the alarm driver can pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Actuator {
    RedLed = 0,
    GreenLed = 1,
    AmberLed = 2,
    Buzzer = 3,
}

impl TryFrom<u8> for Actuator {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Actuator::RedLed),
            1 => Ok(Actuator::GreenLed),
            2 => Ok(Actuator::AmberLed),
            3 => Ok(Actuator::Buzzer),
            other => Err(Error::validation(format!("unknown actuator selector: {}", other))),
        }
    }
}

/// Pulse one actuator for `duration` driver units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverCommand {
    pub actuator: Actuator,
    pub duration: u8,
}

impl DriverCommand {
    pub const fn new(actuator: Actuator, duration: u8) -> Self {
        Self { actuator, duration }
    }

    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        [self.actuator as u8, self.duration]
    }

    pub fn decode(frame: [u8; FRAME_SIZE]) -> Result<Self> {
        Ok(Self::new(Actuator::try_from(frame[0])?, frame[1]))
    }
}

/// Signalled after a code on the allow-list is scanned.
pub const GRANTED_SEQUENCE: [DriverCommand; 2] = [
    DriverCommand::new(Actuator::GreenLed, 100),
    DriverCommand::new(Actuator::Buzzer, 10),
];

/// Signalled after an unknown code is scanned.
pub const DENIED_SEQUENCE: [DriverCommand; 2] = [
    DriverCommand::new(Actuator::RedLed, 200),
    DriverCommand::new(Actuator::Buzzer, 200),
];

/// Signalled when the admin console changes the allow-list.
pub const ADMIN_ACK: DriverCommand = DriverCommand::new(Actuator::AmberLed, 200);
