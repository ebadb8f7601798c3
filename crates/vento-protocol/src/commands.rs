//! Unit-level commands and the parameter writes they map to.

use crate::constants::*;
use crate::params::{SpeedLevel, VentilationMode};
use crate::types::{CommandRequest, ParameterList};

/// Commands that can be sent to a ventilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanCommand {
    /// Read power, speed and ventilation mode.
    ReadStatus,

    /// Switch the unit on.
    TurnOn,

    /// Switch the unit off.
    TurnOff,

    /// Set a discrete speed level.
    SetSpeed(SpeedLevel),

    /// Set the speed from a percentage, rounded into a level bucket.
    SetPercentage(u16),

    /// Set the ventilation mode.
    SetVentilationMode(VentilationMode),

    /// Toggle heat recovery. Off falls back to plain ventilation.
    SetHeatRecovery(bool),
}

impl FanCommand {
    /// Build the request for this command.
    pub fn to_request(&self) -> CommandRequest {
        match self {
            FanCommand::ReadStatus => CommandRequest::read(&[
                PARAM_UNIT_ON_OFF,
                PARAM_SPEED_NUMBER,
                PARAM_VENTILATION_MODE,
            ]),

            FanCommand::TurnOn => write_one(PARAM_UNIT_ON_OFF, 1),

            FanCommand::TurnOff => write_one(PARAM_UNIT_ON_OFF, 0),

            FanCommand::SetSpeed(level) => write_one(PARAM_SPEED_NUMBER, level.level()),

            FanCommand::SetPercentage(percentage) => write_one(
                PARAM_SPEED_NUMBER,
                SpeedLevel::from_percentage(*percentage).level(),
            ),

            FanCommand::SetVentilationMode(mode) => {
                write_one(PARAM_VENTILATION_MODE, u8::from(*mode))
            }

            FanCommand::SetHeatRecovery(enabled) => {
                let mode = if *enabled {
                    VentilationMode::HeatRecovery
                } else {
                    VentilationMode::Ventilation
                };
                write_one(PARAM_VENTILATION_MODE, u8::from(mode))
            }
        }
    }
}

fn write_one(id: u8, value: u8) -> CommandRequest {
    CommandRequest::write(ParameterList::new().with(id, value))
}
