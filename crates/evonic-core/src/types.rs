//! Protocol types: commands going to the fire, events coming back

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::error::Error;

/// Identifier of one RGB strip, as embedded in the firmware's
/// `brightnessRGB<n>`/`speedRGB<n>` keys and `rgb set <n> ...` commands.
pub type ModuleId = u8;

/// State to request from a switchable feature (main light, heater)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerCommand {
    On,
    Off,
    Toggle,
}

impl FromStr for PowerCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "on" => Ok(PowerCommand::On),
            "off" => Ok(PowerCommand::Off),
            "toggle" => Ok(PowerCommand::Toggle),
            other => Err(Error::InvalidArgument(format!(
                "unknown power command {other:?}, must be one of 'on', 'off' or 'toggle'"
            ))),
        }
    }
}

/// Temperature unit the fire is configured for.
///
/// The unit is reported by the device, never chosen by the caller; target
/// temperatures are validated against the unit's range before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempUnit {
    Celsius,
    Fahrenheit,
}

impl TempUnit {
    /// Target temperatures the thermostat accepts in this unit
    pub fn valid_range(self) -> RangeInclusive<i64> {
        match self {
            TempUnit::Fahrenheit => 50..=90,
            TempUnit::Celsius => 10..=33,
        }
    }
}

impl fmt::Display for TempUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TempUnit::Celsius => write!(f, "°C"),
            TempUnit::Fahrenheit => write!(f, "°F"),
        }
    }
}

/// A validated one-shot outbound instruction.
///
/// Constructed by the builders in [`crate::command`], encoded by
/// [`crate::codec::encode`], written by the session, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LightPower(PowerCommand),
    FeatureLightToggle,
    HeaterPower(PowerCommand),
    SetEffect(String),
    SetBrightness { module: ModuleId, brightness: u8 },
    SetAnimationSpeed { module: ModuleId, speed: u8 },
    SetTemperature(i64),
}

/// Hardware the fire reports in its `modules` list: the RGB strips plus
/// capability flags for the feature light and thermostat control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInventory {
    /// Ids of the addressable RGB strips, ascending
    pub rgb: Vec<ModuleId>,
    /// Fire has a feature light (`light_box` entry)
    pub feature_light: bool,
    /// Fire has thermostat control (`temperature` entry)
    pub heating: bool,
}

/// One decoded inbound update: the changed attribute and its new value.
///
/// Events are consumed exactly once by [`crate::Device::apply`] and once by
/// the caller's observer; they are not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Reported module inventory
    Inventory(ModuleInventory),
    /// Model configuration id (`configs`), selects the effect catalogue
    ModelConfig(String),
    /// Product name
    Product(String),
    /// Temperature unit the fire is configured for
    TemperatureUnit(TempUnit),
    /// Measured room temperature
    CurrentTemperature(i64),
    /// Thermostat target temperature
    TargetTemperature(i64),
    /// Main flame lighting on/off
    MainLightPower(bool),
    /// Feature light on/off
    FeatureLightPower(bool),
    /// Heater element on/off
    HeaterPower(bool),
    /// Brightness of one RGB strip
    Brightness { module: ModuleId, value: u8 },
    /// Animation speed of one RGB strip
    AnimationSpeed { module: ModuleId, value: u8 },
    /// Active lighting effect
    Effect(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_command_from_str() {
        assert_eq!("on".parse::<PowerCommand>().unwrap(), PowerCommand::On);
        assert_eq!("off".parse::<PowerCommand>().unwrap(), PowerCommand::Off);
        assert_eq!(
            "toggle".parse::<PowerCommand>().unwrap(),
            PowerCommand::Toggle
        );
        assert!(matches!(
            "dim".parse::<PowerCommand>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unit_ranges() {
        assert!(TempUnit::Fahrenheit.valid_range().contains(&50));
        assert!(TempUnit::Fahrenheit.valid_range().contains(&90));
        assert!(!TempUnit::Fahrenheit.valid_range().contains(&91));
        assert!(TempUnit::Celsius.valid_range().contains(&10));
        assert!(TempUnit::Celsius.valid_range().contains(&33));
        assert!(!TempUnit::Celsius.valid_range().contains(&9));
    }
}
