//! Command validation and construction
//!
//! One builder per command kind. Builders validate against an immutable
//! device snapshot and return a [`Command`] ready for the codec; putting it
//! on the wire is the session's job, never done here.

use crate::device::Device;
use crate::error::{Error, Result};
use crate::types::{Command, ModuleId, PowerCommand};

/// Main flame lighting on/off/toggle
pub fn light_power(cmd: PowerCommand) -> Command {
    Command::LightPower(cmd)
}

/// Heater element on/off/toggle
pub fn heater_power(cmd: PowerCommand) -> Command {
    Command::HeaterPower(cmd)
}

/// Toggle the feature light.
///
/// Rejected once the fire has reported an inventory without a `light_box`;
/// before any inventory arrives the toggle is allowed through.
pub fn toggle_feature_light(device: &Device) -> Result<Command> {
    if let Some(inventory) = &device.inventory {
        if !inventory.feature_light {
            return Err(Error::Unsupported(
                "this fire has no feature light".to_string(),
            ));
        }
    }
    Ok(Command::FeatureLightToggle)
}

/// Set the brightness of one RGB strip, 0-255
pub fn set_light_brightness(device: &Device, module: ModuleId, brightness: i64) -> Result<Command> {
    let brightness = channel_value(device, module, brightness)?;
    Ok(Command::SetBrightness { module, brightness })
}

/// Set the animation speed of one RGB strip, 0-255
pub fn set_animation_speed(device: &Device, module: ModuleId, speed: i64) -> Result<Command> {
    let speed = channel_value(device, module, speed)?;
    Ok(Command::SetAnimationSpeed { module, speed })
}

/// Set the thermostat target.
///
/// The valid range depends on the unit the fire reports: [50, 90] °F or
/// [10, 33] °C. Until a unit has been seen there is nothing to validate
/// against, so the command is refused rather than guessing.
pub fn set_temperature(device: &Device, temp: i64) -> Result<Command> {
    let Some(unit) = device.unit else {
        return Err(Error::NotReady(
            "temperature unit not reported yet".to_string(),
        ));
    };

    let range = unit.valid_range();
    if !range.contains(&temp) {
        return Err(Error::InvalidArgument(format!(
            "{temp} is out of range, must be between {} and {} {unit}",
            range.start(),
            range.end()
        )));
    }

    Ok(Command::SetTemperature(temp))
}

/// Select a lighting effect by name, validated against the model's catalogue
pub fn set_effect(device: &Device, name: &str) -> Result<Command> {
    if device.configs.is_none() {
        return Err(Error::NotReady(
            "model configuration not reported yet".to_string(),
        ));
    }
    if !device.available_effects.iter().any(|effect| effect == name) {
        return Err(Error::Unsupported(format!(
            "effect {name:?} is not available on this fire"
        )));
    }
    Ok(Command::SetEffect(name.to_string()))
}

fn channel_value(device: &Device, module: ModuleId, value: i64) -> Result<u8> {
    if !device.has_module(module) {
        return Err(Error::InvalidArgument(format!(
            "rgb{module} is not a module on this fire"
        )));
    }
    u8::try_from(value).map_err(|_| {
        Error::InvalidArgument(format!("{value} is out of range, must be between 0 and 255"))
    })
}
