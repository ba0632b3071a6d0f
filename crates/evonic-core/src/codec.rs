//! Evonic Wire Codec
//!
//! One JSON text frame per WebSocket message, both directions. Outbound
//! commands use the firmware's `voice`/`cmd` envelopes; inbound status frames
//! are flat JSON objects carrying any subset of the known attribute keys.
//! This module is the only place the wire format is known.

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::types::{Command, Event, ModuleId, ModuleInventory, PowerCommand, TempUnit};

// ============================================================================
// ENCODING
// ============================================================================

/// Encode one validated command into the exact text payload the fire expects.
///
/// Deterministic, no I/O. Fails only on programmer-error inputs that escaped
/// the command builders.
pub fn encode(command: &Command) -> Result<String> {
    let payload = match command {
        Command::LightPower(cmd) => json!({ "voice": voice_power("Fire", *cmd) }),
        Command::HeaterPower(cmd) => json!({ "voice": voice_power("Heater", *cmd) }),
        Command::FeatureLightToggle => json!({ "voice": "Light_box" }),
        Command::SetEffect(name) => json!({ "voice": name }),
        Command::SetBrightness { module, brightness } => {
            json!({ "cmd": format!("rgb set {module} - - {brightness} -") })
        }
        Command::SetAnimationSpeed { module, speed } => {
            json!({ "cmd": format!("rgb set {module} - {speed} - -") })
        }
        Command::SetTemperature(level) => json!({ "cmd": format!("templevel {level}") }),
    };

    serde_json::to_string(&payload).map_err(|e| Error::Encode(e.to_string()))
}

/// `Fire_ON` / `Fire_OFF` / `Fire_ON/OFF` style voice command
fn voice_power(target: &str, cmd: PowerCommand) -> String {
    match cmd {
        PowerCommand::On => format!("{target}_ON"),
        PowerCommand::Off => format!("{target}_OFF"),
        PowerCommand::Toggle => format!("{target}_ON/OFF"),
    }
}

// ============================================================================
// DECODING
// ============================================================================

/// Decode one inbound frame into zero or more events.
///
/// Unknown keys are ignored, so a frame may legitimately produce no events.
/// Events come out in a fixed order (inventory and unit before plain values)
/// so that a single full-status frame applies cleanly to an empty snapshot.
pub fn decode(raw: &str) -> Result<Vec<Event>> {
    let value: Value = serde_json::from_str(raw).map_err(|e| Error::Decode(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(Error::Decode("frame is not a JSON object".to_string()));
    };

    let mut events = Vec::new();

    if let Some(value) = fields.get("modules") {
        events.push(Event::Inventory(decode_inventory(value)?));
    }
    if let Some(value) = fields.get("configs") {
        events.push(Event::ModelConfig(decode_str("configs", value)?));
    }
    if let Some(value) = fields.get("product") {
        events.push(Event::Product(decode_str("product", value)?));
    }
    if let Some(value) = fields.get("fahrenheit") {
        let unit = if decode_bool("fahrenheit", value)? {
            TempUnit::Fahrenheit
        } else {
            TempUnit::Celsius
        };
        events.push(Event::TemperatureUnit(unit));
    }
    if let Some(value) = fields.get("temperature") {
        events.push(Event::CurrentTemperature(decode_int("temperature", value)?));
    }
    if let Some(value) = fields.get("templevel") {
        events.push(Event::TargetTemperature(decode_int("templevel", value)?));
    }
    if let Some(value) = fields.get("Fire") {
        events.push(Event::MainLightPower(decode_bool("Fire", value)?));
    }
    if let Some(value) = fields.get("pinout3") {
        events.push(Event::FeatureLightPower(decode_bool("pinout3", value)?));
    }
    if let Some(value) = fields.get("Heater") {
        events.push(Event::HeaterPower(decode_bool("Heater", value)?));
    }

    events.extend(decode_module_values(&fields)?);

    if let Some(value) = fields.get("effect") {
        events.push(Event::Effect(decode_str("effect", value)?));
    }

    Ok(events)
}

/// `modules` lists the RGB strips (`rgb<n>`) alongside capability entries
/// (`light_box`, `temperature`); anything else in the list is ignored.
fn decode_inventory(value: &Value) -> Result<ModuleInventory> {
    let Value::Array(entries) = value else {
        return Err(Error::Decode("modules is not an array".to_string()));
    };

    let mut inventory = ModuleInventory::default();
    for entry in entries {
        let Some(name) = entry.as_str() else {
            return Err(Error::Decode(format!("module entry is not a string: {entry}")));
        };
        if let Some(suffix) = name.strip_prefix("rgb") {
            let id: ModuleId = suffix
                .parse()
                .map_err(|_| Error::Decode(format!("bad module name {name:?}")))?;
            inventory.rgb.push(id);
        } else if name == "light_box" {
            inventory.feature_light = true;
        } else if name == "temperature" {
            inventory.heating = true;
        }
    }

    inventory.rgb.sort_unstable();
    inventory.rgb.dedup();
    Ok(inventory)
}

/// Per-strip `brightnessRGB<n>`/`speedRGB<n>` values, ordered by module id
/// (brightness before speed) so decode order is stable.
fn decode_module_values(fields: &Map<String, Value>) -> Result<Vec<Event>> {
    let mut values: Vec<(ModuleId, u8, Event)> = Vec::new();

    for (key, value) in fields {
        if let Some(suffix) = key.strip_prefix("brightnessRGB") {
            let module = parse_module_suffix(key, suffix)?;
            let value = decode_channel(key, value)?;
            values.push((module, 0, Event::Brightness { module, value }));
        } else if let Some(suffix) = key.strip_prefix("speedRGB") {
            let module = parse_module_suffix(key, suffix)?;
            let value = decode_channel(key, value)?;
            values.push((module, 1, Event::AnimationSpeed { module, value }));
        }
    }

    values.sort_by_key(|(module, kind, _)| (*module, *kind));
    Ok(values.into_iter().map(|(_, _, event)| event).collect())
}

fn parse_module_suffix(key: &str, suffix: &str) -> Result<ModuleId> {
    suffix
        .parse()
        .map_err(|_| Error::Decode(format!("bad module key {key:?}")))
}

/// Firmware traffic carries booleans both as JSON bools and as 0/1 integers
fn decode_bool(key: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(Error::Decode(format!("{key} is not a boolean: {value}"))),
        },
        _ => Err(Error::Decode(format!("{key} is not a boolean: {value}"))),
    }
}

fn decode_int(key: &str, value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Error::Decode(format!("{key} is not an integer: {value}")))
}

fn decode_str(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::Decode(format!("{key} is not a string: {value}")))
}

fn decode_channel(key: &str, value: &Value) -> Result<u8> {
    let value = decode_int(key, value)?;
    u8::try_from(value).map_err(|_| Error::Decode(format!("{key} out of range: {value}")))
}

// ============================================================================
// TESTS
// ============================================================================
