//! Last-known state of one fire
//!
//! Everything starts unknown and fills in as status frames arrive. The device
//! is the single source of truth and its frames are causally ordered by the
//! socket, so applying an event simply overwrites the previous value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::effects;
use crate::types::{Event, ModuleId, ModuleInventory, TempUnit};

/// Per-strip attributes, reported lazily by the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleState {
    pub brightness: Option<u8>,
    pub speed: Option<u8>,
}

/// Snapshot of the fire's attributes derived from decoded events.
///
/// Mutated only through [`Device::apply`], and only by the session's receive
/// loop; everyone else reads immutable snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub product: Option<String>,
    pub configs: Option<String>,
    /// Last-reported module inventory, `None` until the fire announces one
    pub inventory: Option<ModuleInventory>,
    /// Known RGB strips and their last-reported values
    pub modules: BTreeMap<ModuleId, ModuleState>,
    pub main_light: Option<bool>,
    pub feature_light: Option<bool>,
    pub heater: Option<bool>,
    pub effect: Option<String>,
    pub current_temp: Option<i64>,
    pub target_temp: Option<i64>,
    pub unit: Option<TempUnit>,
    /// Effects this model supports, derived from `configs`
    pub available_effects: Vec<String>,
}

impl Device {
    /// Apply one decoded event, last-writer-wins.
    ///
    /// A value event for an unknown strip adds it (fires may report new
    /// modules after an info refresh). An inventory event replaces the id
    /// set, keeping state for ids that survive.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::Inventory(inventory) => {
                self.modules.retain(|id, _| inventory.rgb.contains(id));
                for id in &inventory.rgb {
                    self.modules.entry(*id).or_default();
                }
                self.inventory = Some(inventory.clone());
            }
            Event::ModelConfig(configs) => {
                self.available_effects = effects::available_for(configs)
                    .iter()
                    .map(|name| (*name).to_string())
                    .collect();
                self.configs = Some(configs.clone());
            }
            Event::Product(product) => self.product = Some(product.clone()),
            Event::TemperatureUnit(unit) => self.unit = Some(*unit),
            Event::CurrentTemperature(temp) => self.current_temp = Some(*temp),
            Event::TargetTemperature(temp) => self.target_temp = Some(*temp),
            Event::MainLightPower(on) => self.main_light = Some(*on),
            Event::FeatureLightPower(on) => self.feature_light = Some(*on),
            Event::HeaterPower(on) => self.heater = Some(*on),
            Event::Brightness { module, value } => {
                self.modules.entry(*module).or_default().brightness = Some(*value);
            }
            Event::AnimationSpeed { module, value } => {
                self.modules.entry(*module).or_default().speed = Some(*value);
            }
            Event::Effect(name) => self.effect = Some(name.clone()),
        }
    }

    /// Whether `module` is known, from the inventory or a previously seen
    /// per-strip value
    pub fn has_module(&self, module: ModuleId) -> bool {
        self.modules.contains_key(&module)
    }
}
