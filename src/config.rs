//! Per-class tunables, the override registry and run-wide switches

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::error::{Result, SimError};
use crate::player::{Attribute, Class, Player};

/// Longest fight before it is called a draw
pub const DEFAULT_MAX_TURNS: u32 = 10_000;

/// Which mechanic a class's skip chance feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SkipType {
    /// Blocks or evades a single attack
    Default,
    /// Denies the opponent's whole turn
    Control,
}

impl TryFrom<u8> for SkipType {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(SkipType::Default),
            1 => Ok(SkipType::Control),
            other => Err(format!("unknown skip type {other}")),
        }
    }
}

impl From<SkipType> for u8 {
    fn from(value: SkipType) -> Self {
        match value {
            SkipType::Default => 0,
            SkipType::Control => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeneralConfig {
    pub crit_base: f64,
    pub crit_gladiator_bonus: f64,
    pub crit_enchantment_bonus: f64,
}

/// Parameters every class carries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClassConfig {
    pub attribute: Attribute,
    pub health_multiplier: f64,
    pub weapon_multiplier: f64,
    pub damage_multiplier: f64,
    pub maximum_damage_reduction: f64,
    pub maximum_damage_reduction_multiplier: f64,
    pub skip_chance: f64,
    pub skip_limit: u32,
    pub skip_type: SkipType,
}

impl ClassConfig {
    #[allow(clippy::too_many_arguments)]
    fn new(
        attribute: Attribute,
        health_multiplier: f64,
        weapon_multiplier: f64,
        damage_multiplier: f64,
        maximum_damage_reduction: f64,
        maximum_damage_reduction_multiplier: f64,
        skip_chance: f64,
        skip_limit: u32,
        skip_type: SkipType,
    ) -> Self {
        Self {
            attribute,
            health_multiplier,
            weapon_multiplier,
            damage_multiplier,
            maximum_damage_reduction,
            maximum_damage_reduction_multiplier,
            skip_chance,
            skip_limit,
            skip_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarriorConfig {
    #[serde(flatten)]
    pub base: ClassConfig,
    /// Ignore the descriptor's shield block chance and use `SkipChance`
    #[serde(rename = "Bool_OverwritePlayerShieldBlockChance")]
    pub overwrite_block_chance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattlemageConfig {
    #[serde(flatten)]
    pub base: ClassConfig,
    #[serde(rename = "Bool_DynamicFireballDmgScaling")]
    pub dynamic_fireball_scaling: bool,
    #[serde(rename = "Bool_FBDmgScalesWithCurrentHp")]
    pub fireball_scales_with_current_health: bool,
    #[serde(rename = "Bool_NoFireballDmgCap")]
    pub no_fireball_cap: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DemonHunterConfig {
    #[serde(flatten)]
    pub base: ClassConfig,
    pub revive_chance: f64,
    pub revive_chance_decay: f64,
    pub revive_health: f64,
    pub revive_health_min: f64,
    pub revive_health_decay: f64,
    pub revive_damage_decay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DruidRageConfig {
    pub skip_chance: f64,
    pub critical_chance: f64,
    pub critical_bonus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DruidConfig {
    #[serde(flatten)]
    pub base: ClassConfig,
    pub swoop_chance: f64,
    pub swoop_chance_min: f64,
    pub swoop_chance_max: f64,
    /// Subtracted from the swoop chance after every swoop (negative grows it)
    pub swoop_chance_decay: f64,
    pub swoop_bonus: f64,
    pub rage: DruidRageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BardConfig {
    #[serde(flatten)]
    pub base: ClassConfig,
    pub effect_rounds: u32,
    pub effect_base_duration: [u32; 3],
    pub effect_base_chance: [f64; 3],
    pub effect_values: [f64; 3],
}

/// Fully resolved parameter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimConfig {
    pub general: GeneralConfig,
    pub warrior: WarriorConfig,
    pub mage: ClassConfig,
    pub scout: ClassConfig,
    pub assassin: ClassConfig,
    pub battlemage: BattlemageConfig,
    pub berserker: ClassConfig,
    pub demon_hunter: DemonHunterConfig,
    pub druid: DruidConfig,
    pub bard: BardConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        use Attribute::*;
        use SkipType::{Control, Default as Block};

        Self {
            general: GeneralConfig {
                crit_base: 2.0,
                crit_gladiator_bonus: 0.11,
                crit_enchantment_bonus: 0.05,
            },
            warrior: WarriorConfig {
                base: ClassConfig::new(Strength, 5.0, 2.0, 1.0, 50.0, 1.0, 0.25, 999, Block),
                overwrite_block_chance: false,
            },
            mage: ClassConfig::new(Intelligence, 2.0, 4.5, 1.0, 10.0, 1.0, 0.0, 999, Block),
            scout: ClassConfig::new(Dexterity, 4.0, 2.5, 1.0, 25.0, 1.0, 0.50, 999, Block),
            assassin: ClassConfig::new(Dexterity, 4.0, 2.0, 0.625, 25.0, 1.0, 0.50, 999, Block),
            battlemage: BattlemageConfig {
                base: ClassConfig::new(Strength, 5.0, 2.0, 1.0, 10.0, 5.0, 0.0, 999, Block),
                dynamic_fireball_scaling: false,
                fireball_scales_with_current_health: false,
                no_fireball_cap: false,
            },
            berserker: ClassConfig::new(Strength, 4.0, 2.0, 1.25, 25.0, 1.0, 0.5, 14, Control),
            demon_hunter: DemonHunterConfig {
                base: ClassConfig::new(Dexterity, 4.0, 2.5, 1.0, 50.0, 1.0, 0.0, 999, Block),
                revive_chance: 0.44,
                revive_chance_decay: 0.02,
                revive_health: 0.9,
                revive_health_min: 0.1,
                revive_health_decay: 0.1,
                revive_damage_decay: 0.0,
            },
            druid: DruidConfig {
                base: ClassConfig::new(Intelligence, 5.0, 4.5, 1.0 / 3.0, 20.0, 2.0, 0.35, 999, Block),
                swoop_chance: 0.25,
                swoop_chance_min: 0.0,
                swoop_chance_max: 0.50,
                swoop_chance_decay: -0.05,
                swoop_bonus: 0.775,
                rage: DruidRageConfig {
                    skip_chance: 0.0,
                    critical_chance: 0.75,
                    critical_bonus: 3.6,
                },
            },
            bard: BardConfig {
                base: ClassConfig::new(Intelligence, 2.0, 4.5, 1.125, 25.0, 2.0, 0.0, 999, Block),
                effect_rounds: 4,
                effect_base_duration: [1, 1, 2],
                effect_base_chance: [25.0, 50.0, 25.0],
                effect_values: [20.0, 40.0, 60.0],
            },
        }
    }
}

impl SimConfig {
    /// Defaults with `overrides` deep-merged on top
    pub fn resolve(overrides: Option<&Value>) -> Result<Self> {
        let defaults = serde_json::to_value(SimConfig::default())?;
        match overrides {
            Some(source) => Ok(serde_json::from_value(merge_deep(&defaults, source))?),
            None => Ok(serde_json::from_value(defaults)?),
        }
    }

    /// Load an override file (YAML or JSON) and resolve it against the defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let overrides = read_tree(path)?;
        Self::resolve(Some(&overrides))
    }

    /// Shared parameters of one class
    pub fn class(&self, class: Class) -> &ClassConfig {
        match class {
            Class::Warrior => &self.warrior.base,
            Class::Mage => &self.mage,
            Class::Scout => &self.scout,
            Class::Assassin => &self.assassin,
            Class::Battlemage => &self.battlemage.base,
            Class::Berserker => &self.berserker,
            Class::DemonHunter => &self.demon_hunter.base,
            Class::Druid => &self.druid.base,
            Class::Bard => &self.bard.base,
        }
    }
}

/// Deep merge of `source` over `target`.
///
/// Objects merge key by key, anything else in `source` (arrays included) replaces the
/// target value wholesale. Neither input is modified.
pub fn merge_deep(target: &Value, source: &Value) -> Value {
    match (target, source) {
        (Value::Object(base), Value::Object(patch)) => {
            let mut output: Map<String, Value> = base.clone();
            for (key, value) in patch {
                let merged = match base.get(key) {
                    Some(existing) => merge_deep(existing, value),
                    None => value.clone(),
                };
                output.insert(key.clone(), merged);
            }
            Value::Object(output)
        }
        (_, patch) => patch.clone(),
    }
}

/// Process-independent switches that change the combat formulas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Flags {
    /// Treat every gladiator level as 15 (0 for builds flagged `NoGladiator`)
    #[serde(rename = "Gladiator15")]
    pub gladiator_15: bool,
    /// The opponent's gladiator level no longer reduces the critical bonus
    pub no_gladiator_reduction: bool,
    /// Drop the defender's half attribute from the attribute advantage term
    pub no_attribute_reduction: bool,
}

/// Everything a simulation run needs besides the two fighters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub flags: Flags,
    pub log_enabled: bool,
    pub max_turns: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            flags: Flags::default(),
            log_enabled: false,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

/// One changed leaf between the default tree and the active override
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigDifference {
    pub path: Vec<String>,
    pub default: Value,
    pub custom: Value,
}

/// Holds the default parameter tree and the override currently applied on top of it
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    defaults: Value,
    current: Option<Value>,
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self {
            // A plain struct of numbers always serializes
            defaults: serde_json::to_value(SimConfig::default()).unwrap_or(Value::Null),
            current: None,
        }
    }

    pub fn defaults(&self) -> &Value {
        &self.defaults
    }

    /// Replace the active override. Rejected overrides leave the registry unchanged.
    pub fn set_override(&mut self, overrides: Option<Value>) -> Result<()> {
        if let Some(tree) = &overrides {
            serde_json::from_value::<SimConfig>(merge_deep(&self.defaults, tree))?;
        }
        self.current = overrides;
        Ok(())
    }

    pub fn active_override(&self) -> Option<&Value> {
        self.current.as_ref()
    }

    pub fn resolve(&self) -> Result<SimConfig> {
        let tree = match &self.current {
            Some(overrides) => merge_deep(&self.defaults, overrides),
            None => self.defaults.clone(),
        };
        Ok(serde_json::from_value(tree)?)
    }

    /// Leaves of the default tree whose value the override changes
    pub fn differences(&self) -> Vec<ConfigDifference> {
        let mut differences = Vec::new();
        if let Some(current) = &self.current {
            collect_differences(&self.defaults, Some(current), &mut Vec::new(), &mut differences);
        }
        differences
    }
}

fn collect_differences(
    default: &Value,
    custom: Option<&Value>,
    path: &mut Vec<String>,
    out: &mut Vec<ConfigDifference>,
) {
    match default {
        Value::Object(map) => {
            for (key, value) in map {
                path.push(key.clone());
                collect_differences(value, custom.and_then(|c| c.get(key)), path, out);
                path.pop();
            }
        }
        _ => {
            if let Some(custom) = custom {
                if !same_value(default, custom) {
                    out.push(ConfigDifference {
                        path: path.clone(),
                        default: default.clone(),
                        custom: custom.clone(),
                    });
                }
            }
        }
    }
}

// 2 and 2.0 are the same tunable
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| same_value(x, y))
        }
        _ => a == b,
    }
}

/// Two descriptors plus optional override and flags, as loaded from a matchup file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchupFile {
    pub fighters: Vec<Value>,
    #[serde(default)]
    pub config: Option<Value>,
    #[serde(default)]
    pub flags: Flags,
}

impl MatchupFile {
    /// Load a matchup from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let tree = read_tree(path)?;
        Ok(serde_json::from_value(tree)?)
    }

    /// Normalize both descriptors
    pub fn players(&self) -> Result<[Player; 2]> {
        match self.fighters.as_slice() {
            [a, b] => Ok([Player::normalize(a), Player::normalize(b)]),
            other => Err(SimError::FighterCount(other.len())),
        }
    }

    pub fn resolve_config(&self) -> Result<SimConfig> {
        SimConfig::resolve(self.config.as_ref())
    }
}

/// Read a raw override tree from a YAML or JSON file
pub fn read_override<P: AsRef<Path>>(path: P) -> Result<Value> {
    read_tree(path)
}

fn read_tree<P: AsRef<Path>>(path: P) -> Result<Value> {
    let content = fs::read_to_string(&path)?;
    let path_str = path.as_ref().to_string_lossy().to_lowercase();

    if path_str.ends_with(".json") {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_yaml::from_str(&content)?)
    }
}
