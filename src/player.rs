//! Normalized player descriptors

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SimError};

/// The nine fighter classes, numbered the way the game numbers them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Warrior,
    Mage,
    Scout,
    Assassin,
    Battlemage,
    Berserker,
    DemonHunter,
    Druid,
    Bard,
}

impl Class {
    pub const ALL: [Class; 9] = [
        Class::Warrior,
        Class::Mage,
        Class::Scout,
        Class::Assassin,
        Class::Battlemage,
        Class::Berserker,
        Class::DemonHunter,
        Class::Druid,
        Class::Bard,
    ];

    /// Numeric game id (1-based)
    pub fn id(self) -> u8 {
        match self {
            Class::Warrior => 1,
            Class::Mage => 2,
            Class::Scout => 3,
            Class::Assassin => 4,
            Class::Battlemage => 5,
            Class::Berserker => 6,
            Class::DemonHunter => 7,
            Class::Druid => 8,
            Class::Bard => 9,
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        Self::ALL.iter().copied().find(|class| class.id() as u64 == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            Class::Warrior => "Warrior",
            Class::Mage => "Mage",
            Class::Scout => "Scout",
            Class::Assassin => "Assassin",
            Class::Battlemage => "Battlemage",
            Class::Berserker => "Berserker",
            Class::DemonHunter => "DemonHunter",
            Class::Druid => "Druid",
            Class::Bard => "Bard",
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Class {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_lowercase();

        if let Ok(id) = key.parse::<u64>() {
            return Self::from_id(id).ok_or_else(|| SimError::UnknownClass(s.to_string()));
        }

        Self::ALL
            .iter()
            .copied()
            .find(|class| class.name().to_lowercase() == key)
            .ok_or_else(|| SimError::UnknownClass(s.to_string()))
    }
}

impl Serialize for Class {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.id())
    }
}

/// Attribute a class scales its damage with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Strength,
    Dexterity,
    Intelligence,
    Constitution,
    Luck,
}

/// Elemental rune socketed into a weapon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "u32")]
pub enum Rune {
    #[default]
    None,
    Fire,
    Cold,
    Lightning,
    /// Scales with the target's weakest resistance
    Best,
}

impl From<u32> for Rune {
    fn from(id: u32) -> Self {
        match id {
            40 => Rune::Fire,
            41 => Rune::Cold,
            42 => Rune::Lightning,
            187 => Rune::Best,
            _ => Rune::None,
        }
    }
}

impl From<Rune> for u32 {
    fn from(rune: Rune) -> Self {
        match rune {
            Rune::None => 0,
            Rune::Fire => 40,
            Rune::Cold => 41,
            Rune::Lightning => 42,
            Rune::Best => 187,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WeaponInput", rename_all = "PascalCase")]
pub struct Weapon {
    pub damage_min: f64,
    pub damage_max: f64,
    pub has_enchantment: bool,
    pub rune_type: Rune,
    pub rune_value: f64,
}

impl Default for Weapon {
    fn default() -> Self {
        WeaponInput::default().into()
    }
}

/// Weapon as it may arrive: the rune either as `RuneType`/`RuneValue` or in slot 2 of the
/// game's `AttributeTypes`/`Attributes` lists
#[derive(Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct WeaponInput {
    #[serde(deserialize_with = "lenient::number")]
    damage_min: f64,
    #[serde(deserialize_with = "lenient::number")]
    damage_max: f64,
    #[serde(deserialize_with = "lenient::flag")]
    has_enchantment: bool,
    #[serde(deserialize_with = "lenient::rune")]
    rune_type: Rune,
    #[serde(deserialize_with = "lenient::number")]
    rune_value: f64,
    attribute_types: Value,
    attributes: Value,
}

impl Default for WeaponInput {
    fn default() -> Self {
        Self {
            damage_min: 1.0,
            damage_max: 2.0,
            has_enchantment: false,
            rune_type: Rune::None,
            rune_value: 0.0,
            attribute_types: Value::Null,
            attributes: Value::Null,
        }
    }
}

impl From<WeaponInput> for Weapon {
    fn from(input: WeaponInput) -> Self {
        let (rune_type, rune_value) = if input.rune_type != Rune::None {
            (input.rune_type, input.rune_value)
        } else {
            let rune = lenient::slot(&input.attribute_types, 2)
                .and_then(lenient::read_number)
                .map(|id| Rune::from(id as u32))
                .unwrap_or_default();
            let value = lenient::slot(&input.attributes, 2)
                .and_then(lenient::read_number)
                .unwrap_or(0.0);
            (rune, value)
        };

        Self {
            damage_min: input.damage_min,
            damage_max: input.damage_max,
            has_enchantment: input.has_enchantment,
            rune_type,
            rune_value,
        }
    }
}

impl Weapon {
    /// Rune bonus in percent if the weapon carries `rune`, else 0
    pub fn rune(&self, rune: Rune) -> f64 {
        if self.rune_type == rune {
            self.rune_value
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct OffHand {
    #[serde(deserialize_with = "lenient::flag")]
    pub has_enchantment: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Items {
    #[serde(deserialize_with = "lenient::section")]
    pub wpn1: Weapon,
    #[serde(deserialize_with = "lenient::section")]
    pub wpn2: Weapon,
    #[serde(deserialize_with = "lenient::section")]
    pub hand: OffHand,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Runes {
    #[serde(deserialize_with = "lenient::number")]
    pub health: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub resistance_fire: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub resistance_cold: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub resistance_lightning: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Potions {
    #[serde(deserialize_with = "lenient::number")]
    pub life: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Dungeons {
    #[serde(deserialize_with = "lenient::number")]
    pub player: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub group: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Fortress {
    #[serde(deserialize_with = "lenient::number")]
    pub gladiator: f64,
}

/// One build as the engine sees it.
///
/// Every field is optional on input; whatever is missing or unreadable takes the neutral
/// value from [`Player::default`] (zero bonuses, zero resistances, a 1-2 damage weapon).
/// Attributes may be plain numbers or `{ "Total": n }` blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Player {
    #[serde(rename = "ID", deserialize_with = "lenient::label", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::label", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::level")]
    pub level: u32,
    #[serde(deserialize_with = "lenient::class")]
    pub class: Option<Class>,

    #[serde(deserialize_with = "lenient::number")]
    pub strength: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub dexterity: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub intelligence: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub constitution: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub luck: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub armor: f64,

    #[serde(deserialize_with = "lenient::section")]
    pub items: Items,
    #[serde(deserialize_with = "lenient::section")]
    pub runes: Runes,
    #[serde(deserialize_with = "lenient::section")]
    pub potions: Potions,
    #[serde(deserialize_with = "lenient::section")]
    pub dungeons: Dungeons,
    #[serde(deserialize_with = "lenient::section")]
    pub fortress: Fortress,

    /// Fixed health, replaces the computed pool when positive
    #[serde(deserialize_with = "lenient::optional_number", skip_serializing_if = "Option::is_none")]
    pub health: Option<f64>,
    /// Shield block chance in percent (warriors only)
    #[serde(deserialize_with = "lenient::optional_number", skip_serializing_if = "Option::is_none")]
    pub block_chance: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number", skip_serializing_if = "Option::is_none")]
    pub health_multiplier: Option<f64>,

    #[serde(deserialize_with = "lenient::flag")]
    pub no_gladiator: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub no_base_damage: bool,

    /// Class value that named no known class, reported when a fighter is created
    #[serde(skip)]
    pub unrecognized_class: Option<String>,
}

impl Player {
    /// Normalize a loosely shaped descriptor. Never fails: missing or unreadable fields
    /// take their neutral defaults and a non-object input is an empty build.
    pub fn normalize(input: &Value) -> Self {
        if !input.is_object() {
            return Player::default();
        }

        let mut player = Player::deserialize(input).unwrap_or_default();
        if player.class.is_none() {
            player.unrecognized_class = input
                .get("Class")
                .filter(|class| !class.is_null())
                .map(|class| class.to_string());
        }
        player
    }

    pub fn attribute(&self, attribute: Attribute) -> f64 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Intelligence => self.intelligence,
            Attribute::Constitution => self.constitution,
            Attribute::Luck => self.luck,
        }
    }

    /// Label used in fight logs: the explicit ID when present, else the fighter index
    pub fn label(&self, index: usize) -> String {
        match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => index.to_string(),
        }
    }
}

/// Field readers that accept every value, mapping anything unreadable to the neutral default
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{Class, Rune};

    /// Finite number from a number, a numeric string or a `{ "Total": n }` block
    pub fn read_number(value: &Value) -> Option<f64> {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Object(map) => map.get("Total").and_then(read_number),
            _ => None,
        };
        number.filter(|n| n.is_finite())
    }

    /// Entry `index` of a list, or of an object keyed by position
    pub fn slot(value: &Value, index: usize) -> Option<&Value> {
        match value {
            Value::Array(items) => items.get(index),
            Value::Object(map) => map.get(&index.to_string()),
            _ => None,
        }
    }

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(read_number(&Value::deserialize(deserializer)?).unwrap_or(0.0))
    }

    pub fn optional_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(read_number(&Value::deserialize(deserializer)?))
    }

    pub fn level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let level = read_number(&Value::deserialize(deserializer)?).unwrap_or(0.0);
        // Saturating cast: negatives become 0
        Ok(level.trunc() as u32)
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(flag) => flag,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        })
    }

    pub fn label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn class<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Class>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s.parse().ok(),
            other => read_number(&other)
                .filter(|id| id.fract() == 0.0 && *id > 0.0)
                .and_then(|id| Class::from_id(id as u64)),
        })
    }

    pub fn rune<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rune, D::Error> {
        Ok(read_number(&Value::deserialize(deserializer)?)
            .map(|id| Rune::from(id as u32))
            .unwrap_or_default())
    }

    /// Nested block; a block of the wrong shape falls back to its default
    pub fn section<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        Ok(serde_json::from_value(Value::deserialize(deserializer)?).unwrap_or_default())
    }
}
