//! Fighter model: formulas shared by every class, derived data and per-fight state

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::classes::{ClassKit, Mechanics};
use crate::config::{ClassConfig, Flags, GeneralConfig, SimConfig, SkipType};
use crate::error::{Result, SimError};
use crate::player::{Class, Player, Rune, Weapon};
use crate::rng::Dice;
use crate::simulation::Bout;

/// Outcome of taking damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Life {
    Alive,
    Dead,
}

/// What kind of swing an attack is, before skip and critical qualifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strike {
    Normal,
    /// Off-hand follow-up
    Secondary,
    /// Attack made right after denying the opponent a turn
    Chained,
    Swoop,
}

/// One rolled attack, ready to be applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Swing {
    pub damage: f64,
    pub skipped: bool,
    pub critical: bool,
    pub strike: Strike,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DamageRange {
    pub base: f64,
    pub min: f64,
    pub max: f64,
}

impl DamageRange {
    /// Uniform sample in `[min, max + 1)`
    #[inline(always)]
    pub fn sample(&self, dice: &mut dyn Dice) -> f64 {
        dice.unit() * (1.0 + self.max - self.min) + self.min
    }
}

/// Skip and critical numbers for one stance
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Profile {
    pub skip_chance: f64,
    pub critical_chance: f64,
    pub critical_multiplier: f64,
}

/// Opponent dependent statistics, computed once per matchup
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Derived {
    pub weapon1: DamageRange,
    pub weapon2: Option<DamageRange>,
    pub baseline: Profile,
    /// Druid rage profile
    pub rage: Option<Profile>,
    /// Bard songs only play against non-mages
    pub sings_before_attack: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stance {
    #[default]
    Baseline,
    Rage,
}

/// Cache key: the opponent's immutable inputs plus the run flags
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchupKey(Vec<u8>);

impl MatchupKey {
    pub fn new(identity: &[u8], flags: Flags) -> Self {
        let mut bytes = Vec::with_capacity(identity.len() + 3);
        bytes.extend_from_slice(identity);
        bytes.push(flags.gladiator_15 as u8);
        bytes.push(flags.no_gladiator_reduction as u8);
        bytes.push(flags.no_attribute_reduction as u8);
        Self(bytes)
    }
}

/// State and formulas every class shares
#[derive(Debug, Clone)]
pub struct FighterCore {
    pub index: usize,
    pub player: Player,
    pub class: Class,
    pub config: ClassConfig,
    pub general: GeneralConfig,
    /// Warriors ignore the descriptor block chance when set
    pub overwrite_block_chance: bool,
    /// Off-hand enchantment
    pub attack_first: bool,

    pub total_health: f64,
    pub health: f64,
    pub skip_count: u32,

    identity: Vec<u8>,
    data: Arc<Derived>,
    stance: Stance,
}

impl FighterCore {
    fn level(&self) -> f64 {
        self.player.level.max(1) as f64
    }

    pub fn health_pool(&self) -> f64 {
        if let Some(health) = self.player.health.filter(|h| *h > 0.0) {
            return health;
        }

        let p = &self.player;
        let mut health = p.constitution * self.config.health_multiplier * (p.level as f64 + 1.0);

        health = (health * (1.0 + p.potions.life / 100.0)).ceil();
        health = (health * (1.0 + p.dungeons.player / 100.0)).ceil();
        health = (health * (1.0 + p.runes.health / 100.0)).ceil();
        health = (health * p.health_multiplier.unwrap_or(1.0)).ceil();

        health
    }

    /// Percent of incoming damage absorbed by armor
    pub fn damage_reduction(&self, source: &FighterCore) -> f64 {
        if source.class == Class::Mage {
            return 0.0;
        }

        self.config.maximum_damage_reduction_multiplier
            * self
                .config
                .maximum_damage_reduction
                .min(self.player.armor / source.level())
    }

    pub fn skip_chance_against(&self, source: &FighterCore) -> f64 {
        if source.class == Class::Mage {
            0.0
        } else if self.class == Class::Warrior && !self.overwrite_block_chance {
            self.player
                .block_chance
                .map(|chance| chance / 100.0)
                .unwrap_or(self.config.skip_chance)
        } else {
            self.config.skip_chance
        }
    }

    pub fn critical_chance(&self, target: &FighterCore, maximum: f64, bonus: f64) -> f64 {
        maximum.min(bonus + self.player.luck * 2.5 / target.level() / 100.0)
    }

    pub fn critical_multiplier(
        &self,
        weapon1: &Weapon,
        weapon2: Option<&Weapon>,
        target: &FighterCore,
        flags: Flags,
    ) -> f64 {
        let mut multiplier = self.general.crit_base;
        if weapon1.has_enchantment || weapon2.is_some_and(|w| w.has_enchantment) {
            multiplier += self.general.crit_enchantment_bonus;
        }

        let mut own = self.player.fortress.gladiator;
        let mut reducing = target.player.fortress.gladiator;

        if flags.gladiator_15 {
            own = if self.player.no_gladiator { 0.0 } else { 15.0 };
            reducing = if target.player.no_gladiator { 0.0 } else { 15.0 };
        }
        if flags.no_gladiator_reduction {
            reducing = 0.0;
        }

        multiplier + self.general.crit_gladiator_bonus * (own - reducing).max(0.0)
    }

    /// Level based damage floor as `(min, max)`
    pub fn base_damage(&self, secondary: bool) -> (f64, f64) {
        if self.player.level > 10 && !self.player.no_base_damage {
            let factor = if secondary { 0.1 } else { 0.7 };
            let n = factor * (self.player.level as f64 - 9.0) * self.config.weapon_multiplier;

            ((n * 2.0 / 3.0).ceil().max(1.0), (n * 4.0 / 3.0).round().max(2.0))
        } else {
            (1.0, 2.0)
        }
    }

    pub fn damage_base(&self, weapon: &Weapon, target: &FighterCore, flags: Flags) -> f64 {
        let resist = &target.player.runes;
        let element = |resistance: f64, rune: Rune| (1.0 - resistance / 100.0) * (weapon.rune(rune) / 100.0);

        let fire = element(resist.resistance_fire, Rune::Fire);
        let cold = element(resist.resistance_cold, Rune::Cold);
        let lightning = element(resist.resistance_lightning, Rune::Lightning);
        let lowest = resist
            .resistance_fire
            .min(resist.resistance_cold)
            .min(resist.resistance_lightning);
        let best = element(lowest, Rune::Best);

        let aa = self.player.attribute(self.config.attribute);
        let ad = if flags.no_attribute_reduction {
            0.0
        } else {
            target.player.attribute(self.config.attribute) / 2.0
        };

        let mut base = (1.0 + self.player.dungeons.group / 100.0)
            * (1.0 - target.damage_reduction(self) / 100.0)
            * (1.0 + fire + cold + lightning + best);
        base *= self.config.damage_multiplier;
        base *= 1.0 + (aa / 2.0).max(aa - ad) / 10.0;

        base
    }

    pub fn damage_range(
        &self,
        weapon: &Weapon,
        target: &FighterCore,
        secondary: bool,
        flags: Flags,
    ) -> DamageRange {
        let base = self.damage_base(weapon, target, flags);
        let (min, max) = self.base_damage(secondary);

        DamageRange {
            base,
            min: base * weapon.damage_min.max(min),
            max: base * weapon.damage_max.max(max),
        }
    }

    /// Baseline derived data against `target`
    pub fn derive(&self, target: &FighterCore, flags: Flags) -> Derived {
        let items = &self.player.items;

        Derived {
            weapon1: self.damage_range(&items.wpn1, target, false, flags),
            weapon2: None,
            baseline: Profile {
                skip_chance: self.skip_chance_against(target),
                critical_chance: self.critical_chance(target, 0.5, 0.0),
                critical_multiplier: self.critical_multiplier(&items.wpn1, Some(&items.wpn2), target, flags),
            },
            rage: None,
            sings_before_attack: false,
        }
    }

    pub fn reset(&mut self, reset_health: bool) {
        self.stance = Stance::Baseline;
        self.skip_count = 0;

        if reset_health {
            self.health = self.total_health;
        }
    }

    pub fn data(&self) -> &Derived {
        &self.data
    }

    pub fn stance(&self) -> Stance {
        self.stance
    }

    pub fn enter_stance(&mut self, stance: Stance) {
        self.stance = stance;
    }

    pub fn special_state(&self) -> bool {
        self.stance != Stance::Baseline
    }

    /// Numbers of the active stance
    pub fn profile(&self) -> &Profile {
        match self.stance {
            Stance::Baseline => &self.data.baseline,
            Stance::Rage => self.data.rage.as_ref().unwrap_or(&self.data.baseline),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn label(&self) -> String {
        self.player.label(self.index)
    }

    /// Roll a skip of `kind`; a success extends the streak
    pub fn skip(&mut self, kind: SkipType, dice: &mut dyn Dice) -> bool {
        if self.config.skip_type == kind
            && dice.chance(self.profile().skip_chance)
            && self.skip_count < self.config.skip_limit
        {
            self.skip_count += 1;
            true
        } else {
            false
        }
    }

    pub fn take_damage(&mut self, damage: f64) -> Life {
        self.health -= damage;
        if self.health > 0.0 {
            Life::Alive
        } else {
            Life::Dead
        }
    }

    /// Apply a swing to `target`. Returns whether the target survived.
    pub fn attack(&mut self, swing: Swing, target: &mut Fighter, bout: &mut Bout<'_>) -> bool {
        let damage = if swing.skipped {
            0.0
        } else {
            let mut damage = swing.damage;
            if swing.critical {
                damage *= self.profile().critical_multiplier;
            }

            target.core.skip_count = 0;
            damage.trunc()
        };

        if let Some(log) = bout.log() {
            log.record_attack(self, &target.core, damage, &swing);
        }

        target.on_damage_taken(self, damage, bout) == Life::Alive
    }
}

/// One combatant: shared core, class mechanics and the per-opponent cache
#[derive(Debug, Clone)]
pub struct Fighter {
    pub core: FighterCore,
    kit: ClassKit,
    cache: HashMap<MatchupKey, Arc<Derived>>,
}

impl Fighter {
    pub fn create(index: usize, player: Player, config: &SimConfig) -> Result<Self> {
        let class = match (player.class, &player.unrecognized_class) {
            (Some(class), _) => class,
            (None, Some(raw)) => return Err(SimError::UnknownClass(raw.clone())),
            (None, None) => return Err(SimError::MissingClass { index }),
        };
        let class_config = config.class(class).clone();
        let identity = serde_json::to_vec(&(&player, &class_config))?;

        let mut core = FighterCore {
            index,
            attack_first: player.items.hand.has_enchantment,
            player,
            class,
            config: class_config,
            general: config.general.clone(),
            overwrite_block_chance: config.warrior.overwrite_block_chance,
            total_health: 0.0,
            health: 0.0,
            skip_count: 0,
            identity,
            data: Arc::default(),
            stance: Stance::Baseline,
        };
        core.total_health = core.health_pool();

        let kit = ClassKit::new(class, config, &core);
        let mut fighter = Self {
            core,
            kit,
            cache: HashMap::new(),
        };
        fighter.reset(true);

        Ok(fighter)
    }

    /// Load derived data against `target`, computing it on first sight of that opponent
    pub fn initialize(&mut self, target: &FighterCore, flags: Flags) {
        let key = MatchupKey::new(&target.identity, flags);

        let data = match self.cache.get(&key) {
            Some(data) => {
                trace!(fighter = self.core.index, "derived data cache hit");
                Arc::clone(data)
            }
            None => {
                let mut data = self.core.derive(target, flags);
                self.kit.extend_data(&self.core, target, flags, &mut data);

                let data = Arc::new(data);
                self.cache.insert(key, Arc::clone(&data));
                data
            }
        };

        self.core.data = data;
        self.core.stance = Stance::Baseline;
    }

    pub fn reset(&mut self, reset_health: bool) {
        self.core.reset(reset_health);
        self.kit.reset(&self.core);
    }

    pub fn skip(&mut self, kind: SkipType, dice: &mut dyn Dice) -> bool {
        self.core.skip(kind, dice)
    }

    pub fn before(&mut self, target: &mut Fighter, bout: &mut Bout<'_>) {
        self.kit.before(&mut self.core, target, bout);
    }

    pub fn control(&mut self, target: &mut Fighter, bout: &mut Bout<'_>) {
        self.kit.control(&mut self.core, target, bout);
    }

    pub fn attack(&mut self, swing: Swing, target: &mut Fighter, bout: &mut Bout<'_>) -> bool {
        self.kit.attack(&mut self.core, swing, target, bout)
    }

    pub fn on_damage_taken(&mut self, source: &FighterCore, damage: f64, bout: &mut Bout<'_>) -> Life {
        self.kit.on_damage_taken(&mut self.core, source, damage, bout)
    }

    pub fn index(&self) -> usize {
        self.core.index
    }

    pub fn class(&self) -> Class {
        self.core.class
    }

    pub fn health(&self) -> f64 {
        self.core.health
    }

    pub fn total_health(&self) -> f64 {
        self.core.total_health
    }

    pub fn is_alive(&self) -> bool {
        self.core.is_alive()
    }

    pub fn data(&self) -> &Derived {
        self.core.data()
    }

    pub fn kit(&self) -> &ClassKit {
        &self.kit
    }

    /// Number of opponents with cached derived data
    pub fn cached_matchups(&self) -> usize {
        self.cache.len()
    }
}

/// Prepare both fighters against each other
pub fn initialize_fighters(a: &mut Fighter, b: &mut Fighter, flags: Flags) {
    a.initialize(&b.core, flags);
    b.initialize(&a.core, flags);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedDice;
    use serde_json::json;

    fn fighter(index: usize, descriptor: serde_json::Value) -> Fighter {
        let player = Player::normalize(&descriptor);
        Fighter::create(index, player, &SimConfig::default()).unwrap()
    }

    fn pair(a: serde_json::Value, b: serde_json::Value) -> (Fighter, Fighter) {
        let mut a = fighter(0, a);
        let mut b = fighter(1, b);
        initialize_fighters(&mut a, &mut b, Flags::default());
        (a, b)
    }

    #[test]
    fn test_health_pool() {
        let f = fighter(0, json!({ "Class": 1, "Level": 20, "Constitution": 100 }));
        assert_eq!(f.total_health(), 100.0 * 5.0 * 21.0);
        assert_eq!(f.health(), f.total_health());

        let f = fighter(0, json!({
            "Class": 2, "Level": 99, "Constitution": 1000,
            "Potions": { "Life": 25 }, "Runes": { "Health": 5 }
        }));
        // 1000 * 2 * 100 = 200000, +25% = 250000, +5% = 262500
        assert_eq!(f.total_health(), 262_500.0);

        let f = fighter(0, json!({ "Class": 2, "Health": 1234, "Constitution": 1000 }));
        assert_eq!(f.total_health(), 1234.0);
    }

    #[test]
    fn test_missing_class_is_an_error() {
        let player = Player::normalize(&json!({ "Level": 10 }));
        let err = Fighter::create(1, player, &SimConfig::default()).unwrap_err();
        assert!(matches!(err, SimError::MissingClass { index: 1 }));

        let player = Player::normalize(&json!({ "Class": "Paladin" }));
        let err = Fighter::create(0, player, &SimConfig::default()).unwrap_err();
        assert!(matches!(err, SimError::UnknownClass(raw) if raw.contains("Paladin")));
    }

    #[test]
    fn test_mage_ignores_armor_and_block() {
        let (warrior, mage) = pair(
            json!({ "Class": 1, "Level": 100, "Armor": 5000, "BlockChance": 25 }),
            json!({ "Class": 2, "Level": 100 }),
        );

        assert_eq!(warrior.core.damage_reduction(&mage.core), 0.0);
        assert_eq!(warrior.data().baseline.skip_chance, 0.0);
        assert_eq!(mage.data().baseline.skip_chance, 0.0);
    }

    #[test]
    fn test_damage_reduction_is_capped() {
        let (warrior, scout) = pair(
            json!({ "Class": 1, "Level": 100, "Armor": 100000 }),
            json!({ "Class": 3, "Level": 100 }),
        );
        assert_eq!(warrior.core.damage_reduction(&scout.core), 50.0);
        assert_eq!(scout.core.damage_reduction(&warrior.core), 25.0);
    }

    #[test]
    fn test_warrior_block_chance_override() {
        let (warrior, _) = pair(
            json!({ "Class": 1, "Level": 10, "BlockChance": 30 }),
            json!({ "Class": 3, "Level": 10 }),
        );
        assert!((warrior.data().baseline.skip_chance - 0.30).abs() < 1e-12);

        let (warrior, _) = pair(json!({ "Class": 1, "Level": 10 }), json!({ "Class": 3, "Level": 10 }));
        assert_eq!(warrior.data().baseline.skip_chance, 0.25);
    }

    #[test]
    fn test_critical_chance_capped_at_half() {
        let (lucky, _) = pair(
            json!({ "Class": 3, "Level": 10, "Luck": 100000 }),
            json!({ "Class": 3, "Level": 10 }),
        );
        assert_eq!(lucky.data().baseline.critical_chance, 0.5);

        let (unlucky, _) = pair(
            json!({ "Class": 3, "Level": 10, "Luck": 20 }),
            json!({ "Class": 3, "Level": 100 }),
        );
        assert!((unlucky.data().baseline.critical_chance - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_critical_multiplier_flags() {
        let a = json!({ "Class": 1, "Level": 10, "Fortress": { "Gladiator": 10 },
                        "Items": { "Wpn2": { "HasEnchantment": true } } });
        let b = json!({ "Class": 1, "Level": 10, "Fortress": { "Gladiator": 4 } });
        let a = fighter(0, a);
        let b = fighter(1, b);
        let items = &a.core.player.items;

        let plain = a.core.critical_multiplier(&items.wpn1, Some(&items.wpn2), &b.core, Flags::default());
        assert!((plain - (2.0 + 0.05 + 0.11 * 6.0)).abs() < 1e-12);

        let no_reduction = Flags { no_gladiator_reduction: true, ..Flags::default() };
        let value = a.core.critical_multiplier(&items.wpn1, None, &b.core, no_reduction);
        assert!((value - (2.0 + 0.11 * 10.0)).abs() < 1e-12);

        let gladiator_15 = Flags { gladiator_15: true, ..Flags::default() };
        let value = a.core.critical_multiplier(&items.wpn1, None, &b.core, gladiator_15);
        assert!((value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_base_damage_floor() {
        let low = fighter(0, json!({ "Class": 1, "Level": 10 }));
        assert_eq!(low.core.base_damage(false), (1.0, 2.0));

        let high = fighter(0, json!({ "Class": 1, "Level": 20 }));
        assert_eq!(high.core.base_damage(false), (11.0, 21.0));

        let disabled = fighter(0, json!({ "Class": 1, "Level": 20, "NoBaseDamage": true }));
        assert_eq!(disabled.core.base_damage(false), (1.0, 2.0));
    }

    #[test]
    fn test_rune_damage_uses_resistance() {
        let (a, _) = pair(
            json!({ "Class": 1, "Level": 10, "Items": { "Wpn1": { "RuneType": 40, "RuneValue": 50 } } }),
            json!({ "Class": 1, "Level": 10, "Runes": { "ResistanceFire": 50 } }),
        );
        let (plain, _) = pair(json!({ "Class": 1, "Level": 10 }), json!({ "Class": 1, "Level": 10 }));

        // 50% fire rune against 50% fire resistance adds a quarter
        let ratio = a.data().weapon1.base / plain.data().weapon1.base;
        assert!((ratio - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_level_zero_is_not_a_divisor() {
        let (a, b) = pair(
            json!({ "Class": 1, "Level": 0, "Armor": 100, "Luck": 10 }),
            json!({ "Class": 3, "Level": 0, "Armor": 100, "Luck": 10 }),
        );
        assert!(a.data().baseline.critical_chance.is_finite());
        assert!(b.core.damage_reduction(&a.core).is_finite());
    }

    #[test]
    fn test_initialize_reuses_cached_data() {
        let (mut a, mut b) = pair(json!({ "Class": 3, "Level": 50 }), json!({ "Class": 4, "Level": 50 }));
        let first = a.data().clone();

        initialize_fighters(&mut a, &mut b, Flags::default());
        assert_eq!(a.cached_matchups(), 1);
        assert_eq!(a.data(), &first);

        let flags = Flags { no_attribute_reduction: true, ..Flags::default() };
        initialize_fighters(&mut a, &mut b, flags);
        assert_eq!(a.cached_matchups(), 2);
    }

    #[test]
    fn test_skip_streak_respects_limit() {
        let mut config = SimConfig::default();
        config.scout.skip_limit = 2;

        let scout = Player::normalize(&json!({ "Class": 3, "Level": 10 }));
        let warrior = Player::normalize(&json!({ "Class": 1, "Level": 10 }));
        let mut a = Fighter::create(0, scout, &config).unwrap();
        let mut b = Fighter::create(1, warrior, &config).unwrap();
        initialize_fighters(&mut a, &mut b, Flags::default());

        let mut dice = ScriptedDice::new().always(true);
        assert!(a.skip(SkipType::Default, &mut dice));
        assert!(a.skip(SkipType::Default, &mut dice));
        assert!(!a.skip(SkipType::Default, &mut dice));
        assert_eq!(a.core.skip_count, 2);

        // Wrong kind never skips
        a.reset(true);
        assert!(!a.skip(SkipType::Control, &mut dice));
        assert_eq!(a.core.skip_count, 0);
    }

    #[test]
    fn test_attack_resets_streak_and_truncates() {
        let (mut a, mut b) = pair(json!({ "Class": 1, "Level": 10 }), json!({ "Class": 3, "Level": 10 }));
        b.core.skip_count = 3;

        let mut dice = ScriptedDice::new();
        let mut bout = Bout::new(&mut dice, None);
        let health = b.health();

        let alive = a.attack(
            Swing { damage: 10.9, skipped: false, critical: false, strike: Strike::Normal },
            &mut b,
            &mut bout,
        );
        assert!(alive);
        assert_eq!(b.health(), health - 10.0);
        assert_eq!(b.core.skip_count, 0);

        b.core.skip_count = 1;
        a.attack(
            Swing { damage: 500.0, skipped: true, critical: true, strike: Strike::Normal },
            &mut b,
            &mut bout,
        );
        assert_eq!(b.health(), health - 10.0);
        assert_eq!(b.core.skip_count, 1);
    }
}
