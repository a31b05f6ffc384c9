use super::Mechanics;
use crate::config::{DruidConfig, Flags};
use crate::fighter::{Derived, Fighter, FighterCore, Life, Profile, Stance, Strike, Swing};
use crate::player::Class;
use crate::rng::Dice;
use crate::simulation::Bout;

/// Shape shifter. An avoided hit arms a rage action; baseline attacks may swoop.
#[derive(Debug, Clone)]
pub struct Druid {
    config: DruidConfig,
    swoop_multiplier: f64,
    swoop_chance: f64,
    rage_pending: bool,
}

impl Druid {
    pub fn new(config: &DruidConfig) -> Self {
        let multiplier = config.base.damage_multiplier;

        Self {
            config: config.clone(),
            swoop_multiplier: (multiplier + config.swoop_bonus) / multiplier,
            swoop_chance: config.swoop_chance,
            rage_pending: false,
        }
    }

    pub fn swoop_chance(&self) -> f64 {
        self.swoop_chance
    }

    pub fn rage_pending(&self) -> bool {
        self.rage_pending
    }
}

impl Mechanics for Druid {
    fn extend_data(&self, me: &FighterCore, target: &FighterCore, _flags: Flags, data: &mut Derived) {
        let rage = &self.config.rage;

        data.rage = Some(Profile {
            skip_chance: if target.class == Class::Mage {
                0.0
            } else {
                rage.skip_chance
            },
            critical_chance: me.critical_chance(target, rage.critical_chance, 0.10),
            critical_multiplier: data.baseline.critical_multiplier + rage.critical_bonus,
        });
    }

    fn reset(&mut self, _me: &FighterCore) {
        self.swoop_chance = self.config.swoop_chance;
        self.rage_pending = false;
    }

    // The stance changes only once the swing is rolled, so the critical roll of an action
    // uses the stance left by the previous one
    fn attack(&mut self, me: &mut FighterCore, swing: Swing, target: &mut Fighter, bout: &mut Bout<'_>) -> bool {
        if self.rage_pending {
            self.rage_pending = false;
            me.enter_stance(Stance::Rage);
        } else if me.special_state() {
            me.enter_stance(Stance::Baseline);
        }

        if me.special_state() || !bout.chance(self.swoop_chance) {
            return me.attack(swing, target, bout);
        }

        self.swoop_chance = (self.swoop_chance - self.config.swoop_chance_decay)
            .clamp(self.config.swoop_chance_min, self.config.swoop_chance_max);

        let swoop = Swing {
            damage: swing.damage * self.swoop_multiplier,
            critical: false,
            strike: Strike::Swoop,
            ..swing
        };
        me.attack(swoop, target, bout)
    }

    fn on_damage_taken(
        &mut self,
        me: &mut FighterCore,
        _source: &FighterCore,
        damage: f64,
        _bout: &mut Bout<'_>,
    ) -> Life {
        if damage == 0.0 && !me.special_state() {
            self.rage_pending = true;
        }

        me.take_damage(damage)
    }
}
