use super::Mechanics;
use crate::config::BattlemageConfig;
use crate::fighter::{Fighter, FighterCore};
use crate::player::Class;
use crate::simulation::Bout;

/// Opens every fight with a fireball
#[derive(Debug, Clone)]
pub struct Battlemage {
    dynamic_scaling: bool,
    scales_with_current_health: bool,
    uncapped: bool,
}

impl Battlemage {
    pub fn new(config: &BattlemageConfig) -> Self {
        Self {
            dynamic_scaling: config.dynamic_fireball_scaling,
            scales_with_current_health: config.fireball_scales_with_current_health,
            uncapped: config.no_fireball_cap,
        }
    }

    pub fn fireball_damage(&self, me: &FighterCore, target: &FighterCore) -> f64 {
        if target.class == Class::Mage {
            return 0.0;
        }

        let mut multiplier = 0.05 * target.config.health_multiplier;
        let mut cap = 1.0 / 3.0;

        if self.dynamic_scaling {
            let reduction = me.config.maximum_damage_reduction * me.config.maximum_damage_reduction_multiplier;
            let factor = 1.0 - 0.375 / (1.0 - reduction / 100.0);

            multiplier = factor / me.config.health_multiplier * target.config.health_multiplier;
            cap = (1.0 / (1.0 - factor) - 1.0).ceil();
        }

        if self.uncapped {
            cap = 1.0;
        }

        let own = if self.scales_with_current_health {
            me.health
        } else {
            me.total_health
        };

        (target.total_health * cap).ceil().min((own * multiplier).ceil())
    }
}

impl Mechanics for Battlemage {
    fn before(&mut self, me: &mut FighterCore, target: &mut Fighter, bout: &mut Bout<'_>) {
        bout.rage();

        let damage = self.fireball_damage(me, &target.core);
        if let Some(log) = bout.log() {
            log.record_fireball(me, &target.core, damage);
        }

        if damage > 0.0 {
            target.on_damage_taken(me, damage, bout);
        }
    }
}
