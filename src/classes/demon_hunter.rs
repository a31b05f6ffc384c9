use super::Mechanics;
use crate::config::DemonHunterConfig;
use crate::fighter::{Fighter, FighterCore, Life, Swing};
use crate::player::Class;
use crate::rng::Dice;
use crate::simulation::Bout;

/// Chance to rise again after a lethal blow, weaker with every revive
#[derive(Debug, Clone)]
pub struct DemonHunter {
    config: DemonHunterConfig,
    revives: u32,
}

impl DemonHunter {
    pub fn new(config: &DemonHunterConfig) -> Self {
        Self {
            config: config.clone(),
            revives: 0,
        }
    }

    pub fn revives(&self) -> u32 {
        self.revives
    }

    fn revive_chance(&self) -> f64 {
        self.config.revive_chance - self.config.revive_chance_decay * self.revives as f64
    }

    fn revive_fraction(&self) -> f64 {
        let decayed = self.config.revive_health - self.revives as f64 * self.config.revive_health_decay;
        decayed.max(self.config.revive_health_min)
    }
}

impl Mechanics for DemonHunter {
    fn reset(&mut self, _me: &FighterCore) {
        self.revives = 0;
    }

    fn attack(&mut self, me: &mut FighterCore, mut swing: Swing, target: &mut Fighter, bout: &mut Bout<'_>) -> bool {
        swing.damage *= 1.0 - self.config.revive_damage_decay * self.revives as f64;
        me.attack(swing, target, bout)
    }

    fn on_damage_taken(
        &mut self,
        me: &mut FighterCore,
        source: &FighterCore,
        damage: f64,
        bout: &mut Bout<'_>,
    ) -> Life {
        if me.take_damage(damage) == Life::Alive {
            return Life::Alive;
        }

        if source.class == Class::Mage || !bout.chance(self.revive_chance()) {
            return Life::Dead;
        }

        me.health = (me.total_health * self.revive_fraction()).min(me.total_health);
        self.revives += 1;

        if let Some(log) = bout.log() {
            log.record_revive(me);
        }

        Life::Alive
    }
}
