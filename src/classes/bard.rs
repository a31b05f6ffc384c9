use super::{strike, Mechanics};
use crate::config::{BardConfig, Flags};
use crate::fighter::{Derived, Fighter, FighterCore, Strike, Swing};
use crate::player::Class;
use crate::rng::Dice;
use crate::simulation::Bout;

/// Plays a song every few actions that boosts the next attacks
#[derive(Debug, Clone)]
pub struct Bard {
    config: BardConfig,
    /// Cumulative tier weights
    brackets: [f64; 3],
    bonus_rounds: u32,

    /// Active tier, 1-based
    level: u32,
    /// Attacks the current song lasts
    duration: u32,
    /// Attacks already boosted by the current song
    consumed: u32,
    /// Actions since the last song
    since_song: u32,
    multiplier: f64,
}

impl Bard {
    pub fn new(config: &BardConfig, core: &FighterCore) -> Self {
        let chances = config.effect_base_chance;
        let brackets = [
            chances[0],
            chances[0] + chances[1],
            chances[0] + chances[1] + chances[2],
        ];

        let main = core.player.attribute(core.config.attribute);
        let constitution = core.player.constitution;
        let mut bonus_rounds = 0;
        if constitution >= main / 2.0 {
            bonus_rounds += 1;
        }
        if constitution >= 3.0 * main / 4.0 {
            bonus_rounds += 1;
        }

        let mut bard = Self {
            config: config.clone(),
            brackets,
            bonus_rounds,
            level: 0,
            duration: 0,
            consumed: 0,
            since_song: 0,
            multiplier: 0.0,
        };
        bard.rearm();
        bard
    }

    fn rearm(&mut self) {
        self.level = 0;
        self.duration = 0;
        self.multiplier = 0.0;
        self.consumed = 0;
        // The first action always sings
        self.since_song = self.config.effect_rounds;
    }

    /// Damage multiplier of the running song, 0 when silent
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn bonus_rounds(&self) -> u32 {
        self.bonus_rounds
    }

    fn sing(&mut self, dice: &mut dyn Dice) {
        let roll = dice.unit() * self.brackets[2];
        let tier = if roll <= self.brackets[0] {
            0
        } else if roll <= self.brackets[1] {
            1
        } else {
            2
        };

        self.level = tier as u32 + 1;
        self.duration = self.config.effect_base_duration[tier] + self.bonus_rounds;
        self.consumed = 0;
        self.since_song = 0;
        self.multiplier = 1.0 + self.config.effect_values[tier] / 100.0;
    }
}

impl Mechanics for Bard {
    fn extend_data(&self, _me: &FighterCore, target: &FighterCore, _flags: Flags, data: &mut Derived) {
        data.sings_before_attack = target.class != Class::Mage;
    }

    fn reset(&mut self, _me: &FighterCore) {
        self.rearm();
    }

    fn control(&mut self, me: &mut FighterCore, target: &mut Fighter, bout: &mut Bout<'_>) {
        if me.data().sings_before_attack {
            self.since_song += 1;
            if self.since_song >= self.config.effect_rounds {
                self.sing(bout);
            }
        }

        strike(self, me, target, bout, Strike::Normal);
    }

    fn attack(&mut self, me: &mut FighterCore, mut swing: Swing, target: &mut Fighter, bout: &mut Bout<'_>) -> bool {
        let singing = self.multiplier > 0.0;
        if singing {
            swing.damage *= self.multiplier;
        }

        let alive = me.attack(swing, target, bout);

        if singing {
            self.consumed += 1;
            if let Some(log) = bout.log() {
                let notes = (self.duration + 1).saturating_sub(self.consumed);
                log.record_song(me, &target.core, self.level, notes);
            }
            if self.consumed >= self.duration {
                self.multiplier = 0.0;
            }
        }

        alive
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::duel;
    use super::*;
    use crate::classes::ClassKit;
    use crate::log::{AttackKind, FightLog};
    use crate::rng::ScriptedDice;
    use serde_json::json;

    fn kit(fighter: &Fighter) -> &Bard {
        match fighter.kit() {
            ClassKit::Bard(kit) => kit,
            other => panic!("expected a bard, got {other:?}"),
        }
    }

    #[test]
    fn test_bonus_rounds_follow_constitution() {
        let cases = [(40.0, 0), (50.0, 1), (75.0, 2), (200.0, 2)];
        for (constitution, expected) in cases {
            let (bard, _) = duel(
                json!({ "Class": 9, "Level": 10, "Intelligence": 100, "Constitution": constitution }),
                json!({ "Class": 1, "Level": 10 }),
            );
            assert_eq!(kit(&bard).bonus_rounds(), expected, "constitution {constitution}");
        }
    }

    #[test]
    fn test_silent_against_mage() {
        let (mut bard, mut mage) = duel(
            json!({ "Class": 9, "Level": 10, "Intelligence": 100 }),
            json!({ "Class": 2, "Level": 10, "Constitution": 1000 }),
        );
        assert!(!bard.data().sings_before_attack);

        let mut dice = ScriptedDice::new().with_units([0.999]);
        let mut bout = Bout::new(&mut dice, None);
        bard.control(&mut mage, &mut bout);
        drop(bout);

        assert_eq!(kit(&bard).multiplier(), 0.0);
        // The only sample went to damage
        assert_eq!(dice.remaining_units(), 0);
    }

    #[test]
    fn test_tier_brackets() {
        let (mut bard, mut warrior) = duel(
            json!({ "Class": 9, "Level": 10, "Intelligence": 100, "Constitution": 100 }),
            json!({ "Class": 1, "Level": 10, "Constitution": 10000 }),
        );

        // Rolls of 0.25 and 0.75 sit on the bracket edges and stay in the lower tier
        for (unit, multiplier) in [(0.1, 1.2), (0.25, 1.2), (0.5, 1.4), (0.75, 1.4), (0.9, 1.6)] {
            bard.reset(true);
            let mut dice = ScriptedDice::new().with_units([unit]);
            let mut bout = Bout::new(&mut dice, None);
            bard.control(&mut warrior, &mut bout);
            assert!((kit(&bard).multiplier() - multiplier).abs() < 1e-12, "roll {unit}");
        }
    }

    #[test]
    fn test_song_consumption_is_logged() {
        let (mut bard, mut warrior) = duel(
            json!({ "Class": 9, "Level": 10, "Intelligence": 100, "Constitution": 100 }),
            json!({ "Class": 1, "Level": 10, "Constitution": 10000 }),
        );
        let mut log = FightLog::default();
        log.open_session(&bard.core, &warrior.core);

        // Middle tier: one base attack plus two bonus rounds
        let mut dice = ScriptedDice::new().with_units([0.5]);
        let mut bout = Bout::new(&mut dice, Some(&mut log));
        for _ in 0..4 {
            bard.control(&mut warrior, &mut bout);
        }
        drop(bout);

        let songs: Vec<_> = log.dump()[0]
            .rounds
            .iter()
            .filter_map(|round| match round.attack_type.kind {
                AttackKind::Song { level, notes } => Some((level, notes)),
                _ => None,
            })
            .collect();
        assert_eq!(songs, vec![(2, 3), (2, 2), (2, 1)]);
        assert_eq!(log.dump()[0].rounds[1].attack_code, 200 + 30 + 2);
    }
}
