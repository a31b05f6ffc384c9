//! Match scheduler and batch runner

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::config::{RunOptions, SimConfig, SkipType};
use crate::error::Result;
use crate::fighter::{initialize_fighters, Fighter};
use crate::log::FightLog;
use crate::player::Player;
use crate::rng::{Dice, FastRng};
use crate::stats::{FightResult, MatchupStats, Outcome};

/// Per-fight context handed to class hooks: the dice, the optional log and the rage counter
pub struct Bout<'a> {
    dice: &'a mut dyn Dice,
    log: Option<&'a mut FightLog>,
    turn: u32,
}

impl<'a> Bout<'a> {
    pub fn new(dice: &'a mut dyn Dice, log: Option<&'a mut FightLog>) -> Self {
        Self { dice, log, turn: 0 }
    }

    /// Current rage multiplier; advances the turn counter
    pub fn rage(&mut self) -> f64 {
        let rage = 1.0 + self.turn as f64 / 6.0;
        self.turn += 1;

        if let Some(log) = self.log.as_deref_mut() {
            log.record_rage(rage);
        }

        rage
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn log(&mut self) -> Option<&mut FightLog> {
        self.log.as_deref_mut()
    }
}

impl Dice for Bout<'_> {
    #[inline(always)]
    fn unit(&mut self) -> f64 {
        self.dice.unit()
    }

    #[inline(always)]
    fn chance(&mut self, p: f64) -> bool {
        self.dice.chance(p)
    }
}

/// Two prepared fighters plus the options they fight under
#[derive(Debug, Clone)]
pub struct Simulator {
    fighters: [Fighter; 2],
    options: RunOptions,
    log: FightLog,
}

impl Simulator {
    pub fn new(mut a: Fighter, mut b: Fighter, options: RunOptions) -> Self {
        initialize_fighters(&mut a, &mut b, options.flags);

        Self {
            fighters: [a, b],
            options,
            log: FightLog::default(),
        }
    }

    pub fn from_players(players: [Player; 2], config: &SimConfig, options: RunOptions) -> Result<Self> {
        let [a, b] = players;
        let a = Fighter::create(0, a, config)?;
        let b = Fighter::create(1, b, config)?;

        Ok(Self::new(a, b, options))
    }

    /// Run one fight from the fighters' current state; true when fighter 0 wins
    pub fn fight<R: Dice>(&mut self, dice: &mut R) -> bool {
        self.fight_result(dice).outcome == Outcome::Winner(0)
    }

    /// Reset both fighters to full health, then fight
    pub fn fresh_fight<R: Dice>(&mut self, dice: &mut R) -> FightResult {
        self.reset(true);
        self.fight_result(dice)
    }

    /// Run one fight without resetting first. Health left over from a previous bout
    /// (see [`Simulator::reset`]) carries into this one.
    pub fn fight_result<R: Dice>(&mut self, dice: &mut R) -> FightResult {
        let log = if self.options.log_enabled {
            self.log.open_session(&self.fighters[0].core, &self.fighters[1].core);
            Some(&mut self.log)
        } else {
            None
        };
        let mut bout = Bout::new(dice, log);
        let max_turns = self.options.max_turns;

        let [first, second] = &mut self.fighters;
        let (mut a, mut b) = (first, second);

        let swap = if a.core.attack_first == b.core.attack_first {
            bout.chance(0.5)
        } else {
            b.core.attack_first
        };
        if swap {
            std::mem::swap(&mut a, &mut b);
        }

        a.before(b, &mut bout);
        b.before(a, &mut bout);

        let mut rounds = 0;
        while a.is_alive() && b.is_alive() && rounds < max_turns {
            if b.skip(SkipType::Control, &mut bout) {
                bout.rage();
            } else {
                a.control(b, &mut bout);
            }

            std::mem::swap(&mut a, &mut b);
            rounds += 1;
        }

        let outcome = if a.is_alive() && b.is_alive() {
            Outcome::Draw
        } else if a.is_alive() {
            Outcome::Winner(a.index())
        } else {
            Outcome::Winner(b.index())
        };
        let turns = bout.turn();

        trace!(?outcome, rounds, turns, "fight finished");

        FightResult {
            outcome,
            turns,
            rounds,
            health: [
                self.fighters[0].health().max(0.0),
                self.fighters[1].health().max(0.0),
            ],
        }
    }

    pub fn reset(&mut self, reset_health: bool) {
        for fighter in &mut self.fighters {
            fighter.reset(reset_health);
        }
    }

    pub fn fighters(&self) -> &[Fighter; 2] {
        &self.fighters
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn log(&self) -> &FightLog {
        &self.log
    }

    /// Copy for batch trials: same prepared fighters, logging off
    pub fn trial(&self) -> Simulator {
        Simulator {
            fighters: self.fighters.clone(),
            options: RunOptions {
                log_enabled: false,
                ..self.options
            },
            log: FightLog::default(),
        }
    }
}

/// Worker count for batch runs: about 70% of the cores so the machine stays responsive
pub fn default_threads() -> usize {
    let cores = num_cpus::get();

    ((cores as f64 * 0.70).round() as usize)
        .max(2)
        .min(cores.saturating_sub(1).max(1))
}

/// Run fights in parallel, trial `i` seeded with `seed + i`
pub fn run_fights_parallel(simulator: &Simulator, count: usize, seed: u64) -> Vec<FightResult> {
    let template = simulator.trial();

    (0..count)
        .into_par_iter()
        .map_init(
            || template.clone(),
            |sim, i| {
                let mut rng = FastRng::new(seed.wrapping_add(i as u64));
                sim.fresh_fight(&mut rng)
            },
        )
        .collect()
}

/// Run fights sequentially from one seeded generator
pub fn run_fights_sequential(simulator: &Simulator, count: usize, seed: u64) -> Vec<FightResult> {
    let mut sim = simulator.trial();
    let mut rng = FastRng::new(seed);

    (0..count).map(|_| sim.fresh_fight(&mut rng)).collect()
}

/// Replay the prepared matchup `count` times and aggregate the results
pub fn run_matchup(simulator: &Simulator, count: usize, parallel: bool, seed: u64) -> MatchupStats {
    debug!(fights = count, parallel, seed, "running matchup");

    let results = if parallel {
        run_fights_parallel(simulator, count, seed)
    } else {
        run_fights_sequential(simulator, count, seed)
    };

    let stats = MatchupStats::from_results(&results);
    debug!(win_rate = stats.win_rate, draws = stats.draws, "matchup finished");

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Flags;
    use crate::rng::ScriptedDice;
    use serde_json::json;

    fn simulator(a: serde_json::Value, b: serde_json::Value, options: RunOptions) -> Simulator {
        let players = [Player::normalize(&a), Player::normalize(&b)];
        Simulator::from_players(players, &SimConfig::default(), options).unwrap()
    }

    fn warrior_vs_mage(options: RunOptions) -> Simulator {
        simulator(
            json!({ "Class": 1, "Level": 20, "Strength": 100, "Constitution": 100, "Luck": 50 }),
            json!({ "Class": 2, "Level": 20, "Intelligence": 100, "Constitution": 100, "Luck": 50 }),
            options,
        )
    }

    #[test]
    fn test_rage_progression() {
        let mut dice = ScriptedDice::new();
        let mut bout = Bout::new(&mut dice, None);

        assert_eq!(bout.rage(), 1.0);
        for _ in 0..5 {
            bout.rage();
        }
        assert_eq!(bout.rage(), 2.0);
        assert_eq!(bout.turn(), 7);
    }

    #[test]
    fn test_fight_is_reproducible() {
        let options = RunOptions {
            log_enabled: true,
            ..RunOptions::default()
        };
        let mut first = warrior_vs_mage(options);
        let mut second = warrior_vs_mage(options);

        for seed in 0..20 {
            let a = first.fresh_fight(&mut FastRng::new(seed));
            let b = second.fresh_fight(&mut FastRng::new(seed));
            assert_eq!(a, b);
        }
        assert_eq!(first.log().dump(), second.log().dump());
        assert_eq!(first.log().dump().len(), 20);
    }

    #[test]
    fn test_off_hand_enchantment_attacks_first() {
        let mut sim = simulator(
            json!({ "Class": 3, "Level": 10, "Constitution": 10 }),
            json!({ "Class": 3, "Level": 10, "Constitution": 10, "Items": { "Hand": { "HasEnchantment": true } } }),
            RunOptions {
                log_enabled: true,
                ..RunOptions::default()
            },
        );

        // No coin flip is drawn: the first flip is the evade roll of fighter 0
        sim.fight_result(&mut ScriptedDice::new());
        let session = sim.log().last_session().unwrap();
        assert_eq!(session.rounds[0].attacker_id, "1");
    }

    #[test]
    fn test_coin_flip_decides_equal_initiative() {
        let options = RunOptions {
            log_enabled: true,
            ..RunOptions::default()
        };
        let mut sim = simulator(
            json!({ "Class": 1, "Level": 10, "Constitution": 10 }),
            json!({ "Class": 1, "Level": 10, "Constitution": 10 }),
            options,
        );

        sim.fight_result(&mut ScriptedDice::new().with_flips([true]));
        assert_eq!(sim.log().last_session().unwrap().rounds[0].attacker_id, "1");

        sim.fresh_fight(&mut ScriptedDice::new().with_flips([false]));
        assert_eq!(sim.log().last_session().unwrap().rounds[0].attacker_id, "0");
    }

    #[test]
    fn test_turn_cap_ends_in_draw() {
        // Two scouts that always evade never land a hit
        let options = RunOptions {
            max_turns: 50,
            ..RunOptions::default()
        };
        let mut sim = simulator(
            json!({ "Class": 3, "Level": 10, "Constitution": 10 }),
            json!({ "Class": 3, "Level": 10, "Constitution": 10 }),
            options,
        );

        let result = sim.fight_result(&mut ScriptedDice::new().always(true));
        assert_eq!(result.outcome, Outcome::Draw);
        assert_eq!(result.rounds, 50);
        assert_eq!(result.health, [sim.fighters()[0].total_health(), sim.fighters()[1].total_health()]);
        assert!(!sim.fight(&mut ScriptedDice::new().always(true)));
    }

    #[test]
    fn test_stun_advances_rage_without_attacking() {
        let options = RunOptions {
            max_turns: 3,
            log_enabled: true,
            ..RunOptions::default()
        };
        let mut sim = simulator(
            json!({ "Class": 6, "Level": 10, "Constitution": 10 }),
            json!({ "Class": 3, "Level": 10, "Constitution": 10 }),
            options,
        );

        // Every flip succeeds: the berserker stuns whenever the scout would act
        let result = sim.fight_result(&mut ScriptedDice::new().always(true));
        assert_eq!(result.rounds, 3);
        assert_eq!(result.turns, 3);

        let rounds = &sim.log().last_session().unwrap().rounds;
        assert!(rounds.iter().all(|round| round.attacker_id == "0"));
    }

    #[test]
    fn test_winner_by_index() {
        let mut sim = simulator(
            json!({ "Class": 1, "Level": 100, "Strength": 5000, "Constitution": 5000 }),
            json!({ "Class": 3, "Level": 1, "Constitution": 1 }),
            RunOptions::default(),
        );

        let wins = (0..50)
            .filter(|seed| sim.fresh_fight(&mut FastRng::new(*seed)).winner() == Some(0))
            .count();
        assert_eq!(wins, 50);
    }

    #[test]
    fn test_partial_reset_carries_health_into_next_bout() {
        let mut sim = warrior_vs_mage(RunOptions::default());
        let first = sim.fight_result(&mut FastRng::new(3));
        let winner = first.winner().unwrap();
        let loser = 1 - winner;
        let winner_health = sim.fighters()[winner].health();

        sim.reset(false);
        assert!(sim.fighters()[loser].health() <= 0.0);

        // The loser is still down, so the bout ends before anyone acts
        let second = sim.fight_result(&mut FastRng::new(4));
        assert_eq!(second.rounds, 0);
        assert_eq!(second.winner(), Some(winner));
        assert_eq!(sim.fighters()[winner].health(), winner_health);
        assert_eq!(second.health[loser], 0.0);

        // A full reset restores both sides
        let third = sim.fresh_fight(&mut FastRng::new(4));
        assert!(third.rounds > 0);
    }

    #[test]
    fn test_flags_flow_into_derived_data() {
        let a = json!({ "Class": 1, "Level": 50, "Strength": 500, "Fortress": { "Gladiator": 5 } });
        let b = json!({ "Class": 1, "Level": 50, "Strength": 500, "Fortress": { "Gladiator": 5 } });

        let plain = simulator(a.clone(), b.clone(), RunOptions::default());
        let no_reduction = simulator(
            a,
            b,
            RunOptions {
                flags: Flags {
                    no_gladiator_reduction: true,
                    ..Flags::default()
                },
                ..RunOptions::default()
            },
        );

        let plain = plain.fighters()[0].data().baseline.critical_multiplier;
        let boosted = no_reduction.fighters()[0].data().baseline.critical_multiplier;
        assert!((boosted - plain - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_batch_runs() {
        let sim = warrior_vs_mage(RunOptions::default());

        let parallel = run_fights_parallel(&sim, 64, 42);
        assert_eq!(parallel, run_fights_parallel(&sim, 64, 42));

        let stats = run_matchup(&sim, 64, false, 7);
        assert_eq!(stats.fights, 64);
        assert_eq!(stats.wins[0] + stats.wins[1] + stats.draws, 64);
        assert!(stats.win_rate >= 0.0 && stats.win_rate <= 1.0);
    }

    #[test]
    fn test_default_threads_is_positive() {
        let threads = default_threads();
        assert!(threads >= 1);
        assert!(threads <= num_cpus::get().max(2));
    }
}
