//! Per-fight results and matchup statistics

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Index of the winning fighter
    Winner(usize),
    /// Turn cap reached with both fighters standing
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FightResult {
    pub outcome: Outcome,
    /// Rage counter when the fight ended
    pub turns: u32,
    /// Scheduler iterations, denied turns included
    pub rounds: u32,
    /// Remaining health per fighter index, floored at 0
    pub health: [f64; 2],
}

impl FightResult {
    pub fn winner(&self) -> Option<usize> {
        match self.outcome {
            Outcome::Winner(index) => Some(index),
            Outcome::Draw => None,
        }
    }
}

/// Aggregate of many fights of the same matchup
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchupStats {
    pub fights: usize,
    pub wins: [usize; 2],
    pub draws: usize,
    /// Share of fights won by fighter 0
    pub win_rate: f64,

    pub avg_rounds: f64,
    pub std_rounds: f64,
    pub min_rounds: u32,
    pub max_rounds: u32,

    pub avg_health_left: [f64; 2],
}

impl MatchupStats {
    pub fn from_results(results: &[FightResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let n = results.len() as f64;
        let mut stats = Self {
            fights: results.len(),
            min_rounds: u32::MAX,
            ..Self::default()
        };

        for result in results {
            match result.outcome {
                Outcome::Winner(index) => stats.wins[index.min(1)] += 1,
                Outcome::Draw => stats.draws += 1,
            }

            stats.min_rounds = stats.min_rounds.min(result.rounds);
            stats.max_rounds = stats.max_rounds.max(result.rounds);
            stats.avg_rounds += result.rounds as f64;
            stats.avg_health_left[0] += result.health[0];
            stats.avg_health_left[1] += result.health[1];
        }

        stats.avg_rounds /= n;
        stats.avg_health_left[0] /= n;
        stats.avg_health_left[1] /= n;
        stats.win_rate = stats.wins[0] as f64 / n;

        let variance = results
            .iter()
            .map(|r| (r.rounds as f64 - stats.avg_rounds).powi(2))
            .sum::<f64>()
            / n;
        stats.std_rounds = variance.sqrt();

        stats
    }
}
