//! Duel outcome simulator
//!
//! Predicts one-on-one fights between two character builds. A fight is a deterministic
//! state machine driven by a [`rng::Dice`]; many seeded fights give a win probability.

pub mod classes;
pub mod config;
pub mod error;
pub mod fighter;
pub mod log;
pub mod player;
pub mod rng;
pub mod simulation;
pub mod stats;

pub use config::{ConfigRegistry, Flags, MatchupFile, RunOptions, SimConfig};
pub use error::{Result, SimError};
pub use fighter::{initialize_fighters, Fighter};
pub use log::FightLog;
pub use player::{Class, Player};
pub use rng::{Dice, FastRng, ScriptedDice};
pub use simulation::{run_matchup, Simulator};
pub use stats::{FightResult, MatchupStats, Outcome};
