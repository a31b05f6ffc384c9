use super::{strike, Mechanics};
use crate::fighter::{Fighter, FighterCore, Strike};
use crate::simulation::Bout;

/// Denies the opponent's turn instead of evading; follow-up attacks chain
#[derive(Debug, Clone, Copy, Default)]
pub struct Berserker;

impl Mechanics for Berserker {
    fn control(&mut self, me: &mut FighterCore, target: &mut Fighter, bout: &mut Bout<'_>) {
        let kind = if me.skip_count > 0 {
            Strike::Chained
        } else {
            Strike::Normal
        };
        strike(self, me, target, bout, kind);
    }
}
