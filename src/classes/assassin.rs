use super::{roll_swing, Mechanics};
use crate::config::Flags;
use crate::fighter::{Derived, Fighter, FighterCore, Strike};
use crate::simulation::Bout;

/// Dual wielder: a landed main-hand hit is followed by an off-hand swing
#[derive(Debug, Clone, Copy, Default)]
pub struct Assassin;

impl Mechanics for Assassin {
    fn extend_data(&self, me: &FighterCore, target: &FighterCore, flags: Flags, data: &mut Derived) {
        data.weapon2 = Some(me.damage_range(&me.player.items.wpn2, target, true, flags));
    }

    fn control(&mut self, me: &mut FighterCore, target: &mut Fighter, bout: &mut Bout<'_>) {
        let main = roll_swing(me, me.data().weapon1, target, bout, Strike::Normal);
        let landed = !main.skipped;

        if !self.attack(me, main, target, bout) || !landed {
            return;
        }

        if let Some(range) = me.data().weapon2 {
            let off_hand = roll_swing(me, range, target, bout, Strike::Secondary);
            self.attack(me, off_hand, target, bout);
        }
    }
}
