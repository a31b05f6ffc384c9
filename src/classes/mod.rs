//! Class mechanics
//!
//! Each class is a variant of [`ClassKit`]. Behaviour shared by all classes lives in the
//! default methods of [`Mechanics`]; a class overrides only the hooks it changes.

mod assassin;
mod bard;
mod battlemage;
mod berserker;
mod demon_hunter;
mod druid;

pub use assassin::Assassin;
pub use bard::Bard;
pub use battlemage::Battlemage;
pub use berserker::Berserker;
pub use demon_hunter::DemonHunter;
pub use druid::Druid;

use crate::config::{Flags, SimConfig, SkipType};
use crate::fighter::{DamageRange, Derived, Fighter, FighterCore, Life, Strike, Swing};
use crate::player::Class;
use crate::rng::Dice;
use crate::simulation::Bout;

/// Hooks the fight engine calls on the active class
pub trait Mechanics {
    /// Add class specific entries to freshly derived data
    fn extend_data(&self, _me: &FighterCore, _target: &FighterCore, _flags: Flags, _data: &mut Derived) {}

    /// Re-arm per-fight counters
    fn reset(&mut self, _me: &FighterCore) {}

    /// Runs once before the first turn
    fn before(&mut self, _me: &mut FighterCore, _target: &mut Fighter, _bout: &mut Bout<'_>) {}

    /// Take one turn
    fn control(&mut self, me: &mut FighterCore, target: &mut Fighter, bout: &mut Bout<'_>) {
        strike(self, me, target, bout, Strike::Normal);
    }

    fn attack(&mut self, me: &mut FighterCore, swing: Swing, target: &mut Fighter, bout: &mut Bout<'_>) -> bool {
        me.attack(swing, target, bout)
    }

    fn on_damage_taken(
        &mut self,
        me: &mut FighterCore,
        _source: &FighterCore,
        damage: f64,
        _bout: &mut Bout<'_>,
    ) -> Life {
        me.take_damage(damage)
    }
}

/// Roll one swing with `range`: rage, damage sample, the target's skip, own critical
pub fn roll_swing(
    me: &FighterCore,
    range: DamageRange,
    target: &mut Fighter,
    bout: &mut Bout<'_>,
    kind: Strike,
) -> Swing {
    let rage = bout.rage();
    let damage = rage * range.sample(bout);
    let skipped = target.skip(SkipType::Default, bout);
    let critical = bout.chance(me.profile().critical_chance);

    Swing {
        damage,
        skipped,
        critical,
        strike: kind,
    }
}

/// Main-hand attack through the class's own `attack` hook
pub fn strike<K: Mechanics + ?Sized>(
    kit: &mut K,
    me: &mut FighterCore,
    target: &mut Fighter,
    bout: &mut Bout<'_>,
    kind: Strike,
) -> bool {
    let swing = roll_swing(me, me.data().weapon1, target, bout, kind);
    kit.attack(me, swing, target, bout)
}

/// Warrior, Mage and Scout
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl Mechanics for Plain {}

#[derive(Debug, Clone)]
pub enum ClassKit {
    Plain(Plain),
    Assassin(Assassin),
    Battlemage(Battlemage),
    Berserker(Berserker),
    DemonHunter(DemonHunter),
    Druid(Druid),
    Bard(Bard),
}

impl ClassKit {
    pub fn new(class: Class, config: &SimConfig, core: &FighterCore) -> Self {
        match class {
            Class::Warrior | Class::Mage | Class::Scout => ClassKit::Plain(Plain),
            Class::Assassin => ClassKit::Assassin(Assassin),
            Class::Battlemage => ClassKit::Battlemage(Battlemage::new(&config.battlemage)),
            Class::Berserker => ClassKit::Berserker(Berserker),
            Class::DemonHunter => ClassKit::DemonHunter(DemonHunter::new(&config.demon_hunter)),
            Class::Druid => ClassKit::Druid(Druid::new(&config.druid)),
            Class::Bard => ClassKit::Bard(Bard::new(&config.bard, core)),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $kit:ident => $body:expr) => {
        match $self {
            ClassKit::Plain($kit) => $body,
            ClassKit::Assassin($kit) => $body,
            ClassKit::Battlemage($kit) => $body,
            ClassKit::Berserker($kit) => $body,
            ClassKit::DemonHunter($kit) => $body,
            ClassKit::Druid($kit) => $body,
            ClassKit::Bard($kit) => $body,
        }
    };
}

impl Mechanics for ClassKit {
    fn extend_data(&self, me: &FighterCore, target: &FighterCore, flags: Flags, data: &mut Derived) {
        dispatch!(self, kit => kit.extend_data(me, target, flags, data))
    }

    fn reset(&mut self, me: &FighterCore) {
        dispatch!(self, kit => kit.reset(me))
    }

    fn before(&mut self, me: &mut FighterCore, target: &mut Fighter, bout: &mut Bout<'_>) {
        dispatch!(self, kit => kit.before(me, target, bout))
    }

    fn control(&mut self, me: &mut FighterCore, target: &mut Fighter, bout: &mut Bout<'_>) {
        dispatch!(self, kit => kit.control(me, target, bout))
    }

    fn attack(&mut self, me: &mut FighterCore, swing: Swing, target: &mut Fighter, bout: &mut Bout<'_>) -> bool {
        dispatch!(self, kit => kit.attack(me, swing, target, bout))
    }

    fn on_damage_taken(
        &mut self,
        me: &mut FighterCore,
        source: &FighterCore,
        damage: f64,
        bout: &mut Bout<'_>,
    ) -> Life {
        dispatch!(self, kit => kit.on_damage_taken(me, source, damage, bout))
    }
}
