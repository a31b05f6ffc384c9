//! Fight audit log
//!
//! Records every action of a fight when logging is enabled in the run options. Each fight
//! opens a [`FightSession`] holding snapshots of both fighters followed by one
//! [`RoundRecord`] per logged action.

use serde::Serialize;

use crate::fighter::{FighterCore, Strike, Swing};
use crate::player::{Class, Weapon};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttackKind {
    Normal,
    Swoop,
    Fireball,
    Revive,
    Song { level: u32, notes: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Qualifier {
    Normal,
    Critical,
    Blocked,
    Evaded,
    CriticalBlocked,
    CriticalEvaded,
}

impl Qualifier {
    fn offset(self) -> u32 {
        match self {
            Qualifier::Normal => 0,
            Qualifier::Critical => 1,
            Qualifier::Blocked => 3,
            Qualifier::Evaded => 4,
            Qualifier::CriticalBlocked => 8,
            Qualifier::CriticalEvaded => 9,
        }
    }
}

/// Structured attack classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttackType {
    pub kind: AttackKind,
    pub qualifier: Qualifier,
    pub secondary: bool,
    pub chained: bool,
    pub special: bool,
}

impl AttackType {
    fn plain(kind: AttackKind, qualifier: Qualifier) -> Self {
        Self {
            kind,
            qualifier,
            secondary: false,
            chained: false,
            special: matches!(kind, AttackKind::Revive | AttackKind::Song { .. }),
        }
    }

    /// Classify a swing. Skipped hits on a warrior count as blocked, on anyone else as evaded.
    pub fn classify(strike: Strike, skipped: bool, critical: bool, target: Class) -> Self {
        let warrior = target == Class::Warrior;

        if strike == Strike::Swoop {
            let qualifier = match (skipped, warrior) {
                (false, _) => Qualifier::Normal,
                (true, true) => Qualifier::Blocked,
                (true, false) => Qualifier::Evaded,
            };
            return Self::plain(AttackKind::Swoop, qualifier);
        }

        let qualifier = match (critical, skipped, warrior) {
            (false, false, _) => Qualifier::Normal,
            (true, false, _) => Qualifier::Critical,
            (false, true, true) => Qualifier::Blocked,
            (false, true, false) => Qualifier::Evaded,
            (true, true, true) => Qualifier::CriticalBlocked,
            (true, true, false) => Qualifier::CriticalEvaded,
        };

        Self {
            secondary: strike == Strike::Secondary,
            chained: strike == Strike::Chained,
            ..Self::plain(AttackKind::Normal, qualifier)
        }
    }

    pub fn fireball(damage: f64) -> Self {
        let qualifier = if damage == 0.0 {
            Qualifier::Blocked
        } else {
            Qualifier::Normal
        };
        Self::plain(AttackKind::Fireball, qualifier)
    }

    pub fn revive() -> Self {
        Self::plain(AttackKind::Revive, Qualifier::Normal)
    }

    pub fn song(level: u32, notes: u32) -> Self {
        Self::plain(AttackKind::Song { level, notes }, Qualifier::Normal)
    }

    /// Numeric code used by existing fight log tooling
    pub fn code(&self) -> u32 {
        match self.kind {
            AttackKind::Normal => {
                let family = if self.secondary {
                    10
                } else if self.chained {
                    20
                } else {
                    0
                };
                family + self.qualifier.offset()
            }
            AttackKind::Swoop => match self.qualifier {
                Qualifier::Blocked | Qualifier::CriticalBlocked => 6,
                Qualifier::Evaded | Qualifier::CriticalEvaded => 7,
                _ => 5,
            },
            AttackKind::Fireball => {
                if self.qualifier == Qualifier::Blocked {
                    16
                } else {
                    15
                }
            }
            AttackKind::Revive => 100,
            AttackKind::Song { level, notes } => 200 + 10 * notes + level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub attacker_id: String,
    pub attacker_special_state: bool,
    pub target_id: String,
    pub target_special_state: bool,
    pub target_health_left: f64,
    pub target_skip_count: u32,
    pub attack_damage: f64,
    pub attack_rage: f64,
    pub attack_type: AttackType,
    pub attack_code: u32,
    pub attack_chained: bool,
    pub attack_secondary: bool,
    pub attack_crit: bool,
    pub attack_missed: bool,
    pub attack_special: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FighterSnapshot {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub level: u32,
    pub class: Class,
    pub maximum_life: f64,
    pub life: f64,
    pub strength: f64,
    pub dexterity: f64,
    pub intelligence: f64,
    pub constitution: f64,
    pub luck: f64,
    pub weapon1: Weapon,
    pub weapon2: Weapon,
}

impl FighterSnapshot {
    pub fn of(fighter: &FighterCore) -> Self {
        let player = &fighter.player;

        Self {
            id: fighter.label(),
            name: player.name.clone(),
            level: player.level,
            class: fighter.class,
            maximum_life: fighter.total_health,
            life: fighter.health,
            strength: player.strength,
            dexterity: player.dexterity,
            intelligence: player.intelligence,
            constitution: player.constitution,
            luck: player.luck,
            weapon1: player.items.wpn1.clone(),
            weapon2: player.items.wpn2.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FightSession {
    pub fighter_a: FighterSnapshot,
    pub fighter_b: FighterSnapshot,
    pub rounds: Vec<RoundRecord>,
}

/// Recorder owned by the simulator; sessions accumulate for its whole lifetime
#[derive(Debug, Clone, Default)]
pub struct FightLog {
    sessions: Vec<FightSession>,
    current_rage: Option<f64>,
}

impl FightLog {
    pub fn open_session(&mut self, a: &FighterCore, b: &FighterCore) {
        self.current_rage = None;
        self.sessions.push(FightSession {
            fighter_a: FighterSnapshot::of(a),
            fighter_b: FighterSnapshot::of(b),
            rounds: Vec::new(),
        });
    }

    pub fn record_rage(&mut self, rage: f64) {
        self.current_rage = Some(rage);
    }

    pub fn record_attack(&mut self, attacker: &FighterCore, target: &FighterCore, damage: f64, swing: &Swing) {
        let attack_type = AttackType::classify(swing.strike, swing.skipped, swing.critical, target.class);
        self.record(attacker, target, damage, attack_type, swing.skipped, swing.critical);
    }

    pub fn record_fireball(&mut self, source: &FighterCore, target: &FighterCore, damage: f64) {
        self.record(source, target, damage, AttackType::fireball(damage), damage == 0.0, false);
    }

    pub fn record_revive(&mut self, source: &FighterCore) {
        self.record(source, source, 0.0, AttackType::revive(), false, false);
    }

    pub fn record_song(&mut self, source: &FighterCore, target: &FighterCore, level: u32, notes: u32) {
        self.record(source, target, 0.0, AttackType::song(level, notes), false, false);
    }

    fn record(
        &mut self,
        attacker: &FighterCore,
        target: &FighterCore,
        damage: f64,
        attack_type: AttackType,
        missed: bool,
        critical: bool,
    ) {
        let rage = self.current_rage.unwrap_or(1.0);
        let Some(session) = self.sessions.last_mut() else {
            return;
        };

        session.rounds.push(RoundRecord {
            attacker_id: attacker.label(),
            attacker_special_state: attacker.special_state(),
            target_id: target.label(),
            target_special_state: target.special_state(),
            target_health_left: (target.health - damage).max(0.0),
            target_skip_count: target.skip_count,
            attack_damage: damage,
            attack_rage: rage,
            attack_code: attack_type.code(),
            attack_chained: attack_type.chained,
            attack_secondary: attack_type.secondary,
            attack_crit: critical,
            attack_missed: missed,
            attack_special: attack_type.special,
            attack_type,
        });
    }

    /// Every session recorded so far
    pub fn dump(&self) -> &[FightSession] {
        &self.sessions
    }

    pub fn last_session(&self) -> Option<&FightSession> {
        self.sessions.last()
    }
}
