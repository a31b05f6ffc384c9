//! Property tests over random builds and seeds

use std::collections::HashMap;

use duel_sim::config::{merge_deep, ConfigRegistry, SkipType};
use duel_sim::log::AttackKind;
use duel_sim::rng::RandDice;
use duel_sim::{Class, FastRng, Player, RunOptions, SimConfig, Simulator};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;

fn build() -> impl Strategy<Value = serde_json::Value> {
    (1u64..=9, 1u32..=300, 0u32..=2000, 0u32..=2000, 0u32..=2000, 0u32..=5000).prop_map(
        |(class, level, main, constitution, luck, armor)| {
            json!({
                "Class": class,
                "Level": level,
                "Strength": main,
                "Dexterity": main,
                "Intelligence": main,
                "Constitution": constitution.max(1),
                "Luck": luck,
                "Armor": armor,
            })
        },
    )
}

fn simulator(a: &serde_json::Value, b: &serde_json::Value, options: RunOptions) -> Simulator {
    let players = [Player::normalize(a), Player::normalize(b)];
    Simulator::from_players(players, &SimConfig::default(), options).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_same_seed_same_fight(a in build(), b in build(), seed in any::<u64>()) {
        let options = RunOptions { log_enabled: true, max_turns: 500, ..RunOptions::default() };
        let mut first = simulator(&a, &b, options);
        let mut second = simulator(&a, &b, options);

        let left = first.fight_result(&mut FastRng::new(seed));
        let right = second.fight_result(&mut FastRng::new(seed));

        prop_assert_eq!(left, right);
        prop_assert_eq!(first.log().dump(), second.log().dump());
    }

    #[test]
    fn test_fight_invariants(a in build(), b in build(), seed in any::<u64>()) {
        let options = RunOptions { log_enabled: true, max_turns: 500, ..RunOptions::default() };
        let mut sim = simulator(&a, &b, options);
        let mut dice = RandDice(ChaCha8Rng::seed_from_u64(seed));

        let result = sim.fight_result(&mut dice);
        prop_assert!(result.rounds <= 500);

        for (index, fighter) in sim.fighters().iter().enumerate() {
            prop_assert!(fighter.health() <= fighter.total_health());
            prop_assert!(result.health[index] >= 0.0);
            prop_assert!(fighter.core.skip_count <= fighter.core.config.skip_limit);
        }

        match result.winner() {
            Some(winner) => {
                prop_assert!(sim.fighters()[winner].is_alive());
                prop_assert!(!sim.fighters()[1 - winner].is_alive());
            }
            None => {
                prop_assert_eq!(result.rounds, 500);
                prop_assert!(sim.fighters().iter().all(|f| f.is_alive()));
            }
        }

        let session = sim.log().last_session().unwrap();
        let mut health: HashMap<&str, f64> = HashMap::new();
        for snapshot in [&session.fighter_a, &session.fighter_b] {
            health.insert(snapshot.id.as_str(), snapshot.life);
        }

        for round in &session.rounds {
            prop_assert!(round.target_health_left >= 0.0);
            prop_assert!(round.attack_damage >= 0.0);
            prop_assert_eq!(round.attack_damage, round.attack_damage.trunc());

            // Health only goes down, except when a revive brings it back
            let last = health[round.target_id.as_str()];
            if round.attack_type.kind != AttackKind::Revive {
                prop_assert!(round.target_health_left <= last);
            }
            health.insert(round.target_id.as_str(), round.target_health_left);
        }
    }

    #[test]
    fn test_disjoint_overrides_commute(mage in 0.0f64..1.0, scout in 0.0f64..1.0) {
        let defaults = serde_json::to_value(SimConfig::default()).unwrap();
        let left = json!({ "Mage": { "SkipChance": mage } });
        let right = json!({ "Scout": { "SkipChance": scout } });

        let one_way = merge_deep(&merge_deep(&defaults, &left), &right);
        let other_way = merge_deep(&merge_deep(&defaults, &right), &left);
        prop_assert_eq!(&one_way, &other_way);

        let config: SimConfig = serde_json::from_value(one_way).unwrap();
        prop_assert_eq!(config.class(Class::Mage).skip_chance, mage);
        prop_assert_eq!(config.class(Class::Scout).skip_chance, scout);
        prop_assert_eq!(config.class(Class::Warrior).skip_chance, 0.25);
    }

    #[test]
    fn test_override_differences_name_changed_leaves(limit in 1u32..500) {
        let mut registry = ConfigRegistry::new();
        registry.set_override(Some(json!({ "Berserker": { "SkipLimit": limit } }))).unwrap();

        let differences = registry.differences();
        if limit == 14 {
            prop_assert!(differences.is_empty());
        } else {
            prop_assert_eq!(differences.len(), 1);
            prop_assert_eq!(&differences[0].path, &vec!["Berserker".to_string(), "SkipLimit".to_string()]);
        }

        let config = registry.resolve().unwrap();
        prop_assert_eq!(config.berserker.skip_limit, limit);
        prop_assert_eq!(config.berserker.skip_type, SkipType::Control);
    }
}

#[test]
fn test_empty_override_keeps_defaults() {
    let defaults = serde_json::to_value(SimConfig::default()).unwrap();
    assert_eq!(merge_deep(&defaults, &json!({})), defaults);

    let mut registry = ConfigRegistry::new();
    registry.set_override(Some(json!({}))).unwrap();
    assert!(registry.differences().is_empty());
    assert_eq!(
        serde_json::to_value(registry.resolve().unwrap()).unwrap(),
        defaults
    );
}
