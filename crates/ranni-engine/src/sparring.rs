//! In-process sparring target for the demo binary.
//!
//! Builds a [`ScriptedTarget`] whose hp attributes follow a seeded duel:
//! each read of the snapshot attributes advances one exchange in which
//! either side may land a hit. The animation id stays at its idle value, so
//! combat actions in the demo complete on elapsed time.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use ranni_core::target::ScriptedTarget;
use ranni_types::AttributeValue;

/// Starting and maximum hp for both fighters.
pub const MAX_HP: i64 = 100;

/// Largest damage a single hit deals.
const MAX_HIT: i64 = 18;

/// Chance per exchange that the player lands a hit.
const PLAYER_HIT_CHANCE: f64 = 0.45;

/// Chance per exchange that the opponent lands a hit.
const OPPONENT_HIT_CHANCE: f64 = 0.3;

/// Animation id reported throughout the duel.
const IDLE_ANIMATION: i64 = 0;

/// A target scripted with `exchanges` seeded duel exchanges.
///
/// Once either fighter reaches zero hp the remaining reads repeat the
/// final values.
pub fn sparring_target(seed: u64, exchanges: usize) -> ScriptedTarget {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut hero = MAX_HP;
    let mut npc = MAX_HP;
    let mut hero_hp = vec![AttributeValue::Int(hero)];
    let mut npc_hp = vec![AttributeValue::Int(npc)];
    let mut score = vec![AttributeValue::Int(0)];

    for _ in 0..exchanges {
        if hero <= 0 || npc <= 0 {
            break;
        }
        if rng.random_bool(PLAYER_HIT_CHANCE) {
            npc = npc.saturating_sub(rng.random_range(1..=MAX_HIT)).max(0);
        }
        if rng.random_bool(OPPONENT_HIT_CHANCE) {
            hero = hero.saturating_sub(rng.random_range(1..=MAX_HIT)).max(0);
        }
        hero_hp.push(AttributeValue::Int(hero));
        npc_hp.push(AttributeValue::Int(npc));
        score.push(AttributeValue::Int(MAX_HP.saturating_sub(npc)));
    }

    ScriptedTarget::new()
        .with_attribute("HeroHp", hero_hp)
        .with_attribute("HeroMaxHp", vec![AttributeValue::Int(MAX_HP)])
        .with_attribute("NpcHp", npc_hp)
        .with_attribute("NpcMaxHp", vec![AttributeValue::Int(MAX_HP)])
        .with_attribute("HeroAnimId", vec![AttributeValue::Int(IDLE_ANIMATION)])
        .with_attribute("score", score)
}
