#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Damage-over-time and aging of status effects attached to enemies.

use std::time::Duration;

use siege_core::{time_elapsed, Command, EnemySnapshot, Event};

/// Pure system that converts active poison and burn into damage and ages every effect.
#[derive(Debug, Default)]
pub struct StatusEffects {
    scratch: Vec<Command>,
}

impl StatusEffects {
    /// Creates a new status effect system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `ApplyEffectDamage` per damaging effect followed by one `AgeEffects`.
    ///
    /// Damage covers only the part of `dt` the effect was still active for.
    pub fn handle(&mut self, events: &[Event], enemies: &[EnemySnapshot], out: &mut Vec<Command>) {
        let dt = time_elapsed(events);
        if dt.is_zero() || enemies.is_empty() {
            return;
        }

        self.scratch.clear();

        for enemy in enemies {
            for effect in enemy.effects.iter() {
                if !effect.kind.is_damage_over_time() {
                    continue;
                }
                let active = active_for(effect.remaining, dt);
                let damage = effect.magnitude * active.as_secs_f32();
                if damage > 0.0 {
                    self.scratch.push(Command::ApplyEffectDamage {
                        enemy: enemy.id,
                        damage,
                    });
                }
            }
        }

        self.scratch.push(Command::AgeEffects { dt });
        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

fn active_for(remaining: Duration, dt: Duration) -> Duration {
    remaining.min(dt)
}
