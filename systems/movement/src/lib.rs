#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that advances enemies along the map path.

use siege_core::{time_elapsed, Command, EnemySnapshot, Event, WaypointPath};

/// Pure system that reacts to elapsed time and emits enemy movement commands.
#[derive(Debug, Default)]
pub struct Movement {
    scratch: Vec<Command>,
}

impl Movement {
    /// Creates a new movement system with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes `TimeAdvanced` events and emits one command per live enemy.
    ///
    /// Each enemy advances by `speed * slow_multiplier * dt`. Enemies whose
    /// progress reaches the path length leak instead of moving.
    pub fn handle(
        &mut self,
        events: &[Event],
        enemies: &[EnemySnapshot],
        path: &WaypointPath,
        out: &mut Vec<Command>,
    ) {
        let dt = time_elapsed(events);
        if dt.is_zero() || enemies.is_empty() {
            return;
        }

        self.scratch.clear();
        let seconds = dt.as_secs_f32();
        let length = path.length();

        for enemy in enemies {
            let multiplier = enemy.effects.slow_multiplier();
            let distance = enemy.speed * multiplier * seconds;
            if distance <= 0.0 {
                continue;
            }

            let progress = enemy.progress + distance;
            if progress >= length {
                self.scratch.push(Command::LeakEnemy { enemy: enemy.id });
            } else {
                self.scratch.push(Command::MoveEnemy {
                    enemy: enemy.id,
                    progress,
                });
            }
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use siege_core::{
        ActiveEffects, DefenseProfile, EffectKind, EnemyId, EnemyTypeId, OnHitEffect,
        StackingRule, WaveIndex, WorldPoint,
    };

    fn path() -> WaypointPath {
        WaypointPath::new(vec![WorldPoint::new(0.0, 0.0), WorldPoint::new(100.0, 0.0)])
            .expect("valid path")
    }

    fn enemy(id: u32, progress: f32, speed: f32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            kind: EnemyTypeId::new(1),
            wave: WaveIndex::new(0),
            position: WorldPoint::new(progress, 0.0),
            progress,
            health: 10.0,
            max_health: 10.0,
            speed,
            armor: 0.0,
            defense: DefenseProfile::default(),
            effects: ActiveEffects::default(),
        }
    }

    fn tick(secs: f32) -> Vec<Event> {
        vec![Event::TimeAdvanced {
            tick: 1,
            dt: Duration::from_secs_f32(secs),
        }]
    }

    #[test]
    fn advances_by_speed_times_dt() {
        let mut movement = Movement::new();
        let mut out = Vec::new();
        movement.handle(&tick(0.5), &[enemy(1, 10.0, 20.0)], &path(), &mut out);
        assert_eq!(
            out,
            vec![Command::MoveEnemy {
                enemy: EnemyId::new(1),
                progress: 20.0,
            }]
        );
    }

    #[test]
    fn reaching_the_end_leaks() {
        let mut movement = Movement::new();
        let mut out = Vec::new();
        movement.handle(&tick(1.0), &[enemy(4, 95.0, 5.0)], &path(), &mut out);
        assert_eq!(
            out,
            vec![Command::LeakEnemy {
                enemy: EnemyId::new(4)
            }]
        );
    }

    #[test]
    fn slows_scale_and_stuns_halt_movement() {
        let mut slowed = enemy(1, 0.0, 40.0);
        slowed.effects.apply(
            OnHitEffect {
                kind: EffectKind::Slow,
                magnitude: 0.5,
                duration_secs: 1.0,
            },
            StackingRule::Refresh,
        );
        let mut stunned = enemy(2, 0.0, 40.0);
        stunned.effects.apply(
            OnHitEffect {
                kind: EffectKind::Stun,
                magnitude: 1.0,
                duration_secs: 1.0,
            },
            StackingRule::Refresh,
        );

        let mut movement = Movement::new();
        let mut out = Vec::new();
        movement.handle(&tick(1.0), &[slowed, stunned], &path(), &mut out);
        assert_eq!(
            out,
            vec![Command::MoveEnemy {
                enemy: EnemyId::new(1),
                progress: 20.0,
            }]
        );
    }

    #[test]
    fn no_time_means_no_commands() {
        let mut movement = Movement::new();
        let mut out = Vec::new();
        movement.handle(&[], &[enemy(1, 0.0, 40.0)], &path(), &mut out);
        assert!(out.is_empty());
    }
}
