#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave scheduler that drives preparation countdowns, spawns and wave completion.

use std::time::Duration;

use siege_core::{
    time_elapsed, Command, EnemySnapshot, Event, WaveDefinition, WaveIndex, WaveProgress,
};

/// Pure system that reacts to elapsed time and emits wave clock and spawn commands.
#[derive(Debug, Default)]
pub struct WaveScheduler {
    scratch: Vec<Command>,
}

impl WaveScheduler {
    /// Creates a new wave scheduler with an empty scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes events and the current wave progress to emit scheduling commands.
    ///
    /// While preparing, the countdown advances and `BeginWave` is emitted once
    /// it elapses. While a wave is active, every entry whose offset falls
    /// within the elapsed wave time is spawned in schedule order, and
    /// `CompleteWave` is emitted once every entry has spawned and no live
    /// enemy of that wave remains.
    pub fn handle(
        &mut self,
        events: &[Event],
        progress: WaveProgress,
        schedule: &[WaveDefinition],
        enemies: &[EnemySnapshot],
        out: &mut Vec<Command>,
    ) {
        let dt = time_elapsed(events);
        if dt.is_zero() {
            return;
        }

        self.scratch.clear();

        match progress {
            WaveProgress::Preparing { remaining, .. } => {
                self.scratch.push(Command::AdvanceWaveClock { dt });
                if remaining <= dt {
                    self.scratch.push(Command::BeginWave);
                }
            }
            WaveProgress::Active {
                wave,
                elapsed,
                spawned,
            } => {
                let Some(definition) = wave_definition(schedule, wave) else {
                    return;
                };
                self.scratch.push(Command::AdvanceWaveClock { dt });

                let spawned = usize::try_from(spawned).unwrap_or(usize::MAX);
                if spawned >= definition.entries.len() {
                    if !enemies.iter().any(|enemy| enemy.wave == wave) {
                        self.scratch.push(Command::CompleteWave { wave });
                    }
                } else {
                    let horizon = elapsed.saturating_add(dt);
                    for entry in &definition.entries[spawned..] {
                        if offset(entry.offset_secs) > horizon {
                            break;
                        }
                        self.scratch.push(Command::SpawnEnemy {
                            wave,
                            kind: entry.enemy,
                        });
                    }
                }
            }
            WaveProgress::Cleared | WaveProgress::Concluded { .. } => return,
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

fn wave_definition(schedule: &[WaveDefinition], wave: WaveIndex) -> Option<&WaveDefinition> {
    usize::try_from(wave.get())
        .ok()
        .and_then(|index| schedule.get(index))
}

fn offset(seconds: f32) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f32(seconds)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siege_core::{
        standard_ids, ActiveEffects, DefenseProfile, EnemyId, SpawnEntry, WorldPoint,
    };

    fn schedule() -> Vec<WaveDefinition> {
        vec![WaveDefinition {
            entries: vec![
                SpawnEntry {
                    enemy: standard_ids::BASIC_ENEMY,
                    offset_secs: 0.0,
                },
                SpawnEntry {
                    enemy: standard_ids::FAST_ENEMY,
                    offset_secs: 0.5,
                },
                SpawnEntry {
                    enemy: standard_ids::BASIC_ENEMY,
                    offset_secs: 2.0,
                },
            ],
            bonus: 10,
        }]
    }

    fn tick(millis: u64) -> Vec<Event> {
        vec![Event::TimeAdvanced {
            tick: 1,
            dt: Duration::from_millis(millis),
        }]
    }

    fn active(elapsed_millis: u64, spawned: u32) -> WaveProgress {
        WaveProgress::Active {
            wave: WaveIndex::new(0),
            elapsed: Duration::from_millis(elapsed_millis),
            spawned,
        }
    }

    fn enemy_of_wave(wave: u32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(1),
            kind: standard_ids::BASIC_ENEMY,
            wave: WaveIndex::new(wave),
            position: WorldPoint::new(0.0, 0.0),
            progress: 0.0,
            health: 10.0,
            max_health: 10.0,
            speed: 10.0,
            armor: 0.0,
            defense: DefenseProfile::default(),
            effects: ActiveEffects::default(),
        }
    }

    fn run(progress: WaveProgress, enemies: &[EnemySnapshot], millis: u64) -> Vec<Command> {
        let mut scheduler = WaveScheduler::new();
        let mut out = Vec::new();
        scheduler.handle(&tick(millis), progress, &schedule(), enemies, &mut out);
        out
    }

    #[test]
    fn countdown_begins_wave_when_elapsed() {
        let waiting = WaveProgress::Preparing {
            wave: WaveIndex::new(0),
            remaining: Duration::from_millis(300),
        };
        assert_eq!(
            run(waiting, &[], 100),
            vec![Command::AdvanceWaveClock {
                dt: Duration::from_millis(100)
            }]
        );
        assert_eq!(
            run(waiting, &[], 300),
            vec![
                Command::AdvanceWaveClock {
                    dt: Duration::from_millis(300)
                },
                Command::BeginWave,
            ]
        );
    }

    #[test]
    fn spawns_every_due_entry_in_order() {
        let out = run(active(0, 0), &[], 600);
        assert_eq!(
            out,
            vec![
                Command::AdvanceWaveClock {
                    dt: Duration::from_millis(600)
                },
                Command::SpawnEnemy {
                    wave: WaveIndex::new(0),
                    kind: standard_ids::BASIC_ENEMY,
                },
                Command::SpawnEnemy {
                    wave: WaveIndex::new(0),
                    kind: standard_ids::FAST_ENEMY,
                },
            ]
        );

        let out = run(active(600, 2), &[], 100);
        assert_eq!(out.len(), 1, "third entry is not due yet: {out:?}");
    }

    #[test]
    fn completion_waits_for_live_enemies_of_the_wave() {
        assert!(!run(active(3_000, 3), &[enemy_of_wave(0)], 100)
            .iter()
            .any(|command| matches!(command, Command::CompleteWave { .. })));

        assert_eq!(
            run(active(3_000, 3), &[enemy_of_wave(1)], 100).last(),
            Some(&Command::CompleteWave {
                wave: WaveIndex::new(0)
            })
        );
    }

    #[test]
    fn concluded_sessions_are_not_scheduled() {
        assert!(run(WaveProgress::Cleared, &[], 100).is_empty());
    }
}
