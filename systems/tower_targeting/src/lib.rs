#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.

use std::cmp::Ordering;

use siege_core::{
    EnemyId, EnemySnapshot, TargetingPolicy, TowerId, TowerSnapshot, TowerTarget, WorldPoint,
};

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    tower_workspace: Vec<TowerWorkspace>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes targets for every tower whose cooldown has elapsed.
    ///
    /// The output buffer is cleared before populating it. Towers without a
    /// candidate in range are omitted and hold fire.
    pub fn handle(
        &mut self,
        towers: &[TowerSnapshot],
        enemies: &[EnemySnapshot],
        out: &mut Vec<TowerTarget>,
    ) {
        out.clear();

        if towers.is_empty() || enemies.is_empty() {
            return;
        }

        self.prepare_tower_workspace(towers);
        if self.tower_workspace.is_empty() {
            return;
        }

        for tower in &self.tower_workspace {
            let max_distance = tower.range * tower.range;
            let mut best: Option<BestCandidate> = None;

            for enemy in enemies {
                let distance_sq = tower.position.distance_sq(enemy.position);
                if distance_sq > max_distance || enemy.health <= 0.0 {
                    continue;
                }

                let current = BestCandidate {
                    score: score(tower.policy, distance_sq, enemy),
                    enemy: enemy.id,
                };

                match &mut best {
                    Some(existing) => {
                        if current.precedes(existing) {
                            *existing = current;
                        }
                    }
                    None => best = Some(current),
                }
            }

            if let Some(best_candidate) = best {
                out.push(TowerTarget {
                    tower: tower.id,
                    enemy: best_candidate.enemy,
                });
            }
        }
    }

    fn prepare_tower_workspace(&mut self, towers: &[TowerSnapshot]) {
        self.tower_workspace.clear();
        self.tower_workspace.reserve(towers.len());

        for snapshot in towers {
            if !snapshot.ready_in.is_zero() || snapshot.range <= 0.0 {
                continue;
            }

            self.tower_workspace.push(TowerWorkspace {
                id: snapshot.id,
                position: snapshot.position,
                range: snapshot.range,
                policy: snapshot.targeting,
            });
        }
    }
}

/// Ranking key where lower values are preferred.
fn score(policy: TargetingPolicy, distance_sq: f32, enemy: &EnemySnapshot) -> f32 {
    match policy {
        TargetingPolicy::Closest => distance_sq,
        TargetingPolicy::Strongest => -enemy.health,
        TargetingPolicy::First => -enemy.progress,
        TargetingPolicy::Last => enemy.progress,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TowerWorkspace {
    id: TowerId,
    position: WorldPoint,
    range: f32,
    policy: TargetingPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    score: f32,
    enemy: EnemyId,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        match self.score.total_cmp(&other.score) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.enemy < other.enemy,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use siege_core::{
        ActiveEffects, CellCoord, DefenseProfile, EnemyTypeId, TowerTypeId, WaveIndex,
    };

    fn tower(id: u32, policy: TargetingPolicy, ready_in: Duration) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(id),
            kind: TowerTypeId::new(1),
            cell: CellCoord::new(0, 0),
            position: WorldPoint::new(0.0, 0.0),
            level: 1,
            trinkets: Vec::new(),
            range: 50.0,
            targeting: policy,
            ready_in,
            target: None,
        }
    }

    fn enemy(id: u32, position: (f32, f32), progress: f32, health: f32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            kind: EnemyTypeId::new(1),
            wave: WaveIndex::new(0),
            position: WorldPoint::new(position.0, position.1),
            progress,
            health,
            max_health: 100.0,
            speed: 10.0,
            armor: 0.0,
            defense: DefenseProfile::default(),
            effects: ActiveEffects::default(),
        }
    }

    fn target_of(policy: TargetingPolicy, enemies: &[EnemySnapshot]) -> Option<EnemyId> {
        let mut system = TowerTargeting::new();
        let mut out = Vec::new();
        system.handle(&[tower(1, policy, Duration::ZERO)], enemies, &mut out);
        out.first().map(|target| target.enemy)
    }

    fn field() -> Vec<EnemySnapshot> {
        vec![
            enemy(1, (30.0, 0.0), 10.0, 40.0),
            enemy(2, (10.0, 0.0), 5.0, 90.0),
            enemy(3, (20.0, 0.0), 30.0, 60.0),
        ]
    }

    #[test]
    fn policies_select_expected_enemy() {
        let enemies = field();
        assert_eq!(
            target_of(TargetingPolicy::Closest, &enemies),
            Some(EnemyId::new(2))
        );
        assert_eq!(
            target_of(TargetingPolicy::Strongest, &enemies),
            Some(EnemyId::new(2))
        );
        assert_eq!(
            target_of(TargetingPolicy::First, &enemies),
            Some(EnemyId::new(3))
        );
        assert_eq!(
            target_of(TargetingPolicy::Last, &enemies),
            Some(EnemyId::new(2))
        );
    }

    #[test]
    fn enemy_outside_range_is_ignored() {
        let enemies = vec![enemy(1, (51.0, 0.0), 0.0, 10.0)];
        assert_eq!(target_of(TargetingPolicy::Closest, &enemies), None);
    }

    #[test]
    fn smaller_enemy_id_is_preferred_on_ties() {
        let enemies = vec![
            enemy(20, (0.0, 10.0), 7.0, 50.0),
            enemy(10, (10.0, 0.0), 7.0, 50.0),
        ];
        for policy in [
            TargetingPolicy::Closest,
            TargetingPolicy::Strongest,
            TargetingPolicy::First,
            TargetingPolicy::Last,
        ] {
            assert_eq!(target_of(policy, &enemies), Some(EnemyId::new(10)));
        }
    }

    #[test]
    fn cooling_towers_are_skipped() {
        let mut system = TowerTargeting::new();
        let mut out = Vec::new();
        system.handle(
            &[
                tower(1, TargetingPolicy::Closest, Duration::from_millis(5)),
                tower(2, TargetingPolicy::Closest, Duration::ZERO),
            ],
            &field(),
            &mut out,
        );
        assert_eq!(
            out,
            vec![TowerTarget {
                tower: TowerId::new(2),
                enemy: EnemyId::new(2),
            }]
        );
    }
}
