//! Projectile flight, lost-target handling and impact resolution.

use std::{cmp::Ordering, time::Duration};

use siege_core::{
    time_elapsed, Catalog, CombatTuning, Command, DamagePayload, Delivery, EnemyId,
    EnemySnapshot, Event, ExpiryReason, GridSpec, Hit, LostTargetPolicy, ProjectileSnapshot,
};
use siege_system_elements::ElementTable;

/// Pure system that advances projectiles and converts impacts into hits.
#[derive(Debug)]
pub struct ProjectileResolution {
    table: ElementTable,
    tuning: CombatTuning,
    lifetime: Duration,
    scratch: Vec<Command>,
}

impl ProjectileResolution {
    /// Creates the system from the catalog's element chart and combat tuning.
    #[must_use]
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            table: ElementTable::new(&catalog.elements),
            tuning: catalog.combat,
            lifetime: Duration::from_secs_f32(catalog.combat.projectile_lifetime_secs),
            scratch: Vec::new(),
        }
    }

    /// Emits flight, retarget, expiry and impact commands for every live projectile.
    ///
    /// Instant projectiles impact on the tick they are observed. Traveling
    /// projectiles re-resolve their target every tick; a lost target is
    /// replaced or the projectile expires according to the lost-target
    /// policy, never both. `enemies` must be sorted by identifier.
    pub fn handle(
        &mut self,
        events: &[Event],
        projectiles: &[ProjectileSnapshot],
        enemies: &[EnemySnapshot],
        grid: GridSpec,
        out: &mut Vec<Command>,
    ) {
        if projectiles.is_empty() {
            return;
        }

        self.scratch.clear();
        let dt = time_elapsed(events);

        for projectile in projectiles {
            let target = match find_enemy(enemies, projectile.target) {
                Some(enemy) => enemy,
                None => match self.replacement(projectile, enemies) {
                    Some(enemy) => {
                        self.scratch.push(Command::RetargetProjectile {
                            projectile: projectile.id,
                            target: enemy.id,
                        });
                        enemy
                    }
                    None => {
                        self.scratch.push(Command::ExpireProjectile {
                            projectile: projectile.id,
                            reason: ExpiryReason::TargetLost,
                        });
                        continue;
                    }
                },
            };

            match projectile.delivery {
                Delivery::Instant => {
                    let hits = self.resolve_hits(&projectile.payload, target, enemies);
                    self.scratch.push(Command::ImpactProjectile {
                        projectile: projectile.id,
                        hits,
                    });
                }
                Delivery::Traveling { speed } => {
                    let age = projectile.age.saturating_add(dt);
                    if age > self.lifetime {
                        self.scratch.push(Command::ExpireProjectile {
                            projectile: projectile.id,
                            reason: ExpiryReason::Lifetime,
                        });
                        continue;
                    }

                    let step = speed * dt.as_secs_f32();
                    if projectile.position.distance(target.position) <= step {
                        let hits = self.resolve_hits(&projectile.payload, target, enemies);
                        self.scratch.push(Command::ImpactProjectile {
                            projectile: projectile.id,
                            hits,
                        });
                        continue;
                    }

                    let position = projectile.position.step_toward(target.position, step);
                    if !grid.contains_point(position) {
                        self.scratch.push(Command::ExpireProjectile {
                            projectile: projectile.id,
                            reason: ExpiryReason::OutOfBounds,
                        });
                        continue;
                    }

                    self.scratch.push(Command::MoveProjectile {
                        projectile: projectile.id,
                        position,
                        target_position: target.position,
                        age,
                    });
                }
            }
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }

    /// Nearest live enemy within the retarget radius of the last known target position.
    fn replacement<'a>(
        &self,
        projectile: &ProjectileSnapshot,
        enemies: &'a [EnemySnapshot],
    ) -> Option<&'a EnemySnapshot> {
        let LostTargetPolicy::Retarget { radius } = self.tuning.lost_target else {
            return None;
        };
        let limit = radius * radius;

        enemies
            .iter()
            .filter(|enemy| enemy.health > 0.0)
            .map(|enemy| (enemy.position.distance_sq(projectile.target_position), enemy))
            .filter(|(distance_sq, _)| *distance_sq <= limit)
            .min_by(|(left_distance, left), (right_distance, right)| {
                match left_distance.total_cmp(right_distance) {
                    Ordering::Equal => left.id.cmp(&right.id),
                    ordering => ordering,
                }
            })
            .map(|(_, enemy)| enemy)
    }

    /// Resolves the hits of an impact on `primary`, including splash victims.
    fn resolve_hits(
        &self,
        payload: &DamagePayload,
        primary: &EnemySnapshot,
        enemies: &[EnemySnapshot],
    ) -> Vec<Hit> {
        if payload.splash_radius <= 0.0 {
            return vec![self.hit(payload, primary)];
        }

        let limit = payload.splash_radius * payload.splash_radius;
        enemies
            .iter()
            .filter(|enemy| enemy.health > 0.0)
            .filter(|enemy| enemy.position.distance_sq(primary.position) <= limit)
            .map(|enemy| self.hit(payload, enemy))
            .collect()
    }

    fn hit(&self, payload: &DamagePayload, enemy: &EnemySnapshot) -> Hit {
        let multiplier = self.table.resolve_multiplier(payload.element, &enemy.defense);
        let damage = if multiplier <= 0.0 {
            0.0
        } else {
            let mitigation = (enemy.armor - payload.armor_penetration).max(0.0);
            (payload.damage * multiplier - mitigation).max(self.tuning.minimum_damage)
        };
        let effects = if self.table.status_applies(
            payload.element,
            &enemy.defense,
            payload.status_bypasses_immunity,
        ) {
            payload.on_hit.clone()
        } else {
            Vec::new()
        };

        Hit {
            enemy: enemy.id,
            damage,
            effects,
        }
    }
}

fn find_enemy(enemies: &[EnemySnapshot], enemy: EnemyId) -> Option<&EnemySnapshot> {
    enemies
        .binary_search_by_key(&enemy, |snapshot| snapshot.id)
        .ok()
        .map(|index| &enemies[index])
        .filter(|snapshot| snapshot.health > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use siege_core::{
        ActiveEffects, DefenseProfile, EffectKind, Element, ElementSet, EnemyTypeId, OnHitEffect,
        ProjectileId, TowerId, WaveIndex, WorldPoint,
    };

    const GRID: GridSpec = GridSpec {
        columns: 10,
        rows: 10,
        cell_size: 10.0,
    };

    fn catalog(lost_target: LostTargetPolicy) -> Catalog {
        let mut catalog = Catalog::standard();
        catalog.combat.lost_target = lost_target;
        catalog
    }

    fn enemy(id: u32, x: f32, y: f32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            kind: EnemyTypeId::new(1),
            wave: WaveIndex::new(0),
            position: WorldPoint::new(x, y),
            progress: 0.0,
            health: 50.0,
            max_health: 50.0,
            speed: 10.0,
            armor: 0.0,
            defense: DefenseProfile::default(),
            effects: ActiveEffects::default(),
        }
    }

    fn payload(damage: f32) -> DamagePayload {
        DamagePayload {
            damage,
            element: Element::Physical,
            armor_penetration: 0.0,
            splash_radius: 0.0,
            on_hit: Vec::new(),
            status_bypasses_immunity: false,
        }
    }

    fn projectile(target: u32, delivery: Delivery, position: WorldPoint) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: ProjectileId::new(1),
            tower: TowerId::new(1),
            target: EnemyId::new(target),
            position,
            target_position: WorldPoint::new(50.0, 50.0),
            delivery,
            payload: payload(20.0),
            age: Duration::ZERO,
        }
    }

    fn tick() -> Vec<Event> {
        vec![Event::TimeAdvanced {
            tick: 1,
            dt: Duration::from_millis(100),
        }]
    }

    fn run(
        system: &mut ProjectileResolution,
        projectiles: &[ProjectileSnapshot],
        enemies: &[EnemySnapshot],
    ) -> Vec<Command> {
        let mut out = Vec::new();
        system.handle(&tick(), projectiles, enemies, GRID, &mut out);
        out
    }

    #[test]
    fn instant_projectiles_hit_immediately() {
        let mut system = ProjectileResolution::new(&Catalog::standard());
        let enemies = [enemy(3, 50.0, 50.0)];
        let out = run(
            &mut system,
            &[projectile(3, Delivery::Instant, WorldPoint::new(0.0, 0.0))],
            &enemies,
        );
        assert_eq!(
            out,
            vec![Command::ImpactProjectile {
                projectile: ProjectileId::new(1),
                hits: vec![Hit {
                    enemy: EnemyId::new(3),
                    damage: 20.0,
                    effects: Vec::new(),
                }],
            }]
        );
    }

    #[test]
    fn traveling_projectiles_close_distance_then_impact() {
        let mut system = ProjectileResolution::new(&Catalog::standard());
        let enemies = [enemy(3, 50.0, 10.0)];
        let start = WorldPoint::new(10.0, 10.0);
        let out = run(
            &mut system,
            &[projectile(3, Delivery::Traveling { speed: 200.0 }, start)],
            &enemies,
        );
        let Some(Command::MoveProjectile {
            position,
            target_position,
            age,
            ..
        }) = out.first()
        else {
            panic!("expected the projectile to move");
        };
        assert!((position.x - 30.0).abs() < 1e-3);
        assert!((position.y - 10.0).abs() < 1e-3);
        assert_eq!(*target_position, WorldPoint::new(50.0, 10.0));
        assert_eq!(*age, Duration::from_millis(100));

        let out = run(
            &mut system,
            &[projectile(
                3,
                Delivery::Traveling { speed: 200.0 },
                WorldPoint::new(35.0, 10.0),
            )],
            &enemies,
        );
        assert!(matches!(out[0], Command::ImpactProjectile { .. }));
    }

    #[test]
    fn lost_target_retargets_nearest_enemy_within_radius() {
        let mut system =
            ProjectileResolution::new(&catalog(LostTargetPolicy::Retarget { radius: 15.0 }));
        let enemies = [
            enemy(5, 60.0, 50.0),
            enemy(6, 40.0, 50.0),
            enemy(7, 50.0, 90.0),
        ];
        let out = run(
            &mut system,
            &[projectile(
                1,
                Delivery::Traveling { speed: 10.0 },
                WorldPoint::new(0.0, 50.0),
            )],
            &enemies,
        );

        let retargets: Vec<_> = out
            .iter()
            .filter_map(|command| match command {
                Command::RetargetProjectile { target, .. } => Some(*target),
                _ => None,
            })
            .collect();
        assert_eq!(retargets, vec![EnemyId::new(5)]);
        assert!(!out
            .iter()
            .any(|command| matches!(command, Command::ExpireProjectile { .. })));
    }

    #[test]
    fn lost_target_without_candidates_expires() {
        let mut system =
            ProjectileResolution::new(&catalog(LostTargetPolicy::Retarget { radius: 5.0 }));
        let enemies = [enemy(7, 50.0, 90.0)];
        let out = run(
            &mut system,
            &[projectile(
                1,
                Delivery::Traveling { speed: 10.0 },
                WorldPoint::new(0.0, 50.0),
            )],
            &enemies,
        );
        assert_eq!(
            out,
            vec![Command::ExpireProjectile {
                projectile: ProjectileId::new(1),
                reason: ExpiryReason::TargetLost,
            }]
        );
    }

    #[test]
    fn despawn_policy_never_retargets() {
        let mut system = ProjectileResolution::new(&catalog(LostTargetPolicy::Despawn));
        let enemies = [enemy(5, 50.0, 50.0)];
        let out = run(
            &mut system,
            &[projectile(
                1,
                Delivery::Traveling { speed: 10.0 },
                WorldPoint::new(0.0, 50.0),
            )],
            &enemies,
        );
        assert_eq!(
            out,
            vec![Command::ExpireProjectile {
                projectile: ProjectileId::new(1),
                reason: ExpiryReason::TargetLost,
            }]
        );
    }

    #[test]
    fn projectiles_expire_after_lifetime() {
        let mut system = ProjectileResolution::new(&Catalog::standard());
        let enemies = [enemy(3, 90.0, 90.0)];
        let mut aged = projectile(3, Delivery::Traveling { speed: 1.0 }, WorldPoint::new(0.0, 0.0));
        aged.age = Duration::from_secs(3);
        let out = run(&mut system, &[aged], &enemies);
        assert_eq!(
            out,
            vec![Command::ExpireProjectile {
                projectile: ProjectileId::new(1),
                reason: ExpiryReason::Lifetime,
            }]
        );
    }

    #[test]
    fn armor_is_subtracted_and_damage_floored() {
        let system = ProjectileResolution::new(&Catalog::standard());
        let mut armored = enemy(1, 0.0, 0.0);
        armored.armor = 8.0;

        let mut shot = payload(20.0);
        shot.armor_penetration = 3.0;
        assert_eq!(system.hit(&shot, &armored).damage, 15.0);

        armored.armor = 500.0;
        assert_eq!(system.hit(&shot, &armored).damage, 1.0);
    }

    #[test]
    fn immunity_zeroes_damage_and_blocks_status_unless_bypassed() {
        let system = ProjectileResolution::new(&Catalog::standard());
        let mut immune = enemy(1, 0.0, 0.0);
        immune.defense.immunities = ElementSet::of(&[Element::Fire]);

        let mut shot = payload(20.0);
        shot.element = Element::Fire;
        shot.on_hit = vec![OnHitEffect {
            kind: EffectKind::Burn,
            magnitude: 5.0,
            duration_secs: 2.0,
        }];

        let blocked = system.hit(&shot, &immune);
        assert_eq!(blocked.damage, 0.0);
        assert!(blocked.effects.is_empty());

        shot.status_bypasses_immunity = true;
        let bypassed = system.hit(&shot, &immune);
        assert_eq!(bypassed.damage, 0.0);
        assert_eq!(bypassed.effects.len(), 1);
    }

    #[test]
    fn splash_hits_every_enemy_in_radius() {
        let system = ProjectileResolution::new(&Catalog::standard());
        let enemies = [
            enemy(1, 50.0, 50.0),
            enemy(2, 60.0, 50.0),
            enemy(3, 90.0, 50.0),
        ];
        let mut shot = payload(10.0);
        shot.splash_radius = 15.0;

        let hits = system.resolve_hits(&shot, &enemies[0], &enemies);
        let victims: Vec<_> = hits.iter().map(|hit| hit.enemy).collect();
        assert_eq!(victims, vec![EnemyId::new(1), EnemyId::new(2)]);
    }
}
