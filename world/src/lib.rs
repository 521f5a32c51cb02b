#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for a single Siege session.
//!
//! The world is the only place where session state is mutated. Systems
//! inspect it through the [`query`] module and request changes by handing
//! [`Command`] values to [`apply`].

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use siege_core::{
    ActiveEffects, Catalog, CellCoord, Command, DamagePayload, DefenseProfile, Delivery, EnemyId,
    EnemyTypeId, Event, Hit, Intent, IntentRejection, LoadError, MapDefinition, ProjectileId,
    SessionStats, TargetingPolicy, TowerId, TowerStats, TowerTypeId, TrinketId, WaveDefinition,
    WaveIndex, WaveProgress, WaypointPath, WorldPoint,
};

mod store;

pub use store::PoolStats;

use store::{EntityStore, Recycle};

/// Placed tower record.
#[derive(Debug)]
pub(crate) struct Tower {
    id: TowerId,
    kind: TowerTypeId,
    cell: CellCoord,
    position: WorldPoint,
    level: u8,
    trinkets: Vec<TrinketId>,
    stats: TowerStats,
    targeting: TargetingPolicy,
    cooldown: Duration,
    /// Part of the last tick left over after the cooldown ran out.
    carry: Duration,
    target: Option<EnemyId>,
}

/// Live enemy record; recycled through the enemy pool.
#[derive(Debug, Default)]
pub(crate) struct Enemy {
    id: Option<EnemyId>,
    kind: Option<EnemyTypeId>,
    wave: Option<WaveIndex>,
    progress: f32,
    position: WorldPoint,
    health: f32,
    max_health: f32,
    speed: f32,
    armor: f32,
    defense: DefenseProfile,
    reward: u32,
    damage_to_base: u32,
    effects: ActiveEffects,
}

impl Recycle for Enemy {
    fn recycle(&mut self) {
        let effects = std::mem::take(&mut self.effects);
        *self = Self {
            effects,
            ..Self::default()
        };
        self.effects.clear();
    }
}

/// In-flight projectile record; recycled through the projectile pool.
#[derive(Debug, Default)]
pub(crate) struct Projectile {
    id: Option<ProjectileId>,
    tower: Option<TowerId>,
    target: Option<EnemyId>,
    position: WorldPoint,
    target_position: WorldPoint,
    delivery: Option<Delivery>,
    payload: Option<DamagePayload>,
    age: Duration,
}

impl Recycle for Projectile {
    fn recycle(&mut self) {
        *self = Self::default();
    }
}

/// Represents the authoritative state of one session.
#[derive(Debug)]
pub struct World {
    catalog: Arc<Catalog>,
    map: Arc<MapDefinition>,
    path: WaypointPath,
    blocked: BTreeSet<CellCoord>,
    occupied: BTreeMap<CellCoord, TowerId>,
    schedule: Vec<WaveDefinition>,
    store: EntityStore,
    tick: u64,
    currency: u32,
    lives: u32,
    progress: WaveProgress,
    stats: SessionStats,
}

impl World {
    /// Creates a world for `map` using `catalog` and the full wave `schedule`.
    ///
    /// The schedule holds the map's authored waves followed by any generated
    /// ones; it must not be empty.
    pub fn new(
        catalog: Arc<Catalog>,
        map: Arc<MapDefinition>,
        schedule: Vec<WaveDefinition>,
    ) -> Result<Self, LoadError> {
        catalog.validate()?;
        map.validate(&catalog)?;
        if schedule.is_empty() {
            return Err(LoadError::NoWaves);
        }
        for (index, wave) in schedule.iter().enumerate() {
            if let Some(entry) = wave
                .entries
                .iter()
                .find(|entry| catalog.enemy(entry.enemy).is_none())
            {
                return Err(LoadError::UnknownEnemy {
                    wave: index,
                    enemy: entry.enemy,
                });
            }
        }

        let path = map.waypoint_path()?;
        let blocked = blocked_cells(&map, &path);
        let progress = WaveProgress::Preparing {
            wave: WaveIndex::new(0),
            remaining: Duration::from_secs_f32(map.preparation_secs),
        };

        Ok(Self {
            store: EntityStore::new(catalog.pool_capacity),
            currency: map.starting_currency,
            lives: map.starting_lives,
            catalog,
            map,
            path,
            blocked,
            occupied: BTreeMap::new(),
            schedule,
            tick: 0,
            progress,
            stats: SessionStats::default(),
        })
    }

    fn preparation(&self) -> Duration {
        Duration::from_secs_f32(self.map.preparation_secs)
    }

    fn spend(&mut self, cost: u32) -> Result<(), IntentRejection> {
        if self.currency < cost {
            return Err(IntentRejection::InsufficientCurrency {
                required: cost,
                available: self.currency,
            });
        }
        self.currency -= cost;
        self.stats.currency_spent += u64::from(cost);
        Ok(())
    }

    fn earn(&mut self, amount: u32) {
        self.currency = self.currency.saturating_add(amount);
        self.stats.currency_earned += u64::from(amount);
    }

    fn apply_intent(
        &mut self,
        intent: Intent,
        out_events: &mut Vec<Event>,
    ) -> Result<(), IntentRejection> {
        if self.progress.is_concluded() {
            return Err(IntentRejection::SessionConcluded);
        }

        let catalog = Arc::clone(&self.catalog);
        match intent {
            Intent::PlaceTower { kind, cell } => {
                let definition = catalog
                    .tower(kind)
                    .ok_or(IntentRejection::UnknownTowerType { kind })?;
                if !self.map.grid.contains(cell) {
                    return Err(IntentRejection::OutOfBounds);
                }
                if self.blocked.contains(&cell) {
                    return Err(IntentRejection::Restricted);
                }
                if self.occupied.contains_key(&cell) {
                    return Err(IntentRejection::Occupied);
                }
                if self.store.towers.is_exhausted() {
                    return Err(IntentRejection::TowerLimit);
                }
                self.spend(definition.cost)?;

                let position = self.map.grid.cell_center(cell);
                let stats = TowerStats::resolve(&catalog, definition, 1, &[]);
                let tower = self.store.towers.insert_with(|id| Tower {
                    id,
                    kind,
                    cell,
                    position,
                    level: 1,
                    trinkets: Vec::new(),
                    stats,
                    targeting: definition.targeting,
                    cooldown: Duration::ZERO,
                    carry: Duration::ZERO,
                    target: None,
                });
                let tower = tower.ok_or(IntentRejection::TowerLimit)?;
                let _ = self.occupied.insert(cell, tower);
                out_events.push(Event::TowerPlaced { tower, kind, cell });
            }
            Intent::UpgradeTower { tower } => {
                let record = self
                    .store
                    .towers
                    .get_live(tower)
                    .ok_or(IntentRejection::UnknownTower { tower })?;
                let definition = catalog
                    .tower(record.kind)
                    .ok_or(IntentRejection::UnknownTowerType { kind: record.kind })?;
                let cost = definition
                    .upgrade_cost(record.level)
                    .ok_or(IntentRejection::MaxLevel)?;
                self.spend(cost)?;

                if let Some(record) = self.store.towers.get_live_mut(tower) {
                    record.level += 1;
                    record.stats =
                        TowerStats::resolve(&catalog, definition, record.level, &record.trinkets);
                    out_events.push(Event::TowerUpgraded {
                        tower,
                        level: record.level,
                    });
                }
            }
            Intent::SocketTrinket { tower, trinket } => {
                let record = self
                    .store
                    .towers
                    .get_live(tower)
                    .ok_or(IntentRejection::UnknownTower { tower })?;
                let definition = catalog
                    .tower(record.kind)
                    .ok_or(IntentRejection::UnknownTowerType { kind: record.kind })?;
                let gem = catalog
                    .trinket(trinket)
                    .ok_or(IntentRejection::UnknownTrinket { trinket })?;
                if record.trinkets.len() >= usize::from(definition.trinket_slots) {
                    return Err(IntentRejection::TrinketSlotsFull);
                }
                if !gem.required_elements.is_empty()
                    && !gem.required_elements.contains(definition.element)
                {
                    return Err(IntentRejection::TrinketIncompatible);
                }
                self.spend(gem.cost)?;

                if let Some(record) = self.store.towers.get_live_mut(tower) {
                    record.trinkets.push(trinket);
                    record.stats =
                        TowerStats::resolve(&catalog, definition, record.level, &record.trinkets);
                    out_events.push(Event::TrinketSocketed { tower, trinket });
                }
            }
            Intent::StartNextWave => match self.progress {
                WaveProgress::Preparing { wave, .. } => self.begin_wave(wave, out_events),
                _ => return Err(IntentRejection::WaveAlreadyActive),
            },
        }
        Ok(())
    }

    fn begin_wave(&mut self, wave: WaveIndex, out_events: &mut Vec<Event>) {
        self.progress = WaveProgress::Active {
            wave,
            elapsed: Duration::ZERO,
            spawned: 0,
        };
        out_events.push(Event::WaveStarted { wave });
    }

    fn spawn_enemy(&mut self, wave: WaveIndex, kind: EnemyTypeId, out_events: &mut Vec<Event>) {
        let WaveProgress::Active {
            wave: running,
            spawned,
            ..
        } = &mut self.progress
        else {
            return;
        };
        if *running != wave {
            return;
        }
        let Some(definition) = self.catalog.enemy(kind) else {
            return;
        };

        let mut record = self.store.enemy_pool.acquire();
        let position = self.path.start();
        let enemy = self.store.enemies.insert_with(|id| {
            record.id = Some(id);
            record.kind = Some(kind);
            record.wave = Some(wave);
            record.progress = 0.0;
            record.position = position;
            record.health = definition.max_health;
            record.max_health = definition.max_health;
            record.speed = definition.speed;
            record.armor = definition.armor;
            record.defense = DefenseProfile {
                element: definition.element,
                resistances: definition.resistances,
                immunities: definition.immunities,
            };
            record.reward = definition.reward;
            record.damage_to_base = definition.damage_to_base;
            record
        });
        let Some(enemy) = enemy else {
            return;
        };
        *spawned += 1;
        self.stats.enemies_spawned += 1;
        out_events.push(Event::EnemySpawned { enemy, kind, wave });
    }

    /// Removes health from a live enemy, recording the kill exactly once.
    ///
    /// Returns `true` when the enemy is still alive afterwards.
    fn damage_enemy(
        &mut self,
        enemy: EnemyId,
        amount: f32,
        killer: Option<TowerId>,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let Some(record) = self.store.enemies.get_live_mut(enemy) else {
            return false;
        };

        if amount > 0.0 && amount.is_finite() {
            let before = record.health;
            record.health = (record.health - amount).clamp(0.0, record.max_health);
            let dealt = before - record.health;
            self.stats.damage_dealt += f64::from(dealt);
            out_events.push(Event::EnemyDamaged {
                enemy,
                amount: dealt,
                health: record.health,
            });
        }
        debug_assert!(record.health >= 0.0 && record.health <= record.max_health);

        if record.health > 0.0 {
            return true;
        }

        let reward = record.reward;
        if self.store.enemies.mark_removed(enemy) {
            self.earn(reward);
            self.stats.enemies_killed += 1;
            out_events.push(Event::EnemyKilled {
                enemy,
                reward,
                killer,
            });
        }
        false
    }

    fn apply_hit(&mut self, hit: Hit, killer: TowerId, out_events: &mut Vec<Event>) {
        if !self.damage_enemy(hit.enemy, hit.damage, Some(killer), out_events) {
            return;
        }
        let rules = self.catalog.effects;
        let Some(record) = self.store.enemies.get_live_mut(hit.enemy) else {
            return;
        };
        for effect in hit.effects {
            record.effects.apply(effect, rules.rule_for(effect.kind));
            if let Some(magnitude) = record.effects.magnitude(effect.kind) {
                out_events.push(Event::EffectApplied {
                    enemy: hit.enemy,
                    kind: effect.kind,
                    magnitude,
                });
            }
        }
    }

    fn complete_wave(&mut self, wave: WaveIndex, out_events: &mut Vec<Event>) {
        if !matches!(self.progress, WaveProgress::Active { wave: running, .. } if running == wave) {
            return;
        }

        let bonus = usize::try_from(wave.get())
            .ok()
            .and_then(|index| self.schedule.get(index))
            .map_or(0, |definition| definition.bonus);
        self.earn(bonus);
        self.stats.waves_cleared += 1;
        out_events.push(Event::WaveCompleted { wave, bonus });

        let next = wave.next();
        let has_next = usize::try_from(next.get()).is_ok_and(|index| index < self.schedule.len());
        if has_next {
            let countdown = self.preparation();
            self.progress = WaveProgress::Preparing {
                wave: next,
                remaining: countdown,
            };
            out_events.push(Event::PreparationStarted {
                wave: next,
                countdown,
            });
        } else {
            self.progress = WaveProgress::Cleared;
        }
    }
}

/// Cells towers may not occupy: the map's restricted cells plus every cell the path crosses.
fn blocked_cells(map: &MapDefinition, path: &WaypointPath) -> BTreeSet<CellCoord> {
    let mut blocked = map.restricted.clone();
    let spacing = map.grid.cell_size / 4.0;
    blocked.extend(
        path.sample(spacing)
            .filter_map(|point| map.grid.cell_at(point)),
    );
    blocked
}

/// Executes the provided command against the world.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Submit {
            player,
            sequence,
            intent,
        } => match world.apply_intent(intent, out_events) {
            Ok(()) => out_events.push(Event::IntentApplied { player, sequence }),
            Err(reason) => out_events.push(Event::IntentRejected {
                player,
                sequence,
                reason,
            }),
        },
        Command::Tick { dt } => {
            world.tick = world.tick.saturating_add(1);
            for tower in world.store.towers.iter_live_mut() {
                // A tower already holding fire banks nothing.
                tower.carry = if tower.cooldown.is_zero() {
                    Duration::ZERO
                } else {
                    dt.saturating_sub(tower.cooldown)
                };
                tower.cooldown = tower.cooldown.saturating_sub(dt);
            }
            out_events.push(Event::TimeAdvanced {
                tick: world.tick,
                dt,
            });
        }
        Command::MoveEnemy { enemy, progress } => {
            let length = world.path.length();
            if let Some(record) = world.store.enemies.get_live_mut(enemy) {
                record.progress = progress.clamp(0.0, length);
                record.position = world.path.position_at(record.progress);
            }
        }
        Command::LeakEnemy { enemy } => {
            let Some(record) = world.store.enemies.get_live_mut(enemy) else {
                return;
            };
            record.progress = world.path.length();
            record.position = world.path.position_at(record.progress);
            let amount = record.damage_to_base;
            if world.store.enemies.mark_removed(enemy) {
                world.lives = world.lives.saturating_sub(amount);
                world.stats.enemies_leaked += 1;
                out_events.push(Event::LifeLost {
                    enemy,
                    amount,
                    lives: world.lives,
                });
            }
        }
        Command::FireProjectile {
            tower,
            target,
            payload,
            delivery,
            cooldown,
        } => {
            let Some(target_position) = world
                .store
                .enemies
                .get_live(target)
                .map(|enemy| enemy.position)
            else {
                return;
            };
            let Some(record) = world.store.towers.get_live_mut(tower) else {
                return;
            };
            record.cooldown = cooldown.saturating_sub(std::mem::take(&mut record.carry));
            record.target = Some(target);
            let origin = record.position;

            let mut projectile = world.store.projectile_pool.acquire();
            let id = world.store.projectiles.insert_with(|id| {
                projectile.id = Some(id);
                projectile.tower = Some(tower);
                projectile.target = Some(target);
                projectile.position = origin;
                projectile.target_position = target_position;
                projectile.delivery = Some(delivery);
                projectile.payload = Some(payload);
                projectile.age = Duration::ZERO;
                projectile
            });
            let Some(id) = id else {
                return;
            };
            world.stats.shots_fired += 1;
            out_events.push(Event::ProjectileFired {
                projectile: id,
                tower,
                target,
            });
        }
        Command::MoveProjectile {
            projectile,
            position,
            target_position,
            age,
        } => {
            if let Some(record) = world.store.projectiles.get_live_mut(projectile) {
                record.position = position;
                record.target_position = target_position;
                record.age = age;
            }
        }
        Command::RetargetProjectile { projectile, target } => {
            if world.store.enemies.get_live(target).is_none() {
                return;
            }
            if let Some(record) = world.store.projectiles.get_live_mut(projectile) {
                record.target = Some(target);
                out_events.push(Event::ProjectileRetargeted { projectile, target });
            }
        }
        Command::ExpireProjectile { projectile, reason } => {
            if world.store.projectiles.mark_removed(projectile) {
                out_events.push(Event::ProjectileExpired { projectile, reason });
            }
        }
        Command::ImpactProjectile { projectile, hits } => {
            let Some(tower) = world
                .store
                .projectiles
                .get_live(projectile)
                .and_then(|record| record.tower)
            else {
                return;
            };
            let _ = world.store.projectiles.mark_removed(projectile);
            out_events.push(Event::ProjectileImpacted {
                projectile,
                hits: u32::try_from(hits.len()).unwrap_or(u32::MAX),
            });
            for hit in hits {
                world.apply_hit(hit, tower, out_events);
            }
        }
        Command::ApplyEffectDamage { enemy, damage } => {
            let _ = world.damage_enemy(enemy, damage, None, out_events);
        }
        Command::AgeEffects { dt } => {
            for enemy in world.store.enemies.iter_live_mut() {
                let Some(id) = enemy.id else {
                    continue;
                };
                for kind in enemy.effects.age(dt) {
                    out_events.push(Event::EffectExpired { enemy: id, kind });
                }
            }
        }
        Command::AdvanceWaveClock { dt } => match &mut world.progress {
            WaveProgress::Preparing { remaining, .. } => {
                *remaining = remaining.saturating_sub(dt);
            }
            WaveProgress::Active { elapsed, .. } => {
                *elapsed = elapsed.saturating_add(dt);
            }
            WaveProgress::Cleared | WaveProgress::Concluded { .. } => {}
        },
        Command::BeginWave => {
            if let WaveProgress::Preparing { wave, .. } = world.progress {
                world.begin_wave(wave, out_events);
            }
        }
        Command::SpawnEnemy { wave, kind } => world.spawn_enemy(wave, kind, out_events),
        Command::CompleteWave { wave } => world.complete_wave(wave, out_events),
        Command::SweepRemovals => world.store.sweep(),
        Command::Conclude { outcome } => {
            if !world.progress.is_concluded() {
                world.progress = WaveProgress::Concluded { outcome };
                out_events.push(Event::SessionConcluded { outcome });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::{PoolStats, World};
    use siege_core::{
        Catalog, CellCoord, EnemySnapshot, GridSpec, ProjectileSnapshot, SessionOutcome,
        SessionStats, TowerSnapshot, WaveDefinition, WaveProgress, WaypointPath,
    };

    /// Captures every tower in identifier order.
    #[must_use]
    pub fn towers(world: &World) -> Vec<TowerSnapshot> {
        world
            .store
            .towers
            .iter_live()
            .map(|tower| TowerSnapshot {
                id: tower.id,
                kind: tower.kind,
                cell: tower.cell,
                position: tower.position,
                level: tower.level,
                trinkets: tower.trinkets.clone(),
                range: tower.stats.range,
                targeting: tower.targeting,
                ready_in: tower.cooldown,
                target: tower.target,
            })
            .collect()
    }

    /// Captures every live enemy in identifier order.
    ///
    /// Enemies marked for removal during the current tick are excluded.
    #[must_use]
    pub fn enemies(world: &World) -> Vec<EnemySnapshot> {
        world
            .store
            .enemies
            .iter_live()
            .filter_map(|enemy| {
                Some(EnemySnapshot {
                    id: enemy.id?,
                    kind: enemy.kind?,
                    wave: enemy.wave?,
                    position: enemy.position,
                    progress: enemy.progress,
                    health: enemy.health,
                    max_health: enemy.max_health,
                    speed: enemy.speed,
                    armor: enemy.armor,
                    defense: enemy.defense,
                    effects: enemy.effects.clone(),
                })
            })
            .collect()
    }

    /// Captures every live projectile in identifier order.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .store
            .projectiles
            .iter_live()
            .filter_map(|projectile| {
                Some(ProjectileSnapshot {
                    id: projectile.id?,
                    tower: projectile.tower?,
                    target: projectile.target?,
                    position: projectile.position,
                    target_position: projectile.target_position,
                    delivery: projectile.delivery?,
                    payload: projectile.payload.clone()?,
                    age: projectile.age,
                })
            })
            .collect()
    }

    /// Number of towers placed.
    #[must_use]
    pub fn tower_count(world: &World) -> usize {
        world.store.towers.len()
    }

    /// Catalog the session was created with.
    #[must_use]
    pub fn catalog(world: &World) -> &Catalog {
        &world.catalog
    }

    /// Enemy path of the map.
    #[must_use]
    pub fn path(world: &World) -> &WaypointPath {
        &world.path
    }

    /// Build grid of the map.
    #[must_use]
    pub fn grid(world: &World) -> GridSpec {
        world.map.grid
    }

    /// Reports whether a tower could be placed on `cell`, ignoring cost.
    #[must_use]
    pub fn is_buildable(world: &World, cell: CellCoord) -> bool {
        world.map.grid.contains(cell)
            && !world.blocked.contains(&cell)
            && !world.occupied.contains_key(&cell)
    }

    /// Full wave schedule, authored waves first.
    #[must_use]
    pub fn schedule(world: &World) -> &[WaveDefinition] {
        &world.schedule
    }

    /// Current position in the wave timeline.
    #[must_use]
    pub fn wave_progress(world: &World) -> WaveProgress {
        world.progress
    }

    /// Terminal outcome, once the session has concluded.
    #[must_use]
    pub fn outcome(world: &World) -> Option<SessionOutcome> {
        match world.progress {
            WaveProgress::Concluded { outcome } => Some(outcome),
            _ => None,
        }
    }

    /// Currency held by the players.
    #[must_use]
    pub fn currency(world: &World) -> u32 {
        world.currency
    }

    /// Lives left.
    #[must_use]
    pub fn lives(world: &World) -> u32 {
        world.lives
    }

    /// Number of ticks simulated.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick
    }

    /// Cumulative session counters.
    #[must_use]
    pub fn stats(world: &World) -> SessionStats {
        world.stats
    }

    /// Allocation counters of the enemy and projectile pools.
    #[must_use]
    pub fn pool_stats(world: &World) -> (PoolStats, PoolStats) {
        (
            world.store.enemy_pool.stats(),
            world.store.projectile_pool.stats(),
        )
    }

    /// Countdown before the next wave, when preparing.
    #[must_use]
    pub fn preparation_remaining(world: &World) -> Option<Duration> {
        match world.progress {
            WaveProgress::Preparing { remaining, .. } => Some(remaining),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siege_core::{
        standard_ids, EffectKind, OnHitEffect, PlayerId, SessionOutcome, SpawnEntry,
    };

    fn world() -> World {
        let catalog = Arc::new(Catalog::standard());
        let map = Arc::new(MapDefinition::meadow());
        let schedule = vec![WaveDefinition {
            entries: vec![SpawnEntry {
                enemy: standard_ids::BASIC_ENEMY,
                offset_secs: 0.0,
            }],
            bonus: 50,
        }];
        World::new(catalog, map, schedule).expect("valid world")
    }

    fn submit(world: &mut World, intent: Intent) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::Submit {
                player: PlayerId::new(1),
                sequence: 1,
                intent,
            },
            &mut events,
        );
        events
    }

    fn spawn_one(world: &mut World) -> EnemyId {
        let mut events = Vec::new();
        apply(world, Command::BeginWave, &mut events);
        apply(
            world,
            Command::SpawnEnemy {
                wave: WaveIndex::new(0),
                kind: standard_ids::BASIC_ENEMY,
            },
            &mut events,
        );
        query::enemies(world)[0].id
    }

    #[test]
    fn placement_spends_currency_and_occupies_cell() {
        let mut world = world();
        let cell = CellCoord::new(3, 3);
        let events = submit(
            &mut world,
            Intent::PlaceTower {
                kind: standard_ids::BASIC_TOWER,
                cell,
            },
        );

        assert!(matches!(events[0], Event::TowerPlaced { .. }));
        assert_eq!(query::currency(&world), 50);
        assert!(!query::is_buildable(&world, cell));
    }

    #[test]
    fn overdraft_is_rejected_without_spending() {
        let mut world = world();
        let events = submit(
            &mut world,
            Intent::PlaceTower {
                kind: standard_ids::SNIPER_TOWER,
                cell: CellCoord::new(3, 3),
            },
        );

        assert_eq!(
            events,
            vec![Event::IntentRejected {
                player: PlayerId::new(1),
                sequence: 1,
                reason: IntentRejection::InsufficientCurrency {
                    required: 140,
                    available: 100,
                },
            }]
        );
        assert_eq!(query::currency(&world), 100);
        assert_eq!(query::tower_count(&world), 0);
    }

    #[test]
    fn path_cells_are_restricted() {
        let mut world = world();
        let events = submit(
            &mut world,
            Intent::PlaceTower {
                kind: standard_ids::BASIC_TOWER,
                cell: CellCoord::new(5, 1),
            },
        );
        assert!(matches!(
            events[0],
            Event::IntentRejected {
                reason: IntentRejection::Restricted,
                ..
            }
        ));
    }

    #[test]
    fn upgrades_stop_at_max_level() {
        let mut world = world();
        world.currency = 1_000;
        let _ = submit(
            &mut world,
            Intent::PlaceTower {
                kind: standard_ids::BASIC_TOWER,
                cell: CellCoord::new(3, 3),
            },
        );
        let tower = query::towers(&world)[0].id;
        for _ in 0..4 {
            let events = submit(&mut world, Intent::UpgradeTower { tower });
            assert!(matches!(events[0], Event::TowerUpgraded { .. }));
        }
        let events = submit(&mut world, Intent::UpgradeTower { tower });
        assert!(matches!(
            events[0],
            Event::IntentRejected {
                reason: IntentRejection::MaxLevel,
                ..
            }
        ));
        assert_eq!(query::currency(&world), 1_000 - 50 - 30 - 50 - 80 - 120);
        assert_eq!(query::towers(&world)[0].level, 5);
    }

    #[test]
    fn trinket_slots_are_bounded() {
        let mut world = world();
        world.currency = 1_000;
        let _ = submit(
            &mut world,
            Intent::PlaceTower {
                kind: standard_ids::SNIPER_TOWER,
                cell: CellCoord::new(3, 3),
            },
        );
        let tower = query::towers(&world)[0].id;
        let first = submit(
            &mut world,
            Intent::SocketTrinket {
                tower,
                trinket: standard_ids::DAMAGE_GEM,
            },
        );
        assert!(matches!(first[0], Event::TrinketSocketed { .. }));
        let second = submit(
            &mut world,
            Intent::SocketTrinket {
                tower,
                trinket: standard_ids::SPEED_GEM,
            },
        );
        assert!(matches!(
            second[0],
            Event::IntentRejected {
                reason: IntentRejection::TrinketSlotsFull,
                ..
            }
        ));
    }

    #[test]
    fn simultaneous_overkill_rewards_once() {
        let mut world = world();
        let _ = submit(
            &mut world,
            Intent::PlaceTower {
                kind: standard_ids::BASIC_TOWER,
                cell: CellCoord::new(3, 3),
            },
        );
        let tower = query::towers(&world)[0].id;
        let enemy = spawn_one(&mut world);
        let before = query::currency(&world);

        let mut events = Vec::new();
        for _ in 0..2 {
            apply(
                &mut world,
                Command::FireProjectile {
                    tower,
                    target: enemy,
                    payload: DamagePayload {
                        damage: 500.0,
                        element: siege_core::Element::Physical,
                        armor_penetration: 0.0,
                        splash_radius: 0.0,
                        on_hit: Vec::new(),
                        status_bypasses_immunity: false,
                    },
                    delivery: Delivery::Instant,
                    cooldown: Duration::ZERO,
                },
                &mut events,
            );
        }
        let projectiles: Vec<_> = query::projectiles(&world).iter().map(|p| p.id).collect();
        assert_eq!(projectiles.len(), 2);
        for projectile in projectiles {
            apply(
                &mut world,
                Command::ImpactProjectile {
                    projectile,
                    hits: vec![Hit {
                        enemy,
                        damage: 500.0,
                        effects: Vec::new(),
                    }],
                },
                &mut events,
            );
        }

        let kills = events
            .iter()
            .filter(|event| matches!(event, Event::EnemyKilled { .. }))
            .count();
        assert_eq!(kills, 1);
        assert_eq!(query::currency(&world), before + 8);
        assert!(query::enemies(&world).is_empty());

        apply(&mut world, Command::SweepRemovals, &mut events);
        assert_eq!(query::stats(&world).enemies_killed, 1);
    }

    fn fire_whenever_ready(
        world: &mut World,
        tower: TowerId,
        enemy: EnemyId,
        dt: Duration,
        ticks: u32,
    ) -> usize {
        let interval = Duration::from_secs_f64(1.0 / 1.4);
        let mut shots = 0;
        let mut events = Vec::new();
        for _ in 0..ticks {
            apply(world, Command::Tick { dt }, &mut events);
            if query::towers(world)[0].ready_in.is_zero() {
                apply(
                    world,
                    Command::FireProjectile {
                        tower,
                        target: enemy,
                        payload: DamagePayload {
                            damage: 0.0,
                            element: siege_core::Element::Physical,
                            armor_penetration: 0.0,
                            splash_radius: 0.0,
                            on_hit: Vec::new(),
                            status_bypasses_immunity: false,
                        },
                        delivery: Delivery::Instant,
                        cooldown: interval,
                    },
                    &mut events,
                );
                shots += 1;
            }
        }
        shots
    }

    #[test]
    fn fire_cadence_does_not_depend_on_tick_rate() {
        for rate in [10_u32, 20, 60] {
            let mut world = world();
            let _ = submit(
                &mut world,
                Intent::PlaceTower {
                    kind: standard_ids::BASIC_TOWER,
                    cell: CellCoord::new(3, 3),
                },
            );
            let tower = query::towers(&world)[0].id;
            let enemy = spawn_one(&mut world);

            let dt = Duration::from_secs(1) / rate;
            let shots = fire_whenever_ready(&mut world, tower, enemy, dt, rate * 60);
            assert!((83..=85).contains(&shots), "{shots} shots at {rate} Hz");
        }
    }

    #[test]
    fn holding_fire_banks_no_time() {
        let mut world = world();
        let _ = submit(
            &mut world,
            Intent::PlaceTower {
                kind: standard_ids::BASIC_TOWER,
                cell: CellCoord::new(3, 3),
            },
        );
        let tower = query::towers(&world)[0].id;
        let dt = Duration::from_millis(50);
        let mut events = Vec::new();
        for _ in 0..40 {
            apply(&mut world, Command::Tick { dt }, &mut events);
        }

        let enemy = spawn_one(&mut world);
        assert_eq!(fire_whenever_ready(&mut world, tower, enemy, dt, 1), 1);
        let mut waited = 0;
        while !query::towers(&world)[0].ready_in.is_zero() {
            apply(&mut world, Command::Tick { dt }, &mut events);
            waited += 1;
        }
        assert_eq!(waited, 15);
    }

    #[test]
    fn health_is_clamped_at_zero() {
        let mut world = world();
        let enemy = spawn_one(&mut world);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ApplyEffectDamage {
                enemy,
                damage: 10_000.0,
            },
            &mut events,
        );
        assert!(events.contains(&Event::EnemyDamaged {
            enemy,
            amount: 102.0,
            health: 0.0,
        }));
    }

    #[test]
    fn effects_on_hit_respect_stacking_rules() {
        let mut world = world();
        let _ = submit(
            &mut world,
            Intent::PlaceTower {
                kind: standard_ids::BASIC_TOWER,
                cell: CellCoord::new(3, 3),
            },
        );
        let tower = query::towers(&world)[0].id;
        let enemy = spawn_one(&mut world);
        let burn = OnHitEffect {
            kind: EffectKind::Burn,
            magnitude: 20.0,
            duration_secs: 1.0,
        };
        for _ in 0..2 {
            world.apply_hit(
                Hit {
                    enemy,
                    damage: 1.0,
                    effects: vec![burn],
                },
                tower,
                &mut Vec::new(),
            );
        }
        let snapshot = &query::enemies(&world)[0];
        assert_eq!(snapshot.effects.magnitude(EffectKind::Burn), Some(30.0));
    }

    #[test]
    fn leak_reduces_lives_and_saturates() {
        let mut world = world();
        world.lives = 1;
        let enemy = spawn_one(&mut world);
        let mut events = Vec::new();
        apply(&mut world, Command::LeakEnemy { enemy }, &mut events);
        apply(&mut world, Command::LeakEnemy { enemy }, &mut events);
        assert_eq!(query::lives(&world), 0);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::LifeLost { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn swept_enemies_are_recycled() {
        let mut world = world();
        let enemy = spawn_one(&mut world);
        let mut events = Vec::new();
        apply(&mut world, Command::LeakEnemy { enemy }, &mut events);
        apply(&mut world, Command::SweepRemovals, &mut events);
        let (enemy_pool, _) = query::pool_stats(&world);
        assert_eq!(enemy_pool.allocated, 1);

        world.progress = WaveProgress::Preparing {
            wave: WaveIndex::new(0),
            remaining: Duration::ZERO,
        };
        let _ = spawn_one(&mut world);
        let (enemy_pool, _) = query::pool_stats(&world);
        assert_eq!(enemy_pool.reused, 1);
        assert!(query::enemies(&world)[0].effects.is_empty());
    }

    #[test]
    fn completing_last_wave_clears_schedule() {
        let mut world = world();
        let enemy = spawn_one(&mut world);
        let mut events = Vec::new();
        apply(&mut world, Command::LeakEnemy { enemy }, &mut events);
        apply(&mut world, Command::SweepRemovals, &mut events);
        apply(
            &mut world,
            Command::CompleteWave {
                wave: WaveIndex::new(0),
            },
            &mut events,
        );
        assert_eq!(query::currency(&world), 150);
        assert_eq!(query::wave_progress(&world), WaveProgress::Cleared);
    }

    #[test]
    fn concluded_sessions_reject_intents() {
        let mut world = world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Conclude {
                outcome: SessionOutcome::Lost,
            },
            &mut events,
        );
        let events = submit(&mut world, Intent::StartNextWave);
        assert!(matches!(
            events[0],
            Event::IntentRejected {
                reason: IntentRejection::SessionConcluded,
                ..
            }
        ));
    }
}
