#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Siege engine.
//!
//! This crate defines the message surface that connects the session loop,
//! the authoritative world, and pure systems. Systems read immutable
//! snapshots and respond exclusively with [`Command`] batches, the world
//! executes those commands via its `apply` entry point, and every observable
//! mutation is reported as an [`Event`] that the synchronization layer turns
//! into outbound deltas.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod catalog;
mod effects;
mod element;
mod error;
mod geometry;
mod ids;
mod map;

pub use catalog::{
    standard_ids, Catalog, CombatTuning, Delivery, ElementChart, ElementRelation, EnemyDefinition,
    EnemyRole, LevelScaling, LostTargetPolicy, TargetingPolicy, TowerDefinition, TowerStats,
    TrinketDefinition,
};
pub use effects::{ActiveEffect, ActiveEffects, EffectKind, EffectRules, OnHitEffect, StackingRule};
pub use element::{DefenseProfile, Element, ElementSet};
pub use error::{IntentRejection, LoadError};
pub use geometry::{CellCoord, GridSpec, WaypointPath, WorldPoint};
pub use ids::{
    EnemyId, EnemyTypeId, PlayerId, ProjectileId, TowerId, TowerTypeId, TrinketId, WaveIndex,
};
pub use map::{MapDefinition, SpawnEntry, WaveDefinition};

/// Player request validated against session state before it mutates anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Builds a tower of `kind` on `cell`.
    PlaceTower {
        /// Tower type to build.
        kind: TowerTypeId,
        /// Target grid cell.
        cell: CellCoord,
    },
    /// Raises a tower's level by one.
    UpgradeTower {
        /// Tower to upgrade.
        tower: TowerId,
    },
    /// Buys `trinket` and sockets it into `tower`.
    SocketTrinket {
        /// Receiving tower.
        tower: TowerId,
        /// Trinket to purchase.
        trinket: TrinketId,
    },
    /// Ends the current preparation countdown early.
    StartNextWave,
}

/// Damage carried by a projectile from the tower that fired it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DamagePayload {
    /// Damage before elemental and armor adjustments.
    pub damage: f32,
    /// Attack element.
    pub element: Element,
    /// Armor ignored by the hit.
    pub armor_penetration: f32,
    /// Area damage radius around the impact point.
    pub splash_radius: f32,
    /// Status effects applied on hit.
    pub on_hit: Vec<OnHitEffect>,
    /// Whether status effects land on targets immune to the element.
    pub status_bypasses_immunity: bool,
}

impl DamagePayload {
    /// Builds the payload of a shot from resolved tower statistics.
    #[must_use]
    pub fn from_stats(stats: &TowerStats) -> Self {
        Self {
            damage: stats.damage,
            element: stats.element,
            armor_penetration: stats.armor_penetration,
            splash_radius: stats.splash_radius,
            on_hit: stats.on_hit.clone(),
            status_bypasses_immunity: stats.status_bypasses_immunity,
        }
    }
}

/// Damage and effects a single enemy receives from an impact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Enemy receiving the hit.
    pub enemy: EnemyId,
    /// Final damage after elemental multiplier and armor.
    pub damage: f32,
    /// Status effects that apply to this enemy.
    pub effects: Vec<OnHitEffect>,
}

/// Reason a projectile was removed without impacting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    /// The target disappeared and no replacement was found.
    TargetLost,
    /// The projectile exceeded its lifetime.
    Lifetime,
    /// The projectile left the map.
    OutOfBounds,
}

/// Terminal result of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    /// Every scheduled wave was cleared.
    Won,
    /// Lives reached zero.
    Lost,
}

/// Position of the session within its wave timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveProgress {
    /// Counting down before `wave` starts.
    Preparing {
        /// Wave about to start.
        wave: WaveIndex,
        /// Countdown left.
        remaining: Duration,
    },
    /// `wave` is spawning or still has live enemies.
    Active {
        /// Running wave.
        wave: WaveIndex,
        /// Time since the wave started.
        elapsed: Duration,
        /// Entries spawned so far.
        spawned: u32,
    },
    /// Every wave has been cleared; the session is about to conclude.
    Cleared,
    /// The session reached a terminal state.
    Concluded {
        /// Final result.
        outcome: SessionOutcome,
    },
}

impl WaveProgress {
    /// Reports whether the session accepts no further intents or ticks.
    #[must_use]
    pub const fn is_concluded(&self) -> bool {
        matches!(self, Self::Concluded { .. })
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Validates and applies a player intent.
    Submit {
        /// Player that issued the intent.
        player: PlayerId,
        /// Client-chosen sequence number echoed in the response.
        sequence: u64,
        /// Requested action.
        intent: Intent,
    },
    /// Advances the simulation clock and tower cooldowns.
    Tick {
        /// Duration of simulated time covered by the tick.
        dt: Duration,
    },
    /// Moves an enemy to a new arc-length position on the path.
    MoveEnemy {
        /// Enemy to move.
        enemy: EnemyId,
        /// New arc-length progress.
        progress: f32,
    },
    /// Removes an enemy that reached the end of the path and charges lives.
    LeakEnemy {
        /// Enemy that leaked.
        enemy: EnemyId,
    },
    /// Spawns a projectile from a ready tower and resets its cooldown.
    FireProjectile {
        /// Firing tower.
        tower: TowerId,
        /// Targeted enemy.
        target: EnemyId,
        /// Damage carried by the projectile.
        payload: DamagePayload,
        /// Delivery mode.
        delivery: Delivery,
        /// Cooldown applied to the tower.
        cooldown: Duration,
    },
    /// Updates a traveling projectile's flight state.
    MoveProjectile {
        /// Projectile to move.
        projectile: ProjectileId,
        /// New position.
        position: WorldPoint,
        /// Last known position of the target.
        target_position: WorldPoint,
        /// Lifetime consumed so far.
        age: Duration,
    },
    /// Redirects a projectile whose target was lost.
    RetargetProjectile {
        /// Projectile to redirect.
        projectile: ProjectileId,
        /// Replacement target.
        target: EnemyId,
    },
    /// Removes a projectile without impact.
    ExpireProjectile {
        /// Projectile to remove.
        projectile: ProjectileId,
        /// Cause of removal.
        reason: ExpiryReason,
    },
    /// Removes a projectile and applies its hits.
    ImpactProjectile {
        /// Impacting projectile.
        projectile: ProjectileId,
        /// Hits resolved at the impact point.
        hits: Vec<Hit>,
    },
    /// Applies one tick of damage-over-time from an active effect.
    ApplyEffectDamage {
        /// Affected enemy.
        enemy: EnemyId,
        /// Damage dealt this tick.
        damage: f32,
    },
    /// Decrements every active effect and removes the expired ones.
    AgeEffects {
        /// Time elapsed.
        dt: Duration,
    },
    /// Advances the wave countdown or wave clock.
    AdvanceWaveClock {
        /// Time elapsed.
        dt: Duration,
    },
    /// Starts the wave whose countdown finished.
    BeginWave,
    /// Spawns the next scheduled entry of the running wave.
    SpawnEnemy {
        /// Wave the enemy belongs to.
        wave: WaveIndex,
        /// Enemy type to spawn.
        kind: EnemyTypeId,
    },
    /// Grants the wave bonus and moves to the next preparation phase.
    CompleteWave {
        /// Wave that was cleared.
        wave: WaveIndex,
    },
    /// Deletes every entity marked for removal during the tick.
    SweepRemovals,
    /// Moves the session into its terminal state.
    Conclude {
        /// Final result.
        outcome: SessionOutcome,
    },
}

/// Events emitted by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// Simulation time advanced.
    TimeAdvanced {
        /// Tick counter after the advance.
        tick: u64,
        /// Duration covered.
        dt: Duration,
    },
    /// A player intent was applied.
    IntentApplied {
        /// Issuing player.
        player: PlayerId,
        /// Client sequence number.
        sequence: u64,
    },
    /// A player intent was rejected without mutating state.
    IntentRejected {
        /// Issuing player.
        player: PlayerId,
        /// Client sequence number.
        sequence: u64,
        /// Cause of rejection.
        reason: IntentRejection,
    },
    /// A tower was built.
    TowerPlaced {
        /// New tower.
        tower: TowerId,
        /// Tower type.
        kind: TowerTypeId,
        /// Occupied cell.
        cell: CellCoord,
    },
    /// A tower gained a level.
    TowerUpgraded {
        /// Upgraded tower.
        tower: TowerId,
        /// Level after the upgrade.
        level: u8,
    },
    /// A trinket was socketed.
    TrinketSocketed {
        /// Receiving tower.
        tower: TowerId,
        /// Socketed trinket.
        trinket: TrinketId,
    },
    /// The countdown to a wave began.
    PreparationStarted {
        /// Upcoming wave.
        wave: WaveIndex,
        /// Countdown length.
        countdown: Duration,
    },
    /// A wave began spawning.
    WaveStarted {
        /// Started wave.
        wave: WaveIndex,
    },
    /// An enemy entered the path.
    EnemySpawned {
        /// New enemy.
        enemy: EnemyId,
        /// Enemy type.
        kind: EnemyTypeId,
        /// Owning wave.
        wave: WaveIndex,
    },
    /// An enemy lost health.
    EnemyDamaged {
        /// Damaged enemy.
        enemy: EnemyId,
        /// Health removed.
        amount: f32,
        /// Health left.
        health: f32,
    },
    /// An enemy died; reported exactly once per enemy.
    EnemyKilled {
        /// Dead enemy.
        enemy: EnemyId,
        /// Currency granted.
        reward: u32,
        /// Tower whose projectile landed the final hit, if any.
        killer: Option<TowerId>,
    },
    /// An enemy reached the end of the path.
    LifeLost {
        /// Leaking enemy.
        enemy: EnemyId,
        /// Lives removed.
        amount: u32,
        /// Lives left.
        lives: u32,
    },
    /// A tower fired.
    ProjectileFired {
        /// New projectile.
        projectile: ProjectileId,
        /// Firing tower.
        tower: TowerId,
        /// Targeted enemy.
        target: EnemyId,
    },
    /// A projectile switched to a new target after losing its original one.
    ProjectileRetargeted {
        /// Redirected projectile.
        projectile: ProjectileId,
        /// Replacement target.
        target: EnemyId,
    },
    /// A projectile was removed without impact.
    ProjectileExpired {
        /// Removed projectile.
        projectile: ProjectileId,
        /// Cause of removal.
        reason: ExpiryReason,
    },
    /// A projectile hit.
    ProjectileImpacted {
        /// Impacting projectile.
        projectile: ProjectileId,
        /// Number of enemies hit.
        hits: u32,
    },
    /// A status effect landed on an enemy.
    EffectApplied {
        /// Affected enemy.
        enemy: EnemyId,
        /// Effect kind.
        kind: EffectKind,
        /// Magnitude after stacking.
        magnitude: f32,
    },
    /// A status effect ran out.
    EffectExpired {
        /// Affected enemy.
        enemy: EnemyId,
        /// Effect kind.
        kind: EffectKind,
    },
    /// Every enemy of a wave was removed.
    WaveCompleted {
        /// Cleared wave.
        wave: WaveIndex,
        /// Currency granted.
        bonus: u32,
    },
    /// The session reached a terminal state.
    SessionConcluded {
        /// Final result.
        outcome: SessionOutcome,
    },
}

/// Sums the simulated time reported by `TimeAdvanced` events.
#[must_use]
pub fn time_elapsed(events: &[Event]) -> Duration {
    events
        .iter()
        .filter_map(|event| match event {
            Event::TimeAdvanced { dt, .. } => Some(*dt),
            _ => None,
        })
        .sum()
}

/// Read-only snapshot of a tower.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerSnapshot {
    /// Tower identifier.
    pub id: TowerId,
    /// Tower type.
    pub kind: TowerTypeId,
    /// Occupied cell.
    pub cell: CellCoord,
    /// Centre of the occupied cell.
    pub position: WorldPoint,
    /// Upgrade level, starting at one.
    pub level: u8,
    /// Socketed trinkets in socketing order.
    pub trinkets: Vec<TrinketId>,
    /// Effective range after levels and trinkets.
    pub range: f32,
    /// Target selection rule.
    pub targeting: TargetingPolicy,
    /// Time until the tower may fire again.
    pub ready_in: Duration,
    /// Enemy targeted by the most recent shot; may no longer exist.
    pub target: Option<EnemyId>,
}

/// Read-only snapshot of an enemy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemySnapshot {
    /// Enemy identifier.
    pub id: EnemyId,
    /// Enemy type.
    pub kind: EnemyTypeId,
    /// Wave that spawned the enemy.
    pub wave: WaveIndex,
    /// Position derived from path progress.
    pub position: WorldPoint,
    /// Arc-length progress along the path.
    pub progress: f32,
    /// Current health in `[0, max_health]`.
    pub health: f32,
    /// Health on spawn.
    pub max_health: f32,
    /// Base movement speed.
    pub speed: f32,
    /// Flat damage reduction.
    pub armor: f32,
    /// Elemental defenses.
    pub defense: DefenseProfile,
    /// Active status effects.
    pub effects: ActiveEffects,
}

/// Read-only snapshot of a projectile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    /// Projectile identifier.
    pub id: ProjectileId,
    /// Tower that fired the projectile.
    pub tower: TowerId,
    /// Targeted enemy; may no longer exist.
    pub target: EnemyId,
    /// Current position.
    pub position: WorldPoint,
    /// Last known position of the target.
    pub target_position: WorldPoint,
    /// Delivery mode.
    pub delivery: Delivery,
    /// Carried damage.
    pub payload: DamagePayload,
    /// Lifetime consumed so far.
    pub age: Duration,
}

/// Tower chosen to fire at an enemy this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Firing tower.
    pub tower: TowerId,
    /// Chosen enemy.
    pub enemy: EnemyId,
}

/// Cumulative counters describing a session, consumed by balance tooling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Enemies spawned.
    pub enemies_spawned: u32,
    /// Enemies killed.
    pub enemies_killed: u32,
    /// Enemies that reached the end of the path.
    pub enemies_leaked: u32,
    /// Projectiles fired.
    pub shots_fired: u32,
    /// Health removed from enemies.
    pub damage_dealt: f64,
    /// Currency gained from kills and wave bonuses.
    pub currency_earned: u64,
    /// Currency spent on towers, upgrades and trinkets.
    pub currency_spent: u64,
    /// Waves cleared.
    pub waves_cleared: u32,
}
