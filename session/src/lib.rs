#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-step session loop that sequences every system against one authoritative world.
//!
//! A [`Session`] owns the [`World`] and the systems. Intents submitted
//! between ticks are queued and validated at the start of the next tick.
//! Each call to [`Session::tick`] runs the phases in a fixed order and
//! returns the events it produced together with per-player rejections.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use siege_core::{
    Catalog, Command, EnemySnapshot, Event, Intent, IntentRejection, LoadError, MapDefinition,
    PlayerId, ProjectileSnapshot, SessionOutcome, SessionStats, TowerSnapshot, TowerTarget,
    WaveProgress,
};
use siege_system_movement::Movement;
use siege_system_status_effects::StatusEffects;
use siege_system_tower_combat::{ProjectileResolution, TowerCombat};
use siege_system_tower_targeting::TowerTargeting;
use siege_system_wave_generation::WaveGeneration;
use siege_system_wave_scheduler::WaveScheduler;
use siege_world::{self as world, query, World};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Default simulation rate.
pub const DEFAULT_TICK_RATE_HZ: u32 = 20;

/// Static inputs required to start a session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Catalog shared by every session of the process.
    pub catalog: Arc<Catalog>,
    /// Map the session is played on.
    pub map: Arc<MapDefinition>,
    /// Ticks simulated per second of game time.
    pub tick_rate_hz: u32,
    /// Seed for procedural waves.
    pub seed: u64,
}

impl SessionConfig {
    /// Creates a configuration with the default tick rate and a zero seed.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, map: Arc<MapDefinition>) -> Self {
        Self {
            catalog,
            map,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            seed: 0,
        }
    }

    /// Replaces the tick rate.
    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate_hz: u32) -> Self {
        self.tick_rate_hz = tick_rate_hz;
        self
    }

    /// Replaces the procedural wave seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks the tick rate and validates the catalog and map.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.tick_rate_hz == 0 {
            return Err(SessionError::InvalidTickRate);
        }
        self.catalog.validate()?;
        self.map.validate(&self.catalog)?;
        Ok(())
    }
}

/// Failures that prevent a session from starting.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Catalog or map data is malformed.
    #[error("invalid session assets: {0}")]
    Load(#[from] LoadError),
    /// The configured tick rate is zero.
    #[error("tick rate must be greater than zero")]
    InvalidTickRate,
}

/// Intent rejected during a tick, addressed to the player who sent it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// Player that submitted the intent.
    pub player: PlayerId,
    /// Client sequence number of the intent.
    pub sequence: u64,
    /// Why the intent was refused.
    pub reason: IntentRejection,
}

/// Outcome of a single [`Session::tick`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Tick counter after the tick ran.
    pub tick: u64,
    /// Every event emitted during the tick, in emission order.
    pub events: Vec<Event>,
    /// Rejected intents, in submission order.
    pub rejections: Vec<Rejection>,
    /// Set on the tick the session concluded.
    pub concluded: Option<SessionOutcome>,
}

/// Complete observable state of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Ticks simulated so far.
    pub tick: u64,
    /// Currency held by the players.
    pub currency: u32,
    /// Lives left.
    pub lives: u32,
    /// Wave timeline position.
    pub wave: WaveProgress,
    /// Towers in identifier order.
    pub towers: Vec<TowerSnapshot>,
    /// Live enemies in identifier order.
    pub enemies: Vec<EnemySnapshot>,
    /// Live projectiles in identifier order.
    pub projectiles: Vec<ProjectileSnapshot>,
    /// Cumulative counters.
    pub stats: SessionStats,
}

#[derive(Clone, Copy, Debug)]
struct PendingIntent {
    player: PlayerId,
    sequence: u64,
    intent: Intent,
}

/// Authoritative simulation of one game.
#[derive(Debug)]
pub struct Session {
    world: World,
    dt: Duration,
    pending: Vec<PendingIntent>,
    movement: Movement,
    targeting: TowerTargeting,
    combat: TowerCombat,
    projectiles: ProjectileResolution,
    status_effects: StatusEffects,
    scheduler: WaveScheduler,
    targets: Vec<TowerTarget>,
    commands: Vec<Command>,
}

impl Session {
    /// Validates the assets and builds the world with the full wave schedule.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let schedule = WaveGeneration::new().schedule(&config.catalog, &config.map, config.seed);
        let projectiles = ProjectileResolution::new(&config.catalog);
        info!(
            map = %config.map.id,
            waves = schedule.len(),
            tick_rate_hz = config.tick_rate_hz,
            seed = config.seed,
            "session created"
        );
        let world = World::new(config.catalog, config.map, schedule)?;

        Ok(Self {
            world,
            dt: Duration::from_secs(1) / config.tick_rate_hz,
            pending: Vec::new(),
            movement: Movement::new(),
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            projectiles,
            status_effects: StatusEffects::new(),
            scheduler: WaveScheduler::new(),
            targets: Vec::new(),
            commands: Vec::new(),
        })
    }

    /// Queues an intent for validation at the start of the next tick.
    pub fn submit(&mut self, player: PlayerId, sequence: u64, intent: Intent) {
        self.pending.push(PendingIntent {
            player,
            sequence,
            intent,
        });
    }

    /// Duration of simulated time covered by one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        self.dt
    }

    /// Read-only access to the world for queries.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Terminal outcome, once reached.
    #[must_use]
    pub fn outcome(&self) -> Option<SessionOutcome> {
        query::outcome(&self.world)
    }

    /// Reports whether the session has concluded.
    #[must_use]
    pub fn is_concluded(&self) -> bool {
        self.outcome().is_some()
    }

    /// Captures the complete observable state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tick: query::tick(&self.world),
            currency: query::currency(&self.world),
            lives: query::lives(&self.world),
            wave: query::wave_progress(&self.world),
            towers: query::towers(&self.world),
            enemies: query::enemies(&self.world),
            projectiles: query::projectiles(&self.world),
            stats: query::stats(&self.world),
        }
    }

    /// Advances the simulation by one fixed step.
    ///
    /// Concluded sessions only reject queued intents.
    pub fn tick(&mut self) -> TickReport {
        let mut events = Vec::new();

        for pending in std::mem::take(&mut self.pending) {
            world::apply(
                &mut self.world,
                Command::Submit {
                    player: pending.player,
                    sequence: pending.sequence,
                    intent: pending.intent,
                },
                &mut events,
            );
        }

        if !self.is_concluded() {
            self.simulate(&mut events);
        }

        let rejections = collect_rejections(&events);
        for rejection in &rejections {
            debug!(
                player = rejection.player.get(),
                sequence = rejection.sequence,
                reason = %rejection.reason,
                "intent rejected"
            );
        }
        let concluded = log_transitions(&events);

        TickReport {
            tick: query::tick(&self.world),
            events,
            rejections,
            concluded,
        }
    }

    fn simulate(&mut self, events: &mut Vec<Event>) {
        let start = events.len();
        world::apply(&mut self.world, Command::Tick { dt: self.dt }, events);
        let tick_events = events[start..].to_vec();
        trace!(tick = query::tick(&self.world), "tick");

        self.movement.handle(
            &tick_events,
            &query::enemies(&self.world),
            query::path(&self.world),
            &mut self.commands,
        );
        self.flush(events);

        let towers = query::towers(&self.world);
        self.targeting
            .handle(&towers, &query::enemies(&self.world), &mut self.targets);
        self.combat.handle(
            query::catalog(&self.world),
            &towers,
            &self.targets,
            &mut self.commands,
        );
        self.flush(events);

        self.projectiles.handle(
            &tick_events,
            &query::projectiles(&self.world),
            &query::enemies(&self.world),
            query::grid(&self.world),
            &mut self.commands,
        );
        self.flush(events);

        self.status_effects
            .handle(&tick_events, &query::enemies(&self.world), &mut self.commands);
        self.flush(events);

        self.scheduler.handle(
            &tick_events,
            query::wave_progress(&self.world),
            query::schedule(&self.world),
            &query::enemies(&self.world),
            &mut self.commands,
        );
        self.flush(events);

        self.commands.push(Command::SweepRemovals);
        if let Some(outcome) = self.resolve_outcome() {
            self.commands.push(Command::Conclude { outcome });
        }
        self.flush(events);
    }

    fn flush(&mut self, events: &mut Vec<Event>) {
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }

    fn resolve_outcome(&self) -> Option<SessionOutcome> {
        if query::lives(&self.world) == 0 {
            return Some(SessionOutcome::Lost);
        }
        match query::wave_progress(&self.world) {
            WaveProgress::Cleared => Some(SessionOutcome::Won),
            _ => None,
        }
    }
}

fn collect_rejections(events: &[Event]) -> Vec<Rejection> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::IntentRejected {
                player,
                sequence,
                reason,
            } => Some(Rejection {
                player: *player,
                sequence: *sequence,
                reason: reason.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn log_transitions(events: &[Event]) -> Option<SessionOutcome> {
    let mut concluded = None;
    for event in events {
        match event {
            Event::WaveStarted { wave } => info!(wave = wave.get(), "wave started"),
            Event::WaveCompleted { wave, bonus } => {
                info!(wave = wave.get(), bonus, "wave completed");
            }
            Event::SessionConcluded { outcome } => {
                info!(?outcome, "session concluded");
                concluded = Some(*outcome);
            }
            _ => {}
        }
    }
    concluded
}
