//! Room registry and the per-room tick task.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use siege_core::{Catalog, MapDefinition, PlayerId};
use siege_session::{SessionConfig, SessionError, DEFAULT_TICK_RATE_HZ};
use thiserror::Error;
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    time::MissedTickBehavior,
};
use tracing::{debug, info};

use crate::{
    host::{Outbox, SessionHost},
    protocol::ClientMessage,
};

/// Default time an empty room survives before it is torn down.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Settings shared by every room a lobby creates.
#[derive(Clone, Debug)]
pub struct LobbyConfig {
    /// Catalog injected into every session.
    pub catalog: Arc<Catalog>,
    /// Map every room plays on.
    pub map: Arc<MapDefinition>,
    /// Simulation rate of each room.
    pub tick_rate_hz: u32,
    /// Procedural wave seed.
    pub seed: u64,
    /// How long a room may stay empty.
    pub grace_period: Duration,
}

impl LobbyConfig {
    /// Creates a configuration with default rate, seed and grace period.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, map: Arc<MapDefinition>) -> Self {
        Self {
            catalog,
            map,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            seed: 0,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Replaces the grace period.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    fn session(&self) -> SessionConfig {
        SessionConfig::new(Arc::clone(&self.catalog), Arc::clone(&self.map))
            .with_tick_rate(self.tick_rate_hz)
            .with_seed(self.seed)
    }
}

/// Failures while joining a room.
#[derive(Debug, Error)]
pub enum LobbyError {
    /// The room's session could not be created.
    #[error("failed to open room: {0}")]
    Session(#[from] SessionError),
    /// The room task stopped before the join was delivered.
    #[error("room {0} is closed")]
    RoomClosed(String),
}

#[derive(Debug)]
enum RoomCommand {
    Join { player: PlayerId, outbox: Outbox },
    Leave { player: PlayerId },
    Message { player: PlayerId, message: ClientMessage },
}

/// Sender side of a joined room.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    room: String,
    commands: UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    /// Name of the room.
    #[must_use]
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Forwards a client message; returns `false` once the room has stopped.
    pub fn submit(&self, player: PlayerId, message: ClientMessage) -> bool {
        self.commands
            .send(RoomCommand::Message { player, message })
            .is_ok()
    }

    /// Removes the player from the room.
    pub fn leave(&self, player: PlayerId) {
        let _ = self.commands.send(RoomCommand::Leave { player });
    }

    /// Completes once the room has stopped.
    pub async fn closed(&self) {
        self.commands.closed().await;
    }
}

type Rooms = Arc<Mutex<HashMap<String, UnboundedSender<RoomCommand>>>>;

/// Registry of running rooms, cheap to clone across connections.
#[derive(Clone, Debug)]
pub struct Lobby {
    config: Arc<LobbyConfig>,
    rooms: Rooms,
    next_player: Arc<AtomicU32>,
}

impl Lobby {
    /// Creates an empty lobby.
    #[must_use]
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            config: Arc::new(config),
            rooms: Arc::new(Mutex::new(HashMap::new())),
            next_player: Arc::new(AtomicU32::new(1)),
        }
    }

    /// Joins `room`, starting its tick task when it is not running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn join(&self, room: &str, outbox: Outbox) -> Result<(PlayerId, RoomHandle), LobbyError> {
        let player = PlayerId::new(self.next_player.fetch_add(1, Ordering::Relaxed));
        let mut rooms = self.rooms.lock();

        let running = rooms
            .get(room)
            .filter(|commands| !commands.is_closed())
            .cloned();
        let commands = match running {
            Some(commands) => commands,
            None => {
                let host = SessionHost::new(room, self.config.session())?;
                let (commands, inbox) = unbounded_channel();
                let _ = tokio::spawn(run_room(
                    host,
                    inbox,
                    Arc::clone(&self.rooms),
                    self.config.grace_period,
                ));
                let _ = rooms.insert(room.to_owned(), commands.clone());
                info!(room, "room opened");
                commands
            }
        };

        commands
            .send(RoomCommand::Join { player, outbox })
            .map_err(|_| LobbyError::RoomClosed(room.to_owned()))?;
        Ok((
            player,
            RoomHandle {
                room: room.to_owned(),
                commands,
            },
        ))
    }

    /// Number of running rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.lock().len()
    }
}

async fn run_room(
    mut host: SessionHost,
    mut commands: UnboundedReceiver<RoomCommand>,
    rooms: Rooms,
    grace: Duration,
) {
    let mut interval = tokio::time::interval(host.tick_duration());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let _ = interval.tick().await;
        drain(&mut host, &mut commands);
        let _ = host.tick();

        let finished = host.session().is_concluded() || host.idle_for(grace);
        if finished && teardown(&mut host, &mut commands, &rooms) {
            break;
        }
    }
}

fn drain(host: &mut SessionHost, commands: &mut UnboundedReceiver<RoomCommand>) {
    while let Ok(command) = commands.try_recv() {
        match command {
            RoomCommand::Join { player, outbox } => host.join(player, outbox),
            RoomCommand::Leave { player } => host.leave(player),
            RoomCommand::Message { player, message } => host.handle_message(player, message),
        }
    }
}

/// Unregisters the room unless a join raced the idle check.
///
/// A concluded room is always torn down; late joiners still get its final snapshot.
fn teardown(
    host: &mut SessionHost,
    commands: &mut UnboundedReceiver<RoomCommand>,
    rooms: &Rooms,
) -> bool {
    let mut rooms = rooms.lock();
    drain(host, commands);
    if host.client_count() > 0 && !host.session().is_concluded() {
        debug!(room = host.room(), "teardown cancelled by join");
        return false;
    }

    let _ = rooms.remove(host.room());
    info!(
        room = host.room(),
        tick = host.session().snapshot().tick,
        outcome = ?host.session().outcome(),
        "room torn down"
    );
    true
}
