use std::{collections::BTreeMap, sync::Arc, time::Duration};

use siege_core::{Event, MapDefinition, PlayerId};
use siege_session::{Session, SessionConfig, SessionError, TickReport};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace};

use crate::{
    delta::DeltaTracker,
    protocol::{ClientMessage, ServerMessage},
};

/// Outgoing message queue of one connected client.
pub type Outbox = UnboundedSender<ServerMessage>;

/// Drives one session and fans its output out to the connected clients.
#[derive(Debug)]
pub struct SessionHost {
    room: String,
    session: Session,
    map: Arc<MapDefinition>,
    tracker: DeltaTracker,
    clients: BTreeMap<PlayerId, Outbox>,
    idle: Duration,
}

impl SessionHost {
    /// Starts a session for `room`.
    pub fn new(room: impl Into<String>, config: SessionConfig) -> Result<Self, SessionError> {
        let map = Arc::clone(&config.map);
        let session = Session::new(config)?;
        let tracker = DeltaTracker::from_snapshot(&session.snapshot());
        Ok(Self {
            room: room.into(),
            session,
            map,
            tracker,
            clients: BTreeMap::new(),
            idle: Duration::ZERO,
        })
    }

    /// Name of the hosted room.
    #[must_use]
    pub fn room(&self) -> &str {
        &self.room
    }

    /// The hosted session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Registers a client and sends it the welcome and a full snapshot.
    pub fn join(&mut self, player: PlayerId, outbox: Outbox) {
        let welcome = ServerMessage::Welcome {
            room: self.room.clone(),
            player,
        };
        let snapshot = ServerMessage::Snapshot {
            map: Box::new(MapDefinition::clone(&self.map)),
            state: Box::new(self.session.snapshot()),
        };
        if outbox.send(welcome).is_err() || outbox.send(snapshot).is_err() {
            debug!(room = %self.room, player = player.get(), "client left before welcome");
            return;
        }

        let _ = self.clients.insert(player, outbox);
        self.idle = Duration::ZERO;
        info!(
            room = %self.room,
            player = player.get(),
            clients = self.clients.len(),
            "player joined"
        );
    }

    /// Forgets a client.
    pub fn leave(&mut self, player: PlayerId) {
        if self.clients.remove(&player).is_some() {
            info!(
                room = %self.room,
                player = player.get(),
                clients = self.clients.len(),
                "player left"
            );
        }
    }

    /// Queues the intent carried by `message` for the next tick.
    ///
    /// Joins are handled by the lobby and are answered with an error here.
    pub fn handle_message(&mut self, player: PlayerId, message: ClientMessage) {
        match message.intent() {
            Some((sequence, intent)) => self.session.submit(player, sequence, intent),
            None => self.send(
                player,
                ServerMessage::Error {
                    message: format!("already joined room {}", self.room),
                },
            ),
        }
    }

    /// Runs one tick and distributes replies and the delta.
    pub fn tick(&mut self) -> TickReport {
        let report = self.session.tick();

        for event in &report.events {
            if let Event::IntentApplied { player, sequence } = event {
                self.send(*player, ServerMessage::accepted(*sequence));
            }
        }
        for rejection in &report.rejections {
            self.send(
                rejection.player,
                ServerMessage::rejected(rejection.sequence, rejection.reason.clone()),
            );
        }

        let shared = report
            .events
            .iter()
            .filter(|event| !is_private(event))
            .cloned()
            .collect();
        let delta = self.tracker.diff(&self.session.snapshot(), shared);
        trace!(
            room = %self.room,
            tick = delta.tick,
            updated = delta.updated_entities.len(),
            removed = delta.removed_ids.len(),
            "delta"
        );
        let message = ServerMessage::Delta(delta);
        self.clients
            .retain(|_, outbox| outbox.send(message.clone()).is_ok());

        if self.clients.is_empty() {
            self.idle += self.session.tick_duration();
        } else {
            self.idle = Duration::ZERO;
        }
        report
    }

    /// Number of connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Reports whether the room has had no clients for longer than `grace`.
    #[must_use]
    pub fn idle_for(&self, grace: Duration) -> bool {
        self.clients.is_empty() && self.idle > grace
    }

    /// Wall-clock period of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        self.session.tick_duration()
    }

    fn send(&mut self, player: PlayerId, message: ServerMessage) {
        let Some(outbox) = self.clients.get(&player) else {
            return;
        };
        if outbox.send(message).is_err() {
            let _ = self.clients.remove(&player);
            debug!(room = %self.room, player = player.get(), "dropped closed client");
        }
    }
}

/// Intent outcomes travel to their sender as replies, never in the shared delta.
fn is_private(event: &Event) -> bool {
    matches!(
        event,
        Event::IntentApplied { .. } | Event::IntentRejected { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{EntityRef, EntityUpdate};
    use siege_core::{standard_ids, Catalog, CellCoord, IntentRejection, TowerId, TowerTypeId};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn host() -> SessionHost {
        SessionHost::new(
            "test",
            SessionConfig::new(
                Arc::new(Catalog::standard()),
                Arc::new(MapDefinition::meadow()),
            ),
        )
        .expect("valid host")
    }

    fn connect(host: &mut SessionHost, player: u32) -> UnboundedReceiver<ServerMessage> {
        let (outbox, inbox) = unbounded_channel();
        host.join(PlayerId::new(player), outbox);
        inbox
    }

    fn drain(inbox: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = inbox.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn place(kind: TowerTypeId, seq: u64, column: u32) -> ClientMessage {
        ClientMessage::Place {
            seq,
            tower_type: kind,
            position: CellCoord::new(column, 3),
        }
    }

    #[test]
    fn joining_sends_welcome_then_full_snapshot() {
        let mut host = host();
        let mut inbox = connect(&mut host, 1);
        let messages = drain(&mut inbox);

        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0],
            ServerMessage::Welcome {
                room: "test".to_owned(),
                player: PlayerId::new(1),
            }
        );
        match &messages[1] {
            ServerMessage::Snapshot { map, state } => {
                assert_eq!(map.id, "meadow");
                assert_eq!(state.tick, 0);
                assert_eq!(state.currency, map.starting_currency);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
        assert_eq!(host.client_count(), 1);
    }

    #[test]
    fn replies_reach_only_the_sender() {
        let mut host = host();
        let mut first = connect(&mut host, 1);
        let mut second = connect(&mut host, 2);
        let _ = drain(&mut first);
        let _ = drain(&mut second);

        host.handle_message(PlayerId::new(1), place(standard_ids::BASIC_TOWER, 10, 3));
        host.handle_message(PlayerId::new(2), place(standard_ids::SNIPER_TOWER, 4, 5));
        let _ = host.tick();

        let first = drain(&mut first);
        let second = drain(&mut second);
        assert!(first.contains(&ServerMessage::accepted(10)));
        assert!(!first
            .iter()
            .any(|message| matches!(message, ServerMessage::Reply { ok: false, .. })));
        assert!(second.contains(&ServerMessage::rejected(
            4,
            IntentRejection::InsufficientCurrency {
                required: 140,
                available: 50,
            }
        )));
        assert!(!second.contains(&ServerMessage::accepted(10)));

        let deltas = |messages: &[ServerMessage]| {
            messages
                .iter()
                .filter(|message| matches!(message, ServerMessage::Delta(_)))
                .count()
        };
        assert_eq!(deltas(&first), 1);
        assert_eq!(deltas(&second), 1);

        for message in first.iter().chain(&second) {
            if let ServerMessage::Delta(delta) = message {
                assert!(!delta.events.iter().any(|event| matches!(
                    event,
                    Event::IntentApplied { .. } | Event::IntentRejected { .. }
                )));
                assert!(delta
                    .events
                    .iter()
                    .any(|event| matches!(event, Event::TowerPlaced { .. })));
            }
        }
    }

    #[test]
    fn deltas_carry_only_changed_entities() {
        let mut host = host();
        let mut inbox = connect(&mut host, 1);
        host.handle_message(PlayerId::new(1), place(standard_ids::BASIC_TOWER, 1, 3));
        let _ = host.tick();
        let _ = host.tick();

        let deltas: Vec<_> = drain(&mut inbox)
            .into_iter()
            .filter_map(|message| match message {
                ServerMessage::Delta(delta) => Some(delta),
                _ => None,
            })
            .collect();
        assert_eq!(deltas.len(), 2);
        assert_eq!(
            deltas[0]
                .updated_entities
                .iter()
                .map(EntityUpdate::entity)
                .collect::<Vec<_>>(),
            vec![EntityRef::Tower(TowerId::new(1))]
        );
        assert!(deltas[1].updated_entities.is_empty());
        assert_eq!(deltas[1].tick, 2);
        assert_eq!(deltas[1].currency, 50);
    }

    #[test]
    fn dropped_clients_are_forgotten_and_idle_time_accumulates() {
        let mut host = host();
        let inbox = connect(&mut host, 1);
        drop(inbox);

        let _ = host.tick();
        assert_eq!(host.client_count(), 0);

        let grace = Duration::from_millis(170);
        let _ = host.tick();
        let _ = host.tick();
        assert!(!host.idle_for(grace));
        let _ = host.tick();
        assert!(host.idle_for(grace));

        let _inbox = connect(&mut host, 2);
        assert!(!host.idle_for(grace));
    }
}
