use std::collections::BTreeMap;

use siege_core::Event;
use siege_session::SessionSnapshot;

use crate::protocol::{Delta, EntityRef, EntityUpdate};

/// Remembers the entities last broadcast and reports what changed since.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    previous: BTreeMap<EntityRef, EntityUpdate>,
    current: BTreeMap<EntityRef, EntityUpdate>,
}

impl DeltaTracker {
    /// Creates a tracker that considers every entity new.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker whose baseline is `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let mut tracker = Self::new();
        collect(snapshot, &mut tracker.previous);
        tracker
    }

    /// Diffs `snapshot` against the previous baseline and makes it the new one.
    ///
    /// Updated entities and removals are listed in identifier order.
    pub fn diff(&mut self, snapshot: &SessionSnapshot, events: Vec<Event>) -> Delta {
        self.current.clear();
        collect(snapshot, &mut self.current);

        let removed_ids = self
            .previous
            .keys()
            .filter(|entity| !self.current.contains_key(*entity))
            .copied()
            .collect();
        let updated_entities = self
            .current
            .iter()
            .filter(|(entity, update)| self.previous.get(*entity) != Some(*update))
            .map(|(_, update)| update.clone())
            .collect();

        std::mem::swap(&mut self.previous, &mut self.current);

        Delta {
            tick: snapshot.tick,
            removed_ids,
            updated_entities,
            currency: snapshot.currency,
            lives: snapshot.lives,
            wave_state: snapshot.wave,
            events,
        }
    }
}

fn collect(snapshot: &SessionSnapshot, into: &mut BTreeMap<EntityRef, EntityUpdate>) {
    let updates = snapshot
        .towers
        .iter()
        .cloned()
        .map(EntityUpdate::Tower)
        .chain(snapshot.enemies.iter().cloned().map(EntityUpdate::Enemy))
        .chain(
            snapshot
                .projectiles
                .iter()
                .cloned()
                .map(EntityUpdate::Projectile),
        );
    for update in updates {
        let _ = into.insert(update.entity(), update);
    }
}
