//! Per-session entity registries with deferred removal and record pooling.

use std::collections::{BTreeMap, BTreeSet};

use siege_core::{EnemyId, ProjectileId, TowerId};

use crate::{Enemy, Projectile, Tower};

/// Identifier type that can be minted by a [`Registry`].
pub(crate) trait EntityKey: Copy + Ord {
    fn from_raw(raw: u32) -> Self;
}

impl EntityKey for TowerId {
    fn from_raw(raw: u32) -> Self {
        TowerId::new(raw)
    }
}

impl EntityKey for EnemyId {
    fn from_raw(raw: u32) -> Self {
        EnemyId::new(raw)
    }
}

impl EntityKey for ProjectileId {
    fn from_raw(raw: u32) -> Self {
        ProjectileId::new(raw)
    }
}

/// Records whose fields are reset before they return to a [`Pool`].
pub(crate) trait Recycle: Default {
    fn recycle(&mut self);
}

/// Ordered mapping from identifiers to records.
///
/// Identifiers increase monotonically and are never reused, so key order
/// equals insertion order.
/// Removal is two-phase: `mark_removed` hides a record from live iteration
/// and `sweep` deletes every marked record at the end of the tick.
#[derive(Debug)]
pub(crate) struct Registry<K, V> {
    entries: BTreeMap<K, V>,
    pending: BTreeSet<K>,
    next_id: Option<u32>,
}

impl<K: EntityKey, V> Registry<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            pending: BTreeSet::new(),
            next_id: Some(1),
        }
    }

    /// Mints the next identifier and stores the record built for it.
    ///
    /// Returns `None` without calling `build` once the identifier space is spent.
    pub(crate) fn insert_with(&mut self, build: impl FnOnce(K) -> V) -> Option<K> {
        let raw = self.next_id?;
        let id = K::from_raw(raw);
        self.next_id = raw.checked_add(1);
        let _ = self.entries.insert(id, build(id));
        Some(id)
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.next_id.is_none()
    }

    pub(crate) fn get_live(&self, id: K) -> Option<&V> {
        if self.pending.contains(&id) {
            return None;
        }
        self.entries.get(&id)
    }

    pub(crate) fn get_live_mut(&mut self, id: K) -> Option<&mut V> {
        if self.pending.contains(&id) {
            return None;
        }
        self.entries.get_mut(&id)
    }

    /// Marks a record for removal; returns `false` if it was already marked or absent.
    pub(crate) fn mark_removed(&mut self, id: K) -> bool {
        self.entries.contains_key(&id) && self.pending.insert(id)
    }

    /// Iterates over records that are not marked for removal, in insertion order.
    pub(crate) fn iter_live(&self) -> impl Iterator<Item = &V> + '_ {
        self.entries
            .iter()
            .filter(|(id, _)| !self.pending.contains(id))
            .map(|(_, record)| record)
    }

    pub(crate) fn iter_live_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        let pending = &self.pending;
        self.entries
            .iter_mut()
            .filter(move |(id, _)| !pending.contains(id))
            .map(|(_, record)| record)
    }

    /// Deletes every marked record and hands them back for recycling.
    pub(crate) fn sweep(&mut self) -> Vec<V> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .filter_map(|id| self.entries.remove(&id))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Allocation counters of an entity pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Records served from the free list.
    pub reused: u64,
    /// Records freshly allocated because the free list was empty.
    pub allocated: u64,
    /// Released records dropped because the free list was full.
    pub discarded: u64,
}

/// Bounded free list of recycled records.
#[derive(Debug)]
pub(crate) struct Pool<V> {
    free: Vec<V>,
    capacity: usize,
    stats: PoolStats,
}

impl<V: Recycle> Pool<V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
            stats: PoolStats::default(),
        }
    }

    /// Takes a reset record from the free list, or allocates one when it is empty.
    pub(crate) fn acquire(&mut self) -> V {
        match self.free.pop() {
            Some(record) => {
                self.stats.reused += 1;
                record
            }
            None => {
                self.stats.allocated += 1;
                V::default()
            }
        }
    }

    pub(crate) fn release(&mut self, mut record: V) {
        if self.free.len() >= self.capacity {
            self.stats.discarded += 1;
            return;
        }
        record.recycle();
        self.free.push(record);
    }

    pub(crate) fn stats(&self) -> PoolStats {
        self.stats
    }
}

/// Owns every tower, enemy and projectile of a session.
#[derive(Debug)]
pub(crate) struct EntityStore {
    pub(crate) towers: Registry<TowerId, Tower>,
    pub(crate) enemies: Registry<EnemyId, Enemy>,
    pub(crate) projectiles: Registry<ProjectileId, Projectile>,
    pub(crate) enemy_pool: Pool<Enemy>,
    pub(crate) projectile_pool: Pool<Projectile>,
}

impl EntityStore {
    pub(crate) fn new(pool_capacity: usize) -> Self {
        Self {
            towers: Registry::new(),
            enemies: Registry::new(),
            projectiles: Registry::new(),
            enemy_pool: Pool::with_capacity(pool_capacity),
            projectile_pool: Pool::with_capacity(pool_capacity),
        }
    }

    /// Deletes every record marked during the tick and recycles enemies and projectiles.
    pub(crate) fn sweep(&mut self) {
        for enemy in self.enemies.sweep() {
            self.enemy_pool.release(enemy);
        }
        for projectile in self.projectiles.sweep() {
            self.projectile_pool.release(projectile);
        }
    }
}
