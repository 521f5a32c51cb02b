#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure systems that fire projectiles from targeting data and resolve their
//! flight and impact.

mod projectiles;

pub use projectiles::ProjectileResolution;

use siege_core::{
    Catalog, Command, DamagePayload, TowerId, TowerSnapshot, TowerStats, TowerTarget,
};

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireProjectile` entries for targeted towers ready to fire.
    ///
    /// Each shot carries the tower's resolved damage payload and resets its
    /// cooldown to `1 / fire_rate`.
    pub fn handle(
        &mut self,
        catalog: &Catalog,
        towers: &[TowerSnapshot],
        tower_targets: &[TowerTarget],
        out: &mut Vec<Command>,
    ) {
        if tower_targets.is_empty() || towers.is_empty() {
            return;
        }

        self.scratch.clear();

        for target in tower_targets {
            let Some(snapshot) = find_tower(towers, target.tower) else {
                continue;
            };
            if !snapshot.ready_in.is_zero() {
                continue;
            }
            let Some(definition) = catalog.tower(snapshot.kind) else {
                continue;
            };

            let stats = TowerStats::resolve(catalog, definition, snapshot.level, &snapshot.trinkets);
            self.scratch.push(Command::FireProjectile {
                tower: target.tower,
                target: target.enemy,
                payload: DamagePayload::from_stats(&stats),
                delivery: definition.delivery,
                cooldown: stats.cooldown(),
            });
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

fn find_tower(towers: &[TowerSnapshot], tower: TowerId) -> Option<&TowerSnapshot> {
    towers
        .binary_search_by_key(&tower, |snapshot| snapshot.id)
        .ok()
        .map(|index| &towers[index])
}
