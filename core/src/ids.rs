//! Strongly typed identifiers.
//!
//! Entity identifiers double as weak references: holding one never keeps the
//! entity alive, and every use resolves it through the entity store.

use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident($repr:ty)) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($repr);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> $repr {
                self.0
            }
        }
    };
}

identifier!(
    /// Unique identifier assigned to a placed tower.
    TowerId(u32)
);
identifier!(
    /// Unique identifier assigned to a spawned enemy.
    EnemyId(u32)
);
identifier!(
    /// Unique identifier assigned to an in-flight projectile.
    ProjectileId(u32)
);
identifier!(
    /// Identifier of a connected player within a session.
    PlayerId(u32)
);
identifier!(
    /// Catalog key of a tower type.
    TowerTypeId(u16)
);
identifier!(
    /// Catalog key of an enemy type.
    EnemyTypeId(u16)
);
identifier!(
    /// Catalog key of a trinket.
    TrinketId(u16)
);
identifier!(
    /// Zero-based position of a wave within the session schedule.
    WaveIndex(u32)
);

impl WaveIndex {
    /// Index of the wave that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}
