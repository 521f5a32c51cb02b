//! Static map assets: build grid, enemy path and wave timeline.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    catalog::{standard_ids, Catalog},
    error::LoadError,
    geometry::{CellCoord, GridSpec, WaypointPath, WorldPoint},
    ids::EnemyTypeId,
};

/// Single scheduled spawn within a wave.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnEntry {
    /// Enemy type to spawn.
    pub enemy: EnemyTypeId,
    /// Seconds after wave start at which the enemy appears.
    pub offset_secs: f32,
}

/// Ordered list of spawns plus the currency bonus granted on clearance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Spawns ordered by offset.
    pub entries: Vec<SpawnEntry>,
    /// Currency granted once every enemy of the wave has been removed.
    pub bonus: u32,
}

/// Complete description of a playable map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    /// Stable map identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Build grid.
    pub grid: GridSpec,
    /// Ordered waypoints enemies follow.
    pub path: Vec<WorldPoint>,
    /// Cells where towers may not be placed, in addition to path cells.
    #[serde(default)]
    pub restricted: BTreeSet<CellCoord>,
    /// Authored waves, played first.
    #[serde(default)]
    pub waves: Vec<WaveDefinition>,
    /// Number of procedurally generated waves appended after the authored ones.
    #[serde(default)]
    pub generated_waves: u32,
    /// Clearance bonus of generated waves.
    #[serde(default = "default_wave_bonus")]
    pub wave_bonus: u32,
    /// Currency at session start.
    pub starting_currency: u32,
    /// Lives at session start.
    pub starting_lives: u32,
    /// Countdown before each wave, in seconds.
    pub preparation_secs: f32,
}

fn default_wave_bonus() -> u32 {
    12
}

impl MapDefinition {
    /// Parses a map from JSON and validates it against `catalog`.
    pub fn from_json_str(json: &str, catalog: &Catalog) -> Result<Self, LoadError> {
        let map: MapDefinition = serde_json::from_str(json).map_err(LoadError::Parse)?;
        map.validate(catalog)?;
        Ok(map)
    }

    /// Builds the arc-length parameterised enemy path.
    pub fn waypoint_path(&self) -> Result<WaypointPath, LoadError> {
        WaypointPath::new(self.path.clone())
            .ok_or(LoadError::InvalidPath("needs two distinct finite waypoints"))
    }

    /// Total number of waves the map schedules.
    #[must_use]
    pub fn wave_count(&self) -> u32 {
        u32::try_from(self.waves.len())
            .unwrap_or(u32::MAX)
            .saturating_add(self.generated_waves)
    }

    /// Checks the map for consistency with `catalog`.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), LoadError> {
        if self.grid.columns == 0 || self.grid.rows == 0 {
            return Err(LoadError::InvalidValue {
                field: "grid size",
                owner: self.id.clone(),
                value: 0.0,
            });
        }
        if !self.grid.cell_size.is_finite() || self.grid.cell_size <= 0.0 {
            return Err(LoadError::InvalidValue {
                field: "cell_size",
                owner: self.id.clone(),
                value: self.grid.cell_size,
            });
        }
        if !self.preparation_secs.is_finite() || self.preparation_secs < 0.0 {
            return Err(LoadError::InvalidValue {
                field: "preparation_secs",
                owner: self.id.clone(),
                value: self.preparation_secs,
            });
        }

        let path = self.waypoint_path()?;
        if path
            .points()
            .iter()
            .any(|point| !self.grid.contains_point(*point))
        {
            return Err(LoadError::InvalidPath("waypoint outside the grid"));
        }

        if self.wave_count() == 0 {
            return Err(LoadError::NoWaves);
        }

        for (index, wave) in self.waves.iter().enumerate() {
            let mut previous = 0.0_f32;
            for entry in &wave.entries {
                if catalog.enemy(entry.enemy).is_none() {
                    return Err(LoadError::UnknownEnemy {
                        wave: index,
                        enemy: entry.enemy,
                    });
                }
                if !entry.offset_secs.is_finite() || entry.offset_secs < previous {
                    return Err(LoadError::UnorderedWave { wave: index });
                }
                previous = entry.offset_secs;
            }
        }

        Ok(())
    }

    /// Built-in serpentine map with three authored waves and seven generated ones.
    #[must_use]
    pub fn meadow() -> Self {
        let basic = |offset_secs| SpawnEntry {
            enemy: standard_ids::BASIC_ENEMY,
            offset_secs,
        };
        let fast = |offset_secs| SpawnEntry {
            enemy: standard_ids::FAST_ENEMY,
            offset_secs,
        };

        Self {
            id: "meadow".to_owned(),
            name: "Meadow".to_owned(),
            grid: GridSpec {
                columns: 20,
                rows: 12,
                cell_size: 40.0,
            },
            path: vec![
                WorldPoint::new(0.0, 60.0),
                WorldPoint::new(700.0, 60.0),
                WorldPoint::new(700.0, 260.0),
                WorldPoint::new(100.0, 260.0),
                WorldPoint::new(100.0, 420.0),
                WorldPoint::new(800.0, 420.0),
            ],
            restricted: BTreeSet::new(),
            waves: vec![
                WaveDefinition {
                    entries: (0..4).map(|i| basic(i as f32 * 1.2)).collect(),
                    bonus: 12,
                },
                WaveDefinition {
                    entries: (0..5).map(|i| basic(i as f32 * 1.2)).collect(),
                    bonus: 12,
                },
                WaveDefinition {
                    entries: vec![
                        basic(0.0),
                        basic(1.2),
                        fast(2.4),
                        basic(3.6),
                        fast(4.8),
                        basic(6.0),
                    ],
                    bonus: 15,
                },
            ],
            generated_waves: 7,
            wave_bonus: default_wave_bonus(),
            starting_currency: 100,
            starting_lives: 20,
            preparation_secs: 10.0,
        }
    }
}
