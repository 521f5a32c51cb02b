#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic procedural wave generation appended after a map's authored waves.

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use siege_core::{
    Catalog, EnemyRole, EnemyTypeId, MapDefinition, SpawnEntry, WaveDefinition, WaveIndex,
};

/// Seconds between consecutive spawns of a generated wave.
pub const SPAWN_SPACING_SECS: f32 = 1.2;

/// Number of enemies of each role in a generated wave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Composition {
    /// Enemies with the basic role.
    pub basic: u32,
    /// Enemies with the fast role.
    pub fast: u32,
    /// Enemies with the armored role.
    pub armored: u32,
}

impl Composition {
    /// Composition of the wave with 1-based `number`.
    ///
    /// The first three waves are basic only. Fast enemies join from wave
    /// four, capped at 30% of the wave, and armored enemies from wave seven,
    /// capped at 20%, while the fast share grows to 40%.
    #[must_use]
    pub fn for_wave(number: u32) -> Self {
        let number = number.max(1);
        if number <= 3 {
            return Self {
                basic: 3 + number,
                ..Self::default()
            };
        }

        if number <= 6 {
            let total = 5 + 2 * number;
            let fast = share(total, (10 * (number - 3)).min(30));
            return Self {
                basic: total - fast,
                fast,
                armored: 0,
            };
        }

        let late = number - 6;
        let total = 8u32.saturating_add(number.saturating_mul(2));
        let armored = share(total, late.saturating_mul(10).min(20));
        let fast = share(total, late.saturating_mul(5).saturating_add(20).min(40));
        Self {
            basic: total - armored - fast,
            fast,
            armored,
        }
    }

    /// Total number of enemies.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.basic + self.fast + self.armored
    }
}

fn share(total: u32, percent: u32) -> u32 {
    let scaled = u64::from(total) * u64::from(percent) / 100;
    u32::try_from(scaled).unwrap_or(total)
}

/// Generator that reuses its ordering workspace between waves.
#[derive(Debug, Default)]
pub struct WaveGeneration {
    order_workspace: Vec<EnemyTypeId>,
}

impl WaveGeneration {
    /// Creates a generator with an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the full schedule for `map`: authored waves followed by
    /// `generated_waves` procedural waves seeded from `seed`.
    #[must_use]
    pub fn schedule(
        &mut self,
        catalog: &Catalog,
        map: &MapDefinition,
        seed: u64,
    ) -> Vec<WaveDefinition> {
        let mut schedule = map.waves.clone();
        let authored = u32::try_from(map.waves.len()).unwrap_or(u32::MAX);
        schedule.reserve(usize::try_from(map.generated_waves).unwrap_or(0));

        for offset in 0..map.generated_waves {
            let wave = WaveIndex::new(authored.saturating_add(offset));
            schedule.push(self.generate(catalog, wave, seed, map.wave_bonus));
        }
        schedule
    }

    /// Generates the wave at zero-based index `wave`.
    ///
    /// Roles missing from the catalog fall back to the basic role. The
    /// result is a pure function of its arguments.
    #[must_use]
    pub fn generate(
        &mut self,
        catalog: &Catalog,
        wave: WaveIndex,
        seed: u64,
        bonus: u32,
    ) -> WaveDefinition {
        let composition = Composition::for_wave(wave.get().saturating_add(1));
        let basic = catalog
            .enemy_with_role(EnemyRole::Basic)
            .or_else(|| catalog.enemies.first())
            .map(|definition| definition.id);
        let Some(basic) = basic else {
            return WaveDefinition {
                entries: Vec::new(),
                bonus,
            };
        };
        let resolve = |role: EnemyRole| {
            catalog
                .enemy_with_role(role)
                .map_or(basic, |definition| definition.id)
        };

        self.order_workspace.clear();
        self.order_workspace
            .extend(std::iter::repeat(basic).take(count(composition.basic)));
        self.order_workspace
            .extend(std::iter::repeat(resolve(EnemyRole::Fast)).take(count(composition.fast)));
        self.order_workspace.extend(
            std::iter::repeat(resolve(EnemyRole::Armored)).take(count(composition.armored)),
        );

        let mut rng = ChaCha8Rng::seed_from_u64(derive_wave_seed(seed, wave));
        self.order_workspace.shuffle(&mut rng);

        let entries = self
            .order_workspace
            .iter()
            .enumerate()
            .map(|(index, enemy)| SpawnEntry {
                enemy: *enemy,
                offset_secs: index as f32 * SPAWN_SPACING_SECS,
            })
            .collect();

        WaveDefinition { entries, bonus }
    }
}

fn count(value: u32) -> usize {
    usize::try_from(value).unwrap_or(0)
}

fn derive_wave_seed(seed: u64, wave: WaveIndex) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(wave.get().to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
