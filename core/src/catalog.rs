//! Immutable tower, enemy, trinket and element catalogs.
//!
//! A [`Catalog`] is loaded once, validated, and shared by every session that
//! uses it. Nothing in the simulation mutates catalog data.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    effects::{EffectKind, EffectRules, OnHitEffect, StackingRule},
    element::{Element, ElementSet},
    error::LoadError,
    ids::{EnemyTypeId, TowerTypeId, TrinketId},
};

/// Rule a tower uses to choose between candidates in range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetingPolicy {
    /// Nearest enemy to the tower.
    Closest,
    /// Enemy with the highest current health.
    Strongest,
    /// Enemy furthest along the path.
    First,
    /// Enemy least far along the path.
    Last,
}

/// How a tower's projectile reaches its target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Hits on the tick it is fired.
    Instant,
    /// Travels toward the target at `speed` world units per second.
    Traveling {
        /// Travel speed in world units per second.
        speed: f32,
    },
}

/// Behaviour of a traveling projectile whose target disappeared.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum LostTargetPolicy {
    /// Picks the nearest live enemy within `radius` of the last known target position.
    Retarget {
        /// Search radius in world units.
        radius: f32,
    },
    /// Removes the projectile immediately.
    Despawn,
}

/// Projectile tuning shared by every tower type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatTuning {
    /// Behaviour when a traveling projectile loses its target.
    pub lost_target: LostTargetPolicy,
    /// Maximum lifetime of a traveling projectile in seconds.
    pub projectile_lifetime_secs: f32,
    /// Minimum damage dealt by any hit that is not nullified by immunity.
    pub minimum_damage: f32,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            lost_target: LostTargetPolicy::Retarget { radius: 40.0 },
            projectile_lifetime_secs: 3.0,
            minimum_damage: 1.0,
        }
    }
}

/// Per-level growth applied to tower statistics.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelScaling {
    /// Fractional damage gain per level above the first.
    pub damage_per_level: f32,
    /// Fractional range gain per level above the first.
    pub range_per_level: f32,
    /// Fractional fire-rate gain per level above the first.
    pub fire_rate_per_level: f32,
}

impl Default for LevelScaling {
    fn default() -> Self {
        Self {
            damage_per_level: 0.5,
            range_per_level: 0.2,
            fire_rate_per_level: 0.3,
        }
    }
}

/// Data record describing a tower type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TowerDefinition {
    /// Catalog key.
    pub id: TowerTypeId,
    /// Human-readable name.
    pub name: String,
    /// Placement cost.
    pub cost: u32,
    /// Damage per hit at level one.
    pub damage: f32,
    /// Targeting radius at level one, in world units.
    pub range: f32,
    /// Shots per second at level one.
    pub fire_rate: f32,
    /// Element of the tower's attacks.
    pub element: Element,
    /// Target selection rule.
    pub targeting: TargetingPolicy,
    /// Projectile delivery mode.
    pub delivery: Delivery,
    /// Radius of area damage around the impact point; zero for single-target towers.
    #[serde(default)]
    pub splash_radius: f32,
    /// Status effect applied by every hit.
    #[serde(default)]
    pub on_hit: Option<OnHitEffect>,
    /// Number of trinkets the tower can hold.
    pub trinket_slots: u8,
    /// Cost of each upgrade; entry `n` upgrades from level `n + 1`.
    #[serde(default)]
    pub upgrade_costs: Vec<u32>,
}

impl TowerDefinition {
    /// Highest level the tower can reach.
    #[must_use]
    pub fn max_level(&self) -> u8 {
        u8::try_from(self.upgrade_costs.len())
            .unwrap_or(u8::MAX - 1)
            .saturating_add(1)
    }

    /// Cost of upgrading from `level`, or `None` at max level.
    #[must_use]
    pub fn upgrade_cost(&self, level: u8) -> Option<u32> {
        let index = usize::from(level.checked_sub(1)?);
        self.upgrade_costs.get(index).copied()
    }
}

/// Broad class of an enemy type, used by procedural wave generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyRole {
    /// Standard enemy.
    #[default]
    Basic,
    /// Low health, high speed.
    Fast,
    /// High health and armor.
    Armored,
}

/// Data record describing an enemy type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyDefinition {
    /// Catalog key.
    pub id: EnemyTypeId,
    /// Human-readable name.
    pub name: String,
    /// Class used by procedural wave generation.
    #[serde(default)]
    pub role: EnemyRole,
    /// Health on spawn.
    pub max_health: f32,
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Flat damage reduction per hit.
    #[serde(default)]
    pub armor: f32,
    /// Element the enemy belongs to.
    #[serde(default)]
    pub element: Option<Element>,
    /// Elements the enemy resists.
    #[serde(default)]
    pub resistances: ElementSet,
    /// Elements the enemy is immune to.
    #[serde(default)]
    pub immunities: ElementSet,
    /// Currency granted on kill.
    pub reward: u32,
    /// Lives removed when the enemy reaches the end of the path.
    pub damage_to_base: u32,
}

/// Data record describing a socketable trinket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrinketDefinition {
    /// Catalog key.
    pub id: TrinketId,
    /// Human-readable name.
    pub name: String,
    /// Socketing cost.
    pub cost: u32,
    /// Multiplier applied to damage.
    #[serde(default = "unit_multiplier")]
    pub damage_multiplier: f32,
    /// Multiplier applied to fire rate.
    #[serde(default = "unit_multiplier")]
    pub fire_rate_multiplier: f32,
    /// Multiplier applied to range.
    #[serde(default = "unit_multiplier")]
    pub range_multiplier: f32,
    /// Armor ignored by every hit.
    #[serde(default)]
    pub armor_penetration: f32,
    /// Flat damage added before multipliers.
    #[serde(default)]
    pub flat_damage: f32,
    /// Element the tower's attacks take on; the last socketed infusion wins.
    #[serde(default)]
    pub infusion: Option<Element>,
    /// Status effect added to every hit.
    #[serde(default)]
    pub on_hit: Option<OnHitEffect>,
    /// Tower elements this trinket may be socketed into; empty accepts all.
    #[serde(default)]
    pub required_elements: ElementSet,
    /// Lets status effects land on targets immune to the attack element.
    #[serde(default)]
    pub ignores_immunity_for_status: bool,
}

fn unit_multiplier() -> f32 {
    1.0
}

/// Table row describing one element's relations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementRelation {
    /// Attacking element.
    pub element: Element,
    /// Defending elements that take bonus damage.
    #[serde(default)]
    pub effective_against: ElementSet,
    /// Defending elements that take reduced damage.
    #[serde(default)]
    pub weak_against: ElementSet,
}

/// Effectiveness chart consumed by the elemental interaction table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementChart {
    /// Relations keyed by attacking element.
    pub relations: Vec<ElementRelation>,
}

impl ElementChart {
    /// The standard water > fire > earth > thunder > water cycle.
    #[must_use]
    pub fn standard() -> Self {
        let relation = |element, effective, weak| ElementRelation {
            element,
            effective_against: ElementSet::of(&[effective]),
            weak_against: ElementSet::of(&[weak]),
        };
        Self {
            relations: vec![
                relation(Element::Water, Element::Fire, Element::Thunder),
                relation(Element::Fire, Element::Earth, Element::Water),
                relation(Element::Earth, Element::Thunder, Element::Fire),
                relation(Element::Thunder, Element::Water, Element::Earth),
            ],
        }
    }
}

/// Complete static configuration consumed at session start.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Tower types.
    pub towers: Vec<TowerDefinition>,
    /// Enemy types.
    pub enemies: Vec<EnemyDefinition>,
    /// Trinkets.
    #[serde(default)]
    pub trinkets: Vec<TrinketDefinition>,
    /// Element effectiveness chart.
    #[serde(default = "ElementChart::standard")]
    pub elements: ElementChart,
    /// Stacking rule per effect kind.
    #[serde(default)]
    pub effects: EffectRules,
    /// Per-level stat growth.
    #[serde(default)]
    pub level_scaling: LevelScaling,
    /// Projectile tuning.
    #[serde(default)]
    pub combat: CombatTuning,
    /// Number of recycled enemy and projectile records retained per session.
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
}

fn default_pool_capacity() -> usize {
    256
}

/// Tower type identifiers used by [`Catalog::standard`].
pub mod standard_ids {
    use crate::ids::{EnemyTypeId, TowerTypeId, TrinketId};

    /// Single-target tower.
    pub const BASIC_TOWER: TowerTypeId = TowerTypeId::new(1);
    /// Area-damage tower.
    pub const SPLASH_TOWER: TowerTypeId = TowerTypeId::new(2);
    /// Poison-over-time tower.
    pub const POISON_TOWER: TowerTypeId = TowerTypeId::new(3);
    /// Long-range hitscan tower.
    pub const SNIPER_TOWER: TowerTypeId = TowerTypeId::new(4);

    /// Standard enemy.
    pub const BASIC_ENEMY: EnemyTypeId = EnemyTypeId::new(1);
    /// Fast enemy.
    pub const FAST_ENEMY: EnemyTypeId = EnemyTypeId::new(2);
    /// Armored enemy.
    pub const ARMORED_ENEMY: EnemyTypeId = EnemyTypeId::new(3);

    /// Flat damage multiplier.
    pub const DAMAGE_GEM: TrinketId = TrinketId::new(1);
    /// Fire-rate multiplier.
    pub const SPEED_GEM: TrinketId = TrinketId::new(2);
    /// Range multiplier.
    pub const RANGE_GEM: TrinketId = TrinketId::new(3);
    /// Fire infusion with burn.
    pub const PURE_FIRE_GEM: TrinketId = TrinketId::new(4);
    /// Water infusion with slow.
    pub const PURE_WATER_GEM: TrinketId = TrinketId::new(5);
    /// Thunder infusion with fire-rate bonus.
    pub const PURE_THUNDER_GEM: TrinketId = TrinketId::new(6);
    /// Earth infusion with armor penetration.
    pub const PURE_EARTH_GEM: TrinketId = TrinketId::new(7);
    /// Void infusion.
    pub const VOID_SHARD: TrinketId = TrinketId::new(8);
}

impl Catalog {
    /// Built-in catalog with the default tower, enemy and trinket roster.
    #[must_use]
    pub fn standard() -> Self {
        use standard_ids::*;

        let upgrades = vec![30, 50, 80, 120];
        let tower = |id, name: &str, cost, damage, range, fire_rate| TowerDefinition {
            id,
            name: name.to_owned(),
            cost,
            damage,
            range,
            fire_rate,
            element: Element::Physical,
            targeting: TargetingPolicy::First,
            delivery: Delivery::Traveling { speed: 320.0 },
            splash_radius: 0.0,
            on_hit: None,
            trinket_slots: 2,
            upgrade_costs: upgrades.clone(),
        };

        let towers = vec![
            tower(BASIC_TOWER, "basic", 50, 22.0, 105.0, 1.4),
            TowerDefinition {
                splash_radius: 45.0,
                trinket_slots: 3,
                delivery: Delivery::Traveling { speed: 240.0 },
                ..tower(SPLASH_TOWER, "splash", 70, 27.0, 95.0, 1.12)
            },
            TowerDefinition {
                targeting: TargetingPolicy::Strongest,
                on_hit: Some(OnHitEffect {
                    kind: EffectKind::Poison,
                    magnitude: 6.0,
                    duration_secs: 3.0,
                }),
                ..tower(POISON_TOWER, "poison", 95, 5.0, 110.0, 1.68)
            },
            TowerDefinition {
                targeting: TargetingPolicy::Strongest,
                delivery: Delivery::Instant,
                trinket_slots: 1,
                ..tower(SNIPER_TOWER, "sniper", 140, 44.0, 150.0, 0.7)
            },
        ];

        let enemy = |id, name: &str, role, max_health, speed, armor, reward| EnemyDefinition {
            id,
            name: name.to_owned(),
            role,
            max_health,
            speed,
            armor,
            element: None,
            resistances: ElementSet::EMPTY,
            immunities: ElementSet::EMPTY,
            reward,
            damage_to_base: 1,
        };

        let enemies = vec![
            enemy(BASIC_ENEMY, "basic", EnemyRole::Basic, 102.0, 60.0, 0.0, 8),
            enemy(FAST_ENEMY, "fast", EnemyRole::Fast, 72.0, 110.0, 0.0, 10),
            EnemyDefinition {
                damage_to_base: 2,
                element: Some(Element::Earth),
                ..enemy(ARMORED_ENEMY, "armored", EnemyRole::Armored, 420.0, 40.0, 6.0, 18)
            },
        ];

        let gem = |id, name: &str, cost| TrinketDefinition {
            id,
            name: name.to_owned(),
            cost,
            damage_multiplier: 1.0,
            fire_rate_multiplier: 1.0,
            range_multiplier: 1.0,
            armor_penetration: 0.0,
            flat_damage: 0.0,
            infusion: None,
            on_hit: None,
            required_elements: ElementSet::EMPTY,
            ignores_immunity_for_status: false,
        };

        let trinkets = vec![
            TrinketDefinition {
                damage_multiplier: 1.25,
                ..gem(DAMAGE_GEM, "damage gem", 20)
            },
            TrinketDefinition {
                fire_rate_multiplier: 1.2,
                ..gem(SPEED_GEM, "speed gem", 18)
            },
            TrinketDefinition {
                range_multiplier: 1.15,
                ..gem(RANGE_GEM, "range gem", 24)
            },
            TrinketDefinition {
                damage_multiplier: 1.25,
                infusion: Some(Element::Fire),
                on_hit: Some(OnHitEffect {
                    kind: EffectKind::Burn,
                    magnitude: 10.0,
                    duration_secs: 2.0,
                }),
                ..gem(PURE_FIRE_GEM, "pure fire gem", 25)
            },
            TrinketDefinition {
                damage_multiplier: 1.2,
                infusion: Some(Element::Water),
                on_hit: Some(OnHitEffect {
                    kind: EffectKind::Slow,
                    magnitude: 0.3,
                    duration_secs: 2.0,
                }),
                ..gem(PURE_WATER_GEM, "pure water gem", 25)
            },
            TrinketDefinition {
                damage_multiplier: 1.15,
                fire_rate_multiplier: 1.2,
                infusion: Some(Element::Thunder),
                ..gem(PURE_THUNDER_GEM, "pure thunder gem", 30)
            },
            TrinketDefinition {
                damage_multiplier: 1.1,
                armor_penetration: 5.0,
                infusion: Some(Element::Earth),
                ..gem(PURE_EARTH_GEM, "pure earth gem", 28)
            },
            TrinketDefinition {
                infusion: Some(Element::Void),
                ignores_immunity_for_status: true,
                ..gem(VOID_SHARD, "void shard", 60)
            },
        ];

        Self {
            towers,
            enemies,
            trinkets,
            elements: ElementChart::standard(),
            effects: EffectRules::default(),
            level_scaling: LevelScaling::default(),
            combat: CombatTuning::default(),
            pool_capacity: default_pool_capacity(),
        }
    }

    /// Parses and validates a catalog from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        let catalog: Catalog = serde_json::from_str(json).map_err(LoadError::Parse)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Looks up a tower type.
    #[must_use]
    pub fn tower(&self, id: TowerTypeId) -> Option<&TowerDefinition> {
        self.towers.iter().find(|definition| definition.id == id)
    }

    /// Looks up an enemy type.
    #[must_use]
    pub fn enemy(&self, id: EnemyTypeId) -> Option<&EnemyDefinition> {
        self.enemies.iter().find(|definition| definition.id == id)
    }

    /// Looks up a trinket.
    #[must_use]
    pub fn trinket(&self, id: TrinketId) -> Option<&TrinketDefinition> {
        self.trinkets.iter().find(|definition| definition.id == id)
    }

    /// First enemy type with the provided role.
    #[must_use]
    pub fn enemy_with_role(&self, role: EnemyRole) -> Option<&EnemyDefinition> {
        self.enemies.iter().find(|definition| definition.role == role)
    }

    /// Checks every definition for internal consistency.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.towers.is_empty() {
            return Err(LoadError::Empty("towers"));
        }
        if self.enemies.is_empty() {
            return Err(LoadError::Empty("enemies"));
        }

        let mut seen = BTreeSet::new();
        for tower in &self.towers {
            if !seen.insert(tower.id.get()) {
                return Err(LoadError::DuplicateId {
                    table: "towers",
                    id: u32::from(tower.id.get()),
                });
            }
            require_positive("tower range", &tower.name, tower.range)?;
            require_positive("tower fire_rate", &tower.name, tower.fire_rate)?;
            require_non_negative("tower damage", &tower.name, tower.damage)?;
            require_non_negative("tower splash_radius", &tower.name, tower.splash_radius)?;
            if let Delivery::Traveling { speed } = tower.delivery {
                require_positive("projectile speed", &tower.name, speed)?;
            }
            if let Some(effect) = &tower.on_hit {
                validate_effect(&tower.name, effect)?;
            }
        }

        seen.clear();
        for enemy in &self.enemies {
            if !seen.insert(enemy.id.get()) {
                return Err(LoadError::DuplicateId {
                    table: "enemies",
                    id: u32::from(enemy.id.get()),
                });
            }
            require_positive("enemy max_health", &enemy.name, enemy.max_health)?;
            require_non_negative("enemy speed", &enemy.name, enemy.speed)?;
            require_non_negative("enemy armor", &enemy.name, enemy.armor)?;
        }

        seen.clear();
        for trinket in &self.trinkets {
            if !seen.insert(trinket.id.get()) {
                return Err(LoadError::DuplicateId {
                    table: "trinkets",
                    id: u32::from(trinket.id.get()),
                });
            }
            require_positive("trinket damage_multiplier", &trinket.name, trinket.damage_multiplier)?;
            require_positive(
                "trinket fire_rate_multiplier",
                &trinket.name,
                trinket.fire_rate_multiplier,
            )?;
            require_positive("trinket range_multiplier", &trinket.name, trinket.range_multiplier)?;
            require_non_negative("trinket armor_penetration", &trinket.name, trinket.armor_penetration)?;
            require_non_negative("trinket flat_damage", &trinket.name, trinket.flat_damage)?;
            if let Some(effect) = &trinket.on_hit {
                validate_effect(&trinket.name, effect)?;
            }
        }

        for kind in [
            EffectKind::Slow,
            EffectKind::Poison,
            EffectKind::Burn,
            EffectKind::Stun,
        ] {
            if let StackingRule::Additive { cap } = self.effects.rule_for(kind) {
                require_positive("stacking cap", "effects", cap)?;
            }
        }

        if let LostTargetPolicy::Retarget { radius } = self.combat.lost_target {
            require_non_negative("retarget radius", "combat", radius)?;
        }
        require_positive(
            "projectile lifetime",
            "combat",
            self.combat.projectile_lifetime_secs,
        )?;
        require_non_negative("minimum damage", "combat", self.combat.minimum_damage)?;

        Ok(())
    }
}

fn validate_effect(owner: &str, effect: &OnHitEffect) -> Result<(), LoadError> {
    require_positive("effect magnitude", owner, effect.magnitude)?;
    require_positive("effect duration", owner, effect.duration_secs)?;
    if effect.kind == EffectKind::Slow && effect.magnitude > 1.0 {
        return Err(LoadError::InvalidValue {
            field: "slow magnitude",
            owner: owner.to_owned(),
            value: effect.magnitude,
        });
    }
    Ok(())
}

fn require_positive(field: &'static str, owner: &str, value: f32) -> Result<(), LoadError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LoadError::InvalidValue {
            field,
            owner: owner.to_owned(),
            value,
        })
    }
}

fn require_non_negative(field: &'static str, owner: &str, value: f32) -> Result<(), LoadError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LoadError::InvalidValue {
            field,
            owner: owner.to_owned(),
            value,
        })
    }
}

/// Effective tower statistics after level scaling and trinket composition.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerStats {
    /// Damage per hit before elemental and armor adjustments.
    pub damage: f32,
    /// Targeting radius.
    pub range: f32,
    /// Shots per second.
    pub fire_rate: f32,
    /// Armor ignored per hit.
    pub armor_penetration: f32,
    /// Attack element after infusions.
    pub element: Element,
    /// Area damage radius.
    pub splash_radius: f32,
    /// Status effects applied per hit.
    pub on_hit: Vec<OnHitEffect>,
    /// Whether status effects ignore immunity.
    pub status_bypasses_immunity: bool,
}

impl TowerStats {
    /// Resolves the statistics of a tower of `definition` at `level` holding `trinkets`.
    ///
    /// Multipliers compose multiplicatively, armor penetration and flat
    /// damage compose additively. Unknown trinket ids are skipped.
    #[must_use]
    pub fn resolve(
        catalog: &Catalog,
        definition: &TowerDefinition,
        level: u8,
        trinkets: &[TrinketId],
    ) -> Self {
        let scaling = catalog.level_scaling;
        let steps = f32::from(level.max(1) - 1);

        let mut flat_damage = 0.0;
        let mut damage_multiplier = 1.0;
        let mut fire_rate_multiplier = 1.0;
        let mut range_multiplier = 1.0;
        let mut armor_penetration = 0.0;
        let mut element = definition.element;
        let mut on_hit: Vec<OnHitEffect> = definition.on_hit.into_iter().collect();
        let mut status_bypasses_immunity = false;

        for trinket in trinkets.iter().filter_map(|id| catalog.trinket(*id)) {
            flat_damage += trinket.flat_damage;
            damage_multiplier *= trinket.damage_multiplier;
            fire_rate_multiplier *= trinket.fire_rate_multiplier;
            range_multiplier *= trinket.range_multiplier;
            armor_penetration += trinket.armor_penetration;
            if let Some(infusion) = trinket.infusion {
                element = infusion;
            }
            if let Some(effect) = trinket.on_hit {
                on_hit.push(effect);
            }
            status_bypasses_immunity |= trinket.ignores_immunity_for_status;
        }

        let base_damage = definition.damage * (1.0 + scaling.damage_per_level * steps);
        Self {
            damage: (base_damage + flat_damage) * damage_multiplier,
            range: definition.range * (1.0 + scaling.range_per_level * steps) * range_multiplier,
            fire_rate: definition.fire_rate
                * (1.0 + scaling.fire_rate_per_level * steps)
                * fire_rate_multiplier,
            armor_penetration,
            element,
            splash_radius: definition.splash_radius,
            on_hit,
            status_bypasses_immunity,
        }
    }

    /// Time between shots, `1 / fire_rate`.
    #[must_use]
    pub fn cooldown(&self) -> std::time::Duration {
        if self.fire_rate > 0.0 && self.fire_rate.is_finite() {
            std::time::Duration::from_secs_f32(1.0 / self.fire_rate)
        } else {
            std::time::Duration::MAX
        }
    }
}
