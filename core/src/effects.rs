//! Timed status effects attached to enemies and their stacking rules.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Kinds of status effect an attack may inflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    /// Reduces movement speed by `magnitude` (a fraction in `[0, 1]`).
    Slow,
    /// Deals `magnitude` damage per second.
    Poison,
    /// Deals `magnitude` damage per second.
    Burn,
    /// Halts movement entirely while active.
    Stun,
}

impl EffectKind {
    /// Reports whether the effect deals damage over time.
    #[must_use]
    pub const fn is_damage_over_time(self) -> bool {
        matches!(self, Self::Poison | Self::Burn)
    }
}

/// Status effect delivered by a hit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OnHitEffect {
    /// Kind of effect applied.
    pub kind: EffectKind,
    /// Strength of the effect; meaning depends on the kind.
    pub magnitude: f32,
    /// Duration of the effect in seconds.
    pub duration_secs: f32,
}

impl OnHitEffect {
    /// Duration of the effect.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f32(self.duration_secs.max(0.0))
    }
}

/// Policy applied when an effect lands on an enemy already carrying the same kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum StackingRule {
    /// Keeps the strongest magnitude and the longest remaining duration.
    Refresh,
    /// Adds magnitudes up to `cap` and keeps the longest remaining duration.
    Additive {
        /// Maximum combined magnitude.
        cap: f32,
    },
}

/// Stacking rule configured for every effect kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectRules {
    /// Rule applied to slows.
    pub slow: StackingRule,
    /// Rule applied to poison.
    pub poison: StackingRule,
    /// Rule applied to burns.
    pub burn: StackingRule,
    /// Rule applied to stuns.
    pub stun: StackingRule,
}

impl EffectRules {
    /// Looks up the rule for `kind`.
    #[must_use]
    pub const fn rule_for(&self, kind: EffectKind) -> StackingRule {
        match kind {
            EffectKind::Slow => self.slow,
            EffectKind::Poison => self.poison,
            EffectKind::Burn => self.burn,
            EffectKind::Stun => self.stun,
        }
    }
}

impl Default for EffectRules {
    fn default() -> Self {
        Self {
            slow: StackingRule::Refresh,
            poison: StackingRule::Refresh,
            burn: StackingRule::Additive { cap: 30.0 },
            stun: StackingRule::Refresh,
        }
    }
}

/// Effect currently attached to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    /// Kind of effect.
    pub kind: EffectKind,
    /// Current strength of the effect.
    pub magnitude: f32,
    /// Time left before the effect expires.
    pub remaining: Duration,
}

/// Collection of effects on a single enemy; holds at most one entry per kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffects {
    entries: Vec<ActiveEffect>,
}

impl ActiveEffects {
    /// Applies `effect` according to `rule`, merging with an existing entry of the same kind.
    pub fn apply(&mut self, effect: OnHitEffect, rule: StackingRule) {
        let duration = effect.duration();
        if duration.is_zero() || !effect.magnitude.is_finite() || effect.magnitude <= 0.0 {
            return;
        }

        let Some(existing) = self
            .entries
            .iter_mut()
            .find(|entry| entry.kind == effect.kind)
        else {
            let magnitude = match rule {
                StackingRule::Refresh => effect.magnitude,
                StackingRule::Additive { cap } => effect.magnitude.min(cap),
            };
            self.entries.push(ActiveEffect {
                kind: effect.kind,
                magnitude,
                remaining: duration,
            });
            return;
        };

        existing.remaining = existing.remaining.max(duration);
        existing.magnitude = match rule {
            StackingRule::Refresh => existing.magnitude.max(effect.magnitude),
            StackingRule::Additive { cap } => (existing.magnitude + effect.magnitude).min(cap),
        };
    }

    /// Decrements every remaining duration by `dt`, removing expired effects.
    ///
    /// Returns the kinds that expired, in the order they were held.
    pub fn age(&mut self, dt: Duration) -> Vec<EffectKind> {
        let mut expired = Vec::new();
        self.entries.retain_mut(|entry| {
            entry.remaining = entry.remaining.saturating_sub(dt);
            if entry.remaining.is_zero() {
                expired.push(entry.kind);
                false
            } else {
                true
            }
        });
        expired
    }

    /// Magnitude of the effect of `kind`, if present.
    #[must_use]
    pub fn magnitude(&self, kind: EffectKind) -> Option<f32> {
        self.entries
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.magnitude)
    }

    /// Movement multiplier derived from slows and stuns, in `[0, 1]`.
    #[must_use]
    pub fn slow_multiplier(&self) -> f32 {
        if self.magnitude(EffectKind::Stun).is_some() {
            return 0.0;
        }
        let slow = self.magnitude(EffectKind::Slow).unwrap_or(0.0);
        (1.0 - slow).clamp(0.0, 1.0)
    }

    /// Iterates over the active effects.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.entries.iter()
    }

    /// Reports whether no effect is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every effect.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
