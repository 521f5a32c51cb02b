#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Elemental interaction table that turns attack elements and enemy defenses
//! into damage multipliers.

use siege_core::{DefenseProfile, Element, ElementChart};

/// Multiplier applied when the attack element is effective against the defender.
pub const EFFECTIVE_MULTIPLIER: f32 = 1.5;
/// Multiplier applied when the attack element is weak against the defender.
pub const WEAK_MULTIPLIER: f32 = 0.5;
/// Multiplier applied when the defender resists the attack element.
pub const RESISTED_MULTIPLIER: f32 = 0.5;
/// Multiplier applied when the defender is immune to the attack element.
pub const IMMUNE_MULTIPLIER: f32 = 0.0;
/// Multiplier always applied by void attacks.
pub const VOID_MULTIPLIER: f32 = 1.5;

const ELEMENT_COUNT: usize = Element::ALL.len();

/// Dense lookup of chart relations between attacking and defending elements.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementTable {
    relations: [[f32; ELEMENT_COUNT]; ELEMENT_COUNT],
}

impl ElementTable {
    /// Builds the table from a catalog chart.
    ///
    /// When a chart lists an element as both effective and weak against the
    /// same defender, the effective relation wins.
    #[must_use]
    pub fn new(chart: &ElementChart) -> Self {
        let mut relations = [[1.0; ELEMENT_COUNT]; ELEMENT_COUNT];
        for relation in &chart.relations {
            let row = &mut relations[index(relation.element)];
            for defender in relation.weak_against.iter() {
                row[index(defender)] = WEAK_MULTIPLIER;
            }
            for defender in relation.effective_against.iter() {
                row[index(defender)] = EFFECTIVE_MULTIPLIER;
            }
        }
        Self { relations }
    }

    /// Resolves the damage multiplier of `attack` against `defense`.
    ///
    /// Precedence is void, immunity, resistance, chart relation, then 1.0.
    #[must_use]
    pub fn resolve_multiplier(&self, attack: Element, defense: &DefenseProfile) -> f32 {
        if attack == Element::Void {
            return VOID_MULTIPLIER;
        }
        if defense.immunities.contains(attack) {
            return IMMUNE_MULTIPLIER;
        }
        if defense.resistances.contains(attack) {
            return RESISTED_MULTIPLIER;
        }
        match defense.element {
            Some(defender) => self.relations[index(attack)][index(defender)],
            None => 1.0,
        }
    }

    /// Reports whether on-hit status effects of `attack` land on `defense`.
    ///
    /// Immunity blocks status effects unless `bypass_immunity` is set.
    #[must_use]
    pub fn status_applies(
        &self,
        attack: Element,
        defense: &DefenseProfile,
        bypass_immunity: bool,
    ) -> bool {
        attack == Element::Void || bypass_immunity || !defense.immunities.contains(attack)
    }
}

impl Default for ElementTable {
    fn default() -> Self {
        Self::new(&ElementChart::standard())
    }
}

fn index(element: Element) -> usize {
    Element::ALL
        .iter()
        .position(|candidate| *candidate == element)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use siege_core::ElementSet;

    fn defender(element: Option<Element>) -> DefenseProfile {
        DefenseProfile {
            element,
            ..DefenseProfile::default()
        }
    }

    #[test]
    fn chart_relations_apply_to_defender_element() {
        let table = ElementTable::default();
        assert_eq!(
            table.resolve_multiplier(Element::Water, &defender(Some(Element::Fire))),
            EFFECTIVE_MULTIPLIER
        );
        assert_eq!(
            table.resolve_multiplier(Element::Fire, &defender(Some(Element::Water))),
            WEAK_MULTIPLIER
        );
        assert_eq!(
            table.resolve_multiplier(Element::Physical, &defender(Some(Element::Fire))),
            1.0
        );
        assert_eq!(table.resolve_multiplier(Element::Fire, &defender(None)), 1.0);
    }

    #[test]
    fn resistance_overrides_chart_bonus() {
        let table = ElementTable::default();
        let profile = DefenseProfile {
            element: Some(Element::Fire),
            resistances: ElementSet::of(&[Element::Water]),
            immunities: ElementSet::EMPTY,
        };
        assert_eq!(
            table.resolve_multiplier(Element::Water, &profile),
            RESISTED_MULTIPLIER
        );
    }

    #[test]
    fn void_ignores_immunity_and_resistance() {
        let table = ElementTable::default();
        let profile = DefenseProfile {
            element: Some(Element::Void),
            resistances: ElementSet::of(&[Element::Void]),
            immunities: ElementSet::of(&[Element::Void]),
        };
        assert_eq!(table.resolve_multiplier(Element::Void, &profile), VOID_MULTIPLIER);
        assert!(table.status_applies(Element::Void, &profile, false));
    }

    #[test]
    fn immunity_blocks_status_unless_bypassed() {
        let table = ElementTable::default();
        let profile = DefenseProfile {
            element: None,
            resistances: ElementSet::EMPTY,
            immunities: ElementSet::of(&[Element::Fire]),
        };
        assert!(!table.status_applies(Element::Fire, &profile, false));
        assert!(table.status_applies(Element::Fire, &profile, true));
        assert!(table.status_applies(Element::Water, &profile, false));
    }
}
