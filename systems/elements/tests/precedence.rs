use proptest::prelude::*;
use siege_core::{DefenseProfile, Element, ElementChart, ElementSet};
use siege_system_elements::{ElementTable, IMMUNE_MULTIPLIER, RESISTED_MULTIPLIER, VOID_MULTIPLIER};

fn element() -> impl Strategy<Value = Element> {
    prop::sample::select(Element::ALL.to_vec())
}

fn element_set() -> impl Strategy<Value = ElementSet> {
    prop::collection::vec(element(), 0..4).prop_map(|elements| ElementSet::of(&elements))
}

fn profile() -> impl Strategy<Value = DefenseProfile> {
    (prop::option::of(element()), element_set(), element_set()).prop_map(
        |(element, resistances, immunities)| DefenseProfile {
            element,
            resistances,
            immunities,
        },
    )
}

proptest! {
    #[test]
    fn immunity_always_nullifies_non_void_attacks(attack in element(), defense in profile()) {
        prop_assume!(attack != Element::Void);
        let table = ElementTable::new(&ElementChart::standard());
        let mut immune = defense;
        immune.immunities = immune.immunities.with(attack);
        prop_assert_eq!(table.resolve_multiplier(attack, &immune), IMMUNE_MULTIPLIER);
    }

    #[test]
    fn resistance_without_immunity_is_always_half(attack in element(), defense in profile()) {
        prop_assume!(attack != Element::Void);
        prop_assume!(!defense.immunities.contains(attack));
        let table = ElementTable::new(&ElementChart::standard());
        let mut resisted = defense;
        resisted.resistances = resisted.resistances.with(attack);
        prop_assert_eq!(table.resolve_multiplier(attack, &resisted), RESISTED_MULTIPLIER);
    }

    #[test]
    fn void_is_never_reduced(defense in profile()) {
        let table = ElementTable::new(&ElementChart::standard());
        prop_assert_eq!(table.resolve_multiplier(Element::Void, &defense), VOID_MULTIPLIER);
    }

    #[test]
    fn multipliers_come_from_the_fixed_set(attack in element(), defense in profile()) {
        let table = ElementTable::new(&ElementChart::standard());
        let multiplier = table.resolve_multiplier(attack, &defense);
        prop_assert!([0.0, 0.5, 1.0, 1.5].contains(&multiplier));
    }
}
