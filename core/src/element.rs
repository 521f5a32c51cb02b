//! Element tags and defensive profiles.

use serde::{Deserialize, Serialize};

/// Elemental affinity carried by attacks and enemies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    /// Untyped damage with no table relations by default.
    Physical,
    /// Fire damage.
    Fire,
    /// Water damage.
    Water,
    /// Thunder damage.
    Thunder,
    /// Earth damage.
    Earth,
    /// Distinguished element that always applies its bonus and is never resisted.
    Void,
}

impl Element {
    /// Every element in declaration order.
    pub const ALL: [Element; 6] = [
        Element::Physical,
        Element::Fire,
        Element::Water,
        Element::Thunder,
        Element::Earth,
        Element::Void,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Compact set of elements, serialised as a list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Element>", into = "Vec<Element>")]
pub struct ElementSet(u8);

impl ElementSet {
    /// Set containing no elements.
    pub const EMPTY: ElementSet = ElementSet(0);

    /// Creates a set from the provided elements.
    #[must_use]
    pub fn of(elements: &[Element]) -> Self {
        elements
            .iter()
            .fold(Self::EMPTY, |set, element| set.with(*element))
    }

    /// Returns a copy of the set with `element` added.
    #[must_use]
    pub const fn with(self, element: Element) -> Self {
        Self(self.0 | element.bit())
    }

    /// Reports whether the set contains `element`.
    #[must_use]
    pub const fn contains(self, element: Element) -> bool {
        self.0 & element.bit() != 0
    }

    /// Reports whether the set holds no elements.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the contained elements in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Element> {
        Element::ALL
            .into_iter()
            .filter(move |element| self.contains(*element))
    }
}

impl From<Vec<Element>> for ElementSet {
    fn from(elements: Vec<Element>) -> Self {
        Self::of(&elements)
    }
}

impl From<ElementSet> for Vec<Element> {
    fn from(set: ElementSet) -> Self {
        set.iter().collect()
    }
}

/// Defensive attributes consulted when resolving elemental multipliers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseProfile {
    /// Element the defender itself belongs to.
    pub element: Option<Element>,
    /// Elements the defender resists (fixed 0.5 multiplier).
    #[serde(default)]
    pub resistances: ElementSet,
    /// Elements the defender is immune to (0 multiplier).
    #[serde(default)]
    pub immunities: ElementSet,
}
