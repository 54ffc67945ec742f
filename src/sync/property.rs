use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// A named aspect of a controller whose change must reach the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// Selection state.
    State,
    /// Container the visual is attached to.
    Parent,
    /// Display size.
    Size,
    /// Display scale.
    Scale,
    /// Vertex position.
    Position,
    /// Edge endpoint positions.
    Endpoints,
}

impl Property {
    /// Every property, in application order.
    pub const ALL: [Property; 6] = [
        Property::Parent,
        Property::State,
        Property::Size,
        Property::Scale,
        Property::Position,
        Property::Endpoints,
    ];

    /// Returns the property's wire name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Parent => "parentNode",
            Self::Size => "size",
            Self::Scale => "scale",
            Self::Position => "position",
            Self::Endpoints => "endpoints",
        }
    }

    /// Looks a property up by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    fn bit(self) -> u8 {
        match self {
            Self::State => 1,
            Self::Parent => 1 << 1,
            Self::Size => 1 << 2,
            Self::Scale => 1 << 3,
            Self::Position => 1 << 4,
            Self::Endpoints => 1 << 5,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of properties.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PropertySet(u8);

impl PropertySet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns a set holding exactly `properties`.
    #[must_use]
    pub fn of(properties: &[Property]) -> Self {
        properties.iter().fold(Self::empty(), |set, p| set.with(*p))
    }

    /// Returns this set plus `property`.
    #[must_use]
    pub fn with(self, property: Property) -> Self {
        Self(self.0 | property.bit())
    }

    /// Returns `true` if `property` is in the set.
    #[must_use]
    pub fn contains(self, property: Property) -> bool {
        self.0 & property.bit() != 0
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the number of properties in the set.
    #[must_use]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates the set in [`Property::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = Property> {
        Property::ALL.into_iter().filter(move |p| self.contains(*p))
    }
}

impl fmt::Debug for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Property> for PropertySet {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), PropertySet::with)
    }
}

/// Pending properties, shared between producers and the consumer without a lock.
#[derive(Debug, Default)]
pub(crate) struct DirtySet(AtomicU8);

impl DirtySet {
    /// Adds `property`. Sequentially consistent with the controller's synced flag.
    pub(crate) fn mark(&self, property: Property) {
        self.0.fetch_or(property.bit(), Ordering::SeqCst);
    }

    /// Removes and returns everything pending.
    pub(crate) fn take(&self) -> PropertySet {
        PropertySet(self.0.swap(0, Ordering::SeqCst))
    }

    pub(crate) fn peek(&self) -> PropertySet {
        PropertySet(self.0.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for p in Property::ALL {
            assert_eq!(Property::from_name(p.name()), Some(p));
        }
        assert_eq!(Property::from_name("colour"), None);
    }

    #[test]
    fn dirty_set_accumulates_until_taken() {
        let dirty = DirtySet::default();
        dirty.mark(Property::Size);
        dirty.mark(Property::Scale);
        dirty.mark(Property::Size);
        assert_eq!(dirty.peek().len(), 2);
        let taken = dirty.take();
        assert!(taken.contains(Property::Size) && taken.contains(Property::Scale));
        assert!(dirty.take().is_empty());
    }

    #[test]
    fn iterates_parent_first() {
        let set = PropertySet::of(&[Property::Size, Property::Parent, Property::State]);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Property::Parent, Property::State, Property::Size]
        );
    }
}
