use std::fmt;

use crate::math::Point3;

use super::handle::Handle;

slotmap::new_key_type! {
    /// Arena key of a canonical vertex inside a topology store.
    pub struct VertexKey;
}

/// Caller-assigned identifier of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub u32);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mesh vertex.
///
/// Values built with [`Vertex::new`] are detached. Values returned by a
/// [`TopologyStore`](super::TopologyStore) remember which canonical entity
/// they were read from, which lets the store recognise them on reinsertion.
#[derive(Debug, Clone)]
pub struct Vertex {
    id: VertexId,
    position: Point3,
    handle: Option<Handle<VertexKey>>,
}

impl Vertex {
    /// Creates a detached vertex at the given position.
    #[must_use]
    pub fn new(id: VertexId, position: Point3) -> Self {
        Self {
            id,
            position,
            handle: None,
        }
    }

    /// Returns the vertex identifier.
    #[must_use]
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Returns the vertex position.
    #[must_use]
    pub fn position(&self) -> Point3 {
        self.position
    }

    /// Returns the arena key of the canonical vertex this value was read from.
    #[must_use]
    pub fn key(&self) -> Option<VertexKey> {
        self.handle.map(|h| h.key)
    }

    /// Returns a copy that no longer refers to any store entity.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self::new(self.id, self.position)
    }

    pub(crate) fn handle(&self) -> Option<Handle<VertexKey>> {
        self.handle
    }

    pub(crate) fn with_handle(mut self, handle: Handle<VertexKey>) -> Self {
        self.handle = Some(handle);
        self
    }

    pub(crate) fn set_position(&mut self, position: Point3) {
        self.position = position;
    }
}

/// Structural equality: same identifier and bit-identical position.
///
/// Comparing bits keeps equality reflexive for non-finite coordinates.
impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && same_position(&self.position, &other.position)
    }
}

pub(crate) fn same_position(a: &Point3, b: &Point3) -> bool {
    a.coords
        .iter()
        .zip(b.coords.iter())
        .all(|(x, y)| x.to_bits() == y.to_bits())
}
