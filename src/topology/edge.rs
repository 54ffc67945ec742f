use std::fmt;

use crate::error::TopologyError;

use super::handle::Handle;
use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Arena key of a canonical edge inside a topology store.
    pub struct EdgeKey;
}

/// Caller-assigned identifier of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u32);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mesh edge connecting an ordered pair of distinct vertices.
///
/// The vertex pair is fixed at construction.
#[derive(Debug, Clone)]
pub struct Edge {
    id: EdgeId,
    vertices: [VertexId; 2],
    handle: Option<Handle<EdgeKey>>,
}

impl Edge {
    /// Creates a detached edge from `start` to `end`.
    ///
    /// # Errors
    ///
    /// Returns an error if both endpoints are the same vertex.
    pub fn new(id: EdgeId, start: VertexId, end: VertexId) -> Result<Self, TopologyError> {
        if start == end {
            return Err(TopologyError::DegenerateEdge(id));
        }
        Ok(Self {
            id,
            vertices: [start, end],
            handle: None,
        })
    }

    /// Returns the edge identifier.
    #[must_use]
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Returns the ordered vertex pair.
    #[must_use]
    pub fn vertex_ids(&self) -> [VertexId; 2] {
        self.vertices
    }

    /// Returns `true` if the edge joins `a` and `b`, in either direction.
    #[must_use]
    pub fn connects(&self, a: VertexId, b: VertexId) -> bool {
        let [s, e] = self.vertices;
        (s == a && e == b) || (s == b && e == a)
    }

    /// Returns the endpoint opposite to `vertex`, if `vertex` is an endpoint.
    #[must_use]
    pub fn opposite(&self, vertex: VertexId) -> Option<VertexId> {
        match self.vertices {
            [s, e] if s == vertex => Some(e),
            [s, e] if e == vertex => Some(s),
            _ => None,
        }
    }

    /// Returns the arena key of the canonical edge this value was read from.
    #[must_use]
    pub fn key(&self) -> Option<EdgeKey> {
        self.handle.map(|h| h.key)
    }

    /// Returns a copy that no longer refers to any store entity.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            id: self.id,
            vertices: self.vertices,
            handle: None,
        }
    }

    pub(crate) fn handle(&self) -> Option<Handle<EdgeKey>> {
        self.handle
    }

    pub(crate) fn with_handle(mut self, handle: Handle<EdgeKey>) -> Self {
        self.handle = Some(handle);
        self
    }
}

/// Structural equality: same identifier and same ordered vertex pair.
impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.vertices == other.vertices
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_self_loop() {
        let r = Edge::new(EdgeId(1), VertexId(4), VertexId(4));
        assert_eq!(r.unwrap_err(), TopologyError::DegenerateEdge(EdgeId(1)));
    }

    #[test]
    fn connects_in_both_directions() {
        let e = Edge::new(EdgeId(1), VertexId(1), VertexId(2)).unwrap();
        assert!(e.connects(VertexId(1), VertexId(2)));
        assert!(e.connects(VertexId(2), VertexId(1)));
        assert!(!e.connects(VertexId(1), VertexId(3)));
    }

    #[test]
    fn opposite_endpoint() {
        let e = Edge::new(EdgeId(7), VertexId(3), VertexId(9)).unwrap();
        assert_eq!(e.opposite(VertexId(3)), Some(VertexId(9)));
        assert_eq!(e.opposite(VertexId(9)), Some(VertexId(3)));
        assert_eq!(e.opposite(VertexId(1)), None);
    }

    #[test]
    fn equality_ignores_store_handle_but_not_direction() {
        let a = Edge::new(EdgeId(1), VertexId(1), VertexId(2)).unwrap();
        let b = Edge::new(EdgeId(1), VertexId(1), VertexId(2)).unwrap();
        let reversed = Edge::new(EdgeId(1), VertexId(2), VertexId(1)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, reversed);
    }
}
