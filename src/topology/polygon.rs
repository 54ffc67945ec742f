use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::TopologyError;

use super::edge::{Edge, EdgeId};
use super::handle::Handle;
use super::properties::{EdgeProperties, PolygonProperties};
use super::vertex::{Vertex, VertexId};

slotmap::new_key_type! {
    /// Arena key of a polygon inside a topology store.
    pub struct PolygonKey;
}

/// Caller-assigned identifier of a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolygonId(pub u32);

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A closed polygon: a cycle of vertices joined by edges.
///
/// Edge `i` always connects vertex `i` and vertex `(i + 1) % n`, with `n >= 3`
/// and no vertex or edge repeated. The constructor enforces this, so every
/// `Polygon` value is a valid cycle.
#[derive(Debug, Clone)]
pub struct Polygon {
    id: PolygonId,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    edge_properties: BTreeMap<EdgeId, EdgeProperties>,
    properties: PolygonProperties,
    handle: Option<Handle<PolygonKey>>,
}

impl Polygon {
    /// Creates a polygon from its vertex cycle and the edges joining consecutive vertices.
    ///
    /// Every edge receives a default [`EdgeProperties`] record.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than 3 sides, if the vertex and edge
    /// counts differ, if an edge does not join its two neighbouring vertices,
    /// or if a vertex or edge identifier appears twice.
    pub fn new(
        id: PolygonId,
        vertices: Vec<Vertex>,
        edges: Vec<Edge>,
    ) -> Result<Self, TopologyError> {
        check_cycle(&vertices, &edges)?;
        let edge_properties = edges
            .iter()
            .map(|e| (e.id(), EdgeProperties::default()))
            .collect();
        Ok(Self {
            id,
            vertices,
            edges,
            edge_properties,
            properties: PolygonProperties::default(),
            handle: None,
        })
    }

    /// Returns the polygon identifier.
    #[must_use]
    pub fn id(&self) -> PolygonId {
        self.id
    }

    /// Returns the number of sides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns the vertex cycle.
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Returns the edges, edge `i` joining vertex `i` to vertex `i + 1`.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the vertex identifiers in cycle order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().map(Vertex::id)
    }

    /// Returns the edge identifiers in cycle order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().map(Edge::id)
    }

    /// Returns the metadata attached to one of this polygon's edges.
    #[must_use]
    pub fn edge_properties(&self, edge: EdgeId) -> Option<&EdgeProperties> {
        self.edge_properties.get(&edge)
    }

    /// Returns mutable metadata for one of this polygon's edges.
    pub fn edge_properties_mut(&mut self, edge: EdgeId) -> Option<&mut EdgeProperties> {
        self.edge_properties.get_mut(&edge)
    }

    /// Returns the polygon-wide metadata.
    #[must_use]
    pub fn properties(&self) -> &PolygonProperties {
        &self.properties
    }

    /// Replaces the polygon-wide metadata. Returns `true` if the value changed.
    pub fn set_properties(&mut self, properties: PolygonProperties) -> bool {
        if self.properties == properties {
            return false;
        }
        self.properties = properties;
        true
    }

    /// Returns the arena key of the stored polygon this value was read from.
    #[must_use]
    pub fn key(&self) -> Option<PolygonKey> {
        self.handle.map(|h| h.key)
    }

    /// Returns a copy in which neither the polygon nor its parts refer to store entities.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            id: self.id,
            vertices: self.vertices.iter().map(Vertex::detached).collect(),
            edges: self.edges.iter().map(Edge::detached).collect(),
            edge_properties: self.edge_properties.clone(),
            properties: self.properties.clone(),
            handle: None,
        }
    }

    /// Same polygon, with its vertices and edges swapped for `vertices`/`edges`.
    ///
    /// The replacements must carry the same identifiers in the same order.
    pub(crate) fn rebuilt(&self, vertices: Vec<Vertex>, edges: Vec<Edge>) -> Self {
        debug_assert!(self.vertex_ids().eq(vertices.iter().map(Vertex::id)));
        debug_assert!(self.edge_ids().eq(edges.iter().map(Edge::id)));
        Self {
            id: self.id,
            vertices,
            edges,
            edge_properties: self.edge_properties.clone(),
            properties: self.properties.clone(),
            handle: self.handle,
        }
    }

    /// Reassembles a stored polygon. The parts are trusted to form a valid cycle.
    pub(crate) fn assemble(
        id: PolygonId,
        vertices: Vec<Vertex>,
        edges: Vec<Edge>,
        edge_properties: BTreeMap<EdgeId, EdgeProperties>,
        properties: PolygonProperties,
        handle: Handle<PolygonKey>,
    ) -> Self {
        Self {
            id,
            vertices,
            edges,
            edge_properties,
            properties,
            handle: Some(handle),
        }
    }

    pub(crate) fn into_metadata(self) -> (BTreeMap<EdgeId, EdgeProperties>, PolygonProperties) {
        (self.edge_properties, self.properties)
    }
}

/// Structural equality over identifiers, parts and metadata.
impl PartialEq for Polygon {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.vertices == other.vertices
            && self.edges == other.edges
            && self.edge_properties == other.edge_properties
            && self.properties == other.properties
    }
}

/// Checks the cycle invariant for a vertex/edge list pair.
pub(crate) fn check_cycle(vertices: &[Vertex], edges: &[Edge]) -> Result<(), TopologyError> {
    let n = vertices.len();
    if n < 3 || edges.len() < 3 {
        return Err(TopologyError::TooFewSides {
            vertices: n,
            edges: edges.len(),
        });
    }
    if n != edges.len() {
        return Err(TopologyError::SideCountMismatch {
            vertices: n,
            edges: edges.len(),
        });
    }

    for (i, edge) in edges.iter().enumerate() {
        let first = vertices[i].id();
        let second = vertices[(i + 1) % n].id();
        if first == second {
            return Err(TopologyError::RepeatedAdjacentVertex { position: i, id: first });
        }
        if !edge.connects(first, second) {
            return Err(TopologyError::BrokenCycle {
                position: i,
                edge: edge.id(),
                first,
                second,
            });
        }
    }

    let mut seen = BTreeSet::new();
    if let Some(dup) = vertices.iter().map(Vertex::id).find(|id| !seen.insert(*id)) {
        return Err(TopologyError::DuplicateVertex(dup));
    }
    let mut seen = BTreeSet::new();
    if let Some(dup) = edges.iter().map(Edge::id).find(|id| !seen.insert(*id)) {
        return Err(TopologyError::DuplicateEdge(dup));
    }
    Ok(())
}
