use crate::topology::{Edge, PartId, Polygon, TopologyStore, Vertex};

/// How a polygon's parts relate to the store it is inserted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// None of the polygon's vertices or edges existed in the store.
    Fresh,
    /// Every pre-existing part was already the store's canonical entity.
    Shared,
    /// Some parts were equal copies of canonical entities and were replaced by them.
    Rewritten {
        /// Number of vertex slots rewritten.
        vertices: usize,
        /// Number of edge slots rewritten.
        edges: usize,
    },
}

/// A polygon part whose identifier is taken by a structurally different entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    /// The first offending part, in cycle order with vertices checked before edges.
    pub part: PartId,
}

/// Whether a slot resolves to an entity the store already owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Canonical,
    New,
}

/// A polygon ready to be linked into a store.
#[derive(Debug, Clone)]
pub struct ReconciledPolygon {
    pub(crate) polygon: Polygon,
    pub(crate) vertex_slots: Vec<Slot>,
    pub(crate) edge_slots: Vec<Slot>,
    outcome: Reconciliation,
}

impl ReconciledPolygon {
    /// Returns how the polygon was reconciled.
    #[must_use]
    pub fn outcome(&self) -> Reconciliation {
        self.outcome
    }

    /// Returns the polygon as it will be stored.
    #[must_use]
    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }
}

/// Resolves a polygon's vertices and edges against a store's canonical entities.
///
/// For every slot: a part the store already owns is used as is; an unknown
/// identifier is new; an equal but distinct copy of a canonical part is
/// replaced by the canonical one; a different entity under the same
/// identifier rejects the whole polygon.
pub struct ReconcilePolygon<'a> {
    polygon: &'a Polygon,
}

impl<'a> ReconcilePolygon<'a> {
    /// Creates a new `ReconcilePolygon` operation.
    #[must_use]
    pub fn new(polygon: &'a Polygon) -> Self {
        Self { polygon }
    }

    /// Executes the reconciliation without modifying the store.
    ///
    /// # Errors
    ///
    /// Returns the first [`Collision`] found.
    pub fn execute(&self, store: &TopologyStore) -> Result<ReconciledPolygon, Collision> {
        let store_id = store.store_id();
        let n = self.polygon.len();

        let mut vertices = Vec::with_capacity(n);
        let mut vertex_slots = Vec::with_capacity(n);
        let mut rewritten_vertices = 0;
        for vertex in self.polygon.vertices() {
            match store.canonical_vertex(vertex.id()) {
                None => {
                    vertices.push(vertex.detached());
                    vertex_slots.push(Slot::New);
                }
                Some((key, canonical)) => {
                    let identical = vertex.handle().is_some_and(|h| h.is(store_id, key));
                    if !identical {
                        if vertex != canonical {
                            return Err(Collision {
                                part: PartId::Vertex(vertex.id()),
                            });
                        }
                        rewritten_vertices += 1;
                    }
                    vertices.push(canonical.clone());
                    vertex_slots.push(Slot::Canonical);
                }
            }
        }

        let mut edges: Vec<Edge> = Vec::with_capacity(n);
        let mut edge_slots = Vec::with_capacity(n);
        let mut rewritten_edges = 0;
        for edge in self.polygon.edges() {
            match store.canonical_edge(edge.id()) {
                None => {
                    edges.push(edge.detached());
                    edge_slots.push(Slot::New);
                }
                Some((key, canonical)) => {
                    let identical = edge.handle().is_some_and(|h| h.is(store_id, key));
                    if !identical {
                        if edge != canonical {
                            return Err(Collision {
                                part: PartId::Edge(edge.id()),
                            });
                        }
                        rewritten_edges += 1;
                    }
                    edges.push(canonical.clone());
                    edge_slots.push(Slot::Canonical);
                }
            }
        }

        let outcome = if vertex_slots.iter().chain(&edge_slots).all(|s| *s == Slot::New) {
            Reconciliation::Fresh
        } else if rewritten_vertices + rewritten_edges == 0 {
            Reconciliation::Shared
        } else {
            Reconciliation::Rewritten {
                vertices: rewritten_vertices,
                edges: rewritten_edges,
            }
        };

        Ok(ReconciledPolygon {
            polygon: self.polygon.rebuilt(vertices, edges),
            vertex_slots,
            edge_slots,
            outcome,
        })
    }
}

/// Returns `true` if `vertex` is the store's canonical entity rather than a copy.
#[must_use]
pub fn is_canonical_vertex(store: &TopologyStore, vertex: &Vertex) -> bool {
    store
        .canonical_vertex(vertex.id())
        .is_some_and(|(key, _)| vertex.handle().is_some_and(|h| h.is(store.store_id(), key)))
}
