pub mod edge;
pub mod event;
mod handle;
pub mod part;
pub mod polygon;
pub mod properties;
pub mod shared;
pub mod vertex;

pub use edge::{Edge, EdgeId, EdgeKey};
pub use event::{MeshEvent, MeshListener};
pub use part::{MeshPart, PartId};
pub use polygon::{Polygon, PolygonId, PolygonKey};
pub use properties::{
    BoundaryCondition, BoundaryConditionKind, EdgeProperties, PolygonProperties,
};
pub use shared::Mesh;
pub use vertex::{Vertex, VertexId, VertexKey};

use std::collections::{BTreeMap, BTreeSet};

use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::math::Point3;
use crate::operations::{Collision, ReconcilePolygon, ReconciledPolygon, Reconciliation, Slot};

use handle::{Handle, StoreId};

/// Result of [`TopologyStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The polygon was stored.
    Inserted(Reconciliation),
    /// A polygon with the same identifier is already stored; nothing changed.
    DuplicateId,
    /// A part identifier is taken by a different entity; nothing changed.
    Collision(Collision),
}

impl InsertOutcome {
    /// Returns `true` if the polygon was stored.
    #[must_use]
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Stored form of a polygon: identifiers only, parts live in the arenas.
#[derive(Debug, Clone)]
pub(crate) struct PolygonRecord {
    pub(crate) id: PolygonId,
    pub(crate) vertices: Vec<VertexId>,
    pub(crate) edges: Vec<EdgeId>,
    pub(crate) edge_properties: BTreeMap<EdgeId, EdgeProperties>,
    pub(crate) properties: PolygonProperties,
}

/// Graph-consistent container of vertices, edges and polygons.
///
/// Vertices and edges are shared between every polygon that names them and
/// live exactly as long as at least one polygon does. Adjacency indices
/// (vertex → polygons, vertex → edges, edge → polygons) are maintained
/// incrementally on every insert and remove.
///
/// All queries return owned copies; nothing handed out can alter the indices.
#[derive(Debug)]
pub struct TopologyStore {
    store_id: StoreId,
    vertices: SlotMap<VertexKey, Vertex>,
    edges: SlotMap<EdgeKey, Edge>,
    polygons: SlotMap<PolygonKey, PolygonRecord>,
    vertex_index: BTreeMap<VertexId, VertexKey>,
    edge_index: BTreeMap<EdgeId, EdgeKey>,
    polygon_index: BTreeMap<PolygonId, PolygonKey>,
    vertex_polygons: BTreeMap<VertexId, BTreeSet<PolygonId>>,
    vertex_edges: BTreeMap<VertexId, BTreeSet<EdgeId>>,
    edge_polygons: BTreeMap<EdgeId, BTreeSet<PolygonId>>,
    copying: bool,
    listener: Option<MeshListener>,
}

impl Default for TopologyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store_id: StoreId::fresh(),
            vertices: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            polygons: SlotMap::with_key(),
            vertex_index: BTreeMap::new(),
            edge_index: BTreeMap::new(),
            polygon_index: BTreeMap::new(),
            vertex_polygons: BTreeMap::new(),
            vertex_edges: BTreeMap::new(),
            edge_polygons: BTreeMap::new(),
            copying: false,
            listener: None,
        }
    }

    // --- Listener ---

    /// Installs the store's single change listener, replacing any previous one.
    pub fn set_listener(&mut self, listener: MeshListener) {
        self.listener = Some(listener);
    }

    /// Removes and returns the change listener.
    pub fn clear_listener(&mut self) -> Option<MeshListener> {
        self.listener.take()
    }

    /// Returns `true` if a listener is installed.
    #[must_use]
    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    fn send(&mut self, event: MeshEvent) {
        if let Some(listener) = &self.listener {
            if listener.send(event).is_err() {
                debug!("mesh listener disconnected, dropping it");
                self.listener = None;
            }
        }
    }

    fn notify_changed(&mut self) {
        if !self.copying {
            self.send(MeshEvent::Changed);
        }
    }

    // --- Mutation ---

    /// Inserts a polygon, sharing any vertex or edge the store already owns.
    ///
    /// Parts that are equal copies of stored entities are replaced by the
    /// stored entities. If the polygon identifier is taken, or a part
    /// identifier is taken by a different entity, nothing changes.
    pub fn insert(&mut self, polygon: Polygon) -> InsertOutcome {
        let id = polygon.id();
        if self.polygon_index.contains_key(&id) {
            debug!(polygon = %id, "polygon already stored, insert ignored");
            return InsertOutcome::DuplicateId;
        }
        let reconciled = match ReconcilePolygon::new(&polygon).execute(self) {
            Ok(reconciled) => reconciled,
            Err(collision) => {
                warn!(
                    polygon = %id,
                    part = ?collision.part,
                    "identifier taken by a different entity, insert rejected"
                );
                return InsertOutcome::Collision(collision);
            }
        };
        let outcome = reconciled.outcome();
        self.link(reconciled);
        self.check_invariants();
        debug!(polygon = %id, ?outcome, "polygon inserted");
        self.notify_changed();
        InsertOutcome::Inserted(outcome)
    }

    /// Removes a polygon along with every vertex and edge no other polygon uses.
    ///
    /// Returns `false`, without notifying, if no such polygon exists.
    pub fn remove(&mut self, id: PolygonId) -> bool {
        let removed = self.unlink(id);
        if removed {
            self.check_invariants();
            debug!(polygon = %id, "polygon removed");
            self.notify_changed();
        }
        removed
    }

    /// Removes several polygons with at most one change notification.
    ///
    /// Returns how many polygons were actually removed.
    pub fn remove_batch<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = PolygonId>,
    {
        let mut removed = 0;
        for id in ids {
            if self.unlink(id) {
                removed += 1;
            }
        }
        if removed > 0 {
            self.check_invariants();
            debug!(removed, "polygon batch removed");
            self.notify_changed();
        }
        removed
    }

    /// Removes every polygon, vertex and edge.
    pub fn clear(&mut self) {
        let had_polygons = !self.polygon_index.is_empty();
        self.clear_entities();
        if had_polygons {
            self.notify_changed();
        }
    }

    /// Moves a vertex in place. Returns `true` if the position changed.
    pub fn move_vertex(&mut self, id: VertexId, position: Point3) -> bool {
        let Some(&key) = self.vertex_index.get(&id) else {
            return false;
        };
        let Some(vertex) = self.vertices.get_mut(key) else {
            return false;
        };
        if vertex::same_position(&vertex.position(), &position) {
            return false;
        }
        vertex.set_position(position);
        self.send(MeshEvent::VertexMoved(id));
        true
    }

    /// Inserts several polygons with at most one change notification.
    ///
    /// Each polygon goes through [`insert`](Self::insert), so duplicates and
    /// collisions are skipped individually. Returns the per-polygon outcomes
    /// in input order.
    pub fn insert_all<I>(&mut self, polygons: I) -> Vec<InsertOutcome>
    where
        I: IntoIterator<Item = Polygon>,
    {
        let was_copying = std::mem::replace(&mut self.copying, true);
        let outcomes: Vec<InsertOutcome> = polygons.into_iter().map(|p| self.insert(p)).collect();
        self.copying = was_copying;
        let inserted = outcomes.iter().filter(|o| o.is_inserted()).count();
        if inserted > 0 {
            debug!(inserted, skipped = outcomes.len() - inserted, "polygon batch inserted");
            self.notify_changed();
        }
        outcomes
    }

    /// Replaces this store's contents with a copy of `other`.
    ///
    /// Per-insert notifications are suppressed while copying; exactly one
    /// change notification fires at the end.
    pub fn copy_from(&mut self, other: &TopologyStore) {
        self.copying = true;
        self.clear_entities();
        for polygon in other.polygons() {
            let id = polygon.id();
            if !self.insert(polygon.detached()).is_inserted() {
                warn!(polygon = %id, "polygon could not be copied");
            }
        }
        self.copying = false;
        self.notify_changed();
    }

    // --- Polygon metadata ---

    /// Sets the fluid boundary condition of `edge` within `polygon`.
    ///
    /// Returns `true` and notifies if the value changed.
    pub fn set_fluid_condition(
        &mut self,
        polygon: PolygonId,
        edge: EdgeId,
        condition: BoundaryCondition,
    ) -> bool {
        self.update_edge_properties(polygon, edge, |p| p.set_fluid(condition))
    }

    /// Sets the thermal boundary condition of `edge` within `polygon`.
    ///
    /// Returns `true` and notifies if the value changed.
    pub fn set_thermal_condition(
        &mut self,
        polygon: PolygonId,
        edge: EdgeId,
        condition: BoundaryCondition,
    ) -> bool {
        self.update_edge_properties(polygon, edge, |p| p.set_thermal(condition))
    }

    /// Sets passive-scalar condition `index` of `edge` within `polygon`.
    ///
    /// Returns `true` and notifies if the value changed.
    pub fn set_other_condition(
        &mut self,
        polygon: PolygonId,
        edge: EdgeId,
        index: usize,
        condition: BoundaryCondition,
    ) -> bool {
        self.update_edge_properties(polygon, edge, |p| p.set_other(index, condition))
    }

    /// Replaces a polygon's material and group.
    ///
    /// Returns `true` and notifies if the value changed.
    pub fn set_polygon_properties(
        &mut self,
        polygon: PolygonId,
        properties: PolygonProperties,
    ) -> bool {
        let changed = self
            .polygon_index
            .get(&polygon)
            .and_then(|key| self.polygons.get_mut(*key))
            .is_some_and(|record| {
                if record.properties == properties {
                    false
                } else {
                    record.properties = properties;
                    true
                }
            });
        if changed {
            self.notify_changed();
        }
        changed
    }

    fn update_edge_properties<F>(&mut self, polygon: PolygonId, edge: EdgeId, update: F) -> bool
    where
        F: FnOnce(&mut EdgeProperties) -> bool,
    {
        let changed = self
            .polygon_index
            .get(&polygon)
            .and_then(|key| self.polygons.get_mut(*key))
            .and_then(|record| record.edge_properties.get_mut(&edge))
            .is_some_and(update);
        if changed {
            self.notify_changed();
        }
        changed
    }

    // --- Queries ---

    /// Returns the number of polygons.
    #[must_use]
    pub fn polygon_count(&self) -> usize {
        self.polygon_index.len()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_index.len()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    /// Returns `true` if the store holds no polygons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygon_index.is_empty()
    }

    /// Returns all polygons in identifier order.
    #[must_use]
    pub fn polygons(&self) -> Vec<Polygon> {
        self.polygon_index
            .values()
            .filter_map(|key| self.materialize(*key))
            .collect()
    }

    /// Returns the polygon with the given identifier.
    #[must_use]
    pub fn polygon(&self, id: PolygonId) -> Option<Polygon> {
        self.polygon_index.get(&id).and_then(|key| self.materialize(*key))
    }

    /// Returns all vertices in identifier order.
    #[must_use]
    pub fn vertices(&self) -> Vec<Vertex> {
        self.vertex_index
            .values()
            .filter_map(|key| self.vertices.get(*key))
            .cloned()
            .collect()
    }

    /// Returns the vertex with the given identifier.
    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<Vertex> {
        self.canonical_vertex(id).map(|(_, v)| v.clone())
    }

    /// Returns all edges in identifier order.
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.edge_index
            .values()
            .filter_map(|key| self.edges.get(*key))
            .cloned()
            .collect()
    }

    /// Returns the edge with the given identifier.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<Edge> {
        self.canonical_edge(id).map(|(_, e)| e.clone())
    }

    /// Returns the part with the given identifier.
    #[must_use]
    pub fn part(&self, id: PartId) -> Option<MeshPart> {
        match id {
            PartId::Vertex(id) => self.vertex(id).map(MeshPart::Vertex),
            PartId::Edge(id) => self.edge(id).map(MeshPart::Edge),
            PartId::Polygon(id) => self.polygon(id).map(MeshPart::Polygon),
        }
    }

    /// Returns every part: vertices, then edges, then polygons.
    #[must_use]
    pub fn parts(&self) -> Vec<MeshPart> {
        self.vertices()
            .into_iter()
            .map(MeshPart::Vertex)
            .chain(self.edges().into_iter().map(MeshPart::Edge))
            .chain(self.polygons().into_iter().map(MeshPart::Polygon))
            .collect()
    }

    /// Returns the edges incident to a vertex.
    #[must_use]
    pub fn edges_of_vertex(&self, id: VertexId) -> Vec<Edge> {
        self.vertex_edges
            .get(&id)
            .map(|ids| ids.iter().filter_map(|e| self.edge(*e)).collect())
            .unwrap_or_default()
    }

    /// Returns the polygons that use a vertex.
    #[must_use]
    pub fn polygons_of_vertex(&self, id: VertexId) -> Vec<Polygon> {
        self.vertex_polygons
            .get(&id)
            .map(|ids| ids.iter().filter_map(|p| self.polygon(*p)).collect())
            .unwrap_or_default()
    }

    /// Returns the polygons that use an edge.
    #[must_use]
    pub fn polygons_of_edge(&self, id: EdgeId) -> Vec<Polygon> {
        self.edge_polygons
            .get(&id)
            .map(|ids| ids.iter().filter_map(|p| self.polygon(*p)).collect())
            .unwrap_or_default()
    }

    /// Returns the identifiers of the polygons that use a vertex.
    #[must_use]
    pub fn polygon_ids_of_vertex(&self, id: VertexId) -> BTreeSet<PolygonId> {
        self.vertex_polygons.get(&id).cloned().unwrap_or_default()
    }

    /// Returns the identifiers of the edges incident to a vertex.
    #[must_use]
    pub fn edge_ids_of_vertex(&self, id: VertexId) -> BTreeSet<EdgeId> {
        self.vertex_edges.get(&id).cloned().unwrap_or_default()
    }

    /// Returns the identifiers of the polygons that use an edge.
    #[must_use]
    pub fn polygon_ids_of_edge(&self, id: EdgeId) -> BTreeSet<PolygonId> {
        self.edge_polygons.get(&id).cloned().unwrap_or_default()
    }

    /// Returns the edge directly joining two vertices, if any.
    #[must_use]
    pub fn edge_between(&self, first: VertexId, second: VertexId) -> Option<Edge> {
        if first == second {
            return None;
        }
        let first_edges = self.vertex_edges.get(&first)?;
        let second_edges = self.vertex_edges.get(&second)?;
        first_edges
            .intersection(second_edges)
            .next()
            .and_then(|id| self.edge(*id))
    }

    /// Returns every polygon whose vertices all belong to `vertices`.
    #[must_use]
    pub fn polygons_within<I>(&self, vertices: I) -> Vec<Polygon>
    where
        I: IntoIterator<Item = VertexId>,
    {
        let selected: BTreeSet<VertexId> = vertices.into_iter().collect();
        let mut hits: BTreeMap<PolygonId, usize> = BTreeMap::new();
        for id in &selected {
            if let Some(polygons) = self.vertex_polygons.get(id) {
                for polygon in polygons {
                    *hits.entry(*polygon).or_default() += 1;
                }
            }
        }
        hits.into_iter()
            .filter_map(|(id, count)| {
                let key = *self.polygon_index.get(&id)?;
                let record = self.polygons.get(key)?;
                if record.vertices.len() == count {
                    self.materialize(key)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Returns one past the largest polygon identifier, or 1 when empty.
    ///
    /// Returns `None` once `u32::MAX` is taken; lower identifiers may
    /// still be free.
    #[must_use]
    pub fn next_polygon_id(&self) -> Option<PolygonId> {
        next_after(self.polygon_index.keys().next_back().map(|id| id.0)).map(PolygonId)
    }

    /// Returns one past the largest vertex identifier, or 1 when empty.
    ///
    /// Returns `None` once `u32::MAX` is taken.
    #[must_use]
    pub fn next_vertex_id(&self) -> Option<VertexId> {
        next_after(self.vertex_index.keys().next_back().map(|id| id.0)).map(VertexId)
    }

    /// Returns one past the largest edge identifier, or 1 when empty.
    ///
    /// Returns `None` once `u32::MAX` is taken.
    #[must_use]
    pub fn next_edge_id(&self) -> Option<EdgeId> {
        next_after(self.edge_index.keys().next_back().map(|id| id.0)).map(EdgeId)
    }

    /// Returns the arena key of the stored vertex with this identifier.
    #[must_use]
    pub fn vertex_key(&self, id: VertexId) -> Option<VertexKey> {
        self.vertex_index.get(&id).copied()
    }

    /// Returns the arena key of the stored edge with this identifier.
    #[must_use]
    pub fn edge_key(&self, id: EdgeId) -> Option<EdgeKey> {
        self.edge_index.get(&id).copied()
    }

    /// Returns the arena key of the stored polygon with this identifier.
    #[must_use]
    pub fn polygon_key(&self, id: PolygonId) -> Option<PolygonKey> {
        self.polygon_index.get(&id).copied()
    }

    // --- Crate internals ---

    pub(crate) fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub(crate) fn canonical_vertex(&self, id: VertexId) -> Option<(VertexKey, &Vertex)> {
        let key = *self.vertex_index.get(&id)?;
        self.vertices.get(key).map(|v| (key, v))
    }

    pub(crate) fn canonical_edge(&self, id: EdgeId) -> Option<(EdgeKey, &Edge)> {
        let key = *self.edge_index.get(&id)?;
        self.edges.get(key).map(|e| (key, e))
    }

    pub(crate) fn records(&self) -> impl Iterator<Item = (PolygonId, &PolygonRecord)> + '_ {
        self.polygon_index
            .iter()
            .filter_map(|(id, key)| self.polygons.get(*key).map(|r| (*id, r)))
    }

    pub(crate) fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertex_index.keys().copied()
    }

    pub(crate) fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edge_index.keys().copied()
    }

    pub(crate) fn vertex_polygon_index(&self) -> &BTreeMap<VertexId, BTreeSet<PolygonId>> {
        &self.vertex_polygons
    }

    pub(crate) fn vertex_edge_index(&self) -> &BTreeMap<VertexId, BTreeSet<EdgeId>> {
        &self.vertex_edges
    }

    pub(crate) fn edge_polygon_index(&self) -> &BTreeMap<EdgeId, BTreeSet<PolygonId>> {
        &self.edge_polygons
    }

    pub(crate) fn arenas_match_indices(&self) -> bool {
        let store = self.store_id;
        self.vertices.len() == self.vertex_index.len()
            && self.edges.len() == self.edge_index.len()
            && self.polygons.len() == self.polygon_index.len()
            && self.vertex_index.iter().all(|(id, key)| {
                self.vertices
                    .get(*key)
                    .is_some_and(|v| v.id() == *id && v.handle().is_some_and(|h| h.is(store, *key)))
            })
            && self.edge_index.iter().all(|(id, key)| {
                self.edges
                    .get(*key)
                    .is_some_and(|e| e.id() == *id && e.handle().is_some_and(|h| h.is(store, *key)))
            })
    }

    fn materialize(&self, key: PolygonKey) -> Option<Polygon> {
        let record = self.polygons.get(key)?;
        let vertices: Vec<Vertex> = record
            .vertices
            .iter()
            .filter_map(|id| self.canonical_vertex(*id).map(|(_, v)| v.clone()))
            .collect();
        let edges: Vec<Edge> = record
            .edges
            .iter()
            .filter_map(|id| self.canonical_edge(*id).map(|(_, e)| e.clone()))
            .collect();
        debug_assert_eq!(vertices.len(), record.vertices.len());
        debug_assert_eq!(edges.len(), record.edges.len());
        Some(Polygon::assemble(
            record.id,
            vertices,
            edges,
            record.edge_properties.clone(),
            record.properties.clone(),
            Handle::new(self.store_id, key),
        ))
    }

    fn link(&mut self, reconciled: ReconciledPolygon) {
        let ReconciledPolygon {
            polygon,
            vertex_slots,
            edge_slots,
            ..
        } = reconciled;
        let store = self.store_id;
        let id = polygon.id();

        for (vertex, slot) in polygon.vertices().iter().zip(&vertex_slots) {
            if *slot == Slot::New {
                let key = self
                    .vertices
                    .insert_with_key(|key| vertex.detached().with_handle(Handle::new(store, key)));
                self.vertex_index.insert(vertex.id(), key);
            }
        }
        for (edge, slot) in polygon.edges().iter().zip(&edge_slots) {
            if *slot == Slot::New {
                let key = self
                    .edges
                    .insert_with_key(|key| edge.detached().with_handle(Handle::new(store, key)));
                self.edge_index.insert(edge.id(), key);
            }
        }

        let vertex_ids: Vec<VertexId> = polygon.vertex_ids().collect();
        let edge_ids: Vec<EdgeId> = polygon.edge_ids().collect();
        let n = vertex_ids.len();
        for i in 0..n {
            self.vertex_polygons.entry(vertex_ids[i]).or_default().insert(id);
            let incident = self.vertex_edges.entry(vertex_ids[i]).or_default();
            incident.insert(edge_ids[(i + n - 1) % n]);
            incident.insert(edge_ids[i]);
            self.edge_polygons.entry(edge_ids[i]).or_default().insert(id);
        }

        let (edge_properties, properties) = polygon.into_metadata();
        let key = self.polygons.insert(PolygonRecord {
            id,
            vertices: vertex_ids,
            edges: edge_ids,
            edge_properties,
            properties,
        });
        self.polygon_index.insert(id, key);
    }

    fn unlink(&mut self, id: PolygonId) -> bool {
        let Some(key) = self.polygon_index.remove(&id) else {
            return false;
        };
        let Some(record) = self.polygons.remove(key) else {
            return false;
        };

        for vertex in &record.vertices {
            let orphaned = self.vertex_polygons.get_mut(vertex).is_some_and(|polygons| {
                polygons.remove(&id);
                polygons.is_empty()
            });
            if orphaned {
                self.vertex_polygons.remove(vertex);
                if let Some(key) = self.vertex_index.remove(vertex) {
                    self.vertices.remove(key);
                }
            }
        }

        for edge in &record.edges {
            let orphaned = self.edge_polygons.get_mut(edge).is_some_and(|polygons| {
                polygons.remove(&id);
                polygons.is_empty()
            });
            if !orphaned {
                continue;
            }
            self.edge_polygons.remove(edge);
            let Some(key) = self.edge_index.remove(edge) else {
                continue;
            };
            let Some(removed) = self.edges.remove(key) else {
                continue;
            };
            for endpoint in removed.vertex_ids() {
                let emptied = self.vertex_edges.get_mut(&endpoint).is_some_and(|edges| {
                    edges.remove(edge);
                    edges.is_empty()
                });
                if emptied {
                    self.vertex_edges.remove(&endpoint);
                }
            }
        }
        true
    }

    fn clear_entities(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.polygons.clear();
        self.vertex_index.clear();
        self.edge_index.clear();
        self.polygon_index.clear();
        self.vertex_polygons.clear();
        self.vertex_edges.clear();
        self.edge_polygons.clear();
    }

    fn check_invariants(&self) {
        #[cfg(debug_assertions)]
        if let Err(e) = crate::operations::ValidateTopology::new().execute(self) {
            panic!("[invariants] {e}");
        }
    }
}

fn next_after(largest: Option<u32>) -> Option<u32> {
    largest.map_or(Some(1), |id| id.checked_add(1))
}

/// Copies the topology into a new store with its own identity and no listener.
impl Clone for TopologyStore {
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        copy.copy_from(self);
        copy
    }
}

/// Two stores are equal when they hold equal polygons.
impl PartialEq for TopologyStore {
    fn eq(&self, other: &Self) -> bool {
        self.polygons() == other.polygons()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::ValidateTopology;

    fn v(id: u32, x: f64, y: f64) -> Vertex {
        Vertex::new(VertexId(id), Point3::new(x, y, 0.0))
    }

    fn e(id: u32, a: u32, b: u32) -> Edge {
        Edge::new(EdgeId(id), VertexId(a), VertexId(b)).unwrap()
    }

    fn tri(id: u32, vs: [Vertex; 3], es: [Edge; 3]) -> Polygon {
        Polygon::new(PolygonId(id), vs.to_vec(), es.to_vec()).unwrap()
    }

    fn p1() -> Polygon {
        tri(
            1,
            [v(1, 0.0, 0.0), v(2, 1.0, 0.0), v(3, 0.0, 1.0)],
            [e(1, 1, 2), e(2, 2, 3), e(3, 3, 1)],
        )
    }

    fn p2() -> Polygon {
        tri(
            2,
            [v(2, 1.0, 0.0), v(4, 1.0, 1.0), v(3, 0.0, 1.0)],
            [e(4, 2, 4), e(5, 4, 3), e(2, 2, 3)],
        )
    }

    fn ids<T: Copy + Ord>(items: &[T]) -> BTreeSet<T> {
        items.iter().copied().collect()
    }

    #[test]
    fn shared_edge_scenario() {
        let mut store = TopologyStore::new();
        assert!(store.insert(p1()).is_inserted());
        assert_eq!(
            store.insert(p2()),
            InsertOutcome::Inserted(Reconciliation::Rewritten { vertices: 2, edges: 1 })
        );

        assert_eq!(store.vertex_count(), 4);
        assert_eq!(store.edge_count(), 5);
        assert_eq!(store.polygon_count(), 2);
        assert_eq!(store.polygon_ids_of_vertex(VertexId(2)), ids(&[PolygonId(1), PolygonId(2)]));
        assert_eq!(store.polygon_ids_of_vertex(VertexId(3)), ids(&[PolygonId(1), PolygonId(2)]));

        assert!(store.remove(PolygonId(1)));
        assert!(store.vertex(VertexId(1)).is_none());
        assert!(store.edge(EdgeId(1)).is_none());
        assert!(store.edge(EdgeId(3)).is_none());
        assert_eq!(store.polygon_ids_of_vertex(VertexId(2)), ids(&[PolygonId(2)]));
        assert_eq!(store.polygon_ids_of_vertex(VertexId(3)), ids(&[PolygonId(2)]));
        assert_eq!(store.polygon_ids_of_edge(EdgeId(2)), ids(&[PolygonId(2)]));
        ValidateTopology::new().execute(&store).unwrap();
    }

    #[test]
    fn duplicate_polygon_id_is_ignored() {
        let mut store = TopologyStore::new();
        assert!(store.insert(p1()).is_inserted());
        let again = tri(
            1,
            [v(7, 0.0, 0.0), v(8, 1.0, 0.0), v(9, 0.0, 1.0)],
            [e(7, 7, 8), e(8, 8, 9), e(9, 9, 7)],
        );
        assert_eq!(store.insert(again), InsertOutcome::DuplicateId);
        assert_eq!(store.vertex_count(), 3);
    }

    #[test]
    fn collision_leaves_store_unchanged() {
        let mut store = TopologyStore::new();
        assert!(store.insert(p1()).is_inserted());
        let before = store.clone();
        let bad = tri(
            2,
            [v(2, 1.0, 0.0), v(4, 1.0, 1.0), v(3, 9.0, 9.0)],
            [e(4, 2, 4), e(5, 4, 3), e(2, 2, 3)],
        );
        assert_eq!(
            store.insert(bad),
            InsertOutcome::Collision(Collision {
                part: PartId::Vertex(VertexId(3))
            })
        );
        assert_eq!(store, before);
        assert_eq!(store.vertex_count(), 3);
        assert!(store.edge(EdgeId(4)).is_none());
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut store = TopologyStore::new();
        assert!(!store.remove(PolygonId(42)));
        assert_eq!(store.remove_batch([PolygonId(1), PolygonId(2)]), 0);
    }

    #[test]
    fn queries_follow_adjacency() {
        let mut store = TopologyStore::new();
        store.insert(p1());
        store.insert(p2());

        let incident: Vec<EdgeId> = store
            .edges_of_vertex(VertexId(2))
            .iter()
            .map(Edge::id)
            .collect();
        assert_eq!(incident, vec![EdgeId(1), EdgeId(2), EdgeId(4)]);
        assert_eq!(store.edge_between(VertexId(3), VertexId(2)).map(|e| e.id()), Some(EdgeId(2)));
        assert!(store.edge_between(VertexId(1), VertexId(4)).is_none());
        assert!(store.edge_between(VertexId(1), VertexId(1)).is_none());
        assert_eq!(store.polygons_of_edge(EdgeId(2)).len(), 2);
        assert_eq!(store.polygons_of_vertex(VertexId(4)).len(), 1);
        assert!(store.polygons_of_vertex(VertexId(99)).is_empty());

        let within: Vec<PolygonId> = store
            .polygons_within([VertexId(2), VertexId(3), VertexId(4), VertexId(4)])
            .iter()
            .map(Polygon::id)
            .collect();
        assert_eq!(within, vec![PolygonId(2)]);
        assert_eq!(
            store
                .polygons_within([VertexId(1), VertexId(2), VertexId(3), VertexId(4)])
                .len(),
            2
        );
        assert!(store.polygons_within([VertexId(1), VertexId(2)]).is_empty());
    }

    #[test]
    fn next_ids_follow_the_maximum() {
        let mut store = TopologyStore::new();
        assert_eq!(store.next_polygon_id(), Some(PolygonId(1)));
        assert_eq!(store.next_vertex_id(), Some(VertexId(1)));
        assert_eq!(store.next_edge_id(), Some(EdgeId(1)));
        store.insert(p2());
        assert_eq!(store.next_polygon_id(), Some(PolygonId(3)));
        assert_eq!(store.next_vertex_id(), Some(VertexId(5)));
        assert_eq!(store.next_edge_id(), Some(EdgeId(6)));
    }

    #[test]
    fn next_ids_run_out_at_the_top_of_the_range() {
        let mut store = TopologyStore::new();
        let top = u32::MAX;
        let high = tri(
            top,
            [v(top, 0.0, 0.0), v(top - 1, 1.0, 0.0), v(top - 2, 0.0, 1.0)],
            [e(top, top, top - 1), e(top - 1, top - 1, top - 2), e(top - 2, top - 2, top)],
        );
        assert!(store.insert(high).is_inserted());
        assert_eq!(store.next_polygon_id(), None);
        assert_eq!(store.next_vertex_id(), None);
        assert_eq!(store.next_edge_id(), None);

        store.insert(p1());
        store.remove(PolygonId(top));
        assert_eq!(store.next_polygon_id(), Some(PolygonId(2)));
    }

    #[test]
    fn non_finite_positions_compare_by_bits() {
        let nan = |id| Vertex::new(VertexId(id), Point3::new(f64::NAN, 0.0, 0.0));
        let mut store = TopologyStore::new();
        let first = tri(
            1,
            [nan(1), v(2, 1.0, 0.0), v(3, 0.0, 1.0)],
            [e(1, 1, 2), e(2, 2, 3), e(3, 3, 1)],
        );
        assert!(store.insert(first).is_inserted());
        assert_eq!(nan(1), nan(1));

        let second = tri(
            2,
            [nan(1), v(3, 0.0, 1.0), v(4, -1.0, 0.0)],
            [e(3, 3, 1), e(4, 3, 4), e(5, 4, 1)],
        );
        assert_eq!(
            store.insert(second),
            InsertOutcome::Inserted(Reconciliation::Rewritten { vertices: 2, edges: 1 })
        );
        assert_eq!(store.vertex_count(), 4);

        let (tx, rx) = crossbeam_channel::unbounded();
        store.set_listener(tx);
        assert!(!store.move_vertex(VertexId(1), Point3::new(f64::NAN, 0.0, 0.0)));
        assert!(store.move_vertex(VertexId(2), Point3::new(f64::INFINITY, 0.0, 0.0)));
        assert!(!store.move_vertex(VertexId(2), Point3::new(f64::INFINITY, 0.0, 0.0)));
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn insert_all_notifies_once() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut store = TopologyStore::new();
        store.set_listener(tx);

        let outcomes = store.insert_all([p1(), p2(), p2()]);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_inserted());
        assert!(outcomes[1].is_inserted());
        assert_eq!(outcomes[2], InsertOutcome::DuplicateId);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![MeshEvent::Changed]);
        assert_eq!(store.polygon_count(), 2);

        assert!(store.insert_all([p1()]).iter().all(|o| !o.is_inserted()));
        assert_eq!(rx.try_iter().count(), 0);

        store.remove(PolygonId(1));
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn returned_values_are_copies() {
        let mut store = TopologyStore::new();
        store.insert(p1());
        let mut polygons = store.polygons();
        polygons.clear();
        let mut set = store.polygon_ids_of_vertex(VertexId(1));
        set.insert(PolygonId(77));
        assert_eq!(store.polygon_count(), 1);
        assert_eq!(store.polygon_ids_of_vertex(VertexId(1)), ids(&[PolygonId(1)]));
    }

    #[test]
    fn notifications_fire_once_per_mutation() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut store = TopologyStore::new();
        store.set_listener(tx);

        store.insert(p1());
        store.insert(p2());
        store.insert(p2());
        assert_eq!(rx.try_iter().count(), 2);

        assert_eq!(store.remove_batch([PolygonId(1), PolygonId(2), PolygonId(9)]), 2);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![MeshEvent::Changed]);
        assert!(store.is_empty());
        assert_eq!(store.vertex_count(), 0);
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn move_vertex_keeps_identity_and_emits_event() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut store = TopologyStore::new();
        store.insert(p1());
        store.set_listener(tx);
        let key = store.vertex_key(VertexId(2));

        assert!(store.move_vertex(VertexId(2), Point3::new(2.0, 0.0, 0.0)));
        assert!(!store.move_vertex(VertexId(2), Point3::new(2.0, 0.0, 0.0)));
        assert!(!store.move_vertex(VertexId(99), Point3::origin()));
        assert_eq!(store.vertex_key(VertexId(2)), key);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![MeshEvent::VertexMoved(VertexId(2))]);
        assert_eq!(
            store.polygon(PolygonId(1)).unwrap().vertices()[1].position(),
            Point3::new(2.0, 0.0, 0.0)
        );
    }

    #[test]
    fn copy_from_notifies_once_and_preserves_metadata() {
        let mut source = TopologyStore::new();
        source.insert(p1());
        source.insert(p2());
        let wall = BoundaryCondition::new(BoundaryConditionKind::Wall);
        assert!(source.set_fluid_condition(PolygonId(2), EdgeId(2), wall));
        assert!(!source.set_fluid_condition(PolygonId(2), EdgeId(1), wall));
        assert!(source.set_polygon_properties(PolygonId(1), PolygonProperties::new("fuel", 2)));

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut target = TopologyStore::new();
        target.set_listener(tx);
        target.copy_from(&source);

        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(target, source);
        let copied = target.polygon(PolygonId(2)).unwrap();
        assert_eq!(copied.edge_properties(EdgeId(2)).unwrap().fluid, wall);
        assert_eq!(target.polygon(PolygonId(1)).unwrap().properties().material_id, "fuel");
        assert_ne!(target.vertex_key(VertexId(2)), None);
        ValidateTopology::new().execute(&target).unwrap();
    }

    #[test]
    fn recreated_vertex_gets_new_key() {
        let mut store = TopologyStore::new();
        store.insert(p1());
        let old = store.vertex_key(VertexId(1));
        store.remove(PolygonId(1));
        store.insert(p1());
        assert_ne!(store.vertex_key(VertexId(1)), old);
    }

    #[test]
    fn values_from_another_store_are_copies_not_identities() {
        let mut a = TopologyStore::new();
        a.insert(p1());
        let mut b = TopologyStore::new();
        let moved = tri(
            1,
            [v(1, 5.0, 5.0), v(2, 1.0, 0.0), v(3, 0.0, 1.0)],
            [e(1, 1, 2), e(2, 2, 3), e(3, 3, 1)],
        );
        b.insert(moved);

        let from_a = a.polygon(PolygonId(1)).unwrap();
        let foreign = Polygon::new(
            PolygonId(5),
            from_a.vertices().to_vec(),
            from_a.edges().to_vec(),
        )
        .unwrap();
        assert_eq!(
            b.insert(foreign),
            InsertOutcome::Collision(Collision {
                part: PartId::Vertex(VertexId(1))
            })
        );
    }
}
