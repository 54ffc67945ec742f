use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use super::controller::{edge_geometry, Controller, Subject};
use super::queue::UpdateQueue;
use super::visual::{Geometry, VisualFactory};
use crate::config::ViewConfig;
use crate::topology::{
    Edge, EdgeId, EdgeKey, MeshPart, Polygon, PolygonId, PolygonKey, TopologyStore, Vertex,
    VertexId, VertexKey,
};

/// What a [`MeshView`] remembers about a displayed polygon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolygonSnapshot {
    pub key: Option<PolygonKey>,
    pub vertices: Vec<(VertexId, Option<VertexKey>)>,
    pub edges: Vec<(EdgeId, Option<EdgeKey>)>,
}

impl PolygonSnapshot {
    #[must_use]
    pub fn of(polygon: &Polygon) -> Self {
        Self {
            key: polygon.key(),
            vertices: polygon.vertices().iter().map(|v| (v.id(), v.key())).collect(),
            edges: polygon.edges().iter().map(|e| (e.id(), e.key())).collect(),
        }
    }
}

/// Outcome of one [`MeshView::sync`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub polygons_added: usize,
    pub polygons_changed: usize,
    pub polygons_removed: usize,
    pub controllers_created: usize,
    pub controllers_disposed: usize,
}

impl SyncReport {
    /// Returns `true` if the pass changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Presentation-side mirror of a topology store.
///
/// Holds one [`Controller`] per displayed vertex and edge and brings that
/// set in line with the store on every [`sync`](Self::sync). Owned by a
/// single thread; controllers it creates are drained through its queue.
pub struct MeshView {
    displayed: BTreeMap<PolygonId, PolygonSnapshot>,
    vertices: BTreeMap<VertexId, Arc<Controller>>,
    edges: BTreeMap<EdgeId, Arc<Controller>>,
    queue: UpdateQueue,
    factory: Arc<dyn VisualFactory>,
    config: ViewConfig,
}

impl MeshView {
    #[must_use]
    pub fn new(queue: UpdateQueue, factory: Arc<dyn VisualFactory>, config: ViewConfig) -> Self {
        Self {
            displayed: BTreeMap::new(),
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            queue,
            factory,
            config,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn queue(&self) -> &UpdateQueue {
        &self.queue
    }

    #[must_use]
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    #[must_use]
    pub fn displayed_count(&self) -> usize {
        self.displayed.len()
    }

    #[must_use]
    pub fn is_displayed(&self, id: PolygonId) -> bool {
        self.displayed.contains_key(&id)
    }

    #[must_use]
    pub fn snapshot(&self, id: PolygonId) -> Option<&PolygonSnapshot> {
        self.displayed.get(&id)
    }

    #[must_use]
    pub fn vertex_controller(&self, id: VertexId) -> Option<Arc<Controller>> {
        self.vertices.get(&id).cloned()
    }

    #[must_use]
    pub fn edge_controller(&self, id: EdgeId) -> Option<Arc<Controller>> {
        self.edges.get(&id).cloned()
    }

    /// Returns the number of live controllers.
    #[must_use]
    pub fn controller_count(&self) -> usize {
        self.vertices.len() + self.edges.len()
    }

    // --- Delta ---

    /// Brings the controller set in line with `store`.
    ///
    /// Stale and orphaned controllers are disposed before any controller is
    /// created, so a vertex shared between a removed polygon and a new one
    /// is never disposed after being recreated.
    pub fn sync(&mut self, store: &TopologyStore) -> SyncReport {
        let mut report = SyncReport::default();
        let current: BTreeMap<PolygonId, Polygon> =
            store.polygons().into_iter().map(|p| (p.id(), p)).collect();

        let mut fresh: Vec<&Polygon> = Vec::new();
        let mut changed: Vec<&Polygon> = Vec::new();
        for (id, polygon) in &current {
            match self.displayed.get(id) {
                None => fresh.push(polygon),
                Some(shown) if *shown != PolygonSnapshot::of(polygon) => changed.push(polygon),
                Some(_) => {}
            }
        }

        for polygon in &changed {
            if let Some(shown) = self.displayed.remove(&polygon.id()) {
                report.controllers_disposed += self.retire(store, &shown);
            }
        }
        report.polygons_changed = changed.len();

        let removed: Vec<PolygonId> = self
            .displayed
            .keys()
            .filter(|id| !current.contains_key(*id))
            .copied()
            .collect();
        for id in &removed {
            if let Some(shown) = self.displayed.remove(id) {
                report.controllers_disposed += self.retire(store, &shown);
            }
        }
        report.polygons_removed = removed.len();

        report.polygons_added = fresh.len();
        for polygon in fresh.into_iter().chain(changed) {
            for vertex in polygon.vertices() {
                report.controllers_created += usize::from(self.ensure_vertex(store, vertex));
            }
            for edge in polygon.edges() {
                report.controllers_created += usize::from(self.ensure_edge(store, edge));
            }
            self.displayed.insert(polygon.id(), PolygonSnapshot::of(polygon));
        }

        if !report.is_empty() {
            debug!(
                added = report.polygons_added,
                changed = report.polygons_changed,
                removed = report.polygons_removed,
                created = report.controllers_created,
                disposed = report.controllers_disposed,
                "view synchronized"
            );
        }
        report
    }

    /// Pushes new positions of moved vertices, and of their incident edges,
    /// to the matching controllers. Returns the number of controllers touched.
    pub fn apply_moves<I>(&self, store: &TopologyStore, ids: I) -> usize
    where
        I: IntoIterator<Item = VertexId>,
    {
        let mut touched = 0;
        let mut edges = BTreeSet::new();
        for id in ids {
            if let (Some(controller), Some(vertex)) = (self.vertices.get(&id), store.vertex(id)) {
                controller.set_position(vertex.position());
                touched += 1;
            }
            edges.extend(store.edge_ids_of_vertex(id));
        }
        for id in edges {
            let (Some(controller), Some(edge)) = (self.edges.get(&id), store.edge(id)) else {
                continue;
            };
            match edge_geometry(store, &edge) {
                Ok(Geometry::Segment(start, end)) => {
                    controller.set_endpoints(start, end);
                    touched += 1;
                }
                Ok(Geometry::Point(_)) => {}
                Err(e) => error!(edge = %id, error = %e, "cannot place moved edge"),
            }
        }
        touched
    }

    /// Sets the global scale on every controller. Non-positive values are ignored.
    pub fn set_scale(&mut self, scale: f32) {
        if scale <= 0.0 {
            return;
        }
        self.config.scale = scale;
        for controller in self.vertices.values().chain(self.edges.values()) {
            controller.set_scale(scale);
        }
    }

    /// Sets the size of every vertex visual. Non-positive values are ignored.
    pub fn set_vertex_size(&mut self, size: f32) {
        if size <= 0.0 {
            return;
        }
        self.config.vertex_size = size;
        for controller in self.vertices.values() {
            controller.set_size(size);
        }
    }

    /// Sets the size of every edge visual. Non-positive values are ignored.
    pub fn set_edge_size(&mut self, size: f32) {
        if size <= 0.0 {
            return;
        }
        self.config.edge_size = size;
        for controller in self.edges.values() {
            controller.set_size(size);
        }
    }

    /// Disposes every controller and forgets every displayed polygon.
    /// Returns the number of controllers disposed.
    pub fn clear(&mut self) -> usize {
        let disposed = self.controller_count();
        for controller in self.vertices.values().chain(self.edges.values()) {
            controller.dispose();
        }
        self.vertices.clear();
        self.edges.clear();
        self.displayed.clear();
        if disposed > 0 {
            debug!(disposed, "view cleared");
        }
        disposed
    }

    // --- Helpers ---

    /// Disposes the controllers of `shown` whose entity is gone from
    /// `store` or was replaced by a different one.
    fn retire(&mut self, store: &TopologyStore, shown: &PolygonSnapshot) -> usize {
        let mut disposed = 0;
        for (id, _) in &shown.vertices {
            let live = store.vertex_key(*id);
            if let Some(controller) = self.vertices.get(id) {
                let current = matches!(
                    controller.subject(),
                    Subject::Vertex { key, .. } if key.is_some() && key == live
                );
                if !current {
                    controller.dispose();
                    self.vertices.remove(id);
                    disposed += 1;
                }
            }
        }
        for (id, _) in &shown.edges {
            let live = store.edge_key(*id);
            if let Some(controller) = self.edges.get(id) {
                let current = matches!(
                    controller.subject(),
                    Subject::Edge { key, .. } if key.is_some() && key == live
                );
                if !current {
                    controller.dispose();
                    self.edges.remove(id);
                    disposed += 1;
                }
            }
        }
        disposed
    }

    /// Creates the controller for `vertex` unless a current one exists.
    fn ensure_vertex(&mut self, store: &TopologyStore, vertex: &Vertex) -> bool {
        if let Some(existing) = self.vertices.get(&vertex.id()) {
            if matches!(existing.subject(), Subject::Vertex { key, .. } if key == vertex.key()) {
                return false;
            }
            existing.dispose();
        }
        let part = MeshPart::Vertex(vertex.clone());
        match Controller::create(&part, store, &self.queue, Arc::clone(&self.factory)) {
            Ok(controller) => {
                if let Some(container) = self.config.vertex_container {
                    controller.set_parent(container);
                }
                controller.set_size(self.config.vertex_size);
                controller.set_scale(self.config.scale);
                self.vertices.insert(vertex.id(), controller);
                true
            }
            Err(e) => {
                self.vertices.remove(&vertex.id());
                error!(vertex = %vertex.id(), error = %e, "cannot create vertex controller");
                false
            }
        }
    }

    /// Creates the controller for `edge` unless a current one exists.
    fn ensure_edge(&mut self, store: &TopologyStore, edge: &Edge) -> bool {
        if let Some(existing) = self.edges.get(&edge.id()) {
            if matches!(existing.subject(), Subject::Edge { key, .. } if key == edge.key()) {
                return false;
            }
            existing.dispose();
        }
        let part = MeshPart::Edge(edge.clone());
        match Controller::create(&part, store, &self.queue, Arc::clone(&self.factory)) {
            Ok(controller) => {
                if let Some(container) = self.config.edge_container {
                    controller.set_parent(container);
                }
                controller.set_size(self.config.edge_size);
                controller.set_scale(self.config.scale);
                self.edges.insert(edge.id(), controller);
                true
            }
            Err(e) => {
                self.edges.remove(&edge.id());
                error!(edge = %edge.id(), error = %e, "cannot create edge controller");
                false
            }
        }
    }
}

impl fmt::Debug for MeshView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshView")
            .field("displayed", &self.displayed.len())
            .field("vertices", &self.vertices.len())
            .field("edges", &self.edges.len())
            .field("queue", &self.queue)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
