use std::sync::Arc;

use parking_lot::RwLock;

use crate::math::Point3;

use super::{
    Edge, EdgeId, InsertOutcome, MeshListener, Polygon, PolygonId, TopologyStore, Vertex, VertexId,
};

/// Thread-safe handle to a [`TopologyStore`].
///
/// Every call takes the store's single lock for its own duration only;
/// nothing here waits on a consumer. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    inner: Arc<RwLock<TopologyStore>>,
}

impl Mesh {
    /// Creates a handle to a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing store.
    #[must_use]
    pub fn from_store(store: TopologyStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Runs `f` with shared access to the store.
    pub fn read<R>(&self, f: impl FnOnce(&TopologyStore) -> R) -> R {
        f(&*self.inner.read())
    }

    /// Runs `f` with exclusive access to the store.
    pub fn write<R>(&self, f: impl FnOnce(&mut TopologyStore) -> R) -> R {
        f(&mut *self.inner.write())
    }

    /// See [`TopologyStore::insert`].
    pub fn insert(&self, polygon: Polygon) -> InsertOutcome {
        self.inner.write().insert(polygon)
    }

    /// See [`TopologyStore::insert_all`].
    pub fn insert_all<I>(&self, polygons: I) -> Vec<InsertOutcome>
    where
        I: IntoIterator<Item = Polygon>,
    {
        self.inner.write().insert_all(polygons)
    }

    /// See [`TopologyStore::remove`].
    pub fn remove(&self, id: PolygonId) -> bool {
        self.inner.write().remove(id)
    }

    /// See [`TopologyStore::remove_batch`].
    pub fn remove_batch<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = PolygonId>,
    {
        self.inner.write().remove_batch(ids)
    }

    /// See [`TopologyStore::move_vertex`].
    pub fn move_vertex(&self, id: VertexId, position: Point3) -> bool {
        self.inner.write().move_vertex(id, position)
    }

    /// See [`TopologyStore::polygons`].
    #[must_use]
    pub fn polygons(&self) -> Vec<Polygon> {
        self.inner.read().polygons()
    }

    /// See [`TopologyStore::polygon`].
    #[must_use]
    pub fn polygon(&self, id: PolygonId) -> Option<Polygon> {
        self.inner.read().polygon(id)
    }

    /// See [`TopologyStore::vertex`].
    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<Vertex> {
        self.inner.read().vertex(id)
    }

    /// See [`TopologyStore::edge`].
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<Edge> {
        self.inner.read().edge(id)
    }

    /// Installs the store's change listener, replacing any previous one.
    pub fn set_listener(&self, listener: MeshListener) {
        self.inner.write().set_listener(listener);
    }

    /// Removes the store's change listener.
    pub fn clear_listener(&self) -> Option<MeshListener> {
        self.inner.write().clear_listener()
    }

    /// Returns an independent copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> TopologyStore {
        self.inner.read().clone()
    }

    /// Returns `true` if both handles share one store.
    #[must_use]
    pub fn same_store(&self, other: &Mesh) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<TopologyStore> for Mesh {
    fn from(store: TopologyStore) -> Self {
        Self::from_store(store)
    }
}
