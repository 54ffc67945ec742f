use std::collections::{BTreeMap, BTreeSet};

use crate::error::TopologyError;
use crate::topology::polygon::check_cycle;
use crate::topology::{EdgeId, PolygonId, TopologyStore, VertexId};

type Incidence<K, V> = BTreeMap<K, BTreeSet<V>>;

/// Checks every topology invariant of a store against a brute-force
/// recomputation from its polygon list.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidateTopology;

impl ValidateTopology {
    /// Creates a new `ValidateTopology` query.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the validation.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::InvariantViolated`] describing the first mismatch found.
    pub fn execute(&self, store: &TopologyStore) -> Result<(), TopologyError> {
        let mut vertex_polygons: Incidence<VertexId, PolygonId> = BTreeMap::new();
        let mut vertex_edges: Incidence<VertexId, EdgeId> = BTreeMap::new();
        let mut edge_polygons: Incidence<EdgeId, PolygonId> = BTreeMap::new();

        let mut records = 0;
        for (id, record) in store.records() {
            records += 1;
            if record.id != id {
                return Err(violated(format!(
                    "polygon index entry {id} points at polygon {}",
                    record.id
                )));
            }

            let mut vertices = Vec::with_capacity(record.vertices.len());
            for vid in &record.vertices {
                let (_, vertex) = store
                    .canonical_vertex(*vid)
                    .ok_or_else(|| {
                        violated(format!("polygon {id} references missing vertex {vid}"))
                    })?;
                vertices.push(vertex.clone());
            }
            let mut edges = Vec::with_capacity(record.edges.len());
            for eid in &record.edges {
                let (_, edge) = store
                    .canonical_edge(*eid)
                    .ok_or_else(|| {
                        violated(format!("polygon {id} references missing edge {eid}"))
                    })?;
                edges.push(edge.clone());
            }
            check_cycle(&vertices, &edges).map_err(|e| violated(format!("polygon {id}: {e}")))?;

            let n = record.vertices.len();
            for i in 0..n {
                let vid = record.vertices[i];
                vertex_polygons.entry(vid).or_default().insert(id);
                let incident = vertex_edges.entry(vid).or_default();
                incident.insert(record.edges[(i + n - 1) % n]);
                incident.insert(record.edges[i]);
                edge_polygons.entry(record.edges[i]).or_default().insert(id);
            }
        }

        if records != store.polygon_count() {
            return Err(violated(format!(
                "{} polygons indexed but {records} reachable",
                store.polygon_count()
            )));
        }
        compare("vertex→polygon", &vertex_polygons, store.vertex_polygon_index())?;
        compare("vertex→edge", &vertex_edges, store.vertex_edge_index())?;
        compare("edge→polygon", &edge_polygons, store.edge_polygon_index())?;

        let used_vertices: BTreeSet<VertexId> = vertex_polygons.keys().copied().collect();
        let stored_vertices: BTreeSet<VertexId> = store.vertex_ids().collect();
        if used_vertices != stored_vertices {
            return Err(violated(format!(
                "stored vertices {stored_vertices:?} differ from used vertices {used_vertices:?}"
            )));
        }
        let used_edges: BTreeSet<EdgeId> = edge_polygons.keys().copied().collect();
        let stored_edges: BTreeSet<EdgeId> = store.edge_ids().collect();
        if used_edges != stored_edges {
            return Err(violated(format!(
                "stored edges {stored_edges:?} differ from used edges {used_edges:?}"
            )));
        }
        if !store.arenas_match_indices() {
            return Err(violated("arena contents do not match the identifier indices".into()));
        }
        Ok(())
    }
}

fn compare<K, V>(
    label: &str,
    expected: &Incidence<K, V>,
    actual: &Incidence<K, V>,
) -> Result<(), TopologyError>
where
    K: Ord + std::fmt::Debug,
    V: Ord + std::fmt::Debug,
{
    if let Some((key, _)) = actual.iter().find(|(_, set)| set.is_empty()) {
        return Err(violated(format!("{label} index holds an empty set for {key:?}")));
    }
    if expected != actual {
        return Err(violated(format!("{label} index is {actual:?}, expected {expected:?}")));
    }
    Ok(())
}

fn violated(message: String) -> TopologyError {
    TopologyError::InvariantViolated(message)
}
