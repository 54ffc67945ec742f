//! Property-based checks of the topology store's adjacency bookkeeping.
//!
//! Polygons are triangles cut from a 4x4 vertex grid, so neighbouring
//! triangles share vertices and edges. Every insert builds fresh copies of
//! its parts, which exercises reconciliation on each shared part. After
//! every step the stored indices are compared with a brute-force
//! recomputation from the polygon list.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet};

use meshsync::math::Point3;
use meshsync::operations::{Reconciliation, ValidateTopology};
use meshsync::topology::{
    Edge, EdgeId, InsertOutcome, Polygon, PolygonId, TopologyStore, Vertex, VertexId,
};
use proptest::prelude::*;

const SIDE: u32 = 4;
const TRIANGLES: u32 = (SIDE - 1) * (SIDE - 1) * 2;

fn vertex(row: u32, col: u32) -> Vertex {
    Vertex::new(
        VertexId(row * SIDE + col + 1),
        Point3::new(f64::from(col), f64::from(row), 0.0),
    )
}

fn edge(a: &Vertex, b: &Vertex) -> Edge {
    let (lo, hi) = if a.id() < b.id() { (a.id(), b.id()) } else { (b.id(), a.id()) };
    Edge::new(EdgeId(lo.0 * 100 + hi.0), lo, hi).unwrap()
}

fn triangle(index: u32) -> Polygon {
    let cell = index / 2;
    let (row, col) = (cell / (SIDE - 1), cell % (SIDE - 1));
    let corners = if index % 2 == 0 {
        [vertex(row, col), vertex(row, col + 1), vertex(row + 1, col + 1)]
    } else {
        [vertex(row, col), vertex(row + 1, col + 1), vertex(row + 1, col)]
    };
    let edges = (0..3).map(|i| edge(&corners[i], &corners[(i + 1) % 3])).collect();
    Polygon::new(PolygonId(index + 1), corners.to_vec(), edges).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Insert(u32),
    Remove(u32),
    RemoveBatch(Vec<u32>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..TRIANGLES).prop_map(Op::Insert),
        2 => (0..TRIANGLES).prop_map(Op::Remove),
        1 => prop::collection::vec(0..TRIANGLES, 0..4).prop_map(Op::RemoveBatch),
    ]
}

fn assert_matches_brute_force(store: &TopologyStore, expected: &BTreeSet<u32>) {
    ValidateTopology::new().execute(store).unwrap();

    let polygons = store.polygons();
    let ids: BTreeSet<PolygonId> = polygons.iter().map(Polygon::id).collect();
    let want: BTreeSet<PolygonId> = expected.iter().map(|i| PolygonId(i + 1)).collect();
    assert_eq!(ids, want);

    let mut vertex_polygons: BTreeMap<VertexId, BTreeSet<PolygonId>> = BTreeMap::new();
    let mut vertex_edges: BTreeMap<VertexId, BTreeSet<EdgeId>> = BTreeMap::new();
    let mut edge_polygons: BTreeMap<EdgeId, BTreeSet<PolygonId>> = BTreeMap::new();
    for polygon in &polygons {
        for v in polygon.vertex_ids() {
            vertex_polygons.entry(v).or_default().insert(polygon.id());
        }
        for e in polygon.edges() {
            edge_polygons.entry(e.id()).or_default().insert(polygon.id());
            for v in e.vertex_ids() {
                vertex_edges.entry(v).or_default().insert(e.id());
            }
        }
    }

    assert_eq!(store.vertex_count(), vertex_polygons.len());
    assert_eq!(store.edge_count(), edge_polygons.len());
    for (v, polygons) in &vertex_polygons {
        assert_eq!(&store.polygon_ids_of_vertex(*v), polygons);
        assert_eq!(&store.edge_ids_of_vertex(*v), &vertex_edges[v]);
    }
    for (e, polygons) in &edge_polygons {
        assert_eq!(&store.polygon_ids_of_edge(*e), polygons);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn adjacency_survives_any_edit_sequence(ops in prop::collection::vec(op(), 1..40)) {
        let mut store = TopologyStore::new();
        let mut expected = BTreeSet::new();
        for op in ops {
            match op {
                Op::Insert(i) => {
                    let inserted = store.insert(triangle(i)).is_inserted();
                    prop_assert_eq!(inserted, expected.insert(i));
                }
                Op::Remove(i) => {
                    prop_assert_eq!(store.remove(PolygonId(i + 1)), expected.remove(&i));
                }
                Op::RemoveBatch(batch) => {
                    let removed = store.remove_batch(batch.iter().map(|i| PolygonId(i + 1)));
                    let present = batch
                        .iter()
                        .collect::<BTreeSet<_>>()
                        .into_iter()
                        .filter(|i| expected.remove(*i))
                        .count();
                    prop_assert_eq!(removed, present);
                }
            }
            assert_matches_brute_force(&store, &expected);
        }
    }

    #[test]
    fn insertion_order_does_not_change_the_result(
        order in Just((0..TRIANGLES).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let mut forward = TopologyStore::new();
        for i in 0..TRIANGLES {
            forward.insert(triangle(i));
        }
        let mut shuffled = TopologyStore::new();
        for i in order {
            shuffled.insert(triangle(i));
        }
        prop_assert_eq!(forward.vertex_count(), shuffled.vertex_count());
        prop_assert_eq!(forward.edge_count(), shuffled.edge_count());
        prop_assert!(forward == shuffled);
    }
}

#[test]
fn full_grid_has_expected_counts() {
    let mut store = TopologyStore::new();
    for i in 0..TRIANGLES {
        assert!(store.insert(triangle(i)).is_inserted());
    }
    let cells = (SIDE - 1) * (SIDE - 1);
    let edges = 2 * SIDE * (SIDE - 1) + cells;
    assert_eq!(store.vertex_count(), (SIDE * SIDE) as usize);
    assert_eq!(store.edge_count(), edges as usize);
    assert_matches_brute_force(&store, &(0..TRIANGLES).collect());
}

/// Rebuilds `polygon` from the store's own vertices and edges wherever the
/// store already holds them.
fn with_canonical_parts(store: &TopologyStore, polygon: &Polygon) -> Polygon {
    let vertices = polygon
        .vertices()
        .iter()
        .map(|v| store.vertex(v.id()).unwrap_or_else(|| v.clone()))
        .collect();
    let edges = polygon
        .edges()
        .iter()
        .map(|e| store.edge(e.id()).unwrap_or_else(|| e.clone()))
        .collect();
    Polygon::new(polygon.id(), vertices, edges).unwrap()
}

#[test]
fn canonical_and_fresh_parts_give_identical_stores() {
    let mut canonical = TopologyStore::new();
    let mut fresh = TopologyStore::new();
    let mut rewrites = 0;
    for i in 0..TRIANGLES {
        let reused = with_canonical_parts(&canonical, &triangle(i));
        match canonical.insert(reused) {
            InsertOutcome::Inserted(Reconciliation::Fresh | Reconciliation::Shared) => {}
            other => panic!("triangle {i}: unexpected outcome {other:?}"),
        }
        match fresh.insert(triangle(i)) {
            InsertOutcome::Inserted(Reconciliation::Rewritten { .. }) => rewrites += 1,
            InsertOutcome::Inserted(_) => {}
            other => panic!("triangle {i}: unexpected outcome {other:?}"),
        }
    }
    assert!(rewrites > 0);

    assert!(canonical == fresh);
    assert_eq!(canonical.vertex_count(), fresh.vertex_count());
    assert_eq!(canonical.edge_count(), fresh.edge_count());

    let vertex_ids: Vec<VertexId> = canonical.vertices().iter().map(Vertex::id).collect();
    for v in &vertex_ids {
        assert_eq!(canonical.polygon_ids_of_vertex(*v), fresh.polygon_ids_of_vertex(*v));
        assert_eq!(canonical.edge_ids_of_vertex(*v), fresh.edge_ids_of_vertex(*v));
        for w in &vertex_ids {
            assert_eq!(canonical.edge_between(*v, *w), fresh.edge_between(*v, *w));
        }
    }
    for e in canonical.edges() {
        assert_eq!(canonical.polygon_ids_of_edge(e.id()), fresh.polygon_ids_of_edge(e.id()));
    }
    for rows in 1..=SIDE {
        let selection: Vec<VertexId> = (0..rows * SIDE).map(|i| VertexId(i + 1)).collect();
        assert_eq!(
            canonical.polygons_within(selection.iter().copied()),
            fresh.polygons_within(selection)
        );
    }
    assert_matches_brute_force(&canonical, &(0..TRIANGLES).collect());
}
