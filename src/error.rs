use thiserror::Error;

use crate::topology::{EdgeId, VertexId};

/// Top-level error type for the mesh synchronization engine.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Errors related to mesh topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("polygon needs at least 3 vertices and 3 edges, got {vertices} vertices and {edges} edges")]
    TooFewSides { vertices: usize, edges: usize },

    #[error("polygon has {vertices} vertices but {edges} edges")]
    SideCountMismatch { vertices: usize, edges: usize },

    #[error("edge {0} connects a vertex to itself")]
    DegenerateEdge(EdgeId),

    #[error("adjacent vertices at position {position} share id {id}")]
    RepeatedAdjacentVertex { position: usize, id: VertexId },

    #[error("edge {edge} at position {position} does not connect vertices {first} and {second}")]
    BrokenCycle {
        position: usize,
        edge: EdgeId,
        first: VertexId,
        second: VertexId,
    },

    #[error("vertex {0} is used more than once in the polygon")]
    DuplicateVertex(VertexId),

    #[error("edge {0} is used more than once in the polygon")]
    DuplicateEdge(EdgeId),

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("topology invariant violated: {0}")]
    InvariantViolated(String),
}

/// Errors related to the controller and update protocol.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0} parts cannot be wrapped by a controller")]
    UnsupportedPart(&'static str),

    #[error("update pump {0}")]
    PumpState(&'static str),

    #[error("failed to spawn update pump thread")]
    Spawn(#[source] std::io::Error),

    #[error("update pump thread panicked")]
    PumpPanicked,

    #[error("visual update failed: {0}")]
    Visual(String),
}

/// Convenience type alias for results using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;
