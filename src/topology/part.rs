use super::edge::{Edge, EdgeId};
use super::polygon::{Polygon, PolygonId};
use super::vertex::{Vertex, VertexId};

/// Identifier of any mesh part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartId {
    Vertex(VertexId),
    Edge(EdgeId),
    Polygon(PolygonId),
}

/// A mesh part of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshPart {
    Vertex(Vertex),
    Edge(Edge),
    Polygon(Polygon),
}

impl MeshPart {
    /// Returns the identifier of the wrapped part.
    #[must_use]
    pub fn id(&self) -> PartId {
        match self {
            Self::Vertex(v) => PartId::Vertex(v.id()),
            Self::Edge(e) => PartId::Edge(e.id()),
            Self::Polygon(p) => PartId::Polygon(p.id()),
        }
    }

    /// Returns a lowercase name for the part kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Vertex(_) => "vertex",
            Self::Edge(_) => "edge",
            Self::Polygon(_) => "polygon",
        }
    }
}

impl From<Vertex> for MeshPart {
    fn from(v: Vertex) -> Self {
        Self::Vertex(v)
    }
}

impl From<Edge> for MeshPart {
    fn from(e: Edge) -> Self {
        Self::Edge(e)
    }
}

impl From<Polygon> for MeshPart {
    fn from(p: Polygon) -> Self {
        Self::Polygon(p)
    }
}
