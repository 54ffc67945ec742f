use super::vertex::VertexId;

/// Notification emitted by a topology store to its listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshEvent {
    /// The polygon set, or polygon metadata, changed.
    Changed,
    /// A vertex moved in place; the topology is unchanged.
    VertexMoved(VertexId),
}

/// Sending half of a store listener.
pub type MeshListener = crossbeam_channel::Sender<MeshEvent>;
