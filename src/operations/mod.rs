pub mod reconcile;
pub mod validate;

pub use reconcile::{
    is_canonical_vertex, Collision, ReconcilePolygon, ReconciledPolygon, Reconciliation,
};
pub(crate) use reconcile::Slot;
pub use validate::ValidateTopology;
