pub mod config;
pub mod error;
pub mod math;
pub mod operations;
pub mod sync;
pub mod topology;

pub use config::{PumpConfig, ViewConfig};
pub use error::{MeshError, Result, SyncError, TopologyError};
pub use topology::{InsertOutcome, Mesh, MeshEvent, TopologyStore};
