use std::time::Duration;

use crate::sync::ContainerId;

/// Parameters controlling the background update pump.
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// How long to keep collecting mesh events after the first one of a burst.
    pub coalesce_window: Duration,
    /// Upper bound on a single wait; the worker re-checks its control channel at least this often.
    pub idle_timeout: Duration,
    /// Name given to the worker thread.
    pub thread_name: String,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            coalesce_window: Duration::from_millis(16),
            idle_timeout: Duration::from_millis(250),
            thread_name: "mesh-update-pump".into(),
        }
    }
}

/// Parameters applied to every controller created by a [`MeshView`](crate::sync::MeshView).
#[derive(Debug, Clone, Copy)]
pub struct ViewConfig {
    /// Display size of vertex visuals.
    pub vertex_size: f32,
    /// Display size of edge visuals.
    pub edge_size: f32,
    /// Global display scale.
    pub scale: f32,
    /// Container that vertex visuals are attached to.
    pub vertex_container: Option<ContainerId>,
    /// Container that edge visuals are attached to.
    pub edge_container: Option<ContainerId>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            vertex_size: 1.0,
            edge_size: 1.0,
            scale: 1.0,
            vertex_container: None,
            edge_container: None,
        }
    }
}
