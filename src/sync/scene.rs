//! Headless presentation layer.
//!
//! [`Scene`] keeps one [`SceneNode`] per live visual so that the effect of
//! the update protocol can be observed without a renderer.

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::SlotMap;

use super::visual::{ContainerId, ControllerState, Geometry, Visual, VisualFactory};
use crate::error::{Result, SyncError};
use crate::topology::{MeshPart, PartId};

slotmap::new_key_type! {
    /// Identifies a node of a [`Scene`].
    pub struct NodeKey;
}

/// Presentation state of one visual.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub part: PartId,
    pub container: Option<ContainerId>,
    pub state: ControllerState,
    pub size: f32,
    pub scale: f32,
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Default)]
struct SceneInner {
    containers: SlotMap<ContainerId, String>,
    nodes: SlotMap<NodeKey, SceneNode>,
    updates: usize,
    teardowns: usize,
}

/// Thread-safe, clonable in-memory scene.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    inner: Arc<Mutex<SceneInner>>,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named container visuals can be attached under.
    pub fn add_container(&self, name: impl Into<String>) -> ContainerId {
        self.inner.lock().containers.insert(name.into())
    }

    #[must_use]
    pub fn container_name(&self, id: ContainerId) -> Option<String> {
        self.inner.lock().containers.get(id).cloned()
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the live node showing `part`, if any.
    #[must_use]
    pub fn node(&self, part: PartId) -> Option<SceneNode> {
        self.inner.lock().nodes.values().find(|n| n.part == part).cloned()
    }

    /// Returns every live node, ordered by part.
    #[must_use]
    pub fn nodes(&self) -> Vec<SceneNode> {
        let mut nodes: Vec<SceneNode> = self.inner.lock().nodes.values().cloned().collect();
        nodes.sort_by_key(|n| n.part);
        nodes
    }

    /// Returns the number of property updates applied so far.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.inner.lock().updates
    }

    /// Returns the number of nodes torn down so far.
    #[must_use]
    pub fn teardown_count(&self) -> usize {
        self.inner.lock().teardowns
    }

    fn with_node(&self, key: NodeKey, f: impl FnOnce(&mut SceneNode)) -> Result<()> {
        let mut inner = self.inner.lock();
        let node = inner
            .nodes
            .get_mut(key)
            .ok_or_else(|| SyncError::Visual(format!("scene node {key:?} is gone")))?;
        f(node);
        inner.updates += 1;
        Ok(())
    }
}

impl VisualFactory for Scene {
    fn create(&self, part: &MeshPart) -> Box<dyn Visual> {
        let key = self.inner.lock().nodes.insert(SceneNode {
            part: part.id(),
            container: None,
            state: ControllerState::None,
            size: 0.0,
            scale: 1.0,
            geometry: None,
        });
        Box::new(SceneVisual {
            scene: self.clone(),
            key,
        })
    }
}

struct SceneVisual {
    scene: Scene,
    key: NodeKey,
}

impl Visual for SceneVisual {
    fn attach(&mut self, container: ContainerId) -> Result<()> {
        if !self.scene.inner.lock().containers.contains_key(container) {
            return Err(SyncError::Visual(format!("unknown container {container:?}")).into());
        }
        self.scene.with_node(self.key, |n| n.container = Some(container))
    }

    fn set_state(&mut self, state: ControllerState) -> Result<()> {
        self.scene.with_node(self.key, |n| n.state = state)
    }

    fn set_size(&mut self, size: f32) -> Result<()> {
        self.scene.with_node(self.key, |n| n.size = size)
    }

    fn set_scale(&mut self, scale: f32, _inverse: f32) -> Result<()> {
        self.scene.with_node(self.key, |n| n.scale = scale)
    }

    fn set_geometry(&mut self, geometry: Geometry) -> Result<()> {
        self.scene.with_node(self.key, |n| n.geometry = Some(geometry))
    }

    fn teardown(&mut self) -> Result<()> {
        let mut inner = self.scene.inner.lock();
        let key = self.key;
        inner
            .nodes
            .remove(key)
            .ok_or_else(|| SyncError::Visual(format!("scene node {key:?} torn down twice")))?;
        inner.teardowns += 1;
        Ok(())
    }
}
