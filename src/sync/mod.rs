pub mod controller;
pub mod property;
pub mod pump;
pub mod queue;
pub mod scene;
pub mod view;
pub mod visual;

pub use controller::{Controller, Subject};
pub use property::{Property, PropertySet};
pub use pump::UpdatePump;
pub use queue::UpdateQueue;
pub use scene::{NodeKey, Scene, SceneNode};
pub use view::{MeshView, PolygonSnapshot, SyncReport};
pub use visual::{ContainerId, ControllerState, Geometry, Visual, VisualFactory};
