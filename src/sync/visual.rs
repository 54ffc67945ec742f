use crate::error::Result;
use crate::math::Point3;
use crate::topology::MeshPart;

slotmap::new_key_type! {
    /// Identifies a presentation container that visuals attach under.
    pub struct ContainerId;
}

/// Selection state shown by a controller's visual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Plain display.
    #[default]
    None,
    /// Highlighted as selected.
    Selected,
    /// Transient preview, e.g. while dragging.
    Temporary,
}

/// Geometry a visual is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// A vertex at a point.
    Point(Point3),
    /// An edge between two points.
    Segment(Point3, Point3),
}

/// Presentation-side object mirroring one controller.
///
/// Every method is invoked on the consumer thread only, from
/// [`Controller::drain`](super::Controller::drain).
pub trait Visual: Send {
    /// Attaches the visual under `container`.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown to the presentation layer.
    fn attach(&mut self, container: ContainerId) -> Result<()>;

    /// Shows `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if the presentation layer rejects the update.
    fn set_state(&mut self, state: ControllerState) -> Result<()>;

    /// Resizes the visual.
    ///
    /// # Errors
    ///
    /// Returns an error if the presentation layer rejects the update.
    fn set_size(&mut self, size: f32) -> Result<()>;

    /// Rescales the visual. `inverse` is `1 / scale`.
    ///
    /// # Errors
    ///
    /// Returns an error if the presentation layer rejects the update.
    fn set_scale(&mut self, scale: f32, inverse: f32) -> Result<()>;

    /// Moves the visual to `geometry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the presentation layer rejects the update.
    fn set_geometry(&mut self, geometry: Geometry) -> Result<()>;

    /// Releases the visual. Called at most once.
    ///
    /// # Errors
    ///
    /// Returns an error if the presentation layer fails to release it.
    fn teardown(&mut self) -> Result<()>;
}

/// Builds visuals for mesh parts.
pub trait VisualFactory: Send + Sync {
    /// Creates the visual for `part`. Invoked on the consumer thread.
    fn create(&self, part: &MeshPart) -> Box<dyn Visual>;
}
