use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use super::property::{DirtySet, Property, PropertySet};
use super::queue::{QueueLink, UpdateQueue};
use super::visual::{ContainerId, ControllerState, Geometry, Visual, VisualFactory};
use crate::error::{Result, SyncError, TopologyError};
use crate::math::Point3;
use crate::topology::{Edge, EdgeId, EdgeKey, MeshPart, PartId, TopologyStore, VertexId, VertexKey};

/// The model entity a controller wraps.
///
/// `key` is the entity's arena key in the store it was read from; a vertex
/// or edge recreated under the same identifier gets a different key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    Vertex { id: VertexId, key: Option<VertexKey> },
    Edge { id: EdgeId, key: Option<EdgeKey> },
}

impl Subject {
    #[must_use]
    pub fn part_id(self) -> PartId {
        match self {
            Self::Vertex { id, .. } => PartId::Vertex(id),
            Self::Edge { id, .. } => PartId::Edge(id),
        }
    }

    /// Returns `true` if a controller of this subject has `property`.
    #[must_use]
    pub fn carries(self, property: Property) -> bool {
        match property {
            Property::Position => matches!(self, Self::Vertex { .. }),
            Property::Endpoints => matches!(self, Self::Edge { .. }),
            _ => true,
        }
    }

    /// Returns every property of this subject.
    #[must_use]
    pub fn properties(self) -> PropertySet {
        Property::ALL.into_iter().filter(|p| self.carries(*p)).collect()
    }

    fn geometry_property(self) -> Property {
        match self {
            Self::Vertex { .. } => Property::Position,
            Self::Edge { .. } => Property::Endpoints,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex { id, .. } => write!(f, "vertex {id}"),
            Self::Edge { id, .. } => write!(f, "edge {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Values {
    state: ControllerState,
    parent: Option<ContainerId>,
    size: f32,
    scale: f32,
    inverse_scale: f32,
    geometry: Geometry,
}

impl PartialEq for Values {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.parent == other.parent
            && self.size.to_bits() == other.size.to_bits()
            && self.scale.to_bits() == other.scale.to_bits()
            && self.geometry == other.geometry
    }
}

enum VisualSlot {
    /// Not yet created; creation happens on the first drain.
    Pending(MeshPart),
    Live(Box<dyn Visual>),
    Released,
}

/// Per-part synchronization object between the model and its visual.
///
/// Producers change values through the setters, from any thread. Each
/// change marks a [`Property`] dirty, and the first mark after a drain
/// pushes the controller onto its [`UpdateQueue`]. The consumer calls
/// [`drain`](Self::drain), which applies everything pending to the visual.
///
/// ```text
///            mark (enqueue)            more marks
///   Synced ─────────────────▶ Dirty ◀──────────────┐
///      ▲                        │  └────────────────┘
///      └──────── drain ─────────┘
///   any ── dispose ──▶ Disposed ── drain ──▶ torn down
/// ```
pub struct Controller {
    subject: Subject,
    values: Mutex<Values>,
    dirty: DirtySet,
    synced: AtomicBool,
    disposed: AtomicBool,
    visual: Mutex<VisualSlot>,
    factory: Arc<dyn VisualFactory>,
    queue: QueueLink,
}

impl Controller {
    /// Creates a controller for a vertex or edge.
    ///
    /// Edge endpoint positions are read from `store`. The new controller
    /// is already queued so that its visual gets created and placed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnsupportedPart`] for polygons, and
    /// [`TopologyError::EntityNotFound`] if an edge endpoint is not in `store`.
    pub fn create(
        part: &MeshPart,
        store: &TopologyStore,
        queue: &UpdateQueue,
        factory: Arc<dyn VisualFactory>,
    ) -> Result<Arc<Self>> {
        let (subject, geometry) = match part {
            MeshPart::Vertex(v) => (
                Subject::Vertex {
                    id: v.id(),
                    key: v.key(),
                },
                Geometry::Point(v.position()),
            ),
            MeshPart::Edge(e) => (
                Subject::Edge {
                    id: e.id(),
                    key: e.key(),
                },
                edge_geometry(store, e)?,
            ),
            MeshPart::Polygon(_) => return Err(SyncError::UnsupportedPart("polygon").into()),
        };

        let controller = Arc::new(Self {
            subject,
            values: Mutex::new(Values {
                state: ControllerState::None,
                parent: None,
                size: 1.0,
                scale: 1.0,
                inverse_scale: 1.0,
                geometry,
            }),
            dirty: DirtySet::default(),
            synced: AtomicBool::new(true),
            disposed: AtomicBool::new(false),
            visual: Mutex::new(VisualSlot::Pending(part.clone())),
            factory,
            queue: queue.link(),
        });
        controller.mark_dirty(subject.geometry_property());
        trace!(subject = %subject, "controller created");
        Ok(controller)
    }

    // --- Accessors ---

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn part_id(&self) -> PartId {
        self.subject.part_id()
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.values.lock().state
    }

    #[must_use]
    pub fn parent(&self) -> Option<ContainerId> {
        self.values.lock().parent
    }

    #[must_use]
    pub fn size(&self) -> f32 {
        self.values.lock().size
    }

    #[must_use]
    pub fn scale(&self) -> f32 {
        self.values.lock().scale
    }

    #[must_use]
    pub fn inverse_scale(&self) -> f32 {
        self.values.lock().inverse_scale
    }

    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.values.lock().geometry
    }

    /// Returns `true` if nothing is pending since the last drain.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Returns the properties marked since the last drain.
    #[must_use]
    pub fn pending(&self) -> PropertySet {
        self.dirty.peek()
    }

    // --- Producer side ---

    pub fn set_state(self: &Arc<Self>, state: ControllerState) {
        self.update(Property::State, |v| {
            std::mem::replace(&mut v.state, state) != state
        });
    }

    pub fn set_parent(self: &Arc<Self>, container: ContainerId) {
        self.update(Property::Parent, |v| {
            v.parent.replace(container) != Some(container)
        });
    }

    /// Sets the display size. Non-positive sizes are ignored.
    pub fn set_size(self: &Arc<Self>, size: f32) {
        if size <= 0.0 {
            return;
        }
        self.update(Property::Size, |v| {
            std::mem::replace(&mut v.size, size).to_bits() != size.to_bits()
        });
    }

    /// Sets the display scale. Non-positive scales are ignored.
    pub fn set_scale(self: &Arc<Self>, scale: f32) {
        if scale <= 0.0 {
            return;
        }
        self.update(Property::Scale, |v| {
            v.inverse_scale = 1.0 / scale;
            std::mem::replace(&mut v.scale, scale).to_bits() != scale.to_bits()
        });
    }

    /// Moves a vertex controller's visual.
    pub fn set_position(self: &Arc<Self>, position: Point3) {
        self.update(Property::Position, |v| {
            let next = Geometry::Point(position);
            std::mem::replace(&mut v.geometry, next) != next
        });
    }

    /// Moves an edge controller's visual.
    pub fn set_endpoints(self: &Arc<Self>, start: Point3, end: Point3) {
        self.update(Property::Endpoints, |v| {
            let next = Geometry::Segment(start, end);
            std::mem::replace(&mut v.geometry, next) != next
        });
    }

    fn update(self: &Arc<Self>, property: Property, apply: impl FnOnce(&mut Values) -> bool) {
        if !self.subject.carries(property) {
            warn!(subject = %self.subject, %property, "property does not apply, ignoring");
            return;
        }
        let changed = apply(&mut *self.values.lock());
        if changed {
            self.mark_dirty(property);
        }
    }

    /// Marks `property` pending.
    ///
    /// Returns `true` if this call moved the controller from synced to
    /// dirty and so queued it. Properties the subject does not carry are
    /// ignored with a warning.
    pub fn mark_dirty(self: &Arc<Self>, property: Property) -> bool {
        if !self.subject.carries(property) {
            warn!(subject = %self.subject, %property, "property does not apply, ignoring");
            return false;
        }
        if self.is_disposed() {
            debug!(subject = %self.subject, %property, "mark after dispose ignored");
            return false;
        }
        // The set is extended before the flag flips so that a drain that
        // resets the flag first always sees this property.
        self.dirty.mark(property);
        if self.synced.swap(false, Ordering::SeqCst) {
            if !self.queue.push(Arc::clone(self)) {
                debug!(subject = %self.subject, "update queue is gone");
            }
            return true;
        }
        false
    }

    /// Marks a property by wire name. Unknown names are ignored with a warning.
    pub fn mark_dirty_named(self: &Arc<Self>, name: &str) -> bool {
        if let Some(property) = Property::from_name(name) {
            self.mark_dirty(property)
        } else {
            warn!(subject = %self.subject, name, "unknown property, ignoring");
            false
        }
    }

    /// Disposes the controller and queues it for teardown. Idempotent.
    pub fn dispose(self: &Arc<Self>) {
        if self
            .disposed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            trace!(subject = %self.subject, "controller disposed");
            if !self.queue.push(Arc::clone(self)) {
                // Nobody will drain it; release here.
                self.drain();
            }
        }
    }

    // --- Consumer side ---

    /// Applies pending properties to the visual, or tears it down once disposed.
    ///
    /// Must be called by the consumer thread only. Visual failures are
    /// logged and do not stop the remaining properties.
    pub fn drain(&self) {
        // Reset before reading the set: a mark racing with this drain
        // either lands in the set read below or re-queues the controller.
        self.synced.store(true, Ordering::SeqCst);

        let mut slot = self.visual.lock();
        if self.is_disposed() {
            self.release(&mut slot);
            return;
        }

        let pending = self.dirty.take();
        let realized = match std::mem::replace(&mut *slot, VisualSlot::Released) {
            VisualSlot::Pending(part) => {
                *slot = VisualSlot::Live(self.factory.create(&part));
                true
            }
            other => {
                *slot = other;
                false
            }
        };
        let VisualSlot::Live(visual) = &mut *slot else {
            return;
        };

        let properties = if realized { self.subject.properties() } else { pending };
        if properties.is_empty() {
            return;
        }
        let values = *self.values.lock();
        for property in properties.iter() {
            if let Err(e) = apply(visual.as_mut(), property, &values) {
                error!(subject = %self.subject, %property, error = %e, "visual update failed");
            }
        }
    }

    fn release(&self, slot: &mut VisualSlot) {
        if let VisualSlot::Live(mut visual) = std::mem::replace(slot, VisualSlot::Released) {
            if let Err(e) = visual.teardown() {
                error!(subject = %self.subject, error = %e, "visual teardown failed");
            }
            trace!(subject = %self.subject, "visual torn down");
        }
    }
}

fn apply(visual: &mut dyn Visual, property: Property, values: &Values) -> Result<()> {
    match property {
        Property::Parent => match values.parent {
            Some(container) => visual.attach(container),
            None => Ok(()),
        },
        Property::State => visual.set_state(values.state),
        Property::Size => visual.set_size(values.size),
        Property::Scale => visual.set_scale(values.scale, values.inverse_scale),
        Property::Position | Property::Endpoints => visual.set_geometry(values.geometry),
    }
}

/// Reads the endpoint positions of `edge` from `store`.
pub(crate) fn edge_geometry(store: &TopologyStore, edge: &Edge) -> Result<Geometry> {
    let position = |id: VertexId| {
        store
            .vertex(id)
            .map(|v| v.position())
            .ok_or_else(|| TopologyError::EntityNotFound(format!("vertex {id}")))
    };
    let [start, end] = edge.vertex_ids();
    Ok(Geometry::Segment(position(start)?, position(end)?))
}

/// Two controllers are equal when they wrap the same entity and hold the
/// same values.
impl PartialEq for Controller {
    fn eq(&self, other: &Self) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        let mine = *self.values.lock();
        let theirs = *other.values.lock();
        self.subject == other.subject && mine == theirs
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("subject", &self.subject)
            .field("synced", &self.is_synced())
            .field("disposed", &self.is_disposed())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
