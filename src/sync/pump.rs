use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, trace};

use super::queue::UpdateQueue;
use super::view::MeshView;
use crate::config::PumpConfig;
use crate::error::{Result, SyncError};
use crate::topology::{Mesh, MeshEvent, VertexId};

enum Control {
    SetModel(Mesh),
    Stop,
}

enum Wake {
    Event(MeshEvent),
    Control(Control),
    Timeout,
    Disconnected,
}

/// Events collected during one coalescing window.
#[derive(Debug, Default)]
struct Burst {
    events: usize,
    changed: bool,
    resync: bool,
    moved: BTreeSet<VertexId>,
}

impl Burst {
    fn add(&mut self, event: MeshEvent) {
        self.events += 1;
        match event {
            MeshEvent::Changed => self.changed = true,
            MeshEvent::VertexMoved(id) => {
                self.moved.insert(id);
            }
        }
    }
}

struct Running {
    control: Sender<Control>,
    handle: JoinHandle<()>,
}

/// Background loop that turns mesh notifications into view updates.
///
/// The pump listens to one [`Mesh`] at a time. Notifications arriving
/// within [`PumpConfig::coalesce_window`] of the first one in a burst are
/// folded into a single [`MeshView::sync`] pass, followed by one
/// [`MeshView::apply_moves`] pass for every vertex moved in the burst.
pub struct UpdatePump {
    view: Arc<Mutex<MeshView>>,
    config: PumpConfig,
    events: Sender<MeshEvent>,
    receiver: Receiver<MeshEvent>,
    model: Option<Mesh>,
    resync: bool,
    passes: Arc<AtomicUsize>,
    running: Option<Running>,
}

impl UpdatePump {
    #[must_use]
    pub fn new(view: MeshView, config: PumpConfig) -> Self {
        let (events, receiver) = crossbeam_channel::unbounded();
        Self {
            view: Arc::new(Mutex::new(view)),
            config,
            events,
            receiver,
            model: None,
            resync: false,
            passes: Arc::new(AtomicUsize::new(0)),
            running: None,
        }
    }

    /// Runs `f` with exclusive access to the view.
    ///
    /// The worker locks the view before it reads the mesh, so `f` may read
    /// or edit the mesh. Calling this while already holding a mesh lock
    /// (from inside [`Mesh::read`] or [`Mesh::write`]) can deadlock.
    pub fn with_view<R>(&self, f: impl FnOnce(&mut MeshView) -> R) -> R {
        f(&mut *self.view.lock())
    }

    /// Returns the queue the render loop should process.
    #[must_use]
    pub fn queue(&self) -> UpdateQueue {
        self.view.lock().queue().clone()
    }

    #[must_use]
    pub fn model(&self) -> Option<&Mesh> {
        self.model.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Returns the number of update passes run so far.
    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::Relaxed)
    }

    /// Switches the pump to `mesh`.
    ///
    /// The listener moves from the previous mesh to `mesh`, and the view
    /// is rebuilt from scratch on the next pass.
    pub fn set_model(&mut self, mesh: Mesh) {
        if let Some(previous) = self.model.take() {
            if previous.same_store(&mesh) {
                self.model = Some(previous);
                return;
            }
            previous.clear_listener();
        }
        mesh.set_listener(self.events.clone());
        self.model = Some(mesh.clone());

        match &self.running {
            Some(running) => {
                if running.control.send(Control::SetModel(mesh)).is_err() {
                    error!("update pump worker is gone, model change not delivered");
                }
            }
            None => self.resync = true,
        }
    }

    /// Starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PumpState`] if the pump is already running and
    /// [`SyncError::Spawn`] if the thread cannot be created.
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(SyncError::PumpState("already running").into());
        }
        let (control, control_rx) = crossbeam_channel::unbounded();
        let worker = Worker {
            view: Arc::clone(&self.view),
            model: self.model.clone(),
            events: self.receiver.clone(),
            control: control_rx,
            coalesce_window: self.config.coalesce_window,
            idle_timeout: self.config.idle_timeout,
            passes: Arc::clone(&self.passes),
        };
        let resync = std::mem::take(&mut self.resync);
        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || worker.run(resync))
            .map_err(SyncError::Spawn)?;
        self.running = Some(Running { control, handle });
        info!(thread = %self.config.thread_name, "update pump started");
        Ok(())
    }

    /// Signals the worker to stop and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PumpState`] if the pump is not running and
    /// [`SyncError::PumpPanicked`] if the worker panicked.
    pub fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Err(SyncError::PumpState("not running").into());
        };
        // A send error means the worker already exited; join reports why.
        let _ = running.control.send(Control::Stop);
        running.handle.join().map_err(|_| SyncError::PumpPanicked)?;
        info!(thread = %self.config.thread_name, "update pump stopped");
        Ok(())
    }
}

impl Drop for UpdatePump {
    fn drop(&mut self) {
        if self.running.is_some() {
            if let Err(e) = self.stop() {
                error!(error = %e, "update pump did not stop cleanly");
            }
        }
        if let Some(model) = &self.model {
            model.clear_listener();
        }
    }
}

struct Worker {
    view: Arc<Mutex<MeshView>>,
    model: Option<Mesh>,
    events: Receiver<MeshEvent>,
    control: Receiver<Control>,
    coalesce_window: Duration,
    idle_timeout: Duration,
    passes: Arc<AtomicUsize>,
}

impl Worker {
    fn run(mut self, resync: bool) {
        self.flush(Burst {
            changed: true,
            resync,
            ..Burst::default()
        });

        loop {
            match self.wait(self.idle_timeout) {
                Wake::Timeout => {}
                Wake::Disconnected | Wake::Control(Control::Stop) => break,
                Wake::Control(Control::SetModel(mesh)) => {
                    self.model = Some(mesh);
                    self.flush(Burst {
                        changed: true,
                        resync: true,
                        ..Burst::default()
                    });
                }
                Wake::Event(event) => {
                    let mut burst = Burst::default();
                    burst.add(event);
                    let stop = self.collect(&mut burst);
                    self.flush(burst);
                    if stop {
                        break;
                    }
                }
            }
        }
        trace!("update pump worker exiting");
    }

    /// Gathers events until the coalescing window closes. Returns `true`
    /// if a stop was requested meanwhile.
    fn collect(&mut self, burst: &mut Burst) -> bool {
        let deadline = Instant::now() + self.coalesce_window;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.wait(remaining) {
                Wake::Event(event) => burst.add(event),
                Wake::Timeout => return false,
                Wake::Disconnected | Wake::Control(Control::Stop) => return true,
                Wake::Control(Control::SetModel(mesh)) => {
                    self.model = Some(mesh);
                    burst.changed = true;
                    burst.resync = true;
                }
            }
        }
    }

    fn wait(&self, timeout: Duration) -> Wake {
        let (control, events) = (&self.control, &self.events);
        select! {
            recv(control) -> msg => msg.map_or(Wake::Disconnected, Wake::Control),
            recv(events) -> event => event.map_or(Wake::Disconnected, Wake::Event),
            default(timeout) => Wake::Timeout,
        }
    }

    fn flush(&self, burst: Burst) {
        let Some(model) = &self.model else {
            return;
        };
        let mut view = self.view.lock();
        model.read(|store| {
            if burst.resync {
                view.clear();
            }
            if burst.changed {
                view.sync(store);
            }
            if !burst.moved.is_empty() {
                view.apply_moves(store, burst.moved.iter().copied());
            }
        });
        drop(view);
        self.passes.fetch_add(1, Ordering::Relaxed);
        debug!(
            events = burst.events,
            moved = burst.moved.len(),
            resync = burst.resync,
            "update pass"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::error::MeshError;
    use crate::sync::Scene;

    fn pump() -> UpdatePump {
        let view = MeshView::new(UpdateQueue::new(), Arc::new(Scene::new()), ViewConfig::default());
        UpdatePump::new(view, PumpConfig::default())
    }

    #[test]
    fn start_and_stop_are_checked() {
        let mut pump = pump();
        assert!(matches!(
            pump.stop(),
            Err(MeshError::Sync(SyncError::PumpState("not running")))
        ));
        pump.start().unwrap();
        assert!(pump.is_running());
        assert!(matches!(
            pump.start(),
            Err(MeshError::Sync(SyncError::PumpState("already running")))
        ));
        pump.stop().unwrap();
        assert!(!pump.is_running());
        pump.start().unwrap();
        pump.stop().unwrap();
    }

    #[test]
    fn set_model_moves_the_listener() {
        let mut pump = pump();
        let first = Mesh::new();
        let second = Mesh::new();
        pump.set_model(first.clone());
        assert!(first.read(|s| s.has_listener()));

        pump.set_model(second.clone());
        assert!(!first.read(|s| s.has_listener()));
        assert!(second.read(|s| s.has_listener()));

        drop(pump);
        assert!(!second.read(|s| s.has_listener()));
    }

    #[test]
    fn burst_folds_move_events() {
        let mut burst = Burst::default();
        burst.add(MeshEvent::VertexMoved(VertexId(1)));
        burst.add(MeshEvent::VertexMoved(VertexId(1)));
        burst.add(MeshEvent::Changed);
        assert_eq!(burst.events, 3);
        assert_eq!(burst.moved.len(), 1);
        assert!(burst.changed);
    }
}
