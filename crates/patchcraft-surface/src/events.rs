//! Change notification.

use std::fmt;

use patchcraft_patch::{PointId, SurfaceId};
use slotmap::{new_key_type, SlotMap};

use crate::FillId;

new_key_type! {
    /// Handle returned by [`Notifier::subscribe`].
    pub struct ListenerId;
}

/// The entity a change happened to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSource {
    /// A control point.
    Point(PointId),
    /// A multi-patch surface.
    Surface(SurfaceId),
    /// A Gregory hole fill.
    Fill(FillId),
}

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Position moved.
    Position,
    /// Rotation changed.
    Rotation,
    /// Tessellation resolution changed.
    Resolution,
    /// Trimming grids changed.
    Trimming,
    /// Control points were fused.
    Fusion,
    /// A referenced control point moved.
    ControlPoint,
    /// The entity was removed.
    Removed,
}

/// One change, delivered synchronously to every listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Entity that changed.
    pub source: ChangeSource,
    /// What changed about it.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Event for a point.
    pub fn point(id: PointId, kind: ChangeKind) -> Self {
        Self {
            source: ChangeSource::Point(id),
            kind,
        }
    }

    /// Event for a surface.
    pub fn surface(id: SurfaceId, kind: ChangeKind) -> Self {
        Self {
            source: ChangeSource::Surface(id),
            kind,
        }
    }

    /// Event for a fill.
    pub fn fill(id: FillId, kind: ChangeKind) -> Self {
        Self {
            source: ChangeSource::Fill(id),
            kind,
        }
    }
}

type Listener = Box<dyn FnMut(&ChangeEvent)>;

/// Registry of change listeners.
#[derive(Default)]
pub struct Notifier {
    listeners: SlotMap<ListenerId, Listener>,
}

impl Notifier {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`; it sees every event emitted after this call.
    pub fn subscribe(&mut self, listener: impl FnMut(&ChangeEvent) + 'static) -> ListenerId {
        self.listeners.insert(Box::new(listener))
    }

    /// Drop a listener; returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id).is_some()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver `event` to every listener.
    pub fn emit(&mut self, event: ChangeEvent) {
        log::trace!("{:?} {:?}", event.source, event.kind);
        for listener in self.listeners.values_mut() {
            listener(&event);
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
