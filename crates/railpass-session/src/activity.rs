//! User-activity plumbing.
//!
//! [`ActivityHub`] stands in for the document's event target: the UI layer
//! dispatches input events into it, and anyone may register listeners
//! per event kind. [`ActivityTracker`] is the session's registration on
//! that hub. It listens to the six input events that count as a user
//! being present, and nothing else.
//!
//! Listeners run synchronously on the dispatching thread, outside the
//! hub's lock, so a listener may add or remove listeners (or dispatch)
//! without deadlocking.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::lock;

/// Input events the hub can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiEvent {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
    /// Passive events. They reach the hub but do not count as activity.
    Focus,
    Blur,
    Resize,
    VisibilityChange,
}

impl UiEvent {
    /// The events that reset the inactivity clock.
    pub const TRACKED: [UiEvent; 6] = [
        UiEvent::PointerDown,
        UiEvent::PointerMove,
        UiEvent::KeyPress,
        UiEvent::Scroll,
        UiEvent::TouchStart,
        UiEvent::Click,
    ];

    /// The DOM event name.
    pub fn dom_name(self) -> &'static str {
        match self {
            Self::PointerDown => "mousedown",
            Self::PointerMove => "mousemove",
            Self::KeyPress => "keypress",
            Self::Scroll => "scroll",
            Self::TouchStart => "touchstart",
            Self::Click => "click",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::Resize => "resize",
            Self::VisibilityChange => "visibilitychange",
        }
    }

    pub fn from_dom_name(name: &str) -> Option<Self> {
        let event = match name {
            "mousedown" => Self::PointerDown,
            "mousemove" => Self::PointerMove,
            "keypress" => Self::KeyPress,
            "scroll" => Self::Scroll,
            "touchstart" => Self::TouchStart,
            "click" => Self::Click,
            "focus" => Self::Focus,
            "blur" => Self::Blur,
            "resize" => Self::Resize,
            "visibilitychange" => Self::VisibilityChange,
            _ => return None,
        };
        Some(event)
    }

    pub fn is_tracked(self) -> bool {
        Self::TRACKED.contains(&self)
    }
}

impl fmt::Display for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dom_name())
    }
}

type Listener = Arc<dyn Fn(UiEvent) + Send + Sync>;

/// Handle returned by [`ActivityHub::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(ListenerId, UiEvent, Listener)>,
}

/// Dispatch point for UI input events. Clones share one registry.
#[derive(Clone, Default)]
pub struct ActivityHub {
    registry: Arc<Mutex<Registry>>,
}

impl ActivityHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(
        &self,
        event: UiEvent,
        listener: impl Fn(UiEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let mut registry = lock(&self.registry);
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.push((id, event, Arc::new(listener)));
        id
    }

    /// Returns `false` if the listener was already gone.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut registry = lock(&self.registry);
        let before = registry.listeners.len();
        registry.listeners.retain(|(existing, _, _)| *existing != id);
        registry.listeners.len() != before
    }

    /// Delivers `event` to every listener registered for it and returns
    /// how many were called.
    pub fn dispatch(&self, event: UiEvent) -> usize {
        let matching: Vec<Listener> = lock(&self.registry)
            .listeners
            .iter()
            .filter(|(_, kind, _)| *kind == event)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();

        for listener in &matching {
            listener(event);
        }
        matching.len()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}

impl fmt::Debug for ActivityHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityHub")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// A group of listeners that unregister themselves when dropped.
struct Registration {
    hub: ActivityHub,
    ids: Vec<ListenerId>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.hub.remove_listener(id);
        }
    }
}

/// The session's listeners on the hub.
///
/// At most one set is attached at a time: [`attach`](Self::attach)
/// replaces any previous set, so re-attaching never duplicates listeners.
pub struct ActivityTracker {
    hub: ActivityHub,
    attached: Mutex<Option<Registration>>,
}

impl ActivityTracker {
    pub fn new(hub: ActivityHub) -> Self {
        Self {
            hub,
            attached: Mutex::new(None),
        }
    }

    /// Registers `on_activity` for every tracked event.
    pub fn attach(&self, on_activity: impl Fn(UiEvent) + Send + Sync + 'static) {
        let on_activity: Listener = Arc::new(on_activity);
        let ids = UiEvent::TRACKED
            .iter()
            .map(|&event| {
                let on_activity = Arc::clone(&on_activity);
                self.hub.add_listener(event, move |e| on_activity(e))
            })
            .collect();

        let previous = lock(&self.attached).replace(Registration {
            hub: self.hub.clone(),
            ids,
        });
        // Dropped outside the slot lock.
        drop(previous);
        tracing::debug!(events = UiEvent::TRACKED.len(), "activity listeners attached");
    }

    /// Removes the listeners. Returns `false` if none were attached.
    pub fn detach(&self) -> bool {
        let previous = lock(&self.attached).take();
        let detached = previous.is_some();
        drop(previous);
        if detached {
            tracing::debug!("activity listeners detached");
        }
        detached
    }

    pub fn is_attached(&self) -> bool {
        lock(&self.attached).is_some()
    }

    pub fn hub(&self) -> &ActivityHub {
        &self.hub
    }
}

impl fmt::Debug for ActivityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityTracker")
            .field("attached", &self.is_attached())
            .finish()
    }
}
