//! Attribute events and the dispatcher that fans them out
//!
//! Listeners run synchronously, in subscription order, on the thread that
//! triggered the mutation. A listener receives a shared reference to the
//! event and cannot call back into the `AttributeSystem` that emitted it.

use crate::types::AttributeTag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Something observable happened to the attribute set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeEvent {
    /// A field was committed with a new value
    Changed { tag: AttributeTag, value: f64 },
    /// A current-value operation is about to commit (value is unclamped)
    PreChanged { tag: AttributeTag, proposed: f64 },
    Added { tag: AttributeTag, initial: f64 },
    Removed { tag: AttributeTag },
    /// `value <= min_value` on an explicit threshold check
    ThresholdReached { tag: AttributeTag, value: f64 },
    /// A full definition set finished loading
    Initialized,
    /// The vital attribute dropped to zero or below
    VitalDepleted,
}

/// Event discriminant, for filtered subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Changed,
    PreChanged,
    Added,
    Removed,
    ThresholdReached,
    Initialized,
    VitalDepleted,
}

impl AttributeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AttributeEvent::Changed { .. } => EventKind::Changed,
            AttributeEvent::PreChanged { .. } => EventKind::PreChanged,
            AttributeEvent::Added { .. } => EventKind::Added,
            AttributeEvent::Removed { .. } => EventKind::Removed,
            AttributeEvent::ThresholdReached { .. } => EventKind::ThresholdReached,
            AttributeEvent::Initialized => EventKind::Initialized,
            AttributeEvent::VitalDepleted => EventKind::VitalDepleted,
        }
    }

    /// Tag the event refers to, if any
    pub fn tag(&self) -> Option<&AttributeTag> {
        match self {
            AttributeEvent::Changed { tag, .. }
            | AttributeEvent::PreChanged { tag, .. }
            | AttributeEvent::Added { tag, .. }
            | AttributeEvent::Removed { tag }
            | AttributeEvent::ThresholdReached { tag, .. } => Some(tag),
            AttributeEvent::Initialized | AttributeEvent::VitalDepleted => None,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&AttributeEvent) + Send>;

/// Ordered multi-subscriber fan-out
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event
    pub fn subscribe(&mut self, listener: impl FnMut(&AttributeEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Receive only events of one kind
    pub fn subscribe_kind(
        &mut self,
        kind: EventKind,
        mut listener: impl FnMut(&AttributeEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.subscribe(move |event| {
            if event.kind() == kind {
                listener(event);
            }
        })
    }

    /// Returns false if the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: AttributeEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Collects events into a shared buffer
///
/// ```
/// use attribute_core::events::{EventDispatcher, EventRecorder, AttributeEvent};
///
/// let recorder = EventRecorder::new();
/// let mut dispatcher = EventDispatcher::new();
/// dispatcher.subscribe(recorder.listener());
/// dispatcher.emit(AttributeEvent::Initialized);
/// assert_eq!(recorder.events(), vec![AttributeEvent::Initialized]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<AttributeEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that appends to this recorder
    pub fn listener(&self) -> impl FnMut(&AttributeEvent) + Send + 'static {
        let events = Arc::clone(&self.events);
        move |event| {
            if let Ok(mut events) = events.lock() {
                events.push(event.clone());
            }
        }
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<AttributeEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of recorded events of one kind
    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .map(|e| e.iter().filter(|ev| ev.kind() == kind).count())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tags;

    #[test]
    fn test_listeners_run_in_subscription_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        for n in 0..3 {
            let order = Arc::clone(&order);
            dispatcher.subscribe(move |_| order.lock().unwrap().push(n));
        }
        dispatcher.emit(AttributeEvent::Initialized);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_unsubscribe() {
        let recorder = EventRecorder::new();
        let mut dispatcher = EventDispatcher::new();
        let id = dispatcher.subscribe(recorder.listener());
        dispatcher.emit(AttributeEvent::Initialized);
        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        dispatcher.emit(AttributeEvent::Initialized);
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_subscribe_kind_filters() {
        let recorder = EventRecorder::new();
        let mut dispatcher = EventDispatcher::new();
        dispatcher.subscribe_kind(EventKind::Removed, recorder.listener());
        dispatcher.emit(AttributeEvent::Changed {
            tag: tags::HEALTH,
            value: 1.0,
        });
        dispatcher.emit(AttributeEvent::Removed { tag: tags::HEALTH });
        assert_eq!(
            recorder.events(),
            vec![AttributeEvent::Removed { tag: tags::HEALTH }]
        );
    }

    #[test]
    fn test_event_tag_and_kind() {
        let event = AttributeEvent::ThresholdReached {
            tag: tags::MANA,
            value: 0.0,
        };
        assert_eq!(event.kind(), EventKind::ThresholdReached);
        assert_eq!(event.tag(), Some(&tags::MANA));
        assert_eq!(AttributeEvent::VitalDepleted.tag(), None);
    }
}
