//! Event Bus implementation.
//!
//! A session owns an `Arc<EventBus>`; hosts may also use the process-wide
//! instance from [`event_bus`].

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{DesignEvent, EventCategory};

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific event types
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    /// Check if an event matches this filter
    pub fn matches(&self, event: &DesignEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

type EventHandler = Box<dyn Fn(&DesignEvent) + Send + Sync>;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for broadcast.
    pub channel_capacity: usize,
    /// Whether to keep recent events.
    pub enable_history: bool,
    /// Maximum number of events kept when history is enabled.
    pub max_history_size: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            enable_history: false,
            max_history_size: 512,
        }
    }
}

/// Publish/subscribe hub for [`DesignEvent`]s
pub struct EventBus {
    sender: broadcast::Sender<DesignEvent>,
    handlers: RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>,
    history: RwLock<VecDeque<DesignEvent>>,
    config: EventBusConfig,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            config,
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Synchronous handlers run on the caller's thread before this returns.
    /// Returns how many handlers and async receivers saw the event; zero is
    /// not an error since nobody may be listening yet.
    pub fn publish(&self, event: DesignEvent) -> usize {
        tracing::trace!("event: {}", event.description());

        if self.config.enable_history {
            let mut history = self.history.write();
            history.push_back(event.clone());
            while history.len() > self.config.max_history_size {
                history.pop_front();
            }
        }

        let mut delivered = 0;
        {
            let handlers = self.handlers.read();
            for (filter, handler) in handlers.values() {
                if filter.matches(&event) {
                    handler(&event);
                    delivered += 1;
                }
            }
        }

        delivered + self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe with a synchronous handler
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(&DesignEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers.write().insert(id, (filter, Box::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Get a receiver for polling from an async task
    pub fn receiver(&self) -> broadcast::Receiver<DesignEvent> {
        self.sender.subscribe()
    }

    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Recent events, oldest first (empty unless history is enabled)
    pub fn history(&self) -> Vec<DesignEvent> {
        self.history.read().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.config)
            .finish()
    }
}

static EVENT_BUS: OnceLock<Arc<EventBus>> = OnceLock::new();

/// Get or initialize the process-wide event bus
pub fn event_bus() -> Arc<EventBus> {
    EVENT_BUS.get_or_init(|| Arc::new(EventBus::new())).clone()
}

/// Initialize the process-wide event bus with custom configuration
///
/// Must be called before any call to `event_bus()`. Returns the rejected
/// configuration if the bus already exists.
pub fn init_event_bus(config: EventBusConfig) -> Result<(), EventBusConfig> {
    EVENT_BUS
        .set(Arc::new(EventBus::with_config(config)))
        .map_err(|bus| bus.config.clone())
}

/// Convenience macro to publish an event to the process-wide event bus
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::event_bus::event_bus().publish($event)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::events::{HistoryEvent, ModeEvent, TextureEvent};
    use crate::ids::PartId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pushed(cursor: usize) -> DesignEvent {
        DesignEvent::History(HistoryEvent::Pushed {
            part: PartId::new("body"),
            cursor,
            len: cursor + 1,
        })
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();
        let id = bus.subscribe(EventFilter::All, |_| {});
        assert_eq!(bus.subscriber_count(), 1);
        assert!(bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_publish_without_listeners_is_fine() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(DesignEvent::Texture(TextureEvent::Cleared)), 0);
    }

    #[test]
    fn test_event_filtering() {
        let bus = EventBus::new();
        let texture_count = Arc::new(AtomicUsize::new(0));
        let history_count = Arc::new(AtomicUsize::new(0));

        let tc = texture_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::Texture]),
            move |_| {
                tc.fetch_add(1, Ordering::SeqCst);
            },
        );
        let hc = history_count.clone();
        bus.subscribe(
            EventFilter::Categories(vec![EventCategory::History]),
            move |_| {
                hc.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.publish(DesignEvent::Texture(TextureEvent::Cleared));
        bus.publish(pushed(0));
        bus.publish(pushed(1));

        assert_eq!(texture_count.load(Ordering::SeqCst), 1);
        assert_eq!(history_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_history_max_size() {
        let bus = EventBus::with_config(EventBusConfig {
            enable_history: true,
            max_history_size: 3,
            ..Default::default()
        });
        for i in 0..5 {
            bus.publish(pushed(i));
        }
        let history = bus.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0], pushed(2));

        bus.clear_history();
        assert!(bus.history().is_empty());
    }

    #[test]
    fn test_filter_matches() {
        let event = DesignEvent::Mode(ModeEvent::Changed {
            from: "select".to_string(),
            to: "brush".to_string(),
        });
        assert!(EventFilter::All.matches(&event));
        assert!(EventFilter::Categories(vec![EventCategory::Mode]).matches(&event));
        assert!(!EventFilter::Categories(vec![EventCategory::Layers]).matches(&event));
    }

    #[tokio::test]
    async fn test_async_receiver() {
        let bus = EventBus::new();
        let mut receiver = bus.receiver();
        bus.publish(pushed(4));

        match receiver.try_recv() {
            Ok(DesignEvent::History(HistoryEvent::Pushed { cursor, .. })) => {
                assert_eq!(cursor, 4)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
