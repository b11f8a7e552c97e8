use garmentkit_core::{
    DesignEvent, EventBus, EventBusConfig, EventCategory, EventFilter, HistoryEvent, PartId,
    TextureEvent,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn pushed() -> DesignEvent {
    DesignEvent::History(HistoryEvent::Pushed {
        part: PartId::new("body"),
        cursor: 1,
        len: 2,
    })
}

#[test]
fn test_filtered_handlers_only_see_their_category() {
    let bus = EventBus::new();
    let history = Arc::new(AtomicUsize::new(0));
    let all = Arc::new(AtomicUsize::new(0));

    let h = history.clone();
    bus.subscribe(EventFilter::Categories(vec![EventCategory::History]), move |_| {
        h.fetch_add(1, Ordering::SeqCst);
    });
    let a = all.clone();
    bus.subscribe(EventFilter::All, move |_| {
        a.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(bus.publish(pushed()), 2);
    assert_eq!(bus.publish(DesignEvent::Texture(TextureEvent::Cleared)), 1);
    assert_eq!(history.load(Ordering::SeqCst), 1);
    assert_eq!(all.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let bus = EventBus::new();
    let id = bus.subscribe(EventFilter::All, |_| {});
    assert_eq!(bus.subscriber_count(), 1);
    assert!(bus.unsubscribe(id));
    assert!(!bus.unsubscribe(id));
    assert_eq!(bus.publish(pushed()), 0);
}

#[test]
fn test_history_is_bounded() {
    let bus = EventBus::with_config(EventBusConfig {
        enable_history: true,
        max_history_size: 2,
        ..EventBusConfig::default()
    });
    bus.publish(DesignEvent::Texture(TextureEvent::Cleared));
    bus.publish(pushed());
    bus.publish(pushed());
    assert_eq!(bus.history(), vec![pushed(), pushed()]);
    bus.clear_history();
    assert!(bus.history().is_empty());
}

#[tokio::test]
async fn test_async_receiver_gets_events() {
    let bus = EventBus::new();
    let mut rx = bus.receiver();
    assert_eq!(bus.publish(pushed()), 1);
    assert_eq!(rx.recv().await.unwrap(), pushed());
}
