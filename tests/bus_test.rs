mod common;

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use common::RecordingPanel;
use interlinear_sync::{
    bus::{
        BusError, DeliveryOutcome, FilterSpec, Message, MessageBus, MessagePayload, MessageType,
        PanelEndpoint, PanelId, Registration, FILTER_STATE_KEY, NAVIGATION_STATE_KEY,
    },
    config::BusConfig,
    resolver::PanelTokens,
    timestamp::{ManualClock, Timestamp},
    verse_ref::VerseRef,
};

fn manual_bus() -> (Arc<MessageBus>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let bus = Arc::new(MessageBus::new(BusConfig::default(), clock.clone()));
    (bus, clock)
}

fn navigate(verse: u32, at: Option<Timestamp>) -> Message {
    let builder = Message::builder(MessagePayload::NavigateToVerse(VerseRef::new(
        "TIT",
        1,
        verse.to_string(),
    )))
    .source("ult");
    match at {
        Some(at) => builder.timestamp(at).build().unwrap(),
        None => builder.build().unwrap(),
    }
}

fn active_verse(bus: &MessageBus) -> Option<String> {
    bus.get_state(MessageType::NavigateToVerse, NAVIGATION_STATE_KEY)
        .unwrap()
        .and_then(|m| match m.payload() {
            MessagePayload::NavigateToVerse(r) => Some(r.verse.clone()),
            _ => None,
        })
}

#[test]
fn test_state_supersession_keeps_last() {
    let (bus, _) = manual_bus();
    for verse in 1..=5 {
        bus.send(navigate(verse, None)).unwrap();
    }
    assert_eq!(active_verse(&bus).as_deref(), Some("5"));
}

#[test]
fn test_timestamp_order_beats_call_order() {
    let (bus, _) = manual_bus();
    let panel = RecordingPanel::empty();
    bus.register("ust", panel.clone()).unwrap();

    bus.send(navigate(3, Some(Timestamp::from_millis(30)))).unwrap();
    let late = bus.send(navigate(2, Some(Timestamp::from_millis(20)))).unwrap();

    assert_eq!(late.outcome, DeliveryOutcome::Superseded);
    assert!(late.delivered.is_empty());
    assert_eq!(active_verse(&bus).as_deref(), Some("3"));
    assert_eq!(panel.received().len(), 1);
}

#[test]
fn test_commands_never_retained() {
    let (bus, _) = manual_bus();
    let panel = RecordingPanel::empty();
    bus.register("ult", panel.clone()).unwrap();

    let clear = Message::builder(MessagePayload::ClearFilters)
        .source("ust")
        .build()
        .unwrap();
    let delivery = bus.send(clear).unwrap();
    assert_eq!(delivery.delivered, vec![PanelId::from("ult")]);

    assert!(bus
        .get_state(MessageType::ClearFilters, FILTER_STATE_KEY)
        .unwrap()
        .is_none());
    assert!(bus.get_state_by_key(FILTER_STATE_KEY).unwrap().is_none());
}

#[test]
fn test_clearing_command_keeps_newer_state() {
    let (bus, _) = manual_bus();
    let filter = FilterSpec {
        strongs: ["G29160".to_string()].into_iter().collect(),
        ..Default::default()
    };
    let set = Message::builder(MessagePayload::SetFilter(filter))
        .source("ult")
        .timestamp(Timestamp::from_millis(50))
        .build()
        .unwrap();
    let stale_clear = Message::builder(MessagePayload::ClearFilters)
        .source("ust")
        .timestamp(Timestamp::from_millis(40))
        .build()
        .unwrap();
    bus.send(set).unwrap();
    bus.send(stale_clear).unwrap();
    assert!(bus.get_state_by_key(FILTER_STATE_KEY).unwrap().is_some());
}

#[test]
fn test_event_ttl_bounds_late_delivery() {
    let (bus, clock) = manual_bus();
    let note = Message::builder(MessagePayload::HoverCleared)
        .source("ult")
        .ttl(Duration::from_millis(200))
        .build()
        .unwrap();
    bus.send(note).unwrap();

    clock.advance(Duration::from_millis(199));
    let within = RecordingPanel::empty();
    bus.register("uhb", within.clone()).unwrap();
    assert_eq!(within.received_types(), vec![MessageType::HoverCleared]);

    clock.advance(Duration::from_millis(2));
    let after = RecordingPanel::empty();
    bus.register("ust", after.clone()).unwrap();
    assert!(after.received().is_empty());
}

#[test]
fn test_default_event_ttl_applies() {
    let (bus, clock) = manual_bus();
    bus.send(
        Message::builder(MessagePayload::HoverCleared)
            .source("ult")
            .build()
            .unwrap(),
    )
    .unwrap();
    clock.advance(BusConfig::default().default_event_ttl + Duration::from_millis(1));
    let late = RecordingPanel::empty();
    bus.register("ust", late.clone()).unwrap();
    assert!(late.received().is_empty());
}

#[test]
fn test_late_event_not_redelivered_on_remount() {
    let (bus, _) = manual_bus();
    let first = RecordingPanel::empty();
    bus.register("ust", first.clone()).unwrap();
    bus.send(
        Message::builder(MessagePayload::HoverCleared)
            .source("ult")
            .build()
            .unwrap(),
    )
    .unwrap();

    let remounted = RecordingPanel::empty();
    assert_eq!(
        bus.register("ust", remounted.clone()).unwrap(),
        Registration::Replaced
    );
    assert!(remounted.received().is_empty());
    assert_eq!(first.received().len(), 1);
}

#[test]
fn test_unregistered_panel_misses_broadcast() {
    let (bus, _) = manual_bus();
    let ult = RecordingPanel::empty();
    let ust = RecordingPanel::empty();
    bus.register("ult", ult.clone()).unwrap();
    bus.register("ust", ust.clone()).unwrap();
    assert!(bus.unregister(&"ust".into()).unwrap());

    let delivery = bus.send(navigate(1, None)).unwrap();
    assert_eq!(delivery.delivered, vec![PanelId::from("ult")]);
    assert!(ust.received().is_empty());
    assert!(!bus.unregister(&"ust".into()).unwrap());
}

#[test]
fn test_query_after_dispose_fails() {
    let (bus, _) = manual_bus();
    bus.dispose();
    assert_eq!(
        bus.get_state_by_key(NAVIGATION_STATE_KEY),
        Err(BusError::Disposed)
    );
    assert!(matches!(bus.snapshot_tokens(), Err(BusError::Disposed)));
}

/// Answers every navigation with a hover-cleared event of its own.
struct EchoPanel {
    bus: Mutex<Weak<MessageBus>>,
    echoed: Mutex<usize>,
}

impl PanelEndpoint for EchoPanel {
    fn receive(&self, message: &Message) {
        if message.message_type() != MessageType::NavigateToVerse {
            return;
        }
        if let Some(bus) = self.bus.lock().unwrap().upgrade() {
            let echo = Message::builder(MessagePayload::HoverCleared)
                .source("echo")
                .build()
                .unwrap();
            bus.send(echo).unwrap();
            *self.echoed.lock().unwrap() += 1;
        }
    }

    fn current_tokens(&self) -> PanelTokens {
        PanelTokens::default()
    }
}

#[test]
fn test_send_from_inside_callback() {
    let (bus, _) = manual_bus();
    let echo = Arc::new(EchoPanel {
        bus: Mutex::new(Arc::downgrade(&bus)),
        echoed: Mutex::new(0),
    });
    let other = RecordingPanel::empty();
    bus.register("echo", echo.clone()).unwrap();
    bus.register("ult", other.clone()).unwrap();

    bus.send(navigate(1, None)).unwrap();
    assert_eq!(*echo.echoed.lock().unwrap(), 1);
    assert_eq!(
        other.received_types(),
        vec![MessageType::HoverCleared, MessageType::NavigateToVerse]
    );
}

/// Mounts a child panel the first time it sees a hover-cleared event.
struct MountingPanel {
    bus: Mutex<Weak<MessageBus>>,
    child: Arc<RecordingPanel>,
    seen: Mutex<usize>,
}

impl PanelEndpoint for MountingPanel {
    fn receive(&self, message: &Message) {
        if message.message_type() != MessageType::HoverCleared {
            return;
        }
        *self.seen.lock().unwrap() += 1;
        if let Some(bus) = self.bus.lock().unwrap().upgrade() {
            if !bus.is_registered(&"child".into()).unwrap() {
                bus.register("child", self.child.clone()).unwrap();
            }
        }
    }

    fn current_tokens(&self) -> PanelTokens {
        PanelTokens::default()
    }
}

#[test]
fn test_panel_mounted_during_delivery_gets_event_once() {
    let (bus, _) = manual_bus();
    let parent = Arc::new(MountingPanel {
        bus: Mutex::new(Arc::downgrade(&bus)),
        child: RecordingPanel::empty(),
        seen: Mutex::new(0),
    });
    let later = RecordingPanel::empty();
    bus.register("parent", parent.clone()).unwrap();
    bus.register("later", later.clone()).unwrap();

    let hover = Message::builder(MessagePayload::HoverCleared)
        .source("ult")
        .build()
        .unwrap();
    let delivery = bus.send(hover).unwrap();

    assert_eq!(*parent.seen.lock().unwrap(), 1);
    assert_eq!(parent.child.received_types(), vec![MessageType::HoverCleared]);
    assert_eq!(later.received_types(), vec![MessageType::HoverCleared]);
    assert!(!delivery.delivered.contains(&PanelId::from("child")));

    // a remount of the child does not replay it either
    bus.unregister(&"child".into()).unwrap();
    let remounted = RecordingPanel::empty();
    bus.register("child", remounted.clone()).unwrap();
    assert!(remounted.received().is_empty());
}

#[test]
fn test_remount_churn_never_drops_a_panel() {
    let bus = Arc::new(MessageBus::with_defaults());
    let stable = RecordingPanel::empty();
    bus.register("ult", stable.clone()).unwrap();
    let churning = RecordingPanel::empty();
    bus.register("ust", churning.clone()).unwrap();

    std::thread::scope(|scope| {
        let churn_bus = bus.clone();
        scope.spawn(move || {
            for _ in 0..200 {
                churn_bus
                    .register("ust", RecordingPanel::empty())
                    .unwrap();
            }
        });
        for verse in 1..=200 {
            let delivery = bus.send(navigate(verse, None)).unwrap();
            assert_eq!(delivery.delivered.len(), 2, "verse {}", verse);
        }
    });

    assert_eq!(stable.received().len(), 200);
    assert_eq!(bus.panel_ids().unwrap().len(), 2);
}
