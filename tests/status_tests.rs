//! Status bus tests

mod common;

use std::cell::RefCell;

use altcom::core::protocol::CommandId;
use altcom::relay::status::{Disposition, HandlerId, ModemStatus, StatusBus, StatusError};

/// Records every notification a handler sees
#[derive(Default)]
struct Recorder {
    calls: RefCell<Vec<(&'static str, CommandId, ModemStatus, ModemStatus)>>,
}

impl Recorder {
    fn record(&self, name: &'static str, command: CommandId, new: ModemStatus, old: ModemStatus) {
        self.calls.borrow_mut().push((name, command, new, old));
    }

    fn names(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(|call| call.0).collect()
    }
}

const A: HandlerId = HandlerId(1);
const B: HandlerId = HandlerId(2);
const CLEAR: HandlerId = HandlerId(3);
const CANCEL: HandlerId = HandlerId(4);

fn keep_a(r: &Recorder, command: CommandId, new: ModemStatus, old: ModemStatus) -> Disposition {
    r.record("a", command, new, old);
    Disposition::Keep
}

fn keep_b(r: &Recorder, command: CommandId, new: ModemStatus, old: ModemStatus) -> Disposition {
    r.record("b", command, new, old);
    Disposition::Keep
}

fn clear_once(r: &Recorder, command: CommandId, new: ModemStatus, old: ModemStatus) -> Disposition {
    r.record("clear", command, new, old);
    Disposition::Clear
}

fn clear_below_power_on(r: &Recorder, command: CommandId, new: ModemStatus, old: ModemStatus) -> Disposition {
    r.record("cancel", command, new, old);
    if new < ModemStatus::PowerOn {
        Disposition::Clear
    } else {
        Disposition::Keep
    }
}

#[test]
fn test_status_ordering() {
    assert!(ModemStatus::Uninitialized < ModemStatus::Initialized);
    assert!(ModemStatus::Initialized < ModemStatus::RestartOngoing);
    assert!(ModemStatus::RestartOngoing < ModemStatus::PowerOn);
}

#[test]
fn test_swap_status() {
    let bus: StatusBus<Recorder> = StatusBus::new();
    assert_eq!(bus.status(), ModemStatus::Uninitialized);
    assert_eq!(bus.swap_status(ModemStatus::PowerOn), ModemStatus::Uninitialized);
    assert_eq!(bus.status(), ModemStatus::PowerOn);
}

#[test]
fn test_publish_in_registration_order() {
    let bus: StatusBus<Recorder> = StatusBus::new();
    let recorder = Recorder::default();

    bus.subscribe(CommandId::SET_CE, B, keep_b).unwrap();
    bus.subscribe(CommandId::GET_IMS_CAP, A, keep_a).unwrap();

    let invoked = bus.publish(&recorder, ModemStatus::PowerOn, ModemStatus::Initialized);
    assert_eq!(invoked, 2);
    assert_eq!(recorder.names(), ["b", "a"]);

    let calls = recorder.calls.borrow();
    assert_eq!(calls[0], ("b", CommandId::SET_CE, ModemStatus::PowerOn, ModemStatus::Initialized));
    assert_eq!(calls[1].1, CommandId::GET_IMS_CAP);
}

#[test]
fn test_duplicate_subscription_is_kept_once() {
    let bus: StatusBus<Recorder> = StatusBus::new();
    let recorder = Recorder::default();

    bus.subscribe(CommandId::SET_CE, A, keep_a).unwrap();
    bus.subscribe(CommandId::SET_CE, A, keep_a).unwrap();
    // Same handler for another command is a different pairing
    bus.subscribe(CommandId::GET_IMS_CAP, A, keep_a).unwrap();
    assert_eq!(bus.len(), 2);

    bus.publish(&recorder, ModemStatus::Initialized, ModemStatus::PowerOn);
    assert_eq!(recorder.names(), ["a", "a"]);
}

#[test]
fn test_clear_disposition_removes_only_that_subscriber() {
    let bus: StatusBus<Recorder> = StatusBus::new();
    let recorder = Recorder::default();

    bus.subscribe(CommandId::SET_CE, A, keep_a).unwrap();
    bus.subscribe(CommandId::GET_IMS_CAP, CLEAR, clear_once).unwrap();
    bus.subscribe(CommandId::DEACTIVATE_PDN, B, keep_b).unwrap();

    bus.publish(&recorder, ModemStatus::Initialized, ModemStatus::PowerOn);
    // Self-removal does not skip the subscriber after it
    assert_eq!(recorder.names(), ["a", "clear", "b"]);
    assert!(!bus.is_subscribed(CommandId::GET_IMS_CAP, CLEAR));
    assert_eq!(bus.len(), 2);

    recorder.calls.borrow_mut().clear();
    bus.publish(&recorder, ModemStatus::PowerOn, ModemStatus::Initialized);
    assert_eq!(recorder.names(), ["a", "b"]);
}

#[test]
fn test_cancel_handler_keeps_on_power_on() {
    let bus: StatusBus<Recorder> = StatusBus::new();
    let recorder = Recorder::default();
    bus.subscribe(CommandId::SET_CE, CANCEL, clear_below_power_on).unwrap();

    bus.publish(&recorder, ModemStatus::PowerOn, ModemStatus::RestartOngoing);
    assert!(bus.is_subscribed(CommandId::SET_CE, CANCEL));

    bus.publish(&recorder, ModemStatus::RestartOngoing, ModemStatus::PowerOn);
    assert!(!bus.is_subscribed(CommandId::SET_CE, CANCEL));
    assert_eq!(recorder.names(), ["cancel", "cancel"]);
}

#[test]
fn test_unsubscribe_is_idempotent() {
    let bus: StatusBus<Recorder> = StatusBus::new();
    let recorder = Recorder::default();

    bus.unsubscribe(CommandId::SET_CE, A);
    bus.subscribe(CommandId::SET_CE, A, keep_a).unwrap();
    bus.unsubscribe(CommandId::SET_CE, A);
    bus.unsubscribe(CommandId::SET_CE, A);
    assert!(bus.is_empty());

    assert_eq!(bus.publish(&recorder, ModemStatus::PowerOn, ModemStatus::Initialized), 0);
}

#[test]
fn test_full_bus() {
    let bus: StatusBus<Recorder, 2> = StatusBus::new();
    bus.subscribe(CommandId(1), A, keep_a).unwrap();
    bus.subscribe(CommandId(2), A, keep_a).unwrap();
    assert_eq!(bus.subscribe(CommandId(3), A, keep_a), Err(StatusError::Full));

    bus.clear();
    assert!(bus.is_empty());
}

#[test]
fn test_subscriptions_matched_by_id() {
    let bus: StatusBus<Recorder> = StatusBus::new();
    let recorder = Recorder::default();

    // A different function under a taken pairing is ignored
    bus.subscribe(CommandId::SET_CE, A, keep_a).unwrap();
    bus.subscribe(CommandId::SET_CE, A, keep_b).unwrap();
    // The same function under two IDs is two subscriptions
    bus.subscribe(CommandId::SET_CE, B, keep_a).unwrap();
    assert_eq!(bus.len(), 2);

    bus.publish(&recorder, ModemStatus::PowerOn, ModemStatus::Initialized);
    assert_eq!(recorder.names(), ["a", "a"]);

    bus.unsubscribe(CommandId::SET_CE, A);
    assert!(!bus.is_subscribed(CommandId::SET_CE, A));
    assert!(bus.is_subscribed(CommandId::SET_CE, B));
}
