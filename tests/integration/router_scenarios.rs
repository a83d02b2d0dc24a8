//! Discovery, liveness and subscription management as a client sees them.

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use smartlocker::adapters::inbox::Inbox;
use smartlocker::app::compartment::Bank;
use smartlocker::app::events::LockerEvent;

use super::mock_hw::{HwCall, Rig};

#[test]
fn discovery_with_all_doors_closed_lists_every_compartment() {
    let rig = Rig::new([0x00, 0x00]).connected();
    rig.send("request/locker");
    assert_eq!(
        rig.log.publishes_on("respond/locker"),
        vec![r#"{"token":"tok","compartments":"1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16"}"#]
    );
}

#[test]
fn discovery_with_every_door_open_lists_nothing() {
    let rig = Rig::new([0xFF, 0xFF]).connected();
    rig.send("request/locker");
    assert_eq!(
        rig.log.publishes_on("respond/locker"),
        vec![r#"{"token":"tok","compartments":""}"#]
    );
}

#[test]
fn connect_subscribes_fixed_topics_before_compartments() {
    let rig = Rig::new([0b1111_1101, 0xFF]);
    rig.router.on_connected();
    assert_eq!(
        rig.log.all(),
        vec![
            HwCall::Subscribe("request/locker".into()),
            HwCall::Subscribe("tok/check".into()),
            HwCall::Subscribe("tok/check/compartment".into()),
            HwCall::Subscribe("tok/borrow/2/open".into()),
            HwCall::Subscribe("tok/return/2/open".into()),
        ]
    );
}

#[test]
fn check_is_acknowledged_without_touching_hardware() {
    let rig = Rig::new([0, 0]).connected();
    rig.send("tok/check");
    assert_eq!(rig.log.all(), vec![HwCall::Publish("tok/check/respond".into(), "ACK".into())]);
}

#[test]
fn check_compartment_reflects_doors_opened_since_connect() {
    let rig = Rig::new([0, 0]).connected();
    rig.io.set_door(2, true);
    rig.io.set_door(10, true);

    rig.send("tok/check/compartment");
    assert_eq!(
        rig.log.publishes_on("tok/check/compartment/respond"),
        vec![r#"{"compartments":"1,3,4,5,6,7,8,9,11,12,13,14,15,16"}"#]
    );
    let calls = rig.log.all();
    assert!(calls.contains(&HwCall::Unsubscribe("tok/borrow/2/open".into())));
    assert!(calls.contains(&HwCall::Unsubscribe("tok/return/10/open".into())));
    assert!(!calls.contains(&HwCall::Unsubscribe("tok/borrow/3/open".into())));
}

#[test]
fn failed_refresh_reports_last_known_compartments() {
    let rig = Rig::new([0b1111_1100, 0xFF]).connected();
    rig.io.set_switches([0xFF, 0xFF]);
    rig.io.fail_reads(Bank::B, true);

    rig.send("tok/check/compartment");
    assert_eq!(
        rig.log.publishes_on("tok/check/compartment/respond"),
        vec![r#"{"compartments":"1,2"}"#]
    );
}

#[test]
fn opens_for_unavailable_or_foreign_compartments_are_ignored() {
    let rig = Rig::new([0b0000_0100, 0]).connected();
    for topic in [
        "tok/borrow/3/open",
        "tok/borrow/17/open",
        "tok/borrow/0/open",
        "other/borrow/4/open",
        "tok/borrow/4/status",
        "tok/lend/4/open",
    ] {
        rig.send(topic);
    }
    rig.run_until_idle();

    assert!(rig.log.all().is_empty());
    assert!(rig.sink.count(|e| matches!(e, LockerEvent::ActuationQueued { .. })) == 0);
}

#[test]
fn compartment_freed_after_refresh_becomes_openable() {
    let rig = Rig::new([0b0000_1000, 0]).connected();
    rig.send("tok/borrow/4/open");
    rig.run_until_idle();
    assert!(rig.log.writes().is_empty());

    rig.io.set_door(4, false);
    rig.send("request/locker");
    rig.send("tok/borrow/4/open");
    rig.run_until_idle();
    assert_eq!(rig.log.writes(), vec![(Bank::A, 0b1111_0111), (Bank::A, 0xFF)]);
}

#[test]
fn inbox_feeds_the_router_in_order() {
    let rig = Rig::new([0, 0]);
    let inbox: Inbox<NoopRawMutex> = Inbox::new();
    inbox.post_connected();
    assert!(inbox.post_message("tok/check", b""));
    assert!(inbox.post_message("request/locker", b""));

    assert_eq!(inbox.dispatch_pending(&*rig.router), 3);
    let publishes = rig.log.publishes();
    assert_eq!(publishes[0], ("tok/check/respond".into(), "ACK".into()));
    assert_eq!(publishes[1].0, "respond/locker");
    assert!(rig.log.all().contains(&HwCall::Subscribe("tok/borrow/16/open".into())));
}

#[test]
fn reconnection_survives_a_full_inbox() {
    use smartlocker::adapters::inbox::INBOX_DEPTH;

    let rig = Rig::new([0, 0]);
    let inbox: Inbox<NoopRawMutex> = Inbox::new();
    for _ in 0..INBOX_DEPTH {
        assert!(inbox.post_message("tok/check", b""));
    }
    assert!(!inbox.post_message("tok/check", b""));
    inbox.post_connected();

    assert_eq!(inbox.dispatch_pending(&*rig.router), INBOX_DEPTH + 1);
    let calls = rig.log.all();
    assert_eq!(calls[0], HwCall::Subscribe("request/locker".into()));
    assert!(calls.contains(&HwCall::Subscribe("tok/check".into())));
    assert!(calls.contains(&HwCall::Subscribe("tok/borrow/7/open".into())));
    assert_eq!(rig.log.publishes_on("tok/check/respond").len(), INBOX_DEPTH);
}

#[test]
fn serving_inbox_handles_reconnection_ahead_of_backlog() {
    use std::rc::Rc;

    let rig = Rig::new([0, 0]);
    let inbox: Rc<Inbox<NoopRawMutex>> = Rc::new(Inbox::new());
    inbox.post_message("tok/check", b"");
    inbox.post_connected();

    let router = rig.router.clone();
    let served = inbox.clone();
    let log = rig.log.clone();
    futures_lite::future::block_on(rig.executor.run(async move {
        futures_lite::future::or(served.serve(&*router), async {
            while log.publishes().is_empty() {
                futures_lite::future::yield_now().await;
            }
        })
        .await;
    }));

    let calls = rig.log.all();
    let first_publish = calls.iter().position(|c| matches!(c, HwCall::Publish(..)));
    let last_subscribe = calls.iter().rposition(|c| matches!(c, HwCall::Subscribe(_)));
    assert!(last_subscribe < first_publish);
}
