//! Relay sequencing through the full router, on a real local executor.

use std::rc::Rc;

use smartlocker::app::actuator::ActuatorStats;
use smartlocker::app::compartment::{Bank, CompartmentId};
use smartlocker::app::events::LockerEvent;
use smartlocker::error::IoError;

use super::mock_hw::{HwCall, Rig};

fn id(raw: u8) -> CompartmentId {
    CompartmentId::new(raw).unwrap()
}

#[test]
fn borrow_pulses_the_right_bank_and_bit() {
    let rig = Rig::new([0, 0]).connected();
    rig.send("tok/borrow/12/open");
    rig.run_until_idle();

    assert_eq!(rig.log.writes(), vec![(Bank::B, 0b1111_0111), (Bank::B, 0xFF)]);
    let relay_delays: Vec<u32> = rig
        .log
        .all()
        .into_iter()
        .filter_map(|c| match c {
            HwCall::Delay { tag: "relay", ms } => Some(ms),
            _ => None,
        })
        .collect();
    assert_eq!(relay_delays, vec![500, 3000]);
}

#[test]
fn requests_are_serviced_in_arrival_order() {
    let rig = Rig::new([0, 0]).connected();
    for topic in ["tok/borrow/1/open", "tok/return/9/open", "tok/borrow/2/open"] {
        rig.send(topic);
    }
    rig.run_until_idle();

    // Poll delays interleave freely; the relay side must be strictly serial,
    // dwell included, before the next request energises.
    let relay_side: Vec<HwCall> = rig
        .log
        .all()
        .into_iter()
        .filter(|c| !matches!(c, HwCall::Delay { tag: "poll", .. }))
        .collect();
    let mut expected = Vec::new();
    for (bank, pattern) in [(Bank::A, 0b1111_1110), (Bank::B, 0b1111_1110), (Bank::A, 0b1111_1101)] {
        expected.extend([
            HwCall::Write(bank, pattern),
            HwCall::Delay { tag: "relay", ms: 500 },
            HwCall::Write(bank, 0xFF),
            HwCall::Delay { tag: "relay", ms: 3000 },
        ]);
    }
    assert_eq!(relay_side, expected);
    assert_eq!(rig.router.actuator().stats(), ActuatorStats { completed: 3, failed: 0 });
}

#[test]
fn failed_release_does_not_stop_the_next_request() {
    let rig = Rig::new([0, 0]).connected();
    rig.io.fail_next_write(Bank::A, 0xFF);
    rig.send("tok/borrow/3/open");
    rig.send("tok/borrow/4/open");
    rig.run_until_idle();

    // The failed release is not logged; request 4's absolute writes still
    // leave the bank at rest.
    assert_eq!(
        rig.log.writes(),
        vec![(Bank::A, 0b1111_1011), (Bank::A, 0b1111_0111), (Bank::A, 0xFF)]
    );
    assert_eq!(rig.router.actuator().stats(), ActuatorStats { completed: 1, failed: 1 });
    assert_eq!(
        rig.sink.count(|e| *e
            == LockerEvent::ActuationFailed { id: id(3), error: IoError::RelayWriteFailed(Bank::A) }),
        1
    );
    assert_eq!(rig.sink.count(|e| *e == LockerEvent::ActuationCompleted(id(4))), 1);
}

#[test]
fn failed_energise_skips_settle_but_keeps_dwell() {
    let rig = Rig::new([0, 0]).connected();
    rig.io.fail_next_write(Bank::B, 0b1011_1111);
    rig.send("tok/borrow/15/open");
    rig.run_until_idle();

    assert!(rig.log.writes().is_empty());
    assert!(rig.log.all().contains(&HwCall::Delay { tag: "relay", ms: 3000 }));
    assert!(!rig.log.all().contains(&HwCall::Delay { tag: "relay", ms: 500 }));
}

#[test]
fn gate_is_never_held_across_a_delay() {
    let rig = Rig::new([0, 0]).connected();
    let actuator = Rc::clone(rig.router.actuator());
    let held = Rc::new(std::cell::Cell::new(0u32));
    let seen = held.clone();
    rig.relay_delay.on_delay(move |_, _| {
        if !actuator.is_gate_free() {
            seen.set(seen.get() + 1);
        }
    });

    for raw in [1, 2, 10] {
        rig.send(&format!("tok/borrow/{raw}/open"));
    }
    rig.run_until_idle();

    assert_eq!(rig.relay_delay.calls(), 6);
    assert_eq!(held.get(), 0);
}

#[test]
fn reset_leaves_both_banks_at_rest() {
    let rig = Rig::new([0, 0]);
    futures_lite::future::block_on(rig.router.actuator().reset_outputs()).unwrap();
    assert_eq!(rig.log.writes(), vec![(Bank::A, 0xFF), (Bank::B, 0xFF)]);
    assert_eq!(rig.router.actuator().driven(Bank::B), Some(0xFF));
}
