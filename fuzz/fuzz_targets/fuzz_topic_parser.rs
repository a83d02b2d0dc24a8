//! Fuzz target: `LockerCommand::parse`
//!
//! Drives arbitrary topic strings into the command parser and asserts it
//! never panics and never yields an open command for an id outside 1–16
//! or for a foreign token.
//!
//! cargo fuzz run fuzz_topic_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartlocker::app::commands::LockerCommand;
use smartlocker::app::topics::{SessionToken, Topics};

fuzz_target!(|data: &[u8]| {
    let Ok(topic) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(token) = SessionToken::new("Ab3xYz") else {
        return;
    };
    let topics = Topics::new(token);

    if let Some(LockerCommand::Open { kind, id }) = LockerCommand::parse(&topics, topic) {
        assert!((1..=16).contains(&id.get()));
        assert!(topic.starts_with("Ab3xYz/"));
        // Whatever parsed must be exactly the topic we would subscribe to.
        assert_eq!(topics.open(kind, id), topic);
    }
});
