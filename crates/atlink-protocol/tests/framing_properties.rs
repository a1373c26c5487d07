//! Property tests for response framing.
//!
//! Lines are compared after trimming, so any mix of `\r\n`, `\r` and `\n`
//! separators must yield the same line events, blank lines never produce an
//! event, and response completion depends only on the exact suffix.

use std::sync::{Arc, Mutex};

use atlink_protocol::{Delimiter, Intention, ResponseFramer};
use proptest::prelude::*;

/// Line content without terminators and without delimiter text.
fn line_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9+=,:? ]{0,12}".prop_filter("no delimiter text", |s| {
        !s.contains("OK") && !s.contains("ERROR") && !s.contains("Access")
    })
}

fn separator_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("\r\n"), Just("\r"), Just("\r\r\n")]
}

/// Feed `text` and collect line events.
fn collect_lines(text: &str) -> Vec<String> {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let mut framer = ResponseFramer::new();
    let l = lines.clone();
    framer.on_line(move |line| l.lock().unwrap().push(line.to_string()));
    framer.append_str(text, &Intention::data(), true);
    let collected = lines.lock().unwrap().clone();
    collected
}

#[test]
fn prop_line_events_independent_of_separator_style() {
    proptest!(|(
        lines in prop::collection::vec(line_strategy(), 1..8),
        seps in prop::collection::vec(separator_strategy(), 8)
    )| {
        let canonical: String = lines.iter().map(|l| format!("{l}\r")).collect();
        let mixed: String = lines
            .iter()
            .zip(seps.iter().cycle())
            .map(|(l, sep)| format!("{l}{sep}"))
            .collect();

        prop_assert_eq!(collect_lines(&canonical), collect_lines(&mixed));
    });
}

#[test]
fn prop_no_empty_line_events() {
    proptest!(|(text in "[ \t\r\na-z]{0,40}")| {
        for line in collect_lines(&text) {
            prop_assert!(!line.trim().is_empty());
            prop_assert_eq!(line.trim(), line.as_str());
        }
    });
}

#[test]
fn prop_completion_is_suffix_exact() {
    proptest!(|(prefix in line_strategy(), delimiter in prop_oneof![
        Just(Delimiter::Ok),
        Just(Delimiter::Error),
        Just(Delimiter::AccessDenied),
    ])| {
        let mut framer = ResponseFramer::new();
        let text = format!("{prefix}\r{}", delimiter.marker());
        prop_assert_eq!(framer.append_str(&text, &Intention::data(), true), 1);
        prop_assert!(framer.is_empty());

        let mut framer = ResponseFramer::new();
        let text = format!("{prefix}\rOKAYX");
        prop_assert_eq!(framer.append_str(&text, &Intention::data(), true), 0);
    });
}
