//! Classification of upstream stream records.
//!
//! Each line from the worker is expected to be a JSON object of the form
//! `{"t": "console" | "reliable" | "metrics", ...}`. Lines that do not fit
//! that shape are never dropped: they degrade to a console event wrapping the
//! raw text.

use hud_core::{Event, EventKind};
use serde_json::Value;

/// Turns one upstream line into an event.
///
/// Returns `None` only for blank lines. The line is trimmed before parsing.
///
/// - Object with a recognized `t` tag: that kind, payload forwarded verbatim
/// - Object with an unrecognized, missing or non-string `t`: console, raw text
/// - Anything that is not a JSON object: console, raw text
pub fn classify_line(line: &str) -> Option<Event> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(line) else {
        return Some(Event::console(line));
    };

    let tag = map.get("t").and_then(Value::as_str).unwrap_or_default();
    match tag {
        "console" | "reliable" | "metrics" => Some(Event::new(EventKind::from_tag(tag), map)),
        _ => Some(Event::console(line)),
    }
}
