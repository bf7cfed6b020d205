//! Chat-export parser.
//!
//! Turns a loosely-structured chat export (WhatsApp-style text) into
//! structured, sender-attributed messages. The parser is a single pass over
//! the lines of the input: a line that matches the message-header pattern
//! starts a new message, any other non-blank line continues the body of the
//! message in flight. Malformed input never fails the parse; lines that
//! match nothing are simply dropped or folded into the previous message.

pub mod redact;

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of raw input lines kept for UI preview.
const PREVIEW_LINES: usize = 30;

/// Header pattern: optional bracket, date, time with optional am/pm marker,
/// optional closing bracket and dash, then `sender: body`. The date accepts
/// `/`, `-` or `.` separators with 1-2 digit day/month and 2 or 4 digit year.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[?\s*(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2,4}),?\s+(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([AaPp][Mm])?\s*\]?\s*-?\s*(.+?): (.*)$",
    )
    .expect("header pattern is valid")
});

/// Case-insensitive phrases that mark a line as a non-conversational
/// system notice (encryption banners, membership changes, deletions).
const SYSTEM_PATTERNS: &[&str] = &[
    "messages and calls are end-to-end encrypted",
    "end-to-end encrypted",
    "created group",
    "created this group",
    "added you",
    "joined using this group's invite link",
    "left the group",
    "was removed",
    "you removed",
    "changed the subject",
    "changed this group's icon",
    "changed their phone number",
    "security code changed",
    "your security code with",
    "this message was deleted",
    "you deleted this message",
    "<media omitted>",
    "image omitted",
    "missed voice call",
    "missed video call",
];

/// One reconstructed message from the export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedMessage {
    /// Opaque id, freshly generated per parse.
    pub id: Uuid,
    /// Local naive timestamp from the header line.
    pub timestamp: NaiveDateTime,
    pub sender: String,
    /// Body text; continuation lines are joined with `\n`.
    pub text: String,
    pub is_system: bool,
}

/// Result of parsing an export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseResult {
    /// Non-system messages in input order.
    pub messages: Vec<ParsedMessage>,
    /// Distinct non-system sender names, first-seen order.
    pub participants: Vec<String>,
    /// First raw lines of the input, system notices included.
    pub preview: Vec<String>,
}

impl ParseResult {
    /// True when at least one header line was recognized. Callers surface a
    /// "could not parse" condition when this is false for non-empty input.
    #[must_use]
    pub fn recognized_any(&self) -> bool {
        !self.messages.is_empty()
    }
}

/// Parse a raw chat export into structured messages.
///
/// Never fails: unmatched lines become continuations or are dropped, and an
/// input with no recognizable headers yields an empty message list with the
/// preview still populated.
#[must_use]
pub fn parse_export(text: &str) -> ParseResult {
    let mut messages = Vec::new();
    let mut participants: Vec<String> = Vec::new();
    let mut preview = Vec::new();
    let mut in_flight: Option<ParsedMessage> = None;

    for line in text.lines() {
        if preview.len() < PREVIEW_LINES {
            preview.push(line.to_string());
        }

        if let Some((timestamp, sender, body)) = match_header(line) {
            if let Some(done) = in_flight.take() {
                commit(done, &mut messages, &mut participants);
            }
            let body = body.trim().to_string();
            in_flight = Some(ParsedMessage {
                id: Uuid::new_v4(),
                timestamp,
                sender: sender.trim().to_string(),
                is_system: is_system_text(&body),
                text: body,
            });
        } else if !line.trim().is_empty() {
            // Continuation: line-wrapped or quoted text belonging to the
            // message in flight. Lines before the first header are dropped.
            if let Some(msg) = in_flight.as_mut() {
                msg.text.push('\n');
                msg.text.push_str(line);
            }
        }
    }

    if let Some(done) = in_flight.take() {
        commit(done, &mut messages, &mut participants);
    }

    ParseResult {
        messages,
        participants,
        preview,
    }
}

fn commit(msg: ParsedMessage, messages: &mut Vec<ParsedMessage>, participants: &mut Vec<String>) {
    if msg.is_system {
        return;
    }
    if !participants.iter().any(|p| p == &msg.sender) {
        participants.push(msg.sender.clone());
    }
    messages.push(msg);
}

/// Attempt to match a message-header line, returning timestamp, sender and
/// raw body. Returns None for anything that should be treated as a
/// continuation line.
fn match_header(line: &str) -> Option<(NaiveDateTime, String, String)> {
    let caps = HEADER_RE.captures(line)?;

    let p1: u32 = caps[1].parse().ok()?;
    let p2: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if year < 100 {
        year += 2000;
    }

    // Day-first when the first component cannot be a month, month-first when
    // the second cannot be, month-first otherwise. Ambiguous numeric dates
    // (01/02/03) stay ambiguous on purpose; fully ambiguous inputs default
    // to month-first to keep historical parses stable.
    let (day, month) = if p1 > 12 {
        (p1, p2)
    } else if p2 > 12 {
        (p2, p1)
    } else {
        (p2, p1)
    };

    let mut hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;
    let second: u32 = caps.get(6).map_or(Some(0), |m| m.as_str().parse().ok())?;

    // 12h -> 24h only when a marker was present.
    if let Some(marker) = caps.get(7) {
        let is_pm = marker.as_str().starts_with(['p', 'P']);
        if is_pm && hour != 12 {
            hour += 12;
        } else if !is_pm && hour == 12 {
            hour = 0;
        }
    }

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;

    Some((
        NaiveDateTime::new(date, time),
        caps[8].to_string(),
        caps[9].to_string(),
    ))
}

/// True when the body text is a system notice rather than conversation.
fn is_system_text(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SYSTEM_PATTERNS.iter().any(|p| lowered.contains(p))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_two_messages_with_continuation() {
        let input = "12/03/24, 9:15 am - Alice: hi\nthere\n12/03/24, 9:16 am - Bob: hello";
        let result = parse_export(input);

        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.participants, vec!["Alice", "Bob"]);

        let first = &result.messages[0];
        assert_eq!(first.sender, "Alice");
        assert_eq!(first.text, "hi\nthere");
        assert_eq!(first.timestamp.hour(), 9);
        assert_eq!(first.timestamp.minute(), 15);

        let second = &result.messages[1];
        assert_eq!(second.sender, "Bob");
        assert_eq!(second.text, "hello");
        assert_eq!(second.timestamp.minute(), 16);
    }

    #[test]
    fn test_continuation_lines_round_trip() {
        let input = "1/2/24, 10:00 - Alice: first\nsecond line\nthird line";
        let result = parse_export(input);

        let lines: Vec<&str> = result.messages[0].text.split('\n').collect();
        assert_eq!(lines, vec!["first", "second line", "third line"]);
    }

    #[test]
    fn test_system_notice_filtered_but_previewed() {
        let input = "12/03/24, 9:00 am - Alice: Messages and calls are end-to-end encrypted";
        let result = parse_export(input);

        assert!(result.messages.is_empty());
        assert!(result.participants.is_empty());
        assert_eq!(result.preview.len(), 1);
        assert!(result.preview[0].contains("end-to-end encrypted"));
    }

    #[test]
    fn test_day_first_when_first_part_exceeds_twelve() {
        let input = "25/03/24, 9:15 - Alice: hi";
        let result = parse_export(input);

        let ts = result.messages[0].timestamp;
        assert_eq!(ts.day(), 25);
        assert_eq!(ts.month(), 3);
        assert_eq!(ts.year(), 2024);
    }

    #[test]
    fn test_month_first_when_second_part_exceeds_twelve() {
        let input = "03/25/24, 9:15 - Alice: hi";
        let result = parse_export(input);

        let ts = result.messages[0].timestamp;
        assert_eq!(ts.month(), 3);
        assert_eq!(ts.day(), 25);
    }

    #[test]
    fn test_ambiguous_date_defaults_to_month_first() {
        let input = "01/02/03, 9:15 - Alice: hi";
        let result = parse_export(input);

        let ts = result.messages[0].timestamp;
        assert_eq!(ts.month(), 1);
        assert_eq!(ts.day(), 2);
        assert_eq!(ts.year(), 2003);
    }

    #[test]
    fn test_four_digit_year_and_dot_separator() {
        let input = "12.03.2024, 21:15:30 - Alice: hi";
        let result = parse_export(input);

        let ts = result.messages[0].timestamp;
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.hour(), 21);
        assert_eq!(ts.second(), 30);
    }

    #[test]
    fn test_pm_conversion() {
        let input = "12/03/24, 9:15 pm - Alice: hi";
        let result = parse_export(input);
        assert_eq!(result.messages[0].timestamp.hour(), 21);
    }

    #[test]
    fn test_noon_and_midnight() {
        let noon = parse_export("12/03/24, 12:00 pm - Alice: hi");
        assert_eq!(noon.messages[0].timestamp.hour(), 12);

        let midnight = parse_export("12/03/24, 12:00 am - Alice: hi");
        assert_eq!(midnight.messages[0].timestamp.hour(), 0);
    }

    #[test]
    fn test_no_marker_keeps_24h_time() {
        let input = "12/03/24, 9:15 - Alice: hi";
        let result = parse_export(input);
        assert_eq!(result.messages[0].timestamp.hour(), 9);
    }

    #[test]
    fn test_bracketed_header() {
        let input = "[12/03/24, 9:15:02] Alice: hi";
        let result = parse_export(input);
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].sender, "Alice");
    }

    #[test]
    fn test_empty_input() {
        let result = parse_export("");
        assert!(result.messages.is_empty());
        assert!(result.participants.is_empty());
        assert!(result.preview.is_empty());
        assert!(!result.recognized_any());
    }

    #[test]
    fn test_no_recognizable_headers_keeps_preview() {
        let input = "just some notes\nnothing structured here";
        let result = parse_export(input);

        assert!(result.messages.is_empty());
        assert!(result.participants.is_empty());
        assert_eq!(result.preview.len(), 2);
        assert!(!result.recognized_any());
    }

    #[test]
    fn test_preview_capped_at_thirty_lines() {
        let input = (0..50).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let result = parse_export(&input);
        assert_eq!(result.preview.len(), 30);
        assert_eq!(result.preview[0], "line 0");
    }

    #[test]
    fn test_out_of_range_date_becomes_continuation() {
        let input = "12/03/24, 9:15 - Alice: hi\n45/99/24, 9:16 - Bob: not a date";
        let result = parse_export(input);

        // The invalid-date line folds into Alice's message.
        assert_eq!(result.messages.len(), 1);
        assert!(result.messages[0].text.contains("not a date"));
        assert_eq!(result.participants, vec!["Alice"]);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let input = "12/03/24, 9:15 - Alice: hi\n\n12/03/24, 9:16 - Bob: yo";
        let result = parse_export(input);

        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.messages[0].text, "hi");
    }

    #[test]
    fn test_sender_trimmed_and_deduped() {
        let input = "12/03/24, 9:15 - Alice: one\n12/03/24, 9:16 - Alice: two";
        let result = parse_export(input);

        assert_eq!(result.participants, vec!["Alice"]);
        assert_eq!(result.messages.len(), 2);
    }

    #[test]
    fn test_timestamps_non_decreasing_for_chronological_export() {
        let input = "12/03/24, 9:15 - Alice: a\n12/03/24, 9:16 - Bob: b\n12/03/24, 9:16 - Alice: c";
        let result = parse_export(input);

        let stamps: Vec<_> = result.messages.iter().map(|m| m.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_reparse_is_idempotent_modulo_ids() {
        let input = "12/03/24, 9:15 am - Alice: hi\nthere\n12/03/24, 9:16 am - Bob: hello";
        let a = parse_export(input);
        let b = parse_export(input);

        assert_eq!(a.participants, b.participants);
        assert_eq!(a.messages.len(), b.messages.len());
        for (x, y) in a.messages.iter().zip(b.messages.iter()) {
            assert_eq!(x.sender, y.sender);
            assert_eq!(x.text, y.text);
            assert_eq!(x.timestamp, y.timestamp);
            assert_ne!(x.id, y.id);
        }
    }

    #[test]
    fn test_deleted_message_notice_is_system() {
        let input = "12/03/24, 9:15 - Alice: This message was deleted";
        let result = parse_export(input);
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_group_membership_notices_are_system() {
        let input = "12/03/24, 9:15 - Alice: Alice added you\n12/03/24, 9:16 - Bob: real message";
        let result = parse_export(input);

        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.participants, vec!["Bob"]);
    }

    #[test]
    fn test_colon_in_body_keeps_sender_non_greedy() {
        let input = "12/03/24, 9:15 - Alice: note: remember this";
        let result = parse_export(input);

        assert_eq!(result.messages[0].sender, "Alice");
        assert_eq!(result.messages[0].text, "note: remember this");
    }
}
