//! Daily message-usage counters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Message counter for one (user, calendar date) pair.
///
/// Usage "resets" by keying records per day rather than mutating in place;
/// a missing record means zero messages sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyUsage {
    pub user_id: String,
    pub date: NaiveDate,
    pub messages_sent: i32,
}

/// Outcome of an attempted send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendDecision {
    /// Whether the send was accepted and counted.
    pub accepted: bool,
    /// Counter value after the attempt (unchanged when rejected).
    pub new_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_decision_serde() {
        let decision = SendDecision {
            accepted: false,
            new_count: 10,
        };
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"accepted\":false"));
        assert!(json.contains("\"new_count\":10"));
    }
}
