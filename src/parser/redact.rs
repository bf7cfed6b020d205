//! Best-effort masking of obviously sensitive substrings.
//!
//! This is an explicit utility, not part of the parse path: callers decide
//! when to run it (typically before shipping text to the language model).
//! It is a masking pass, not a guarantee of PII removal.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

/// Spaced or hyphenated 16-digit groupings resembling card numbers.
/// Contiguous 16-digit runs fall through to the long-number rule.
static CARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}[ -]\d{4}[ -]\d{4}[ -]\d{4}\b").expect("card pattern is valid")
});

/// Runs of 10 or more digits, phone numbers included.
static LONG_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{10,}").expect("number pattern is valid"));

/// Replace email-like tokens, card-like groupings and long digit runs with
/// fixed placeholders. Emails go first so their digits are not half-eaten by
/// the number rule, cards before plain numbers so groupings stay whole.
#[must_use]
pub fn redact_sensitive(text: &str) -> String {
    let pass = EMAIL_RE.replace_all(text, "[email removed]");
    let pass = CARD_RE.replace_all(&pass, "[card removed]");
    LONG_NUMBER_RE.replace_all(&pass, "[number removed]").into_owned()
}
