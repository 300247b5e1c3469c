use std::sync::LazyLock;

use regex::Regex;

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}/\d{2}/\d{2}, \d{1,2}:\d{2}\s?(?:am|pm)\s-\s[^:]+: ").unwrap()
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+").unwrap()
});
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?91[\-\s]?)?[6789]\d{4}[\-\s]?\d{5}").unwrap()
});
static PHONE_BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[6789]\d{9}\b").unwrap());

/// Strip the chat timestamp/sender prefix and redact PII-like substrings.
/// Idempotent: running it over already-clean text changes nothing.
pub fn clean_message(msg: &str) -> String {
    let msg = TIMESTAMP_RE.replace(msg, "");
    let msg = EMAIL_RE.replace_all(&msg, "[EMAIL]");
    let msg = PHONE_RE.replace_all(&msg, "[PHONE]");
    let msg = PHONE_BARE_RE.replace_all(&msg, "[PHONE]");
    msg.trim().to_string()
}
