use std::time::{
    SystemTime,
    UNIX_EPOCH,
};



/// Event keys the front-end is known to send. Anything else is still
/// accepted, but logged as a warning.
pub const KNOWN_KEYS: &[&str] = &[
    "page_view",
    "convert",
    "swap_currencies",
    "copy_result",
    "select_coin",
];



/// Opaque client side usage event, as received on /api/log/{key}.
///
/// `timestamp` - unix seconds when the event was received.
/// `known` - whether `key` is one of `KNOWN_KEYS`.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageEvent {
    pub key: String,
    pub known: bool,
    pub timestamp: u64,
}



impl UsageEvent {
    pub fn new(key: &str) -> Self {
        // Clock before epoch is not worth failing a telemetry call over.
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            key: key.to_string(),
            known: KNOWN_KEYS.contains(&key),
            timestamp,
        }
    }
}
