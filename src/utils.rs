use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;

const MAX_BACKOFF_MS: u64 = 30_000;

/// Exponential backoff for `attempt` with up to 50% random jitter, capped at
/// 30 seconds.
pub(crate) fn jittered_delay(base_delay_ms: u64, attempt: u32) -> Duration {
    let base = base_delay_ms.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
    let jitter = match base / 2 {
        0 => 0,
        bound => rand::thread_rng().gen_range(0..bound),
    };
    Duration::from_millis(base.saturating_add(jitter).min(MAX_BACKOFF_MS))
}

/// Everything but `A-Z a-z 0-9 - _ . ~` is escaped.
const QUOTE_PLUS_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Form-style encoding: reserved characters including `/` are escaped and
/// spaces become `+`.
pub(crate) fn quote_plus(value: &str) -> String {
    value
        .split(' ')
        .map(|part| utf8_percent_encode(part, QUOTE_PLUS_ENCODE_SET).to_string())
        .collect::<Vec<_>>()
        .join("+")
}
