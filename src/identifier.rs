//! Pseudo time-based identifiers.
//!
//! A session identifier looks like a UUID but carries its creation time in the
//! first two groups, so elapsed time can be checked without a side table:
//!
//! ```text
//! 018bcfe5-6800-1a3f-9c41-0d2e7f5a8b16
//! └─ timestamp ─┘ │ └────── random ──────┘
//!                 version marker
//! ```

use crate::platform::RandomSource;

/// First character of group 3 in identifiers this crate mints.
pub const PSEUDO_VERSION: char = '1';

/// Seconds between the Gregorian epoch (1582-10-15) and the Unix epoch.
const GREGORIAN_OFFSET_SECS: i64 = 12_219_292_800;

/// 100-nanosecond ticks per second in RFC-4122 version 1 timestamps.
const TICKS_PER_SEC: i64 = 10_000_000;

/// Encode `timestamp_ms` into a new identifier.
///
/// Timestamps below 2^48 ms (until year 10889) produce the canonical 8-4-4-4-12
/// layout. Larger values widen group 1 instead of dropping digits.
pub fn encode(timestamp_ms: u64, random: &dyn RandomSource) -> String {
    let stamp = format!("{:012x}", timestamp_ms);
    let (time_low, time_mid) = stamp.split_at(stamp.len() - 4);

    let mut noise = [0u8; 10];
    random.fill(&mut noise);
    let noise = hex::encode(noise);

    format!(
        "{}-{}-{}{}-{}-{}",
        time_low,
        time_mid,
        PSEUDO_VERSION,
        &noise[0..3],
        &noise[3..7],
        &noise[7..19]
    )
}

/// Recover the millisecond timestamp embedded in `identifier`.
///
/// Returns `None` for anything that is not five dash-separated groups of hex.
/// Identifiers whose group 3 does not start with the pseudo marker are read as
/// RFC-4122 version 1 UUIDs, at whole-second precision.
pub fn decode(identifier: &str) -> Option<i64> {
    let groups: Vec<&str> = identifier.split('-').collect();
    let [time_low, time_mid, time_hi, _, _] = groups.as_slice() else {
        return None;
    };

    if time_hi.starts_with(PSEUDO_VERSION) {
        return parse_hex(&[time_low, time_mid]);
    }

    let mut chars = time_hi.chars();
    chars.next();
    let ticks = parse_hex(&[chars.as_str(), time_mid, time_low])?;
    let unix_secs = ticks / TICKS_PER_SEC - GREGORIAN_OFFSET_SECS;
    unix_secs.checked_mul(1000)
}

/// True when `identifier` decodes to a timestamp.
pub fn is_valid(identifier: &str) -> bool {
    decode(identifier).is_some()
}

fn parse_hex(parts: &[&str]) -> Option<i64> {
    let digits: String = parts.concat();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    i64::from_str_radix(&digits, 16).ok()
}
