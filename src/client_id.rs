//! Per-install client identifiers.
//!
//! A client id is 5 random alphanumerics followed by a 10-digit compact
//! creation stamp (`YYMMDDHHmm`), e.g. `aZ3kQ2401150930`. The stamp uses fixed
//! month and year lengths, so it only approximates the calendar; it keeps ids
//! roughly sortable by creation time.

use crate::platform::{Clock, RandomSource};
use crate::store::IdentityStore;
use tracing::debug;

/// Length of every valid client id.
pub const CLIENT_ID_LEN: usize = 15;

const STAMP_LEN: usize = 10;
const RANDOM_PART_LEN: usize = CLIENT_ID_LEN - STAMP_LEN;
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_MONTH: u64 = 2_629_746;
const SECS_PER_YEAR: u64 = 31_556_952;

/// Return the stored client id, minting and persisting a new one if the stored
/// value is missing or not exactly 15 characters long.
pub fn get_or_create(store: &IdentityStore, clock: &dyn Clock, random: &dyn RandomSource) -> String {
    if let Some(existing) = store.client_id() {
        if existing.chars().count() == CLIENT_ID_LEN {
            return existing;
        }
        debug!(len = existing.chars().count(), "Discarding malformed client id");
    }

    let client_id = mint(clock.now_millis(), random);
    store.set_client_id(&client_id);
    debug!(client_id = %client_id, "Minted client id");
    client_id
}

/// Build a fresh client id for `now_millis`.
pub fn mint(now_millis: u64, random: &dyn RandomSource) -> String {
    let mut id = random_alphanumeric(RANDOM_PART_LEN, random);
    id.push_str(&compact_timestamp(now_millis));
    id
}

/// `YYMMDDHHmm` with 31-day months for the day field, ~30.44-day months for the
/// month field, and ~365.24-day years.
pub fn compact_timestamp(millis: u64) -> String {
    let seconds = millis / 1000;
    let minutes = (seconds / 60) % 60;
    let hours = (seconds / 3600) % 24;
    let days = (seconds / SECS_PER_DAY) % 31 + 1;
    let months = (seconds / SECS_PER_MONTH) % 12 + 1;
    let years = seconds / SECS_PER_YEAR + 1970;

    format!(
        "{:02}{:02}{:02}{:02}{:02}",
        years % 100,
        months,
        days,
        hours,
        minutes
    )
}

/// Uniform draw from `[a-zA-Z0-9]`, rejecting bytes that would bias the modulo.
fn random_alphanumeric(len: usize, random: &dyn RandomSource) -> String {
    let limit = (256 / ALPHABET.len() * ALPHABET.len()) as u8;
    let mut out = String::with_capacity(len);
    let mut buf = [0u8; 16];
    while out.len() < len {
        random.fill(&mut buf);
        for byte in buf.iter().copied().filter(|b| *b < limit) {
            if out.len() == len {
                break;
            }
            out.push(ALPHABET[byte as usize % ALPHABET.len()] as char);
        }
    }
    out
}
