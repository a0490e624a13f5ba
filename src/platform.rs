//! Platform capabilities: wall clock, random bytes, and the platform name.
//!
//! Each host supplies one [`Platform`] at construction time. The defaults use the
//! system clock and the thread-local RNG; tests and replays swap in
//! [`ManualClock`] and [`SeededRandom`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Source of the current time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Source of unpredictable bytes. Collision resistance is the only requirement.
pub trait RandomSource: Send + Sync {
    fn fill(&self, buf: &mut [u8]);
}

/// Wall clock backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: u64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance_minutes(&self, minutes: u64) {
        self.now.fetch_add(minutes * 60_000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Random bytes from `rand::thread_rng`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn fill(&self, buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf);
    }
}

/// Deterministic random bytes from a seeded `StdRng`.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn fill(&self, buf: &mut [u8]) {
        self.rng.lock().fill_bytes(buf);
    }
}

/// The capability set a host injects: its name on the wire, a clock, and randomness.
#[derive(Clone)]
pub struct Platform {
    /// Sent as the `d` query parameter ("android", "ios", "linux", ...).
    pub name: String,
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
}

impl Platform {
    pub fn new(name: impl Into<String>, clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            name: name.into(),
            clock,
            random,
        }
    }

    /// System clock, thread RNG, and the compile-time OS name.
    pub fn system() -> Self {
        Self::new(std::env::consts::OS, Arc::new(SystemClock), Arc::new(ThreadRandom))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").field("name", &self.name).finish_non_exhaustive()
    }
}
