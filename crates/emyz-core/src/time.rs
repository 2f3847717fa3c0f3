//! Time primitives
//!
//! Etales carry two stamps: the publish time set by the source peer and
//! the receive time set by the consumer. Both are microseconds since the
//! Unix epoch so that stamps from different peers are comparable.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Timestamp in microseconds
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MicroTime(pub i64);

impl MicroTime {
    pub const ZERO: MicroTime = MicroTime(0);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        MicroTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        MicroTime(millis * 1000)
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        MicroTime(i64::from_le_bytes(bytes))
    }

    /// Signed microseconds elapsed since `earlier`
    #[inline]
    pub fn micros_since(self, earlier: MicroTime) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        MicroTime(self.0.saturating_add(duration_micros(duration)))
    }
}

impl fmt::Debug for MicroTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Duration as whole microseconds, saturating at `i64::MAX`
#[inline]
pub fn duration_micros(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

/// Source of timestamps for the protocol components
pub trait Clock: Send + Sync {
    fn now(&self) -> MicroTime;
}

/// Wall clock, microseconds since the Unix epoch
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> MicroTime {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        MicroTime(duration_micros(since_epoch))
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicI64,
}

impl ManualClock {
    pub fn new(start: MicroTime) -> Self {
        ManualClock {
            micros: AtomicI64::new(start.0),
        }
    }

    pub fn set(&self, time: MicroTime) {
        self.micros.store(time.0, Ordering::SeqCst);
    }

    pub fn advance(&self, duration: Duration) {
        self.micros
            .fetch_add(duration_micros(duration), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> MicroTime {
        MicroTime(self.micros.load(Ordering::SeqCst))
    }
}
