//! Status codes for management operations
//!
//! Re-issuing a management operation (adding what is already there,
//! pausing what is already paused) is not an error: the operation is a
//! no-op and reports why.

use std::fmt;

/// Outcome of an idempotent management operation
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    AlreadyPresent,
    AlreadyAbsent,
    AlreadyPaused,
    AlreadyResumed,
    Absent,
}

impl Status {
    #[inline]
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "ok",
            Status::AlreadyPresent => "already present",
            Status::AlreadyAbsent => "already absent",
            Status::AlreadyPaused => "already paused",
            Status::AlreadyResumed => "already resumed",
            Status::Absent => "absent",
        };
        f.write_str(s)
    }
}
