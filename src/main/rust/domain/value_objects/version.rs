use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

static LAST_VERSION_NANOS: AtomicU64 = AtomicU64::new(0);
static LAST_SESSION_VERSION: AtomicU64 = AtomicU64::new(0);

/// Resource version stamp, `<seconds>:<nanoseconds>`.
///
/// Stamps handed out by [`Version::now`] strictly increase within the process,
/// even when the system clock has a coarse resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    seconds: u64,
    nanoseconds: u32,
}

impl Version {
    pub fn new(seconds: u64, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    pub fn now() -> Self {
        let now = unix_nanos();
        let previous = LAST_VERSION_NANOS
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        let nanos = now.max(previous + 1);
        Self {
            seconds: nanos / 1_000_000_000,
            nanoseconds: (nanos % 1_000_000_000) as u32,
        }
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.seconds, self.nanoseconds)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Fresh SDP origin session version: NTP seconds, strictly increasing.
pub fn next_session_version() -> u64 {
    let now = unix_nanos() / 1_000_000_000 + NTP_UNIX_OFFSET;
    let previous = LAST_SESSION_VERSION
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(previous + 1)
}

fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_strictly_increase() {
        let mut last = Version::now();
        for _ in 0..1000 {
            let next = Version::now();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::new(1439299836, 10).to_string(), "1439299836:10");
    }

    #[test]
    fn test_session_versions_strictly_increase() {
        let first = next_session_version();
        let second = next_session_version();
        assert!(second > first);
        assert!(first > NTP_UNIX_OFFSET);
    }
}
