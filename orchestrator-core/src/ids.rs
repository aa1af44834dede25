//! Time-ordered opaque identifiers for workflows and sessions.
//!
//! Built on a UUID6 (draft RFC 9562) generator: big-endian timestamp prefix for
//! index locality, monotonic within a process, random node/clock-seq fields.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Offset (in 100ns ticks) between the UUID epoch (1582-10-15) and the Unix epoch.
const UUID_EPOCH_OFFSET: u64 = 0x01b2_1dd2_1381_4000;

static LAST_V6_TIMESTAMP: AtomicU64 = AtomicU64::new(0);

fn xorshift(seed: u64) -> u64 {
    let mut x = seed | 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

fn rand_u48() -> u64 {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5bd1_e995);
    xorshift(seed) & 0xffff_ffff_ffff
}

fn rand_u14() -> u64 {
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x27d4_eb2f);
    xorshift(seed.rotate_left(23)) & 0x3fff
}

/// UUID, version 6: time-ordered, monotonic within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uuid6 {
    bytes: [u8; 16],
}

impl Uuid6 {
    fn from_int(int_val: u64, node: u64, clock_seq: u64) -> Self {
        let mut bytes = [0u8; 16];
        let time_high = ((int_val >> 28) & 0xffff_ffff) as u32;
        let time_mid = ((int_val >> 12) & 0xffff) as u16;
        let time_low_and_version = (((int_val & 0xfff) as u16) & 0x0fff) | 0x6000;

        bytes[0..4].copy_from_slice(&time_high.to_be_bytes());
        bytes[4..6].copy_from_slice(&time_mid.to_be_bytes());
        bytes[6..8].copy_from_slice(&time_low_and_version.to_be_bytes());

        let clock_seq = ((clock_seq & 0x3fff) as u16) | 0x8000;
        bytes[8..10].copy_from_slice(&clock_seq.to_be_bytes());

        let node_bytes = node.to_be_bytes();
        bytes[10..16].copy_from_slice(&node_bytes[2..8]);

        Self { bytes }
    }

    pub fn as_bytes(&self) -> [u8; 16] {
        self.bytes
    }
}

impl fmt::Display for Uuid6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

/// Generates a new time-ordered UUID6, monotonic within this process.
pub fn uuid6() -> Uuid6 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let ticks_100ns = nanos / 100 + UUID_EPOCH_OFFSET;

    let ts = loop {
        let last = LAST_V6_TIMESTAMP.load(Ordering::SeqCst);
        let candidate = if ticks_100ns > last {
            ticks_100ns
        } else {
            last + 1
        };
        if LAST_V6_TIMESTAMP
            .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break candidate;
        }
    };

    Uuid6::from_int(ts, rand_u48(), rand_u14())
}

macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Allocates a new, time-ordered id.
            pub fn new() -> Self {
                Self(uuid6().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

opaque_id!(
    WorkflowId,
    "Opaque, time-ordered identifier for a workflow run; stable across resumes."
);
opaque_id!(
    SessionId,
    "Opaque identifier scoping conversational memory across many workflows."
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid6_has_version_nibble_set() {
        let u = uuid6();
        let s = u.to_string();
        let version_char = s.chars().nth(14).unwrap();
        assert_eq!(version_char, '6');
    }

    #[test]
    fn uuid6_string_format() {
        let s = uuid6().to_string();
        assert_eq!(s.len(), 36);
        assert_eq!(s.chars().filter(|&c| c == '-').count(), 4);
    }

    #[test]
    fn uuid6_is_roughly_monotonic() {
        let a = uuid6().to_string();
        let b = uuid6().to_string();
        assert!(b >= a);
    }

    #[test]
    fn workflow_id_new_is_unique() {
        let a = WorkflowId::new();
        let b = WorkflowId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn session_id_roundtrips_through_serde() {
        let id = SessionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn ids_display_match_inner_string() {
        let id = WorkflowId::from("wf-123".to_string());
        assert_eq!(id.to_string(), "wf-123");
        assert_eq!(id.as_str(), "wf-123");
    }
}
