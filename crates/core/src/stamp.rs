use std::cmp::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::CoreError;

/// Returns the current wall-clock time as milliseconds since Unix epoch.
pub fn physical_now() -> Result<u64, CoreError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|_| CoreError::InvalidData("system clock before epoch".into()))
}

/// A 12-byte creation/update stamp: 8 bytes wall_ms (big-endian u64)
/// followed by 4 bytes counter (big-endian u32).
///
/// Bytewise order of the encoded form equals chronological order, so the
/// stamp can be compared directly inside SQL `ORDER BY`.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct Stamp {
    wall_ms: u64,
    counter: u32,
}

impl Stamp {
    pub fn new(wall_ms: u64, counter: u32) -> Self {
        Self { wall_ms, counter }
    }

    pub fn wall_ms(&self) -> u64 {
        self.wall_ms
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn to_bytes(&self) -> [u8; 12] {
        let mut buf = [0u8; 12];
        buf[..8].copy_from_slice(&self.wall_ms.to_be_bytes());
        buf[8..].copy_from_slice(&self.counter.to_be_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8; 12]) -> Self {
        let mut wall = [0u8; 8];
        let mut counter = [0u8; 4];
        wall.copy_from_slice(&bytes[..8]);
        counter.copy_from_slice(&bytes[8..]);
        Self {
            wall_ms: u64::from_be_bytes(wall),
            counter: u32::from_be_bytes(counter),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: &[u8; 12] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidData(format!("stamp must be 12 bytes, got {}", bytes.len())))?;
        Ok(Self::from_bytes(arr))
    }
}

impl Ord for Stamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.wall_ms
            .cmp(&other.wall_ms)
            .then(self.counter.cmp(&other.counter))
    }
}

impl PartialOrd for Stamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Issues strictly increasing stamps for one storage connection.
#[derive(Debug, Default)]
pub struct StampClock {
    wall_ms: u64,
    counter: u32,
}

impl StampClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) -> Result<Stamp, CoreError> {
        let now = physical_now()?;
        if now > self.wall_ms {
            self.wall_ms = now;
            self.counter = 0;
        } else {
            self.counter = self
                .counter
                .checked_add(1)
                .ok_or_else(|| CoreError::InvalidData("stamp counter overflow".into()))?;
        }
        Ok(Stamp::new(self.wall_ms, self.counter))
    }
}
