use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Correlation identifier pairing one outbound request with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(u64);

/// Identifier of an exposed object, unique within its owning endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(u32);

impl CallId {
    pub fn new(value: u64) -> Self {
        CallId(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Renders the id the way it travels in transport metadata.
    pub fn to_header(&self) -> String {
        self.0.to_string()
    }
}

impl HandleId {
    pub fn new(value: u32) -> Self {
        HandleId(value)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleId({})", self.0)
    }
}

impl From<u64> for CallId {
    fn from(value: u64) -> Self {
        CallId::new(value)
    }
}

impl From<u32> for HandleId {
    fn from(value: u32) -> Self {
        HandleId::new(value)
    }
}

impl FromStr for CallId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(CallId)
    }
}

pub struct CallIdAllocator {
    next: AtomicU64,
}

pub struct HandleIdAllocator {
    next: AtomicU32,
}

impl CallIdAllocator {
    pub fn new() -> Self {
        CallIdAllocator {
            next: AtomicU64::new(1),
        }
    }

    pub fn allocate(&self) -> CallId {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        CallId::new(id)
    }

    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl HandleIdAllocator {
    pub fn new() -> Self {
        HandleIdAllocator {
            next: AtomicU32::new(1),
        }
    }

    pub fn allocate(&self) -> HandleId {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        HandleId::new(id)
    }

    pub fn peek_next(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for CallIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for HandleIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallIdAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallIdAllocator")
            .field("next", &self.peek_next())
            .finish()
    }
}

impl fmt::Debug for HandleIdAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleIdAllocator")
            .field("next", &self.peek_next())
            .finish()
    }
}
