//! Server-authoritative timestamps for writes.

use crate::types::Timestamp;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the timestamp stamped onto every write.
pub trait ServerClock: Send + Sync {
    fn now_from_server(&self) -> Timestamp;
}

/// Wall clock of the local host.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl ServerClock for SystemClock {
    fn now_from_server(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Settable clock for deterministic writes.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            micros: AtomicI64::new(start.0),
        }
    }

    pub fn set(&self, at: Timestamp) {
        self.micros.store(at.0, Ordering::SeqCst);
    }

    pub fn advance(&self, micros: i64) {
        self.micros.fetch_add(micros, Ordering::SeqCst);
    }
}

impl ServerClock for ManualClock {
    fn now_from_server(&self) -> Timestamp {
        Timestamp(self.micros.load(Ordering::SeqCst))
    }
}
