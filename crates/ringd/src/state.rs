//! Per-node runtime state shared by the receive and logic tasks.
//!
//! Each field is guarded on its own. No operation needs a consistent view
//! of two fields at once, so there is no node-wide lock and nothing here is
//! ever held across the hold period or a network await.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use ring_core::NodeId;
use ring_services::{Reassembler, SequenceTracker};

use crate::signal::TokenSignal;

pub struct NodeState {
    /// Own running sequence, shared by token and data numbering.
    sequence: AtomicU32,
    pub(crate) liveness: LivenessClock,
    pub(crate) tracker: SequenceTracker,
    inbound: Mutex<Reassembler>,
    pub(crate) signal: TokenSignal,
}

impl NodeState {
    pub fn new(local_id: NodeId) -> Self {
        Self {
            sequence: AtomicU32::new(0),
            liveness: LivenessClock::new(),
            tracker: SequenceTracker::new(),
            inbound: Mutex::new(Reassembler::new(local_id)),
            signal: TokenSignal::new(),
        }
    }

    /// Increment the own sequence and return the new value.
    pub fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// The value `next_sequence` would return, without consuming it.
    pub fn peek_next_sequence(&self) -> u32 {
        self.sequence.load(Ordering::SeqCst).wrapping_add(1)
    }

    pub fn current_sequence(&self) -> u32 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub(crate) fn inbound(&self) -> MutexGuard<'_, Reassembler> {
        self.inbound.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// When ring traffic was last observed, stored as an offset from a fixed
/// epoch so it fits in an atomic.
pub struct LivenessClock {
    epoch: Instant,
    last_ms: AtomicU64,
}

impl LivenessClock {
    /// Starts as if a token had just been observed.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            last_ms: AtomicU64::new(0),
        }
    }

    pub fn touch(&self) {
        let now = self.epoch.elapsed().as_millis() as u64;
        self.last_ms.store(now, Ordering::SeqCst);
    }

    /// Time since the last `touch` (or since construction).
    pub fn since_last(&self) -> Duration {
        let last = Duration::from_millis(self.last_ms.load(Ordering::SeqCst));
        self.epoch.elapsed().saturating_sub(last)
    }
}

impl Default for LivenessClock {
    fn default() -> Self {
        Self::new()
    }
}
