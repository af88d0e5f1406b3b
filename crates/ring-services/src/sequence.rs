//! Sequence tracking — the stale/duplicate token filter.

use std::sync::Arc;

use dashmap::DashMap;
use ring_core::NodeId;

/// Highest token sequence accepted per originating node.
///
/// Shared between the receive path and anything that wants to inspect it.
/// Entries are never removed.
#[derive(Clone, Default)]
pub struct SequenceTracker {
    last_seen: Arc<DashMap<NodeId, u32>>,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self {
            last_seen: Arc::new(DashMap::new()),
        }
    }

    /// Accept `seq` from `origin` iff it is strictly greater than the last
    /// accepted value. An origin never seen before always passes.
    ///
    /// The check and the update happen under the same entry lock.
    pub fn accept(&self, origin: NodeId, seq: u32) -> bool {
        match self.last_seen.entry(origin) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if seq <= *entry.get() {
                    return false;
                }
                entry.insert(seq);
                true
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(seq);
                true
            }
        }
    }

    /// Last accepted sequence from `origin`, if any.
    pub fn last_seen(&self, origin: NodeId) -> Option<u32> {
        self.last_seen.get(&origin).map(|v| *v)
    }

    /// Number of origins observed so far.
    pub fn origins(&self) -> usize {
        self.last_seen.len()
    }
}
