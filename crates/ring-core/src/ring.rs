//! Ring membership and node identity.
//!
//! The ring is a fixed, sorted set of node ids. Circulation order is
//! ascending id, wrapping from the largest back to the smallest. The
//! smallest id is the token origin: the only node allowed to create or
//! regenerate the token.

use std::net::SocketAddr;

/// Node identifier. One byte on the wire.
pub type NodeId = u8;

/// Sorted, deduplicated set of ring members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingMembership {
    members: Vec<NodeId>,
}

impl RingMembership {
    pub fn new(members: impl IntoIterator<Item = NodeId>) -> Result<Self, RingError> {
        let mut members: Vec<NodeId> = members.into_iter().collect();
        members.sort_unstable();
        members.dedup();
        if members.is_empty() {
            return Err(RingError::EmptyRing);
        }
        Ok(Self { members })
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.members.binary_search(&id).is_ok()
    }

    /// The designated origin: the smallest member.
    pub fn origin(&self) -> NodeId {
        self.members[0]
    }

    /// Next member after `id` in ascending order, wrapping to the smallest.
    ///
    /// Total over all ids: a non-member's successor is the first member
    /// greater than it, or the smallest member.
    pub fn successor(&self, id: NodeId) -> NodeId {
        let idx = match self.members.binary_search(&id) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        self.members.get(idx).copied().unwrap_or(self.members[0])
    }

    /// Every member except `id`, in ring order.
    pub fn peers_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.members.iter().copied().filter(move |m| *m != id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Who this node is and where it sits. Immutable once built.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    id: NodeId,
    bind_addr: SocketAddr,
    ring: RingMembership,
}

impl NodeIdentity {
    pub fn new(id: NodeId, bind_addr: SocketAddr, ring: RingMembership) -> Result<Self, RingError> {
        if !ring.contains(id) {
            return Err(RingError::NotAMember(id));
        }
        Ok(Self {
            id,
            bind_addr,
            ring,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn ring(&self) -> &RingMembership {
        &self.ring
    }

    pub fn successor(&self) -> NodeId {
        self.ring.successor(self.id)
    }

    pub fn is_origin(&self) -> bool {
        self.ring.origin() == self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    #[error("ring membership is empty")]
    EmptyRing,
    #[error("node {0} is not a member of the ring")]
    NotAMember(NodeId),
}
