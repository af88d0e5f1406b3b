//! A ring node: identity, shared state, and the two tasks that drive it.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::sync::broadcast;

use ring_core::config::{HoldSend, TimingConfig};
use ring_core::wire::MAX_DATA_LEN;
use ring_core::{NodeId, NodeIdentity, WireError};
use ring_services::{EventKind, EventRecord, SharedSink};

use crate::state::NodeState;
use crate::transport::Transport;
use crate::{logic, receive};

/// Application data waiting for the next token hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    To(NodeId, Bytes),
    Broadcast(Bytes),
}

/// Handle to a running (or runnable) node. Cheap to clone.
pub struct RingNode<T> {
    pub(crate) inner: Arc<NodeInner<T>>,
}

impl<T> Clone for RingNode<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub(crate) struct NodeInner<T> {
    pub(crate) identity: NodeIdentity,
    pub(crate) relay: SocketAddr,
    pub(crate) timing: TimingConfig,
    pub(crate) transport: T,
    pub(crate) events: SharedSink,
    pub(crate) state: NodeState,
    pub(crate) on_hold: Vec<Outgoing>,
    pub(crate) outbox: Mutex<VecDeque<Outgoing>>,
}

impl<T: Transport> RingNode<T> {
    pub fn new(
        identity: NodeIdentity,
        relay: SocketAddr,
        timing: TimingConfig,
        transport: T,
        events: SharedSink,
    ) -> Self {
        let state = NodeState::new(identity.id());
        Self {
            inner: Arc::new(NodeInner {
                identity,
                relay,
                timing,
                transport,
                events,
                state,
                on_hold: Vec::new(),
                outbox: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Sends to perform on every hold. Only valid before the node is shared.
    pub fn with_hold_sends(mut self, sends: &[HoldSend]) -> Self {
        let on_hold = sends
            .iter()
            .map(|s| {
                let data = Bytes::copy_from_slice(s.data.as_bytes());
                match s.to {
                    Some(to) => Outgoing::To(to, data),
                    None => Outgoing::Broadcast(data),
                }
            })
            .collect();
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.on_hold = on_hold;
        } else {
            tracing::warn!("node already shared, hold sends ignored");
        }
        self
    }

    pub fn id(&self) -> NodeId {
        self.inner.identity.id()
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.inner.identity
    }

    pub fn state(&self) -> &NodeState {
        &self.inner.state
    }

    /// Queue a one-off send for the next time this node holds the token.
    pub fn queue_data(&self, to: NodeId, payload: impl Into<Bytes>) -> Result<(), WireError> {
        self.enqueue(|p| Outgoing::To(to, p), payload.into())
    }

    /// Queue a one-off send to every other member.
    pub fn queue_broadcast(&self, payload: impl Into<Bytes>) -> Result<(), WireError> {
        self.enqueue(Outgoing::Broadcast, payload.into())
    }

    fn enqueue(&self, wrap: impl FnOnce(Bytes) -> Outgoing, payload: Bytes) -> Result<(), WireError> {
        if payload.len() > MAX_DATA_LEN {
            return Err(WireError::PayloadTooLarge(payload.len()));
        }
        self.inner
            .outbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(wrap(payload));
        Ok(())
    }

    pub(crate) fn drain_outbox(&self) -> Vec<Outgoing> {
        self.inner
            .outbox
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect()
    }

    pub(crate) fn record(&self, kind: EventKind) {
        self.inner.events.record(EventRecord::now(self.id(), kind));
    }

    /// Send one datagram to the relay. A send failure means the node can no
    /// longer take part in the ring, so it is returned to the caller.
    pub(crate) async fn transmit(&self, bytes: &[u8]) -> Result<()> {
        self.inner
            .transport
            .send_to(bytes, self.inner.relay)
            .await
            .with_context(|| format!("failed to send to relay {}", self.inner.relay))?;
        Ok(())
    }

    /// Run the receive and logic tasks until shutdown or until one fails.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        tracing::info!(
            node = self.id(),
            origin = self.inner.identity.is_origin(),
            successor = self.inner.identity.successor(),
            relay = %self.inner.relay,
            "ring node starting"
        );

        let mut receive_task = tokio::spawn(receive::receive_loop(self.clone()));
        let mut logic_task = tokio::spawn(logic::logic_loop(self.clone()));

        let result = tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!(node = self.id(), "ring node shutting down");
                Ok(())
            }
            r = &mut receive_task => task_result("receive", r),
            r = &mut logic_task   => task_result("logic", r),
        };

        receive_task.abort();
        logic_task.abort();
        result
    }
}

fn task_result(
    name: &str,
    joined: Result<Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match joined {
        Ok(Ok(())) => anyhow::bail!("{name} task exited unexpectedly"),
        Ok(Err(e)) => Err(e.context(format!("{name} task failed"))),
        Err(e) => Err(anyhow::Error::new(e).context(format!("{name} task panicked"))),
    }
}
