//! ringd integration test harness.
//!
//! Every test runs a whole ring in-process over loopback UDP:
//!
//!   node sockets (127.0.0.1:0) ──► relay ──► every node, sender included
//!
//! The relay stands in for the shared broadcast medium. It can be given a
//! filter to drop datagrams, which is how the fault tests lose tokens.
//!
//!   cargo test --test integration

mod circulation;
mod data;
mod fault;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use ring_core::config::{HoldSend, TimingConfig};
use ring_core::{NodeId, NodeIdentity, RingMembership};
use ring_services::{EventKind, MemoryEventLog};
use ringd::{bind_udp, RingNode};

pub use infra::{spawn_relay, DatagramFilter, Relay};

// ── Harness ───────────────────────────────────────────────────────────────────

/// Short timings so a full revolution takes well under a second.
pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        hold_min_ms: 20,
        token_timeout_ms: 400,
        poll_interval_ms: 10,
        settle_delay_ms: 50,
    }
}

/// One running node and its in-memory event log.
pub struct TestNode {
    pub id: NodeId,
    pub addr: SocketAddr,
    pub node: RingNode<UdpSocket>,
    pub log: MemoryEventLog,
    task: JoinHandle<Result<()>>,
}

/// A whole ring plus its relay. Dropping it stops everything.
pub struct TestRing {
    pub nodes: Vec<TestNode>,
    pub relay: Relay,
    shutdown: broadcast::Sender<()>,
}

impl TestRing {
    pub fn node(&self, id: NodeId) -> &TestNode {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .expect("no such node in test ring")
    }

    /// True if no node task has exited (they only exit on a fatal error).
    pub fn all_running(&self) -> bool {
        self.nodes.iter().all(|n| !n.task.is_finished())
    }
}

impl Drop for TestRing {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        for n in &self.nodes {
            n.task.abort();
        }
    }
}

/// Start nodes `ids` with `timing`, each performing `hold_sends(id)` on
/// every hold, joined by a relay that applies `filter`.
pub async fn start_ring(
    ids: &[NodeId],
    timing: TimingConfig,
    hold_sends: impl Fn(NodeId) -> Vec<HoldSend>,
    filter: Option<DatagramFilter>,
) -> Result<TestRing> {
    let ring = RingMembership::new(ids.iter().copied())?;

    let mut sockets = Vec::new();
    for id in ring.members() {
        let socket = bind_udp("127.0.0.1:0".parse()?).context("bind node socket")?;
        let addr = socket.local_addr()?;
        sockets.push((*id, addr, socket));
    }

    let relay = spawn_relay(sockets.iter().map(|(_, addr, _)| *addr).collect(), filter).await?;
    let (shutdown, _) = broadcast::channel(1);

    let mut nodes = Vec::new();
    for (id, addr, socket) in sockets {
        let identity = NodeIdentity::new(id, addr, ring.clone())?;
        let log = MemoryEventLog::new();
        let node = RingNode::new(identity, relay.addr, timing.clone(), socket, Arc::new(log.clone()))
            .with_hold_sends(&hold_sends(id));
        let task = tokio::spawn(node.clone().run(shutdown.subscribe()));
        nodes.push(TestNode {
            id,
            addr,
            node,
            log,
            task,
        });
    }

    Ok(TestRing {
        nodes,
        relay,
        shutdown,
    })
}

/// Poll `log` until some event satisfies `pred`, or fail after `timeout`.
pub async fn wait_for_event(
    log: &MemoryEventLog,
    timeout: Duration,
    pred: impl Fn(&EventKind) -> bool,
) -> Result<EventKind> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(kind) = log.filter(&pred).into_iter().next() {
            return Ok(kind);
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("event not seen within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Token sequence numbers a node has sent, in order.
pub fn sent_token_seqs(log: &MemoryEventLog) -> Vec<(u32, NodeId)> {
    log.filter(|k| matches!(k, EventKind::TokenSent { .. }))
        .into_iter()
        .filter_map(|k| match k {
            EventKind::TokenSent { seq, to } => Some((seq, to)),
            _ => None,
        })
        .collect()
}
