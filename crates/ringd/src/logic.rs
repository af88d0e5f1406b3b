//! Logic task: the token state machine.
//!
//! Every node waits for the "token is mine" signal, holds for the minimum
//! dwell, performs its application sends, and forwards a fresh token to its
//! successor. The origin additionally creates the first token and
//! regenerates it after a period of silence. Nobody else self-heals.

use anyhow::Result;

use crate::node::RingNode;
use crate::transport::Transport;

pub async fn logic_loop<T: Transport>(node: RingNode<T>) -> Result<()> {
    let timing = node.inner.timing.clone();
    let is_origin = node.inner.identity.is_origin();

    if is_origin {
        tracing::debug!(delay_ms = timing.settle_delay_ms, "origin settling before first token");
        tokio::time::sleep(timing.settle_delay()).await;
        node.create_token().await?;
    }

    loop {
        if node.inner.state.signal.wait(timing.poll_interval()).await {
            node.hold_and_forward().await?;
            continue;
        }

        if is_origin {
            let silent_for = node.inner.state.liveness.since_last();
            if silent_for > timing.token_timeout() {
                tracing::warn!(
                    silent_ms = silent_for.as_millis() as u64,
                    "token timeout, regenerating"
                );
                node.create_token().await?;
            }
        }
    }
}

impl<T: Transport> RingNode<T> {
    /// Origin only: put a new token on the ring and restart the timeout.
    pub(crate) async fn create_token(&self) -> Result<()> {
        let token = self.send_token().await?;
        self.inner.state.liveness.touch();
        tracing::info!(
            seq = token.sequence,
            to = token.destination,
            "token created"
        );
        Ok(())
    }

    /// We hold the token: dwell, run application sends, pass it on.
    pub(crate) async fn hold_and_forward(&self) -> Result<()> {
        tracing::debug!(hold_ms = self.inner.timing.hold_min_ms, "holding token");
        tokio::time::sleep(self.inner.timing.hold_min()).await;

        for outgoing in &self.inner.on_hold {
            self.send_outgoing(outgoing).await?;
        }
        for outgoing in self.drain_outbox() {
            self.send_outgoing(&outgoing).await?;
        }

        let token = self.send_token().await?;
        tracing::info!(
            seq = token.sequence,
            to = token.destination,
            "token forwarded"
        );
        Ok(())
    }
}
