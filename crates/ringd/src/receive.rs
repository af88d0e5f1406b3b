//! Receive-dispatch task: decode each datagram and route it by tag.

use anyhow::Result;

use ring_core::wire::{Message, Token, MESSAGE_LEN};
use ring_services::EventKind;

use crate::node::RingNode;
use crate::transport::Transport;

/// Larger than any valid message so oversized datagrams show up as such.
const RECV_BUF_LEN: usize = 64;

/// What the node made of an inbound token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutcome {
    /// We originated it; dropped.
    OwnOrigin,
    /// Sequence not newer than the last one from that origin; dropped.
    Stale,
    /// Accepted, addressed to someone else. Liveness refreshed.
    Observed,
    /// Accepted and addressed to us. Signal raised.
    Mine,
}

/// Runs until the task is aborted; receive errors are logged and skipped.
pub async fn receive_loop<T: Transport>(node: RingNode<T>) -> Result<()> {
    let mut buf = [0u8; RECV_BUF_LEN];

    tracing::debug!(node = node.id(), "receive loop starting");

    loop {
        let (len, from) = match node.inner.transport.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "recv_from failed");
                continue;
            }
        };
        tracing::trace!(len, %from, "datagram received");
        node.handle_datagram(&buf[..len]);
    }
}

impl<T: Transport> RingNode<T> {
    /// Decode and dispatch one datagram. Malformed and unknown messages are
    /// dropped here; nothing on this path is fatal.
    pub fn handle_datagram(&self, datagram: &[u8]) {
        if datagram.len() != MESSAGE_LEN {
            tracing::trace!(len = datagram.len(), "dropping datagram with bad length");
            return;
        }
        let message = match Message::decode(datagram) {
            Ok(m) => m,
            Err(e) => {
                tracing::trace!(error = %e, "dropping malformed datagram");
                return;
            }
        };

        match message {
            Message::Token(token) => {
                self.on_token(&token);
            }
            Message::DataHeader(header) => self.inner.state.inbound().on_header(&header),
            Message::DataChunk(chunk) => self.inner.state.inbound().on_chunk(&chunk),
            Message::DataEnd(end) => {
                let done = self.inner.state.inbound().on_end(&end);
                if let Some(done) = done {
                    tracing::info!(
                        from = done.origin,
                        to = done.destination,
                        seq = done.sequence,
                        len = done.payload.len(),
                        data = hex::encode(&done.payload),
                        "data received"
                    );
                    self.record(EventKind::data_received(
                        done.sequence,
                        done.origin,
                        done.destination,
                        &done.payload,
                    ));
                }
            }
            Message::Unknown(tag) => {
                tracing::trace!(tag, "dropping unknown message type");
            }
        }
    }

    /// Token receipt: own-origin filter, sequence filter, liveness refresh,
    /// and the "token is mine" signal.
    pub fn on_token(&self, token: &Token) -> TokenOutcome {
        let id = self.id();
        if token.origin == id {
            tracing::debug!(seq = token.sequence, "ignoring own token");
            return TokenOutcome::OwnOrigin;
        }

        let state = &self.inner.state;
        if !state.tracker.accept(token.origin, token.sequence) {
            tracing::debug!(
                origin = token.origin,
                seq = token.sequence,
                last_seen = state.tracker.last_seen(token.origin),
                "dropping stale or duplicate token"
            );
            return TokenOutcome::Stale;
        }

        state.liveness.touch();
        tracing::info!(
            origin = token.origin,
            seq = token.sequence,
            dst = token.destination,
            "token observed"
        );

        if token.destination != id {
            return TokenOutcome::Observed;
        }

        self.record(EventKind::TokenReceived {
            seq: token.sequence,
            from: token.origin,
        });
        state.signal.raise();
        TokenOutcome::Mine
    }
}
