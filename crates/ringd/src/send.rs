//! Outbound token and data transmission.

use anyhow::Result;

use ring_core::wire::{chunk_payload, DataEnd, DataHeader, Token, MAX_DATA_LEN};
use ring_core::{NodeId, WireError};
use ring_services::EventKind;

use crate::node::{Outgoing, RingNode};
use crate::transport::Transport;

impl<T: Transport> RingNode<T> {
    /// Send a new token to our successor with the next own sequence.
    pub(crate) async fn send_token(&self) -> Result<Token> {
        let token = Token {
            origin: self.id(),
            sequence: self.inner.state.next_sequence(),
            destination: self.inner.identity.successor(),
        };
        self.transmit(&token.encode()).await?;
        self.record(EventKind::TokenSent {
            seq: token.sequence,
            to: token.destination,
        });
        Ok(token)
    }

    /// Header, one chunk per 7 bytes, end marker — all to the relay.
    ///
    /// The transfer is numbered with the own sequence plus one, truncated to
    /// 16 bits. The counter itself is left alone, so several sends during one
    /// hold share a number, and the token forwarded afterwards reuses it.
    pub async fn send_data(&self, to: NodeId, payload: &[u8]) -> Result<u16> {
        if payload.len() > MAX_DATA_LEN {
            return Err(WireError::PayloadTooLarge(payload.len()).into());
        }
        let origin = self.id();
        let sequence = self.inner.state.peek_next_sequence() as u16;

        self.record(EventKind::data_sent(sequence, to, payload));
        tracing::info!(to, seq = sequence, len = payload.len(), "sending data");

        let header = DataHeader {
            origin,
            sequence,
            destination: to,
            total_len: payload.len() as u8,
        };
        self.transmit(&header.encode()).await?;

        for chunk in chunk_payload(payload) {
            self.transmit(&chunk.encode()).await?;
        }

        let end = DataEnd {
            origin,
            sequence,
            destination: to,
        };
        self.transmit(&end.encode()).await?;

        tracing::debug!(seq = sequence, "data transmission finished");
        Ok(sequence)
    }

    /// `send_data` to every other ring member, in ring order.
    pub async fn broadcast_data(&self, payload: &[u8]) -> Result<()> {
        let peers: Vec<NodeId> = self.inner.identity.ring().peers_of(self.id()).collect();
        for peer in peers {
            self.send_data(peer, payload).await?;
        }
        Ok(())
    }

    pub(crate) async fn send_outgoing(&self, outgoing: &Outgoing) -> Result<()> {
        match outgoing {
            Outgoing::To(to, payload) => self.send_data(*to, payload).await.map(|_| ()),
            Outgoing::Broadcast(payload) => self.broadcast_data(payload).await,
        }
    }
}
