//! Inbound data reassembly.
//!
//! At most one transfer is tracked. A DataHeader starts it, DataChunks
//! append in arrival order, a DataEnd trims to the declared length and
//! completes it. There is no reordering, gap detection or retransmission:
//! a lost chunk shortens or corrupts the result.

use bytes::{Bytes, BytesMut};
use ring_core::wire::{DataChunk, DataEnd, DataHeader};
use ring_core::NodeId;

/// A transfer in progress.
#[derive(Debug, Clone)]
pub struct DataTransfer {
    pub origin: NodeId,
    pub sequence: u16,
    pub destination: NodeId,
    pub total_len: usize,
    buf: BytesMut,
    chunks: usize,
}

impl DataTransfer {
    fn new(header: &DataHeader) -> Self {
        Self {
            origin: header.origin,
            sequence: header.sequence,
            destination: header.destination,
            total_len: header.total_len as usize,
            buf: BytesMut::with_capacity(header.total_len as usize),
            chunks: 0,
        }
    }

    /// Chunks appended so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }
}

/// A finished transfer, ready for the event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub origin: NodeId,
    pub destination: NodeId,
    pub sequence: u16,
    pub payload: Bytes,
}

/// Reassembly state for one node.
#[derive(Debug)]
pub struct Reassembler {
    local_id: NodeId,
    active: Option<DataTransfer>,
}

impl Reassembler {
    pub fn new(local_id: NodeId) -> Self {
        Self {
            local_id,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&DataTransfer> {
        self.active.as_ref()
    }

    /// Start a transfer. Our own headers echoed back by the relay are ignored.
    pub fn on_header(&mut self, header: &DataHeader) {
        if header.origin == self.local_id {
            tracing::debug!(seq = header.sequence, "ignoring own data header");
            return;
        }
        if let Some(prev) = self.active.take() {
            tracing::debug!(
                origin = prev.origin,
                seq = prev.sequence,
                chunks = prev.chunks,
                "abandoning unfinished transfer"
            );
        }
        tracing::debug!(
            origin = header.origin,
            seq = header.sequence,
            len = header.total_len,
            "data transfer started"
        );
        self.active = Some(DataTransfer::new(header));
    }

    pub fn on_chunk(&mut self, chunk: &DataChunk) {
        if let Some(transfer) = self.active.as_mut() {
            transfer.buf.extend_from_slice(&chunk.payload);
            transfer.chunks += 1;
        }
    }

    /// Complete the active transfer. Returns `None` when nothing was in
    /// flight or the end marker is our own.
    pub fn on_end(&mut self, end: &DataEnd) -> Option<CompletedTransfer> {
        if end.origin == self.local_id {
            tracing::debug!(seq = end.sequence, "ignoring own data end");
            return None;
        }
        let transfer = self.active.take()?;
        if transfer.origin != end.origin || transfer.sequence != end.sequence {
            tracing::debug!(
                header_origin = transfer.origin,
                header_seq = transfer.sequence,
                end_origin = end.origin,
                end_seq = end.sequence,
                "data end does not match header, completing anyway"
            );
        }
        let mut buf = transfer.buf;
        buf.truncate(transfer.total_len);
        Some(CompletedTransfer {
            origin: transfer.origin,
            destination: transfer.destination,
            sequence: transfer.sequence,
            payload: buf.freeze(),
        })
    }
}
