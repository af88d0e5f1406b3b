//! ring-services — stateful pieces of a ring node that do no I/O of their
//! own: the sequence filter, inbound data reassembly, and the event log.

pub mod events;
pub mod reassembly;
pub mod sequence;

pub use events::{EventKind, EventRecord, EventSink, JsonlEventLog, MemoryEventLog, SharedSink};
pub use reassembly::{CompletedTransfer, DataTransfer, Reassembler};
pub use sequence::SequenceTracker;
