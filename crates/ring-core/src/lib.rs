//! ring-core — wire format, ring membership, and configuration shared by
//! every ringd crate.

pub mod config;
pub mod ring;
pub mod wire;

pub use ring::{NodeId, NodeIdentity, RingError, RingMembership};
pub use wire::{DataChunk, DataEnd, DataHeader, Message, Token, WireError};
