//! ringd — token ring node runtime.
//!
//! A node runs two tasks over one datagram transport: the receive task
//! decodes and dispatches inbound messages, the logic task drives the token
//! state machine. See [`RingNode`].

pub mod logic;
pub mod node;
pub mod receive;
pub mod send;
pub mod signal;
pub mod state;
pub mod transport;

pub use node::{Outgoing, RingNode};
pub use receive::TokenOutcome;
pub use transport::{bind_udp, Transport};
