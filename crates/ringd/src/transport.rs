//! Datagram transport used by a ring node.
//!
//! The node only needs two primitives: send a datagram to an address and
//! wait for the next datagram. Production uses a tokio `UdpSocket`; tests
//! plug in channels.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

pub trait Transport: Send + Sync + 'static {
    fn send_to(&self, buf: &[u8], target: SocketAddr)
        -> impl Future<Output = io::Result<usize>> + Send;

    fn recv_from(&self, buf: &mut [u8])
        -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;
}

impl Transport for UdpSocket {
    fn send_to(
        &self,
        buf: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send {
        UdpSocket::send_to(self, buf, target)
    }

    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send {
        UdpSocket::recv_from(self, buf)
    }
}

/// Bind the node's UDP socket. Failure here is fatal for the node.
///
/// Must be called from within a tokio runtime.
pub fn bind_udp(addr: SocketAddr) -> Result<UdpSocket> {
    let domain = match addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).context("socket()")?;

    socket.set_reuse_address(true).context("SO_REUSEADDR")?;
    socket.set_nonblocking(true).context("set_nonblocking")?;
    socket
        .bind(&addr.into())
        .with_context(|| format!("bind({addr})"))?;

    UdpSocket::from_std(socket.into()).context("failed to convert to tokio UdpSocket")
}
