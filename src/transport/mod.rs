//! Transport layer for TEDAPI communication.
//!
//! This module provides the abstraction for the connected byte stream the
//! protocol runs over, plus the HTTP framing that carries each exchange.
//! The default implementation is TLS over TCP to the gateway's private
//! address.

pub mod http;
pub mod tls;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::Result;

/// Trait for transport implementations.
///
/// The stream is expected to be connected, ordered and reliable, with TLS
/// (when applicable) already negotiated by `connect`.
pub trait Transport: Send + Sync {
    /// Connects to the gateway.
    fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Disconnects from the gateway.
    fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Sends data to the gateway.
    fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Returns whatever bytes are available within one short poll interval.
    ///
    /// An empty buffer means nothing arrived this poll; the peer closing the
    /// stream also yields an empty buffer and flips [`is_connected`] to
    /// false. Implementations must wait briefly rather than spin so callers
    /// can poll in a loop against a wall-clock deadline.
    ///
    /// [`is_connected`]: Transport::is_connected
    fn recv(&mut self) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + '_>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

pub use http::{ExchangeLimits, HttpResponse, exchange};
pub use tls::{TlsConfig, TlsTransport};
