//! # tedapi
//!
//! A Rust client library for the local TEDAPI interface of Tesla energy
//! gateways (Powerwall).
//!
//! The gateway speaks a proprietary binary RPC over HTTPS on its private
//! network address. This library builds the fixed request shapes, frames
//! them over HTTP/1.1, and reads the replies without a message schema.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Schema-less binary protocol: fixed builders, tag-walking reader
//! - Bounded reads: every exchange has a deadline and a capacity cap
//! - Comprehensive error handling
//!
//! ## Quick Start
//!
//! ```no_run
//! use tedapi::Tedapi;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tedapi::Error> {
//!     // Connect to the gateway on its private network
//!     let mut client = Tedapi::tls("gateway-password");
//!     let din = client.connect().await?;
//!     println!("Gateway DIN: {din}");
//!
//!     // Learn the topology, then poll status
//!     client.fetch_config().await?;
//!     let snapshot = client.fetch_status().await?;
//!     println!("Battery: {:.1}%", snapshot.battery_percent);
//!
//!     client.reset().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Wire format (varints, field walking, request builders)
//! - [`types`] - Data structures (snapshot, status and config documents)
//! - [`transport`] - Transport and HTTP framing (TLS to the gateway)
//! - [`sink`] - Snapshot publication to displays/exporters
//! - [`client`] - High-level [`Tedapi`] session

pub mod client;
pub mod error;
pub mod protocol;
pub mod sink;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{SessionState, Tedapi};
pub use error::{DecodeError, Error, Result};
pub use sink::{LogSink, SnapshotSink};
pub use transport::{ExchangeLimits, TlsConfig, TlsTransport, Transport};
pub use types::{BatteryBlock, EnergySnapshot, GatewayConfig, StatusRoot};
