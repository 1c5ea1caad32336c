//! Data types for TEDAPI entities.
//!
//! This module contains the typed views the session exposes:
//! - The energy snapshot handed to presentation/beacon collaborators
//! - The parsed subset of the status JSON document
//! - The parsed subset of `config.json`

pub mod config;
pub mod snapshot;
pub mod status;

pub use config::{BatteryBlock, GatewayConfig};
pub use snapshot::EnergySnapshot;
pub use status::{ControlStatus, Islanding, MeterAggregate, StatusRoot, SystemStatus};
