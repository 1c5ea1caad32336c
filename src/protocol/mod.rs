//! Protocol definitions for TEDAPI communication.
//!
//! This module contains the low-level wire format:
//! - Varint encoding used by every length and small scalar
//! - Schema-less field walking for received messages
//! - Two-pass request construction for the fixed message shapes
//! - The fixed status query text and its compiled-in auth code

pub mod builder;
pub mod query;
pub mod varint;
pub mod walker;

pub use builder::{
    MAX_REQUEST_SIZE, StatusQuery, encode_config_request, encode_firmware_request,
};
pub use query::{DEVICE_CONTROLLER_QUERY, STATUS_AUTH_CODE};
pub use walker::{FieldReader, FieldValue, extract_config_code, extract_response_text, find_path};
