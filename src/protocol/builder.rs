//! Request construction for the TEDAPI wire format.
//!
//! The gateway firmware rejects any structurally different byte stream, so
//! every tag below is a literal constant from the reference capture
//! (`field_number << 3 | wire_type`, two key bytes for field 16). Requests
//! are built in two passes: leaf and container sizes are computed bottom-up
//! first, then a single top-down pass emits tags, varint lengths and content.
//! Already-written bytes are never patched — every length prefix is exact by
//! construction.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::varint;

/// Upper bound on a built request; anything larger is a caller bug, not a
/// transport failure, and is reported as [`Error::RequestTooLarge`].
pub const MAX_REQUEST_SIZE: usize = 8192;

// Root message
const TAG_ENVELOPE: u8 = 0x0A; // field 1, length-delimited
const TAG_TAIL: u8 = 0x12; // field 2, length-delimited

// MessageEnvelope
const TAG_DELIVERY_CHANNEL: u8 = 0x08; // field 1, varint
const TAG_SENDER: u8 = 0x12; // field 2
const TAG_RECIPIENT: u8 = 0x1A; // field 3
const TAG_FIRMWARE: u8 = 0x22; // field 4
const TAG_CONFIG: u8 = 0x7A; // field 15
const TAG_PAYLOAD: [u8; 2] = [0x82, 0x01]; // field 16, two-byte key

// Participant
const TAG_PARTICIPANT_DIN: u8 = 0x0A; // field 1, bytes
const TAG_PARTICIPANT_LOCAL: u8 = 0x18; // field 3, varint

// QueryType / PayloadQuerySend / PayloadString
const TAG_QUERY_SEND: u8 = 0x0A; // QueryType field 1
const TAG_SEND_NUM: u8 = 0x08; // PayloadQuerySend field 1
const TAG_SEND_PAYLOAD: u8 = 0x12; // PayloadQuerySend field 2
const TAG_SEND_CODE: u8 = 0x1A; // PayloadQuerySend field 3
const TAG_SEND_B: u8 = 0x22; // PayloadQuerySend field 4
const TAG_STRING_VALUE: u8 = 0x08; // PayloadString field 1, varint
const TAG_STRING_TEXT: u8 = 0x12; // PayloadString field 2, string
const TAG_B_VALUE: u8 = 0x0A; // StringValue field 1, string

// ConfigType / PayloadConfigSend
const TAG_CONFIG_SEND: u8 = 0x0A; // ConfigType field 1
const TAG_CONFIG_NUM: u8 = 0x08; // PayloadConfigSend field 1
const TAG_CONFIG_FILE: u8 = 0x12; // PayloadConfigSend field 2

// FirmwareType
const TAG_FIRMWARE_REQUEST: u8 = 0x12; // field 2, string

// Tail
const TAG_TAIL_VALUE: u8 = 0x08; // field 1, varint

/// Config file requested by [`encode_config_request`].
pub const CONFIG_FILE: &str = "config.json";

/// Fixed trailer sent in `send.b.value` of every status query.
const B_VALUE: &[u8] = b"{}";

/// Size of a length-delimited field: key bytes, varint length, content.
const fn field_len(key_len: usize, content_len: usize) -> usize {
    key_len + varint::encoded_len(content_len as u32) + content_len
}

fn put_header(buf: &mut BytesMut, tag: u8, content_len: usize) {
    buf.put_u8(tag);
    varint::encode(buf, content_len as u32);
}

/// A status query addressed to the gateway.
///
/// `multi_device` selects the secondary encoding used by multi-unit
/// topologies: the sender carries the DIN instead of the local flag, and the
/// tail value switches from 1 to 2.
#[derive(Debug, Clone)]
pub struct StatusQuery<'a> {
    /// Recipient device identifier.
    pub din: &'a str,
    /// GraphQL document to evaluate.
    pub query: &'a str,
    /// DER auth code proving sender legitimacy for this query text.
    pub auth_code: &'a [u8],
    /// Use the multi-device sender/tail encoding.
    pub multi_device: bool,
}

impl StatusQuery<'_> {
    /// Serializes the query into one request buffer.
    pub fn encode(&self) -> Result<Bytes> {
        let din = self.din.as_bytes();
        let query = self.query.as_bytes();

        // Pass 1: sizes, deepest first
        let payload_string_len = 2 + field_len(1, query.len()); // value=1, text
        let b_len = field_len(1, B_VALUE.len()); // StringValue{value="{}"}
        let query_send_len = 2 // num=2
            + field_len(1, payload_string_len)
            + field_len(1, self.auth_code.len())
            + field_len(1, b_len);
        let query_type_len = field_len(1, query_send_len);
        let sender_len = if self.multi_device {
            field_len(1, din.len())
        } else {
            2 // local=1
        };
        let recipient_len = field_len(1, din.len());
        let envelope_len = 2 // deliveryChannel=1
            + field_len(1, sender_len)
            + field_len(1, recipient_len)
            + field_len(TAG_PAYLOAD.len(), query_type_len);
        let total = field_len(1, envelope_len) + 4; // + tail

        check_size(total)?;

        // Pass 2: emit
        let mut buf = BytesMut::with_capacity(total);
        put_header(&mut buf, TAG_ENVELOPE, envelope_len);

        buf.put_u8(TAG_DELIVERY_CHANNEL);
        buf.put_u8(0x01);

        put_header(&mut buf, TAG_SENDER, sender_len);
        if self.multi_device {
            put_header(&mut buf, TAG_PARTICIPANT_DIN, din.len());
            buf.put_slice(din);
        } else {
            buf.put_u8(TAG_PARTICIPANT_LOCAL);
            buf.put_u8(0x01);
        }

        put_header(&mut buf, TAG_RECIPIENT, recipient_len);
        put_header(&mut buf, TAG_PARTICIPANT_DIN, din.len());
        buf.put_slice(din);

        buf.put_slice(&TAG_PAYLOAD);
        varint::encode(&mut buf, query_type_len as u32);
        put_header(&mut buf, TAG_QUERY_SEND, query_send_len);

        buf.put_u8(TAG_SEND_NUM);
        buf.put_u8(0x02);

        put_header(&mut buf, TAG_SEND_PAYLOAD, payload_string_len);
        buf.put_u8(TAG_STRING_VALUE);
        buf.put_u8(0x01);
        put_header(&mut buf, TAG_STRING_TEXT, query.len());
        buf.put_slice(query);

        put_header(&mut buf, TAG_SEND_CODE, self.auth_code.len());
        buf.put_slice(self.auth_code);

        put_header(&mut buf, TAG_SEND_B, b_len);
        put_header(&mut buf, TAG_B_VALUE, B_VALUE.len());
        buf.put_slice(B_VALUE);

        put_tail(&mut buf, if self.multi_device { 2 } else { 1 });

        debug_assert_eq!(buf.len(), total);
        Ok(buf.freeze())
    }
}

/// Builds the config-fetch request for [`CONFIG_FILE`].
///
/// Used to learn the device topology (`battery_blocks` count) and, as a
/// side effect of the reply, a provisioning auth code.
pub fn encode_config_request(din: &str) -> Result<Bytes> {
    let din = din.as_bytes();
    let file = CONFIG_FILE.as_bytes();

    let send_len = 2 + field_len(1, file.len()); // num=1, file
    let config_len = field_len(1, send_len);
    let sender_len = 2;
    let recipient_len = field_len(1, din.len());
    let envelope_len = 2
        + field_len(1, sender_len)
        + field_len(1, recipient_len)
        + field_len(1, config_len);
    let total = field_len(1, envelope_len) + 4;

    check_size(total)?;

    let mut buf = BytesMut::with_capacity(total);
    put_header(&mut buf, TAG_ENVELOPE, envelope_len);
    buf.put_u8(TAG_DELIVERY_CHANNEL);
    buf.put_u8(0x01);

    put_header(&mut buf, TAG_SENDER, sender_len);
    buf.put_u8(TAG_PARTICIPANT_LOCAL);
    buf.put_u8(0x01);

    put_header(&mut buf, TAG_RECIPIENT, recipient_len);
    put_header(&mut buf, TAG_PARTICIPANT_DIN, din.len());
    buf.put_slice(din);

    put_header(&mut buf, TAG_CONFIG, config_len);
    put_header(&mut buf, TAG_CONFIG_SEND, send_len);
    buf.put_u8(TAG_CONFIG_NUM);
    buf.put_u8(0x01);
    put_header(&mut buf, TAG_CONFIG_FILE, file.len());
    buf.put_slice(file);

    put_tail(&mut buf, 1);

    debug_assert_eq!(buf.len(), total);
    Ok(buf.freeze())
}

/// Builds the empty firmware request.
///
/// The reply is discarded beyond success/failure; the request doubles as a
/// connectivity and auth check.
pub fn encode_firmware_request(din: &str) -> Result<Bytes> {
    let din = din.as_bytes();

    let firmware_len = 2; // request = "" (field 2, empty string)
    let sender_len = 2;
    let recipient_len = field_len(1, din.len());
    let envelope_len = 2
        + field_len(1, sender_len)
        + field_len(1, recipient_len)
        + field_len(1, firmware_len);
    let total = field_len(1, envelope_len) + 4;

    check_size(total)?;

    let mut buf = BytesMut::with_capacity(total);
    put_header(&mut buf, TAG_ENVELOPE, envelope_len);
    buf.put_u8(TAG_DELIVERY_CHANNEL);
    buf.put_u8(0x01);

    put_header(&mut buf, TAG_SENDER, sender_len);
    buf.put_u8(TAG_PARTICIPANT_LOCAL);
    buf.put_u8(0x01);

    put_header(&mut buf, TAG_RECIPIENT, recipient_len);
    put_header(&mut buf, TAG_PARTICIPANT_DIN, din.len());
    buf.put_slice(din);

    put_header(&mut buf, TAG_FIRMWARE, firmware_len);
    put_header(&mut buf, TAG_FIRMWARE_REQUEST, 0);

    put_tail(&mut buf, 1);

    debug_assert_eq!(buf.len(), total);
    Ok(buf.freeze())
}

fn put_tail(buf: &mut BytesMut, value: u8) {
    buf.put_u8(TAG_TAIL);
    buf.put_u8(0x02);
    buf.put_u8(TAG_TAIL_VALUE);
    buf.put_u8(value);
}

fn check_size(total: usize) -> Result<()> {
    if total > MAX_REQUEST_SIZE {
        return Err(Error::RequestTooLarge {
            size: total,
            max: MAX_REQUEST_SIZE,
        });
    }
    Ok(())
}
