//! Schema-less field walker for received TEDAPI messages.
//!
//! The gateway protocol is undocumented; responses are read without a
//! compiled schema by iterating tag/wire-type/value triples and descending
//! into length-delimited sub-messages along a fixed field-number path.
//! Unknown fields are skipped, malformed input ends the walk: the result is
//! "not found", never a panic or an out-of-range read.

use crate::protocol::varint;

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Wire type 0: varint scalar.
    Varint(u32),
    /// Wire type 1: 64-bit fixed.
    Fixed64(u64),
    /// Wire type 2: length-delimited bytes (sub-message, string, or blob).
    Bytes(&'a [u8]),
    /// Wire type 5: 32-bit fixed.
    Fixed32(u32),
}

/// Iterates the fields of one message body.
///
/// Any read that would run past the end of the slice, and any wire type the
/// protocol does not use, terminates iteration.
#[derive(Debug)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Creates a reader over a message body.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the next `(field_number, value)` pair, or `None` at the end
    /// of input or on the first malformed field.
    pub fn next_field(&mut self) -> Option<(u32, FieldValue<'a>)> {
        if self.pos >= self.buf.len() {
            return None;
        }

        let (key, consumed) = varint::decode(&self.buf[self.pos..]).ok()?;
        self.pos += consumed;

        let wire_type = key & 0x07;
        let field_number = key >> 3;

        let value = match wire_type {
            0 => {
                let (v, n) = varint::decode(&self.buf[self.pos..]).ok()?;
                self.pos += n;
                FieldValue::Varint(v)
            }
            1 => {
                let bytes = self.take(8)?;
                FieldValue::Fixed64(u64::from_le_bytes(bytes.try_into().ok()?))
            }
            2 => {
                let (len, n) = varint::decode(&self.buf[self.pos..]).ok()?;
                self.pos += n;
                FieldValue::Bytes(self.take(len as usize)?)
            }
            5 => {
                let bytes = self.take(4)?;
                FieldValue::Fixed32(u32::from_le_bytes(bytes.try_into().ok()?))
            }
            // Wire types 3/4 (groups) are never produced by the gateway;
            // treat them as a parse fault for the whole range.
            _ => {
                self.pos = self.buf.len();
                return None;
            }
        };

        Some((field_number, value))
    }

    /// Bytes left to walk.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        if end > self.buf.len() {
            self.pos = self.buf.len();
            return None;
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Some(slice)
    }
}

impl<'a> Iterator for FieldReader<'a> {
    type Item = (u32, FieldValue<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_field()
    }
}

/// Field path to the response text inside a query reply:
/// message(1) → payload(16) → recv(2) → text(2).
const RESPONSE_TEXT_PATH: [u32; 4] = [1, 16, 2, 2];

/// Field path to the provisioning auth code inside a config reply:
/// message(1) → config(15) → recv(2) → code(2).
const CONFIG_CODE_PATH: [u32; 4] = [1, 15, 2, 2];

/// Descends `buf` along `path`, returning the bytes of the leaf field.
///
/// Each path element names a length-delimited field to enter. When a field
/// number repeats, every occurrence is tried in order (the first occurrence
/// that yields a full match wins). `None` means any element was absent.
#[must_use]
pub fn find_path<'a>(buf: &'a [u8], path: &[u32]) -> Option<&'a [u8]> {
    let (&first, rest) = path.split_first()?;
    let reader = FieldReader::new(buf);
    for (field, value) in reader {
        if field != first {
            continue;
        }
        if let FieldValue::Bytes(sub) = value {
            if rest.is_empty() {
                return Some(sub);
            }
            if let Some(found) = find_path(sub, rest) {
                return Some(found);
            }
        }
    }
    None
}

/// Extracts `recv.text` from a query reply, the string expected to contain
/// the JSON status document.
#[must_use]
pub fn extract_response_text(buf: &[u8]) -> Option<String> {
    find_path(buf, &RESPONSE_TEXT_PATH).map(|b| String::from_utf8_lossy(b).into_owned())
}

/// Extracts `config.recv.code` from a config reply — the provisioning auth
/// code the session can learn as an override.
#[must_use]
pub fn extract_config_code(buf: &[u8]) -> Option<&[u8]> {
    find_path(buf, &CONFIG_CODE_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// message { envelope(1) { payload(16) { recv(2) { value(1)=1,
    /// text(2)="{\"a\":1}" } } } }
    fn sample_reply() -> Vec<u8> {
        let text = b"{\"a\":1}";
        let recv_len = 2 + 2 + text.len(); // value field + text tag/len
        let payload_len = 1 + 1 + recv_len;
        let envelope_len = 2 + 1 + payload_len;

        let mut buf = vec![0x0A, envelope_len as u8];
        buf.extend_from_slice(&[0x82, 0x01, payload_len as u8]); // payload(16)
        buf.extend_from_slice(&[0x12, recv_len as u8]); // recv(2)
        buf.extend_from_slice(&[0x08, 0x01]); // value(1) = 1
        buf.extend_from_slice(&[0x12, text.len() as u8]); // text(2)
        buf.extend_from_slice(text);
        buf
    }

    #[test]
    fn test_reader_wire_types() {
        // field1 varint, field2 fixed64, field3 bytes, field4 fixed32
        let buf = [
            0x08, 0x2A, // 1: 42
            0x11, 1, 0, 0, 0, 0, 0, 0, 0, // 2: fixed64 1
            0x1A, 0x02, 0xAB, 0xCD, // 3: bytes
            0x25, 2, 0, 0, 0, // 4: fixed32 2
        ];
        let mut reader = FieldReader::new(&buf);
        assert_eq!(reader.next_field(), Some((1, FieldValue::Varint(42))));
        assert_eq!(reader.next_field(), Some((2, FieldValue::Fixed64(1))));
        assert_eq!(
            reader.next_field(),
            Some((3, FieldValue::Bytes(&[0xAB, 0xCD])))
        );
        assert_eq!(reader.next_field(), Some((4, FieldValue::Fixed32(2))));
        assert_eq!(reader.next_field(), None);
    }

    #[test]
    fn test_reader_aborts_on_unknown_wire_type() {
        // Wire type 3 (group start) is a fatal fault for the range
        let buf = [0x0B, 0x08, 0x01];
        let mut reader = FieldReader::new(&buf);
        assert_eq!(reader.next_field(), None);
        assert_eq!(reader.next_field(), None);
    }

    #[test]
    fn test_reader_aborts_on_overlong_length() {
        // Declared length runs past the end of the slice
        let buf = [0x0A, 0x10, 0x01];
        let mut reader = FieldReader::new(&buf);
        assert_eq!(reader.next_field(), None);
    }

    #[test]
    fn test_extract_response_text() {
        let buf = sample_reply();
        assert_eq!(extract_response_text(&buf).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_find_path_not_found() {
        let buf = sample_reply();
        // config(15) is absent from a query reply
        assert_eq!(find_path(&buf, &CONFIG_CODE_PATH), None);
    }

    #[test]
    fn test_find_path_tries_repeated_fields() {
        // Two recv(2) fields; only the second carries text(2)
        let buf = [
            0x12, 0x02, 0x08, 0x01, // recv { value = 1 }
            0x12, 0x04, 0x12, 0x02, b'h', b'i', // recv { text = "hi" }
        ];
        assert_eq!(find_path(&buf, &[2, 2]), Some(&b"hi"[..]));
    }

    #[test]
    fn test_extract_config_code() {
        // message { envelope(1) { config(15) { recv(2) { code(2)=bytes } } } }
        let code = [0xDE, 0xAD, 0xBE, 0xEF];
        let buf = [
            0x0A, 0x0A, // envelope, 10 bytes
            0x7A, 0x08, // config(15), 8 bytes
            0x12, 0x06, // recv(2), 6 bytes
            0x12, 0x04, 0xDE, 0xAD, 0xBE, 0xEF, // code(2)
        ];
        assert_eq!(extract_config_code(&buf), Some(&code[..]));
    }

    #[test]
    fn test_truncated_prefixes_never_panic() {
        let buf = sample_reply();
        for len in 0..buf.len() {
            // Every truncation reports "not found" without reading past end
            assert_eq!(extract_response_text(&buf[..len]), None, "len={len}");
        }
        assert!(extract_response_text(&buf).is_some());
    }
}
