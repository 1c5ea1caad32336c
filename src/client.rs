//! Main [`Tedapi`] client implementation.
//!
//! This module provides the high-level [`Tedapi`] session that combines the
//! transport, HTTP framing, request builder and field walker into a unified
//! interface: fetch the DIN, optionally learn the topology from config, poll
//! status, expose the snapshot.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::{
    DEVICE_CONTROLLER_QUERY, STATUS_AUTH_CODE, StatusQuery, encode_config_request,
    encode_firmware_request, extract_config_code, extract_response_text,
};
use crate::sink::SnapshotSink;
use crate::transport::tls::{DEFAULT_HOST, TlsConfig};
use crate::transport::{ExchangeLimits, Transport, TlsTransport, exchange, http};
use crate::types::{EnergySnapshot, GatewayConfig};

/// Identifier-fetch path (plain authenticated GET).
pub const DIN_PATH: &str = "/tedapi/din";

/// Message-exchange path (binary POST).
pub const MESSAGE_PATH: &str = "/tedapi/v1";

/// Marker the gateway embeds in replies that failed signature validation.
const AUTH_REJECTED_MARKER: &[u8] = b"missing AuthEnvelo";

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No DIN yet; only the identifier fetch is possible.
    Unidentified,
    /// DIN known; status queries and probes may be issued.
    Identified,
    /// Topology learned from config; multi-device encoding settled.
    Ready,
}

/// Client session for a TEDAPI gateway.
pub struct Tedapi<T> {
    transport: T,
    host: String,
    auth: String,
    limits: ExchangeLimits,

    // Session state, mutated only at the end of a successful exchange
    din: Option<String>,
    auth_override: Option<Bytes>,
    multi_device: bool,
    topology_known: bool,
    snapshot: EnergySnapshot,
}

impl Tedapi<TlsTransport> {
    /// Creates a session for the gateway at its default private address.
    ///
    /// `password` is the gateway password printed inside the unit's door.
    #[must_use]
    pub fn tls(password: &str) -> Self {
        Self::tls_at(DEFAULT_HOST, password)
    }

    /// Creates a session for a gateway at a custom address.
    #[must_use]
    pub fn tls_at(host: impl Into<String>, password: &str) -> Self {
        let host = host.into();
        let transport = TlsTransport::new(TlsConfig::new(host.clone()));
        Self::with_transport(transport, host, password)
    }
}

impl<T: Transport> Tedapi<T> {
    /// Creates a session over a caller-supplied transport.
    pub fn with_transport(transport: T, host: impl Into<String>, password: &str) -> Self {
        Self {
            transport,
            host: host.into(),
            auth: http::basic_auth(password),
            limits: ExchangeLimits::default(),
            din: None,
            auth_override: None,
            multi_device: false,
            topology_known: false,
            snapshot: EnergySnapshot::default(),
        }
    }

    /// Overrides the per-exchange timeout/capacity bounds.
    pub fn set_limits(&mut self, limits: ExchangeLimits) {
        self.limits = limits;
    }

    /// Returns the current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        match (&self.din, self.topology_known) {
            (None, _) => SessionState::Unidentified,
            (Some(_), false) => SessionState::Identified,
            (Some(_), true) => SessionState::Ready,
        }
    }

    /// The gateway identifier, once fetched.
    #[must_use]
    pub fn din(&self) -> Option<&str> {
        self.din.as_deref()
    }

    /// The provisioning auth code harvested from a config response, if any.
    #[must_use]
    pub fn auth_override(&self) -> Option<&[u8]> {
        self.auth_override.as_deref()
    }

    /// True when the config reported more than one battery unit.
    #[must_use]
    pub const fn multi_device(&self) -> bool {
        self.multi_device
    }

    /// The latest telemetry snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &EnergySnapshot {
        &self.snapshot
    }

    /// Hands the latest snapshot to a collaborator.
    pub fn publish_to(&self, sink: &mut dyn SnapshotSink) {
        sink.publish(&self.snapshot);
    }

    /// Connects the transport and acquires the gateway identifier.
    pub async fn connect(&mut self) -> Result<String> {
        self.ensure_connected().await?;
        self.fetch_din().await
    }

    /// Disconnects and forgets all session state (DIN, auth override,
    /// topology). The next `connect` starts from scratch.
    pub async fn reset(&mut self) -> Result<()> {
        self.transport.disconnect().await?;
        self.din = None;
        self.auth_override = None;
        self.multi_device = false;
        self.topology_known = false;
        Ok(())
    }

    /// Fetches the DIN via `GET /tedapi/din`.
    ///
    /// The DIN is required as the recipient of every built request; an empty
    /// body leaves the session unidentified.
    pub async fn fetch_din(&mut self) -> Result<String> {
        self.ensure_connected().await?;

        let request = http::get_request(&self.host, DIN_PATH, &self.auth);
        let response = exchange(&mut self.transport, Bytes::from(request), &self.limits).await?;

        let din = String::from_utf8_lossy(&response.body).trim().to_owned();
        if din.is_empty() {
            return Err(Error::Protocol {
                message: "empty DIN response".into(),
            });
        }

        tracing::info!("gateway DIN: {din}");
        self.din = Some(din.clone());
        Ok(din)
    }

    /// Fetches `config.json` to learn the device topology.
    ///
    /// As a side effect the reply may carry a provisioning auth code
    /// (`config.recv.code`), which is remembered as an override for
    /// non-status queries.
    pub async fn fetch_config(&mut self) -> Result<GatewayConfig> {
        let din = self.din.clone().ok_or(Error::NoDin)?;

        let request = encode_config_request(&din)?;
        let body = self.post_message(request).await?;

        if let Some(code) = extract_config_code(&body) {
            tracing::debug!("learned auth code ({} bytes): {}", code.len(), hex::encode(code));
            self.auth_override = Some(Bytes::copy_from_slice(code));
        }

        let text = String::from_utf8_lossy(&body);
        let json = first_json_object(&text).ok_or_else(|| Error::Protocol {
            message: "no JSON object in config response".into(),
        })?;
        let config: GatewayConfig = serde_json::from_str(json)?;

        self.multi_device = config.is_multi_device();
        self.topology_known = true;
        tracing::info!(
            "config: {} battery block(s), multi_device={}",
            config.battery_blocks.len(),
            self.multi_device
        );
        Ok(config)
    }

    /// Issues the status query and refreshes the snapshot.
    ///
    /// Self-contained: always signs with the compiled-in DER code, so it
    /// works from the `Identified` state without a prior config fetch.
    pub async fn fetch_status(&mut self) -> Result<EnergySnapshot> {
        let din = self.din.clone().ok_or(Error::NoDin)?;

        let request = StatusQuery {
            din: &din,
            query: DEVICE_CONTROLLER_QUERY,
            auth_code: STATUS_AUTH_CODE,
            multi_device: self.multi_device,
        }
        .encode()?;
        let body = self.post_message(request).await?;

        if contains(&body, AUTH_REJECTED_MARKER) {
            return Err(Error::AuthRejected);
        }

        let text = extract_response_text(&body).ok_or_else(|| Error::Protocol {
            message: "no recv.text in status response".into(),
        })?;
        let json = first_json_object(&text).ok_or_else(|| Error::Protocol {
            message: "no JSON object in recv.text".into(),
        })?;

        let status = crate::types::StatusRoot::parse(json)?;
        if !self.snapshot.apply_status(&status) {
            return Err(Error::Protocol {
                message: "status document carries no usable energy figures".into(),
            });
        }
        Ok(self.snapshot.clone())
    }

    /// Issues the empty firmware request as a connectivity/auth check.
    pub async fn probe_firmware(&mut self) -> Result<()> {
        let din = self.din.clone().ok_or(Error::NoDin)?;
        let request = encode_firmware_request(&din)?;
        self.post_message(request).await?;
        tracing::debug!("firmware probe answered");
        Ok(())
    }

    /// One reconnect attempt when the transport reports not-connected.
    async fn ensure_connected(&mut self) -> Result<()> {
        if self.transport.is_connected() {
            return Ok(());
        }
        self.transport.connect().await
    }

    /// POSTs one built message and returns the (non-empty) response body.
    ///
    /// The gateway is asked to close the connection after each message, so
    /// the transport is dropped afterwards and reopened on the next call.
    async fn post_message(&mut self, message: Bytes) -> Result<Bytes> {
        self.ensure_connected().await?;

        let head = http::post_request_head(&self.host, MESSAGE_PATH, &self.auth, message.len());
        let mut request = BytesMut::with_capacity(head.len() + message.len());
        request.put_slice(head.as_bytes());
        request.put_slice(&message);

        let response = exchange(&mut self.transport, request.freeze(), &self.limits).await?;
        self.transport.disconnect().await?;

        if response.truncated {
            tracing::warn!("response body truncated at {} bytes", response.body.len());
        }
        if response.body.is_empty() {
            return Err(Error::Protocol {
                message: "empty response body".into(),
            });
        }
        Ok(response.body)
    }
}

/// Returns the first balanced `{...}` object in `text`, or `None`.
///
/// Brace counting only — good enough for the documents the gateway returns,
/// which never contain braces inside string values.
fn first_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{')?;
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::varint;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;

    // ==================== helpers ====================

    /// Transport replaying scripted responses, one per exchange.
    struct MockTransport {
        responses: VecDeque<Bytes>,
        sent: Vec<Bytes>,
        connected: bool,
        connects: usize,
    }

    impl MockTransport {
        fn new(responses: Vec<Bytes>) -> Self {
            Self {
                responses: responses.into_iter().collect(),
                sent: Vec::new(),
                connected: false,
                connects: 0,
            }
        }
    }

    impl Transport for MockTransport {
        fn connect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.connected = true;
                self.connects += 1;
                Ok(())
            })
        }

        fn disconnect(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.connected = false;
                Ok(())
            })
        }

        fn send(&mut self, data: Bytes) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.sent.push(data);
                Ok(())
            })
        }

        fn recv(&mut self) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + '_>> {
            Box::pin(async move {
                if let Some(response) = self.responses.pop_front() {
                    Ok(response)
                } else {
                    self.connected = false;
                    Ok(Bytes::new())
                }
            })
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn http_ok(body: &[u8]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_slice(
            format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", body.len()).as_bytes(),
        );
        buf.put_slice(body);
        buf.freeze()
    }

    /// Gateway reply carrying `recv.text` under envelope→payload(16).
    fn status_reply(text: &str) -> Vec<u8> {
        let text = text.as_bytes();
        let recv_len = 1 + varint::encoded_len(text.len() as u32) + text.len();
        let payload_len = 1 + varint::encoded_len(recv_len as u32) + recv_len;
        let envelope_len = 2 + varint::encoded_len(payload_len as u32) + payload_len;

        let mut buf = BytesMut::new();
        buf.put_u8(0x0A);
        varint::encode(&mut buf, envelope_len as u32);
        buf.put_slice(&[0x82, 0x01]);
        varint::encode(&mut buf, payload_len as u32);
        buf.put_u8(0x12); // recv(2)
        varint::encode(&mut buf, recv_len as u32);
        buf.put_u8(0x12); // text(2)
        varint::encode(&mut buf, text.len() as u32);
        buf.put_slice(text);
        buf.to_vec()
    }

    /// Gateway config reply with a code under envelope→config(15)→recv and
    /// the JSON document embedded as the returned file content.
    fn config_reply(json: &str, code: &[u8]) -> Vec<u8> {
        let json = json.as_bytes();
        let file_len = 1 + varint::encoded_len(json.len() as u32) + json.len();
        let recv_len = 1 + varint::encoded_len(file_len as u32) + file_len
            + 1 + varint::encoded_len(code.len() as u32) + code.len();
        let config_len = 1 + varint::encoded_len(recv_len as u32) + recv_len;
        let envelope_len = 1 + varint::encoded_len(config_len as u32) + config_len;

        let mut buf = BytesMut::new();
        buf.put_u8(0x0A);
        varint::encode(&mut buf, envelope_len as u32);
        buf.put_u8(0x7A); // config(15)
        varint::encode(&mut buf, config_len as u32);
        buf.put_u8(0x12); // recv(2)
        varint::encode(&mut buf, recv_len as u32);
        buf.put_u8(0x0A); // file(1), ConfigString
        varint::encode(&mut buf, file_len as u32);
        buf.put_u8(0x12); // text(2)
        varint::encode(&mut buf, json.len() as u32);
        buf.put_slice(json);
        buf.put_u8(0x12); // code(2)
        varint::encode(&mut buf, code.len() as u32);
        buf.put_slice(code);
        buf.to_vec()
    }

    fn session(responses: Vec<Bytes>) -> Tedapi<MockTransport> {
        Tedapi::with_transport(MockTransport::new(responses), "192.168.91.1", "pw")
    }

    const STATUS_JSON: &str = r#"{"control": {
        "systemStatus": {
            "nominalFullPackEnergyWh": 13500,
            "nominalEnergyRemainingWh": 6750
        },
        "islanding": {"customerIslandMode": "BACKUP", "gridOK": true},
        "meterAggregates": [{"location": "SOLAR", "realPowerW": 1500}]
    }}"#;

    // ==================== tests ====================

    #[tokio::test]
    async fn test_connect_fetches_din() {
        let mut client = session(vec![http_ok(b"1707000-11-L--TG123\n")]);
        let din = client.connect().await.unwrap();
        assert_eq!(din, "1707000-11-L--TG123");
        assert_eq!(client.state(), SessionState::Identified);

        // GET request with Basic auth went out
        let sent = &client.transport.sent[0];
        let text = String::from_utf8_lossy(sent);
        assert!(text.starts_with("GET /tedapi/din HTTP/1.1\r\n"));
        assert!(text.contains("Authorization: Basic "));
    }

    #[tokio::test]
    async fn test_empty_din_keeps_session_unidentified() {
        let mut client = session(vec![http_ok(b"  \r\n")]);
        assert!(client.connect().await.is_err());
        assert_eq!(client.state(), SessionState::Unidentified);
    }

    #[tokio::test]
    async fn test_status_requires_din() {
        let mut client = session(vec![]);
        let err = client.fetch_status().await.unwrap_err();
        assert!(matches!(err, Error::NoDin));
    }

    #[tokio::test]
    async fn test_fetch_status_updates_snapshot() {
        let mut client = session(vec![
            http_ok(b"DIN123"),
            http_ok(&status_reply(STATUS_JSON)),
        ]);
        client.connect().await.unwrap();

        let snapshot = client.fetch_status().await.unwrap();
        assert!(snapshot.valid);
        assert!((snapshot.battery_percent - 50.0).abs() < 0.01);
        assert!((snapshot.solar_power_w - 1500.0).abs() < f32::EPSILON);
        assert!(snapshot.grid_connected);
        assert_eq!(client.snapshot().island_mode, "BACKUP");

        // POST carried the binary message with explicit length
        let text = String::from_utf8_lossy(&client.transport.sent[1]);
        assert!(text.starts_with("POST /tedapi/v1 HTTP/1.1\r\n"));
        assert!(text.contains("Content-Type: application/octet-string\r\n"));
    }

    #[tokio::test]
    async fn test_fetch_status_auth_rejected() {
        let mut client = session(vec![
            http_ok(b"DIN123"),
            http_ok(b"error: missing AuthEnvelope in request"),
        ]);
        client.connect().await.unwrap();

        let err = client.fetch_status().await.unwrap_err();
        assert!(matches!(err, Error::AuthRejected));
    }

    #[tokio::test]
    async fn test_fetch_config_learns_topology_and_code() {
        let config_json = r#"{"battery_blocks": [{"vin": "A"}, {"vin": "B"}]}"#;
        let mut client = session(vec![
            http_ok(b"DIN123"),
            http_ok(&config_reply(config_json, &[0xAA, 0xBB])),
        ]);
        client.connect().await.unwrap();

        let config = client.fetch_config().await.unwrap();
        assert_eq!(config.battery_blocks.len(), 2);
        assert!(client.multi_device());
        assert_eq!(client.auth_override(), Some(&[0xAA, 0xBB][..]));
        assert_eq!(client.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_multi_device_switches_status_encoding() {
        let config_json = r#"{"battery_blocks": [{"vin": "A"}, {"vin": "B"}]}"#;
        let mut client = session(vec![
            http_ok(b"DIN123"),
            http_ok(&config_reply(config_json, &[1])),
            http_ok(&status_reply(STATUS_JSON)),
        ]);
        client.connect().await.unwrap();
        client.fetch_config().await.unwrap();
        client.fetch_status().await.unwrap();

        // The status POST body must use the multi-device tail (value 2)
        let post = &client.transport.sent[2];
        let body_start = contains_at(post, b"\r\n\r\n").unwrap() + 4;
        let tail = crate::protocol::find_path(&post[body_start..], &[2]).unwrap();
        assert_eq!(tail, &[0x08, 0x02]);
    }

    #[tokio::test]
    async fn test_probe_firmware() {
        let mut client = session(vec![http_ok(b"DIN123"), http_ok(&[0x0A, 0x00])]);
        client.connect().await.unwrap();
        client.probe_firmware().await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnects_between_posts() {
        let mut client = session(vec![
            http_ok(b"DIN123"),
            http_ok(&status_reply(STATUS_JSON)),
            http_ok(&status_reply(STATUS_JSON)),
        ]);
        client.connect().await.unwrap();
        client.fetch_status().await.unwrap();
        client.fetch_status().await.unwrap();

        // The first POST rides the keep-alive GET connection; it closes
        // afterwards, so the second POST needs a fresh connect
        assert_eq!(client.transport.connects, 2);
    }

    #[tokio::test]
    async fn test_reset_forgets_session_state() {
        let mut client = session(vec![http_ok(b"DIN123")]);
        client.connect().await.unwrap();
        client.reset().await.unwrap();
        assert_eq!(client.state(), SessionState::Unidentified);
        assert!(client.din().is_none());
    }

    #[test]
    fn test_first_json_object() {
        assert_eq!(first_json_object("junk {\"a\":1} trailing"), Some("{\"a\":1}"));
        assert_eq!(
            first_json_object("{\"a\":{\"b\":2}} {\"c\":3}"),
            Some("{\"a\":{\"b\":2}}")
        );
        assert_eq!(first_json_object("no braces"), None);
        assert_eq!(first_json_object("{\"unterminated\":"), None);
    }

    fn contains_at(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }
}
