//! HTTP framing over a [`Transport`].
//!
//! TEDAPI rides on a minimal slice of HTTP/1.1: one request, one response,
//! per exchange. The reader accumulates bytes until the header terminator,
//! checks for `200 OK`, then drains the body according to either a
//! `Content-Length` header or chunked transfer encoding. Every read is
//! bounded by a wall-clock deadline and a destination capacity: a truncated
//! body is returned as-is rather than failing the exchange, because a
//! partial response is still inspectable downstream.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::{Bytes, BytesMut};
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Fixed HTTP principal the gateway expects in Basic auth.
pub const AUTH_PRINCIPAL: &str = "Tesla_Energy_Device";

/// Default exchange deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default response body capacity; a full `recv.text` JSON payload is
/// typically below 20 KiB.
pub const DEFAULT_RESPONSE_CAPACITY: usize = 24 * 1024;

/// Upper bound on the response head (status line + headers).
const MAX_HEAD_SIZE: usize = 8192;

/// Bounds applied to one HTTP exchange.
#[derive(Debug, Clone)]
pub struct ExchangeLimits {
    /// Wall-clock deadline for the whole read phase.
    pub timeout: Duration,
    /// Destination capacity for the response body.
    pub response_capacity: usize,
}

impl Default for ExchangeLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
        }
    }
}

/// One parsed HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    /// Status code from the status line.
    pub status: u16,
    /// Response body, possibly truncated.
    pub body: Bytes,
    /// True when the capacity or deadline cut the body short.
    pub truncated: bool,
}

/// Encodes the gateway Basic-auth credential for `password`.
#[must_use]
pub fn basic_auth(password: &str) -> String {
    BASE64.encode(format!("{AUTH_PRINCIPAL}:{password}"))
}

/// Builds an authenticated GET request.
#[must_use]
pub fn get_request(host: &str, path: &str, auth: &str) -> String {
    format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Authorization: Basic {auth}\r\n\
         Connection: keep-alive\r\n\r\n"
    )
}

/// Builds the head of an authenticated POST carrying `content_length` bytes
/// of message payload. The gateway expects `Connection: close` on message
/// posts.
#[must_use]
pub fn post_request_head(host: &str, path: &str, auth: &str, content_length: usize) -> String {
    format!(
        "POST {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Authorization: Basic {auth}\r\n\
         Content-Type: application/octet-string\r\n\
         Content-Length: {content_length}\r\n\
         Connection: close\r\n\r\n"
    )
}

/// Body framing declared by the response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Read exactly this many bytes.
    Length(usize),
    /// `Transfer-Encoding: chunked`.
    Chunked,
}

/// Chunked-decoding state.
#[derive(Debug)]
enum ChunkState {
    /// Expecting a hex chunk-size line.
    Size,
    /// Draining chunk data.
    Data { remaining: usize },
    /// Expecting the CRLF after a chunk.
    Crlf,
}

/// Incremental body decoder fed from transport reads.
#[derive(Debug)]
pub struct BodyReader {
    framing: Framing,
    buffer: BytesMut,
    out: BytesMut,
    state: ChunkState,
    capacity: usize,
    complete: bool,
    truncated: bool,
}

impl BodyReader {
    /// Creates a decoder for the given framing and destination capacity.
    #[must_use]
    pub fn new(framing: Framing, capacity: usize) -> Self {
        let complete = framing == Framing::Length(0);
        Self {
            framing,
            buffer: BytesMut::new(),
            out: BytesMut::new(),
            state: ChunkState::Size,
            capacity,
            complete,
            truncated: false,
        }
    }

    /// Feeds raw transport bytes into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        if self.complete {
            return;
        }
        self.buffer.extend_from_slice(&data[..]);
        match self.framing {
            Framing::Length(total) => self.drain_length(total),
            Framing::Chunked => self.drain_chunked(),
        }
    }

    fn drain_length(&mut self, total: usize) {
        let want = total - self.out.len();
        let take = want.min(self.buffer.len());
        let take = self.bounded(take, want);
        self.out.extend_from_slice(&self.buffer.split_to(take));
        if self.out.len() >= total {
            self.complete = true;
        }
    }

    fn drain_chunked(&mut self) {
        loop {
            match self.state {
                ChunkState::Size => {
                    let Some(line_end) = find_crlf(&self.buffer) else {
                        return;
                    };
                    let line = self.buffer.split_to(line_end + 2);
                    let text = String::from_utf8_lossy(&line[..line_end]);
                    let text = text.trim();
                    if text.is_empty() {
                        continue; // stray CRLF between chunks
                    }
                    let Ok(size) = usize::from_str_radix(text, 16) else {
                        // Unparseable size line: stop here with what we have
                        self.complete = true;
                        self.truncated = true;
                        return;
                    };
                    if size == 0 {
                        self.complete = true;
                        return;
                    }
                    self.state = ChunkState::Data { remaining: size };
                }
                ChunkState::Data { remaining } => {
                    if self.buffer.is_empty() {
                        return;
                    }
                    let take = remaining.min(self.buffer.len());
                    let take = self.bounded(take, remaining);
                    self.out.extend_from_slice(&self.buffer.split_to(take));
                    if self.complete {
                        return;
                    }
                    let left = remaining - take;
                    if left == 0 {
                        self.state = ChunkState::Crlf;
                    } else {
                        self.state = ChunkState::Data { remaining: left };
                        return;
                    }
                }
                ChunkState::Crlf => {
                    if self.buffer.len() < 2 {
                        return;
                    }
                    let _ = self.buffer.split_to(2);
                    self.state = ChunkState::Size;
                }
            }
        }
    }

    /// Clamps `take` to the remaining capacity. Truncation is decided from
    /// `outstanding`, the bytes the framing still owes: a feed that lands
    /// exactly on the cap while more of the body is declared is still a cut.
    fn bounded(&mut self, take: usize, outstanding: usize) -> usize {
        let room = self.capacity - self.out.len();
        if take >= room {
            self.complete = true;
            if outstanding > room {
                self.truncated = true;
            }
            room
        } else {
            take
        }
    }

    /// True once the declared body has been fully read (or truncated).
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// True when the capacity bound cut the body short.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Marks the body as cut short by the deadline.
    pub fn mark_truncated(&mut self) {
        self.truncated = true;
    }

    /// Consumes the decoder, returning the collected body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.out.freeze()
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_status_line(head: &str) -> Result<u16> {
    let line = head.lines().next().unwrap_or_default();
    line.split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| Error::Protocol {
            message: format!("malformed status line: {line:?}"),
        })
}

/// Extracts the body framing from the response head.
fn parse_framing(head: &str) -> Framing {
    let mut content_length = 0usize;
    for line in head.lines().skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("transfer-encoding")
            && value.eq_ignore_ascii_case("chunked")
        {
            return Framing::Chunked;
        }
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().unwrap_or(0);
        }
    }
    Framing::Length(content_length)
}

/// Sends `request` and reads one HTTP response.
///
/// # Errors
///
/// [`Error::Timeout`] if the head does not arrive before the deadline,
/// [`Error::Http`] on a non-200 status, [`Error::NotConnected`] if the peer
/// closes before the head completes. A body cut short by the deadline or the
/// capacity bound is **not** an error: the truncated body is returned with
/// `truncated` set.
pub async fn exchange<T: Transport + ?Sized>(
    transport: &mut T,
    request: Bytes,
    limits: &ExchangeLimits,
) -> Result<HttpResponse> {
    transport.send(request).await?;

    let deadline = Instant::now() + limits.timeout;
    let timeout_ms = u64::try_from(limits.timeout.as_millis()).unwrap_or(u64::MAX);

    // Head phase: accumulate until the blank line
    let mut head = BytesMut::new();
    let header_end = loop {
        if let Some(pos) = find_header_end(&head) {
            break pos;
        }
        if head.len() > MAX_HEAD_SIZE {
            return Err(Error::Protocol {
                message: "response head too large".into(),
            });
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout { timeout_ms });
        }
        let chunk = transport.recv().await?;
        if chunk.is_empty() {
            if !transport.is_connected() {
                return Err(Error::NotConnected);
            }
            continue;
        }
        head.extend_from_slice(&chunk);
    };

    let head_text = String::from_utf8_lossy(&head[..header_end]).into_owned();
    let status = parse_status_line(&head_text)?;
    if status != 200 {
        tracing::warn!("gateway answered HTTP {status}");
        return Err(Error::Http { status });
    }

    let framing = parse_framing(&head_text);
    tracing::trace!("response framing: {framing:?}");

    // Body phase: bytes past the terminator belong to the body
    let mut body = BodyReader::new(framing, limits.response_capacity);
    body.feed(&head[header_end + 4..]);

    while !body.is_complete() {
        if Instant::now() >= deadline {
            tracing::debug!("body read hit the deadline, returning partial body");
            body.mark_truncated();
            break;
        }
        let chunk = transport.recv().await?;
        if chunk.is_empty() {
            if !transport.is_connected() {
                tracing::debug!("peer closed before the declared body ended");
                body.mark_truncated();
                break;
            }
            continue;
        }
        body.feed(&chunk);
    }

    let truncated = body.is_truncated();
    Ok(HttpResponse {
        status,
        body: body.into_body(),
        truncated,
    })
}
