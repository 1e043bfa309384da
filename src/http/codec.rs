//! Minimal HTTP/1.x framing for the admin console.
//!
//! Only what the console needs: one request per connection, a request line,
//! headers, an optional `Content-Length` body. Responses are always
//! `200 OK` and the connection is closed afterwards:
//! ```text
//! HTTP/1.1 200 OK
//! Content-Length: <n>
//! Content-Type: <type>
//! Connection: Closed
//!
//! <body>
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
pub const CONTENT_TYPE_ICON: &str = "image/x-icon";

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Request target without any query string.
    pub path: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Parse a raw request. Returns `None` if the request line is unusable.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let (head, body) = match header_end(raw) {
            Some(end) => (&raw[..end], &raw[end..]),
            None => (raw, &raw[raw.len()..]),
        };
        let head = std::str::from_utf8(head).ok()?;
        let mut lines = head.lines();

        let mut parts = lines.next()?.split_whitespace();
        let method = parts.next()?;
        let target = parts.next()?;
        let version = parts.next()?;
        if parts.next().is_some() || !version.starts_with("HTTP/1.") {
            return None;
        }
        let path = target.split('?').next().unwrap_or(target);

        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        Some(Self {
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            headers,
            body: body.to_vec(),
        })
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A `200 OK` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(content_type: &'static str, body: Vec<u8>) -> Self {
        Self { content_type, body }
    }

    pub fn json(body: Vec<u8>) -> Self {
        Self::new(CONTENT_TYPE_JSON, body)
    }

    pub fn encode(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: {}\r\nConnection: Closed\r\n\r\n",
            self.body.len(),
            self.content_type,
        );
        let mut out = Vec::with_capacity(head.len() + self.body.len());
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(&self.body);
        out
    }
}

/// Read one request, up to `max_bytes`.
///
/// Stops once the headers and the declared body have arrived, at EOF, or when
/// the buffer is full. Returns `None` if the peer closed without sending.
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> std::io::Result<Option<Vec<u8>>> {
    let mut buf = Vec::with_capacity(max_bytes.min(4096));
    let mut chunk = [0u8; 1024];

    while buf.len() < max_bytes {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let take = n.min(max_bytes - buf.len());
        buf.extend_from_slice(&chunk[..take]);
        if is_complete(&buf) {
            break;
        }
    }

    if buf.is_empty() {
        Ok(None)
    } else {
        Ok(Some(buf))
    }
}

/// Write a response and flush it.
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> std::io::Result<()> {
    writer.write_all(&response.encode()).await?;
    writer.flush().await?;
    Ok(())
}

/// Offset just past the blank line ending the header block.
fn header_end(buf: &[u8]) -> Option<usize> {
    if let Some(i) = find(buf, b"\r\n\r\n") {
        return Some(i + 4);
    }
    find(buf, b"\n\n").map(|i| i + 2)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn is_complete(buf: &[u8]) -> bool {
    let Some(end) = header_end(buf) else {
        return false;
    };
    let content_length = std::str::from_utf8(&buf[..end])
        .ok()
        .and_then(|head| {
            head.lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        })
        .unwrap_or(0);
    buf.len() >= end + content_length
}
