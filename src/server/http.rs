//! Minimal HTTP/1.1 request parsing and response writing for the embedded
//! web page. One request per connection, no keep-alive.

use crate::error::ParseError;
use log::{debug, warn};
use std::io::{self, ErrorKind, Read, Write};

/// Only the request line and a few headers are ever needed.
pub const MAX_REQUEST_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Request {
    /// Parse the request line of `raw`. Headers and body are ignored.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let line = raw.lines().next().map(str::trim).unwrap_or_default();
        if line.is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut parts = line.split_whitespace();
        let (method, target) = match (parts.next(), parts.next()) {
            (Some(method), Some(target)) if target.starts_with('/') => (method, target),
            _ => return Err(ParseError::MalformedRequestLine(line.to_string())),
        };

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, Vec::new()),
        };

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
            query,
        })
    }

    /// First value for `name`, if present.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// `+` becomes a space and `%XX` escapes are decoded; invalid escapes are
/// kept literally.
pub fn decode_component(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                    out.push(hex_value(hi) << 4 | hex_value(lo));
                    i += 2;
                }
                _ => out.push(b'%'),
            },
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Chunk size used when streaming a body from storage.
pub const STREAM_CHUNK_BYTES: usize = 512;

pub enum Body {
    Text(String),
    /// Copied to the connection in `STREAM_CHUNK_BYTES` pieces; never held
    /// in memory as a whole.
    Stream { reader: Box<dyn Read>, len: u64 },
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Body::Text(text) => text.len() as u64,
            Body::Stream { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl core::fmt::Debug for Body {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Body::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Body::Stream { len, .. } => f.debug_struct("Stream").field("len", len).finish(),
        }
    }
}

#[derive(Debug)]
pub struct Response {
    pub status_line: &'static str,
    pub content_type: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: Body,
}

impl Response {
    pub fn ok(content_type: &'static str, body: String) -> Self {
        Self::with_body(content_type, Body::Text(body))
    }

    pub fn stream(content_type: &'static str, reader: Box<dyn Read>, len: u64) -> Self {
        Self::with_body(content_type, Body::Stream { reader, len })
    }

    fn with_body(content_type: &'static str, body: Body) -> Self {
        Self {
            status_line: "HTTP/1.1 200 OK",
            content_type,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Read until the end of the header block, `MAX_REQUEST_BYTES`, EOF, or the
/// stream's read timeout, whichever comes first.
pub fn read_request(conn: &mut impl Read) -> io::Result<String> {
    let mut buffer = [0u8; MAX_REQUEST_BYTES];
    let mut filled = 0;

    while filled < buffer.len() {
        match conn.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                if buffer[..filled].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                warn!("Request read timed out after {} bytes", filled);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    debug!("Read {} request bytes", filled);
    Ok(String::from_utf8_lossy(&buffer[..filled]).into_owned())
}

pub fn write_response(conn: &mut impl Write, response: Response) -> io::Result<()> {
    let mut head = format!(
        "{}\r\nContent-Type: {}\r\nContent-Length: {}\r\n",
        response.status_line,
        response.content_type,
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("Connection: close\r\n\r\n");
    conn.write_all(head.as_bytes())?;

    match response.body {
        Body::Text(text) => conn.write_all(text.as_bytes())?,
        Body::Stream { reader, len } => copy_exact(reader, len, conn)?,
    }
    conn.flush()
}

/// Copy exactly `len` bytes; a short source is an error since the
/// Content-Length has already gone out.
fn copy_exact(mut reader: Box<dyn Read>, len: u64, conn: &mut impl Write) -> io::Result<()> {
    let mut buffer = [0u8; STREAM_CHUNK_BYTES];
    let mut remaining = len;

    while remaining > 0 {
        let want = remaining.min(buffer.len() as u64) as usize;
        let n = match reader.read(&mut buffer[..want]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("body ended {} bytes short", remaining),
                ))
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        conn.write_all(&buffer[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

#[cfg(test)]
impl Body {
    pub(crate) fn into_text(self) -> String {
        match self {
            Body::Text(text) => text,
            Body::Stream { mut reader, .. } => {
                let mut text = String::new();
                reader.read_to_string(&mut text).unwrap();
                text
            }
        }
    }
}
