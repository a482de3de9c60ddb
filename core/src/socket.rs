//! `Transport` over a plain `TcpStream`, parsing the reply by hand.
//!
//! # Design
//! Each call opens its own connection, writes one HTTP/1.1 request with
//! `Connection: close`, and reads the reply into a single buffer. Reading
//! stops once the reply is framed: `Content-Length` bytes, the last chunk of
//! a chunked body, or EOF when neither is declared. The header/body boundary
//! is located once and passed to `parse_response` as a byte offset, mirroring
//! how curl reports `CURLINFO_HEADER_SIZE`. Interim `1xx` blocks count towards
//! that offset and are otherwise skipped.
//!
//! Header parsing is minimal: a line is kept only when splitting
//! it on `:` gives exactly two parts. That drops the status line, but it also
//! drops values that contain a colon (`X-Time: 12:30`, `Location: http://..`).
//! Callers needing those must read them some other way.
//!
//! HTTPS goes through `native-tls` behind the `tls` feature. The only TLS
//! knob is `verify_tls`.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::{ConnectError, ConnectErrorCode};
use crate::http::{HttpMethod, Transport};
use crate::response::{Headers, Response};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw-socket HTTP/1.1 transport. Holds configuration only.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
    #[cfg_attr(not(feature = "tls"), allow(dead_code))]
    verify_tls: bool,
}

impl Default for SocketTransport {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            verify_tls: true,
        }
    }
}

impl SocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SocketTransportBuilder {
        SocketTransportBuilder {
            inner: Self::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SocketTransportBuilder {
    inner: SocketTransport,
}

impl SocketTransportBuilder {
    /// Zero leaves the connect attempt to the OS timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.inner.connect_timeout = timeout;
        self
    }

    /// Read/write timeout per socket operation. `None` or zero waits forever.
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.inner.read_timeout = timeout.filter(|d| !d.is_zero());
        self
    }

    /// Turning this off accepts invalid certificates and host names.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.inner.verify_tls = verify;
        self
    }

    pub fn build(self) -> SocketTransport {
        self.inner
    }
}

impl Transport for SocketTransport {
    fn request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &Headers,
        body: &str,
    ) -> Result<Response, ConnectError> {
        let target = Target::parse(url)?;
        let request = encode_request(method, &target, headers, body)?;
        let mut stream = self.connect(&target)?;
        stream
            .write_all(&request)
            .and_then(|()| stream.flush())
            .map_err(|e| io_error(ConnectErrorCode::SendFailed, "failed sending request", e))?;

        let buffer = read_reply(&mut stream)?;
        if buffer.is_empty() {
            return Err(ConnectError::new(
                ConnectErrorCode::InvalidReply,
                format!("empty reply from {}", target.authority),
            ));
        }

        let header_size = find_header_end(&buffer).ok_or_else(|| {
            ConnectError::new(
                ConnectErrorCode::InvalidReply,
                "response headers are not terminated",
            )
        })?;
        let response = parse_response(&buffer, header_size)?;
        debug!(%method, url, status = response.status(), bytes = buffer.len(), "received response");

        if !is_chunked(response.headers()) {
            return Ok(response);
        }
        let body = dechunk(&buffer[header_size..])?;
        Ok(Response::new(response.status(), body, response.headers().clone()))
    }
}

impl SocketTransport {
    fn connect(&self, target: &Target) -> Result<Stream, ConnectError> {
        let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|e| {
                ConnectError::new(
                    ConnectErrorCode::CouldNotResolveHost,
                    format!("could not resolve host {}: {e}", target.host),
                )
            })?
            .collect();

        let mut last_error = None;
        for addr in addrs {
            let attempt = if self.connect_timeout.is_zero() {
                TcpStream::connect(addr)
            } else {
                TcpStream::connect_timeout(&addr, self.connect_timeout)
            };
            match attempt {
                Ok(tcp) => {
                    tcp.set_read_timeout(self.read_timeout)
                        .and_then(|()| tcp.set_write_timeout(self.read_timeout))
                        .map_err(|e| {
                            io_error(ConnectErrorCode::CouldNotConnect, "failed configuring socket", e)
                        })?;
                    return self.wrap(tcp, target);
                }
                Err(e) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => io_error(
                ConnectErrorCode::CouldNotConnect,
                &format!("failed to connect to {}", target.authority),
                e,
            ),
            None => ConnectError::new(
                ConnectErrorCode::CouldNotResolveHost,
                format!("no addresses found for {}", target.host),
            ),
        })
    }

    #[cfg(feature = "tls")]
    fn wrap(&self, tcp: TcpStream, target: &Target) -> Result<Stream, ConnectError> {
        if !target.tls {
            return Ok(Stream::Plain(tcp));
        }
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(!self.verify_tls)
            .danger_accept_invalid_hostnames(!self.verify_tls)
            .build()
            .map_err(|e| ConnectError::new(ConnectErrorCode::TlsHandshake, e.to_string()))?;
        let stream = connector.connect(&target.host, tcp).map_err(|e| {
            ConnectError::new(
                ConnectErrorCode::TlsHandshake,
                format!("tls handshake with {} failed: {e}", target.host),
            )
        })?;
        Ok(Stream::Tls(Box::new(stream)))
    }

    #[cfg(not(feature = "tls"))]
    fn wrap(&self, tcp: TcpStream, _target: &Target) -> Result<Stream, ConnectError> {
        Ok(Stream::Plain(tcp))
    }
}

enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<native_tls::TlsStream<TcpStream>>),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.flush(),
        }
    }
}

/// Where a URL points, split into what the socket and request line need.
struct Target {
    #[cfg_attr(not(feature = "tls"), allow(dead_code))]
    tls: bool,
    host: String,
    port: u16,
    /// `Host` header value: host plus an explicit port if the URL had one.
    authority: String,
    path_and_query: String,
}

impl Target {
    fn parse(url: &str) -> Result<Self, ConnectError> {
        let parsed = Url::parse(url).map_err(|e| {
            ConnectError::new(ConnectErrorCode::MalformedUrl, format!("malformed url {url}: {e}"))
        })?;

        let tls = match parsed.scheme() {
            "http" => false,
            "https" if cfg!(feature = "tls") => true,
            "https" => {
                return Err(ConnectError::new(
                    ConnectErrorCode::UnsupportedProtocol,
                    "https requires the `tls` feature",
                ))
            }
            other => {
                return Err(ConnectError::new(
                    ConnectErrorCode::UnsupportedProtocol,
                    format!("unsupported scheme {other}"),
                ))
            }
        };

        let host = match parsed.host() {
            Some(url::Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => {
                return Err(ConnectError::new(
                    ConnectErrorCode::MalformedUrl,
                    format!("malformed url {url}: missing host"),
                ))
            }
        };
        let port = parsed
            .port_or_known_default()
            .unwrap_or(if tls { 443 } else { 80 });
        let authority = match (parsed.host_str(), parsed.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => host.clone(),
        };

        let mut path_and_query = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        Ok(Self {
            tls,
            host,
            port,
            authority,
            path_and_query,
        })
    }
}

/// Headers the transport writes itself; caller copies are skipped.
const MANAGED_HEADERS: [&str; 3] = ["host", "connection", "content-length"];

fn encode_request(
    method: HttpMethod,
    target: &Target,
    headers: &Headers,
    body: &str,
) -> Result<Vec<u8>, ConnectError> {
    let mut head = format!(
        "{method} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n",
        target.path_and_query, target.authority
    );
    if !body.is_empty() {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    for (key, value) in headers {
        if MANAGED_HEADERS.iter().any(|m| key.eq_ignore_ascii_case(m)) {
            continue;
        }
        if key.is_empty() || [key, value].iter().any(|s| s.contains(['\r', '\n'])) {
            return Err(ConnectError::new(
                ConnectErrorCode::BadArgument,
                format!("header {key:?} contains a line break or is unnamed"),
            ));
        }
        head.push_str(&format!("{key}: {value}\r\n"));
    }
    head.push_str("\r\n");

    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(body.as_bytes());
    Ok(bytes)
}

/// Read until the reply is framed or the peer closes. A read error after a
/// complete reply, or a reset while an unframed body is streaming, ends the
/// body instead of failing the call.
fn read_reply(stream: &mut impl Read) -> Result<Vec<u8>, ConnectError> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Ok(buffer),
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if reply_state(&buffer) == ReplyState::Complete {
                    return Ok(buffer);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                let closed = matches!(
                    e.kind(),
                    io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
                );
                return match reply_state(&buffer) {
                    ReplyState::Complete => Ok(buffer),
                    ReplyState::UntilClose if closed => Ok(buffer),
                    _ => Err(io_error(
                        ConnectErrorCode::ReceiveFailed,
                        "failed reading response",
                        e,
                    )),
                };
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyState {
    /// Headers or a declared body still missing.
    Partial,
    /// No length declared; the body runs to EOF.
    UntilClose,
    Complete,
}

fn reply_state(buffer: &[u8]) -> ReplyState {
    let Some(header_size) = find_header_end(buffer) else {
        return ReplyState::Partial;
    };
    let head = &buffer[..header_size];
    let head = String::from_utf8_lossy(&head[final_block_start(head)..]);
    let body = &buffer[header_size..];
    if matches!(parse_status_line(&head), Some(204 | 304)) {
        return ReplyState::Complete;
    }

    let headers = parse_header_block(&head);
    if is_chunked(&headers) {
        return match dechunk(body) {
            Ok(_) => ReplyState::Complete,
            Err(_) => ReplyState::Partial,
        };
    }
    let declared = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok());
    match declared {
        Some(len) if body.len() >= len => ReplyState::Complete,
        Some(_) => ReplyState::Partial,
        None => ReplyState::UntilClose,
    }
}

fn io_error(code: ConnectErrorCode, context: &str, err: io::Error) -> ConnectError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ConnectErrorCode::TimedOut,
        _ => code,
    };
    ConnectError::new(code, format!("{context}: {err}"))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Byte offset just past the blank line ending one header block. Accepts
/// `\r\n\r\n` and bare `\n\n`, whichever comes first.
fn block_end(buffer: &[u8]) -> Option<usize> {
    let crlf = find(buffer, b"\r\n\r\n").map(|i| i + 4);
    let lf = find(buffer, b"\n\n").map(|i| i + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn is_interim(block: &[u8]) -> bool {
    parse_status_line(&String::from_utf8_lossy(block)).is_some_and(|s| (100..200).contains(&s))
}

/// Byte offset just past the final header block. Interim `1xx` blocks
/// before it are included, so `None` until the final block has arrived.
pub fn find_header_end(buffer: &[u8]) -> Option<usize> {
    let mut start = 0;
    loop {
        let end = start + block_end(&buffer[start..])?;
        if !is_interim(&buffer[start..end]) {
            return Some(end);
        }
        start = end;
    }
}

/// Where the last header block inside `head` begins.
fn final_block_start(head: &[u8]) -> usize {
    let mut start = 0;
    while let Some(len) = block_end(&head[start..]) {
        if start + len >= head.len() || !is_interim(&head[start..start + len]) {
            break;
        }
        start += len;
    }
    start
}

/// Split a raw reply at `header_size` and parse the final header block;
/// leading `1xx` blocks are dropped. The body is returned as the trailing
/// bytes, untouched apart from lossy UTF-8 decoding.
pub fn parse_response(buffer: &[u8], header_size: usize) -> Result<Response, ConnectError> {
    let (head, body) = buffer.split_at(header_size.min(buffer.len()));
    let head = String::from_utf8_lossy(&head[final_block_start(head)..]);

    let status = parse_status_line(&head).ok_or_else(|| {
        ConnectError::new(
            ConnectErrorCode::InvalidReply,
            format!(
                "invalid status line: {:?}",
                head.lines().next().unwrap_or_default()
            ),
        )
    })?;

    Ok(Response::new(
        status,
        String::from_utf8_lossy(body).into_owned(),
        parse_header_block(&head),
    ))
}

fn parse_status_line(head: &str) -> Option<u16> {
    let mut parts = head.lines().next()?.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts
        .next()?
        .parse::<u16>()
        .ok()
        .filter(|s| (100..=999).contains(s))
}

/// Keep only `Key: Value` lines that split on `:` into exactly two parts.
pub fn parse_header_block(head: &str) -> Headers {
    let mut headers = Headers::new();
    for line in head.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if let [key, value] = parts.as_slice() {
            headers.insert(key.to_string(), value.trim().to_string());
        }
    }
    headers
}

fn is_chunked(headers: &Headers) -> bool {
    headers.iter().any(|(k, v)| {
        k.eq_ignore_ascii_case("transfer-encoding") && v.to_ascii_lowercase().contains("chunked")
    })
}

fn dechunk(raw: &[u8]) -> Result<String, ConnectError> {
    let invalid = |what: &str| {
        ConnectError::new(
            ConnectErrorCode::InvalidReply,
            format!("invalid chunked body: {what}"),
        )
    };

    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;
    loop {
        let line_end = find(rest, b"\r\n").ok_or_else(|| invalid("missing chunk size"))?;
        let size_line = String::from_utf8_lossy(&rest[..line_end]);
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size =
            usize::from_str_radix(size_hex, 16).map_err(|_| invalid("bad chunk size"))?;
        rest = &rest[line_end + 2..];
        if size == 0 {
            break;
        }
        if rest.len() < size {
            return Err(invalid("truncated chunk"));
        }
        out.extend_from_slice(&rest[..size]);
        rest = rest[size..]
            .strip_prefix(b"\r\n")
            .ok_or_else(|| invalid("missing chunk terminator"))?;
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}
