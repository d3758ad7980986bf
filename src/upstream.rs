//! URI parsing, request header rewriting, and origin dialing.

use std::io::Write;
use std::net::TcpStream;

use crate::error::{ProxyError, Result};
use crate::io::LineReader;

/// The fixed User-Agent line sent to every origin.
pub const USER_AGENT: &str =
    "User-Agent: Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3\r\n";

/// The parsed target of an absolute-form (or bare) request URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub hostname: String,
    pub path: String,
    pub port: u16,
}

/// Parse `http://host[:port]/path`, `host[:port]/path`, or bare `host`.
/// Malformed input (empty host, non-numeric port) is reported as
/// [`ProxyError::UriParse`]; the handler turns that into a `503`.
pub fn parse_uri(uri: &[u8]) -> Result<Target> {
    let uri_str = std::str::from_utf8(uri)
        .map_err(|_| ProxyError::UriParse("uri is not valid utf-8".into()))?;

    let rest = strip_http_prefix(uri_str);

    let slash_pos = rest.find('/');
    let authority = match slash_pos {
        Some(p) => &rest[..p],
        None => rest,
    };
    let path = match slash_pos {
        Some(p) => rest[p..].to_string(),
        None => "/".to_string(),
    };

    if authority.is_empty() {
        return Err(ProxyError::UriParse("empty host".into()));
    }

    let (hostname, port) = match authority.find(':') {
        Some(colon) => {
            let host = &authority[..colon];
            let port_str = &authority[colon + 1..];
            if host.is_empty() {
                return Err(ProxyError::UriParse("empty host".into()));
            }
            let port: u16 = port_str
                .parse()
                .map_err(|_| ProxyError::UriParse(format!("invalid port: {port_str}")))?;
            (host.to_string(), port)
        }
        None => (authority.to_string(), 80),
    };

    Ok(Target {
        hostname,
        path,
        port,
    })
}

fn strip_http_prefix(uri: &str) -> &str {
    if uri.len() >= 7 && uri[..7].eq_ignore_ascii_case("http://") {
        &uri[7..]
    } else {
        uri
    }
}

/// Dial the origin named by `target`. A failed resolve or connect is
/// reported as [`ProxyError::OriginUnreachable`], which the handler
/// turns into a `503`.
pub fn connect(target: &Target) -> Result<TcpStream> {
    TcpStream::connect((target.hostname.as_str(), target.port)).map_err(ProxyError::OriginUnreachable)
}

/// Drain the client's remaining request headers and build the rewritten
/// HTTP/1.0 request to send to `target`:
/// - drop `User-Agent` / `Connection` / `Proxy-Connection` (case-insensitive)
/// - preserve a client `Host` header verbatim; otherwise synthesize one
/// - forward everything else verbatim, in order
pub fn build_request<R: std::io::Read>(
    client: &mut LineReader<R>,
    target: &Target,
) -> Result<Vec<u8>> {
    let mut req = Vec::new();
    write!(req, "GET {} HTTP/1.0\r\n", target.path).expect("writing to Vec never fails");

    let mut host_header: Option<Vec<u8>> = None;
    let mut forwarded = Vec::new();

    loop {
        let mut line = Vec::new();
        let n = client
            .read_line_raw(&mut line)
            .map_err(ProxyError::ClientIo)?;
        if n == 0 || line == b"\r\n" || line == b"\n" {
            break;
        }

        if is_header(&line, b"host") {
            host_header = Some(line);
            continue;
        }
        if is_header(&line, b"user-agent")
            || is_header(&line, b"connection")
            || is_header(&line, b"proxy-connection")
        {
            continue;
        }
        forwarded.extend_from_slice(&line);
    }

    req.extend_from_slice(&forwarded);

    match host_header {
        Some(h) => req.extend_from_slice(&h),
        None => write!(req, "Host: {}\r\n", target.hostname).expect("writing to Vec never fails"),
    }

    req.extend_from_slice(USER_AGENT.as_bytes());
    req.extend_from_slice(b"Connection: close\r\n");
    req.extend_from_slice(b"Proxy-Connection: close\r\n\r\n");

    Ok(req)
}

/// Case-insensitive check for `"<name>:"` at the start of a raw header
/// line. Uses `memchr` to locate the colon rather than scanning
/// byte-by-byte.
fn is_header(line: &[u8], name: &[u8]) -> bool {
    match memchr::memchr(b':', line) {
        Some(colon) => colon == name.len() && line[..colon].eq_ignore_ascii_case(name),
        None => false,
    }
}
