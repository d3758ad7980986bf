//! Per-connection request handler state machine.

use std::io::Write;
use std::net::TcpStream;

use bytes::{Bytes, BytesMut};

use crate::cache::Cache;
use crate::config::Limits;
use crate::errorpage::client_error;
use crate::io::LineReader;
use crate::upstream;

/// Handle one accepted connection to completion: read the request line,
/// probe the cache, fetch from the origin on a miss, stream the response
/// back while staging it for possible admission, and return. The caller
/// drops the socket afterward, which closes it. There is no explicit
/// close call; it is strictly one request per connection.
pub fn handle_connection(cache: &Cache, mut client: TcpStream, limits: Limits) {
    let client_for_reader = match client.try_clone() {
        Ok(c) => c,
        Err(_) => return,
    };
    let mut reader = LineReader::new(client_for_reader, limits.maxline);

    // Step 1: read the request line.
    let mut line = Vec::new();
    let n = match reader.read_line_raw(&mut line) {
        Ok(n) => n,
        Err(_) => return,
    };
    if n == 0 {
        return;
    }

    let Some((method, uri, _version)) = parse_request_line(&line) else {
        return;
    };

    // Step 2: method gate.
    if !method.eq_ignore_ascii_case(b"GET") {
        let method_str = String::from_utf8_lossy(method).into_owned();
        tracing::warn!(method = %method_str, "rejecting unsupported method");
        client_error(
            &mut client,
            &method_str,
            501,
            "Not Implemented",
            "proxy does not implement this method",
        );
        return;
    }

    // Step 3: cache probe; exact byte match, no canonicalization.
    if let Some(body) = cache.find(uri) {
        tracing::debug!(uri = %String::from_utf8_lossy(uri), "cache hit");
        let _ = client.write_all(&body);
        return;
    }
    tracing::debug!(uri = %String::from_utf8_lossy(uri), "cache miss");

    // Step 4: resolve the target and dial the origin.
    let target = match upstream::parse_uri(uri) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "uri parse failed");
            client_error(&mut client, &String::from_utf8_lossy(uri), 503, "Service Unavailable", "could not parse uri");
            return;
        }
    };

    let mut origin = match upstream::connect(&target) {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!(error = %e, host = %target.hostname, port = target.port, "origin unreachable");
            client_error(&mut client, &target.hostname, 503, "Service Unavailable", "could not connect to origin");
            return;
        }
    };

    // Step 5: rewrite and forward the request.
    let request = match upstream::build_request(&mut reader, &target) {
        Ok(r) => r,
        Err(_) => return, // client io failure: silent close
    };
    if origin.write_all(&request).is_err() {
        return; // origin write failure is treated like any other origin io failure
    }

    // Step 6: stream the response to the client, line by line, staging
    // it for possible cache admission up to max_object_size.
    let origin_for_reader = match origin.try_clone() {
        Ok(o) => o,
        Err(_) => return,
    };
    let mut origin_reader = LineReader::new(origin_for_reader, limits.maxline);

    let mut staged = BytesMut::with_capacity(limits.max_object_size.min(limits.maxline));
    let mut truncated = false;

    loop {
        let mut chunk = Vec::new();
        let n = match origin_reader.read_line_raw(&mut chunk) {
            Ok(n) => n,
            Err(_) => break, // origin io failure mid-stream: stop, discard staging
        };
        if n == 0 {
            break; // origin EOF
        }

        if client.write_all(&chunk).is_err() {
            return; // client io failure mid-handler: silent close
        }

        if !truncated {
            if staged.len() + chunk.len() <= limits.max_object_size {
                staged.extend_from_slice(&chunk);
            } else {
                truncated = true;
            }
        }
    }

    // Step 7: admit only if the whole response was staged without
    // truncation. Admitting a truncated prefix would be wrong even
    // though the size check alone would pass.
    if !truncated {
        tracing::debug!(uri = %String::from_utf8_lossy(uri), bytes = staged.len(), "admitting response to cache");
        cache.insert(uri, Bytes::from(staged));
    } else {
        tracing::debug!(uri = %String::from_utf8_lossy(uri), "response exceeded max_object_size, not cached");
    }

    // Step 8: origin is dropped (closed) here; the worker drops `client`
    // after this function returns.
}

/// Split a raw request-line buffer into its three whitespace-separated
/// tokens: method, uri, version. Returns `None` if the line does not
/// have exactly three tokens; the request is then silently dropped, no
/// response is owed for a line that isn't even a valid
/// method/uri/version triple.
fn parse_request_line(line: &[u8]) -> Option<(&[u8], &[u8], &[u8])> {
    let trimmed = trim_crlf(line);
    let mut parts = trimmed.split(|&b| b == b' ' || b == b'\t').filter(|p| !p.is_empty());
    let method = parts.next()?;
    let uri = parts.next()?;
    let version = parts.next()?;
    Some((method, uri, version))
}

fn trim_crlf(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_line_basic() {
        let (m, u, v) = parse_request_line(b"GET http://x/ HTTP/1.0\r\n").unwrap();
        assert_eq!(m, b"GET");
        assert_eq!(u, b"http://x/");
        assert_eq!(v, b"HTTP/1.0");
    }

    #[test]
    fn test_parse_request_line_rejects_malformed() {
        assert!(parse_request_line(b"GET\r\n").is_none());
        assert!(parse_request_line(b"\r\n").is_none());
    }

    #[test]
    fn test_parse_request_line_case_preserved() {
        let (m, _, _) = parse_request_line(b"PUT http://x/ HTTP/1.0\r\n").unwrap();
        assert_eq!(m, b"PUT");
    }
}
