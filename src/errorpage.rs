//! Canned HTML error responses.

use std::io::Write;
use std::net::TcpStream;

/// Write an HTTP/1.0 error response to `stream`. Writes are best-effort:
/// a write failure is swallowed here and simply ends the handler.
pub fn client_error(stream: &mut TcpStream, cause: &str, errnum: u16, shortmsg: &str, longmsg: &str) {
    let body = format!(
        "<html><title>Proxy Error</title>\
         <body bgcolor=\"ffffff\">\r\n\
         {errnum}: {shortmsg}\r\n\
         <p>{longmsg}: {cause}\r\n\
         <hr><em>proxy server</em>\r\n"
    );

    let mut response = Vec::new();
    let _ = write!(response, "HTTP/1.0 {errnum} {shortmsg}\r\n");
    let _ = write!(response, "Content-Type: text/html\r\n");
    let _ = write!(response, "Content-Length: {}\r\n\r\n", body.len());
    response.extend_from_slice(body.as_bytes());

    let _ = stream.write_all(&response);
}
