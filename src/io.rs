//! Line-oriented buffered socket helper: returns a non-negative byte
//! count or `0` at EOF, with the last byte of a line being `\n`. A short,
//! `\n`-less line at EOF is returned rather than treated as an error,
//! which `std::io::BufRead::read_until` already does, so this module is
//! a thin named wrapper rather than a hand-rolled reimplementation.

use std::io::{self, BufRead, BufReader, Read};
use std::net::TcpStream;

/// A buffered, line-oriented reader over a socket.
pub struct LineReader<R> {
    inner: BufReader<R>,
}

impl LineReader<TcpStream> {
    /// Wrap a cloned handle to a client or origin socket.
    pub fn new(stream: TcpStream, maxline: usize) -> Self {
        Self {
            inner: BufReader::with_capacity(maxline, stream),
        }
    }
}

impl<R: Read> LineReader<R> {
    /// Wrap any reader, not just a socket. Used by tests that feed the
    /// header-parsing/rewrite logic a fixed byte buffer.
    pub fn from_reader(reader: R, maxline: usize) -> Self {
        Self {
            inner: BufReader::with_capacity(maxline, reader),
        }
    }

    /// Read one line (including the trailing `\n` if the stream supplied
    /// one) into `buf`, returning the number of bytes read. Returns `0`
    /// at EOF.
    pub fn read_line_raw(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.inner.read_until(b'\n', buf)
    }
}
