use netbuf::Buf;

use crate::chunked::{self, ChunkError};


/// Progress of reading a message body from the input buffer
///
/// Body bytes are never copied elsewhere while reading: the protocol checks
/// `check_buf` and either waits for more data or consumes the whole body
/// when it's done.
#[derive(Debug, Clone)]
pub enum BodyProgress {
    Fixed(u64), // bytes left
    Eof, // only for responses without length
    Chunked(chunked::State),
}

impl BodyProgress {
    /// Returns useful number of bytes in buffer and "end" ("done") flag
    pub fn check_buf(&self, buf: &Buf, eof: bool) -> (usize, bool) {
        use self::BodyProgress::*;
        match *self {
            Fixed(x) if x <= buf.len() as u64 => (x as usize, true),
            Fixed(_) => (buf.len(), false),
            Chunked(ref s) => (s.buffered(), s.is_done()),
            Eof => (buf.len(), eof),
        }
    }
    pub fn parse(&mut self, buf: &mut Buf) -> Result<(), ChunkError> {
        use self::BodyProgress::*;
        match *self {
            Fixed(_) => {},
            Chunked(ref mut s) => s.parse(buf)?,
            Eof => {}
        }
        Ok(())
    }
    pub fn consume(&mut self, buf: &mut Buf, n: usize) {
        use self::BodyProgress::*;
        buf.consume(n);
        match *self {
            Fixed(ref mut x) => {
                assert!(*x >= n as u64);
                *x -= n as u64;
            }
            Chunked(ref mut s) => s.consume(n),
            Eof => {}
        }
    }
    /// Connection can't be reused after this kind of body
    pub fn is_eof_delimited(&self) -> bool {
        matches!(*self, BodyProgress::Eof)
    }
}
