use std::cmp::min;

use httparse::{parse_chunk_size, Status};
use netbuf::Buf;

/// Maximum length of chunk size line (including extensions)
const MAX_CHUNK_HEAD: usize = 128;
/// Maximum length of a single trailer line
const MAX_TRAILER_LINE: usize = 8192;


quick_error! {
    /// Error decoding chunked body
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ChunkError {
        /// Chunk size line is not a valid hex number
        InvalidSize {
            description("invalid chunk size")
        }
        /// Chunk size line (with extensions) is too long
        SizeLineTooLong {
            description("chunk size line is too long")
        }
        /// Chunk data is not followed by CRLF
        MissingDelimiter {
            description("chunk data is not terminated by CRLF")
        }
        /// Malformed trailer field
        InvalidTrailer {
            description("invalid trailer field")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Size,
    Data(u64),
    DataEnd,
    Trailers,
    Done,
}

/// Incremental chunked decoder
///
/// Decoding is done in place: framing (size lines, delimiters, trailers)
/// is removed from the buffer so the first `buffered()` bytes of the
/// buffer are contiguous body bytes. The state survives between reads, so
/// nothing is ever parsed twice.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    buffered: usize,
    phase: Phase,
}

impl State {
    pub fn new() -> State {
        State {
            buffered: 0,
            phase: Phase::Size,
        }
    }
    pub fn parse(&mut self, buf: &mut Buf) -> Result<(), ChunkError> {
        loop {
            match self.phase {
                Phase::Done => return Ok(()),
                Phase::Size => {
                    let res = parse_chunk_size(&buf[self.buffered..])
                        .map_err(|_| ChunkError::InvalidSize)?;
                    match res {
                        Status::Complete((bytes, size)) => {
                            buf.remove_range(
                                self.buffered..self.buffered+bytes);
                            self.phase = if size == 0 {
                                Phase::Trailers
                            } else {
                                Phase::Data(size)
                            };
                        }
                        Status::Partial => {
                            if buf.len() - self.buffered > MAX_CHUNK_HEAD {
                                return Err(ChunkError::SizeLineTooLong);
                            }
                            return Ok(());
                        }
                    }
                }
                Phase::Data(pending) => {
                    let available = (buf.len() - self.buffered) as u64;
                    if available == 0 {
                        return Ok(());
                    }
                    let bytes = min(available, pending);
                    self.buffered += bytes as usize;
                    self.phase = if bytes == pending {
                        Phase::DataEnd
                    } else {
                        Phase::Data(pending - bytes)
                    };
                }
                Phase::DataEnd => {
                    if buf.len() < self.buffered + 2 {
                        return Ok(());
                    }
                    if &buf[self.buffered..self.buffered+2] != b"\r\n" {
                        return Err(ChunkError::MissingDelimiter);
                    }
                    buf.remove_range(self.buffered..self.buffered+2);
                    self.phase = Phase::Size;
                }
                Phase::Trailers => {
                    let line_end = buf[self.buffered..]
                        .windows(2).position(|w| w == b"\r\n");
                    match line_end {
                        None => {
                            if buf.len() - self.buffered > MAX_TRAILER_LINE {
                                return Err(ChunkError::InvalidTrailer);
                            }
                            return Ok(());
                        }
                        Some(0) => {
                            buf.remove_range(
                                self.buffered..self.buffered+2);
                            self.phase = Phase::Done;
                        }
                        Some(end) => {
                            // trailer fields are validated and dropped
                            let start = self.buffered;
                            if !buf[start..start+end].contains(&b':') {
                                return Err(ChunkError::InvalidTrailer);
                            }
                            buf.remove_range(start..start+end+2);
                        }
                    }
                }
            }
        }
    }
    /// Number of decoded body bytes at the start of the buffer
    pub fn buffered(&self) -> usize {
        self.buffered
    }
    /// Terminal chunk and trailers are received
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }
    /// Marks `n` decoded bytes as consumed (caller removes them from buffer)
    pub fn consume(&mut self, n: usize) {
        assert!(self.buffered >= n);
        self.buffered -= n;
    }
}
