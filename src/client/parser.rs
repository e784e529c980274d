use std::str::from_utf8;

use httparse;

use crate::enums::Version;
use crate::enums::status::code_has_body;
use crate::headers::{self, HeaderList};
use super::Error;


/// Number of headers to allocate on a stack
const MIN_HEADERS: usize = 16;
/// A hard limit on the number of headers
const MAX_HEADERS: usize = 1024;


#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodyKind {
    Fixed(u64),
    Chunked,
    Eof,
}

/// Parsed status line and headers of a response
#[derive(Debug)]
pub struct Head {
    pub version: Version,
    pub code: u16,
    pub reason: String,
    pub headers: HeaderList,
    pub body: BodyKind,
    pub close: bool,
}

fn scan_headers(is_head: bool, code: u16, headers: &[httparse::Header])
    -> Result<(BodyKind, bool), Error>
{
    // Implements the body length algorithm for responses:
    // http://httpwg.github.io/specs/rfc7230.html#message.body.length
    //
    // 1. For HEAD, 1xx, 204, 304 -- no body
    // 2. If last transfer encoding is chunked -> Chunked
    // 3. If Content-Length -> Fixed
    // 4. Else Eof
    use self::BodyKind::*;
    if is_head || !code_has_body(code) {
        return Ok((Fixed(0), false));
    }
    let mut has_content_length = false;
    let mut close = false;
    let mut result = Eof;
    for header in headers.iter() {
        if headers::is_transfer_encoding(header.name) {
            if let Some(enc) = header.value.split(|&x| x == b',').last() {
                if headers::is_chunked(enc) {
                    if has_content_length {
                        // override but don't allow keep-alive
                        close = true;
                    }
                    result = Chunked;
                }
            }
        } else if headers::is_content_length(header.name) {
            if has_content_length {
                return Err(Error::DuplicateContentLength);
            }
            has_content_length = true;
            if result != Chunked {
                let len = from_utf8(header.value).ok()
                    .and_then(|s| s.trim().parse().ok())
                    .ok_or(Error::BadContentLength)?;
                result = Fixed(len);
            } else {
                // transfer-encoding has preference and don't allow keep-alive
                close = true;
            }
        }
    }
    if result == Eof {
        close = true;
    }
    Ok((result, close))
}

fn convert(raw: &httparse::Response, status: httparse::Status<usize>,
    is_head: bool)
    -> Result<Option<(Head, usize)>, Error>
{
    let bytes = match status {
        httparse::Status::Complete(bytes) => bytes,
        httparse::Status::Partial => return Ok(None),
    };
    let (version, code, reason) = match (raw.version, raw.code, raw.reason) {
        (Some(v), Some(c), Some(r)) => (v, c, r),
        _ => return Ok(None),
    };
    let version = Version::from_httparse(version)
        .ok_or(Error::Header(httparse::Error::Version))?;
    let (body, close) = scan_headers(is_head, code, &raw.headers[..])?;
    let headers = HeaderList::from_httparse(&raw.headers[..]);
    // we never ask for an upgrade so can't continue after it
    let close = close || code == 101 ||
        !headers::keep_alive(version, &headers);
    Ok(Some((Head {
        version: version,
        code: code,
        reason: reason.to_string(),
        headers: headers,
        body: body,
        close: close,
    }, bytes)))
}

/// Parses response head from the start of the buffer
///
/// Returns `None` if header block is not complete yet. `is_head` means
/// the request was `HEAD`, so response has no body whatever headers say.
pub fn parse_response(buf: &[u8], is_head: bool)
    -> Result<Option<(Head, usize)>, Error>
{
    // obs-fold is replaced by a space when headers are converted
    let mut config = httparse::ParserConfig::default();
    config.allow_obsolete_multiline_headers_in_responses(true);
    let mut headers = [httparse::EMPTY_HEADER; MIN_HEADERS];
    {
        let mut raw = httparse::Response::new(&mut headers);
        match config.parse_response(&mut raw, buf) {
            Ok(status) => return convert(&raw, status, is_head),
            Err(httparse::Error::TooManyHeaders) => {}
            Err(e) => return Err(e.into()),
        }
    }
    let mut headers = vec![httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut raw = httparse::Response::new(&mut headers);
    let status = config.parse_response(&mut raw, buf)?;
    convert(&raw, status, is_head)
}

impl Head {
    /// Interim response (`100 Continue` and alike) to be skipped
    pub fn is_informational(&self) -> bool {
        self.code >= 100 && self.code < 200 && self.code != 101
    }
}
