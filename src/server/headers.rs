use std::str::from_utf8;

use httparse;

use crate::enums::Version;
use crate::headers::{self, HeaderList};
use super::{Error, RequestTarget, ResponseConfig};


/// Number of headers to allocate on a stack
const MIN_HEADERS: usize = 16;
/// A hard limit on the number of headers
const MAX_HEADERS: usize = 1024;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Fixed(u64),
    Chunked,
}

/// Parsed request line and headers
#[derive(Debug)]
pub struct Head {
    pub method: String,
    pub target: String,
    pub path: String,
    pub query: Option<String>,
    pub version: Version,
    pub host: Option<String>,
    pub headers: HeaderList,
    pub body: BodyKind,
    pub close: bool,
    pub expect_continue: bool,
}

struct Scanned<'a> {
    body: BodyKind,
    close: bool,
    expect_continue: bool,
    host: Option<&'a str>,
}

fn scan_headers<'a>(raw_headers: &[httparse::Header<'a>])
    -> Result<Scanned<'a>, Error>
{
    // Implements the body length algorithm for requests:
    // http://httpwg.github.io/specs/rfc7230.html#message.body.length
    //
    // The length of a request body is determined by one of the following
    // (in order of precedence):
    //
    // 1. If the request contains a valid `Transfer-Encoding` header
    //    with `chunked` as the last encoding the request is chunked
    //    (3rd option in RFC).
    // 2. If the request contains a valid `Content-Length` header
    //    the request has the given length in octets
    //    (5th option in RFC).
    // 3. If neither `Transfer-Encoding` nor `Content-Length` are
    //    present the request has an empty body
    //    (6th option in RFC).
    // 4. In all other cases the request is a bad request.
    use self::BodyKind::*;
    let mut has_content_length = false;
    let mut close = false;
    let mut expect_continue = false;
    let mut body = Fixed(0);
    let mut host = None;
    for header in raw_headers.iter() {
        if headers::is_transfer_encoding(header.name) {
            match header.value.split(|&x| x == b',').last() {
                Some(enc) if headers::is_chunked(enc) => {
                    if has_content_length {
                        // override but don't allow keep-alive
                        close = true;
                    }
                    body = Chunked;
                }
                _ => return Err(Error::UnsupportedBody),
            }
        } else if headers::is_content_length(header.name) {
            if has_content_length {
                // duplicate content_length
                return Err(Error::DuplicateContentLength);
            }
            has_content_length = true;
            let len = from_utf8(header.value).ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or(Error::ContentLengthInvalid)?;
            if body != Chunked {
                body = Fixed(len);
            } else {
                // transfer-encoding has preference and don't allow keep-alive
                close = true;
            }
        } else if header.name.eq_ignore_ascii_case("Host") {
            if host.is_some() {
                return Err(Error::DuplicateHost);
            }
            host = Some(from_utf8(header.value)
                .map_err(|_| Error::HostInvalid)?.trim());
        } else if headers::is_expect(header.name) {
            if headers::is_continue(header.value) {
                expect_continue = true;
            }
        }
    }
    Ok(Scanned {
        body: body,
        close: close,
        expect_continue: expect_continue,
        host: host,
    })
}

fn convert(raw: &httparse::Request, status: httparse::Status<usize>)
    -> Result<Option<(Head, usize)>, Error>
{
    let bytes = match status {
        httparse::Status::Complete(bytes) => bytes,
        httparse::Status::Partial => return Ok(None),
    };
    let (method, target, version) = match (raw.method, raw.path, raw.version)
    {
        (Some(m), Some(p), Some(v)) => (m, p, v),
        _ => return Ok(None),
    };
    let version = Version::from_httparse(version)
        .ok_or(Error::ParseError(httparse::Error::Version))?;
    let parsed = RequestTarget::parse(target)
        .ok_or(Error::BadRequestTarget)?;
    if method == "CONNECT" {
        return Err(Error::UnsupportedBody);
    }
    let path_and_query = parsed.path_and_query()
        .ok_or(Error::BadRequestTarget)?;
    let scanned = scan_headers(&raw.headers[..])?;
    let headers = HeaderList::from_httparse(&raw.headers[..]);
    let (path, query) = match path_and_query.find('?') {
        Some(q) => (&path_and_query[..q], Some(&path_and_query[q+1..])),
        None => (path_and_query, None),
    };
    let host = parsed.authority().or(scanned.host);
    let close = scanned.close || !headers::keep_alive(version, &headers);
    Ok(Some((Head {
        method: method.to_string(),
        target: target.to_string(),
        path: path.to_string(),
        query: query.map(|x| x.to_string()),
        version: version,
        host: host.map(|x| x.to_string()),
        headers: headers,
        body: scanned.body,
        close: close,
        expect_continue: scanned.expect_continue,
    }, bytes)))
}

/// Parses request head from the start of the buffer
///
/// Returns `None` if header block is not complete yet. Otherwise returns
/// the head and the number of bytes it occupies. Obsolete line folding is
/// rejected (RFC 7230 section 3.2.4), the peer gets `400 Bad Request`.
pub fn parse_request(buf: &[u8]) -> Result<Option<(Head, usize)>, Error> {
    let mut headers = [httparse::EMPTY_HEADER; MIN_HEADERS];
    {
        let mut raw = httparse::Request::new(&mut headers);
        match raw.parse(buf) {
            Ok(status) => return convert(&raw, status),
            Err(httparse::Error::TooManyHeaders) => {}
            Err(e) => return Err(e.into()),
        }
    }
    let mut headers = vec![httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut raw = httparse::Request::new(&mut headers);
    let status = raw.parse(buf)?;
    convert(&raw, status)
}

impl Head {
    pub fn response_config(&self) -> ResponseConfig {
        ResponseConfig {
            version: self.version,
            is_head: self.method == "HEAD",
            do_close: self.close,
        }
    }
    pub fn has_body(&self) -> bool {
        self.body != BodyKind::Fixed(0)
    }
}

#[cfg(test)]
mod test {
    use super::{parse_request, BodyKind};
    use crate::enums::Version;
    use crate::server::Error;

    #[test]
    fn partial() {
        assert!(parse_request(b"GET / HTTP/1.1\r\nHost: x\r\n")
            .unwrap().is_none());
    }

    #[test]
    fn simple_get() {
        let data = b"GET /a/b?x=1 HTTP/1.1\r\nHost: example.com\r\n\r\nrest";
        let (head, bytes) = parse_request(data).unwrap().unwrap();
        assert_eq!(bytes, data.len() - 4);
        assert_eq!(head.method, "GET");
        assert_eq!(head.path, "/a/b");
        assert_eq!(head.query.as_ref().map(|x| &x[..]), Some("x=1"));
        assert_eq!(head.host.as_ref().map(|x| &x[..]), Some("example.com"));
        assert_eq!(head.version, Version::Http11);
        assert_eq!(head.body, BodyKind::Fixed(0));
        assert!(!head.close);
    }

    #[test]
    fn http10_closes() {
        let (head, _) = parse_request(b"GET / HTTP/1.0\r\n\r\n")
            .unwrap().unwrap();
        assert!(head.close);
        let (head, _) = parse_request(
            b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\n")
            .unwrap().unwrap();
        assert!(!head.close);
    }

    #[test]
    fn chunked_wins_over_length() {
        let (head, _) = parse_request(concat!(
            "POST / HTTP/1.1\r\nContent-Length: 5\r\n",
            "Transfer-Encoding: gzip, chunked\r\n\r\n").as_bytes())
            .unwrap().unwrap();
        assert_eq!(head.body, BodyKind::Chunked);
        assert!(head.close);
    }

    #[test]
    fn bad_lengths() {
        assert_matches!(parse_request(concat!(
            "POST / HTTP/1.1\r\nContent-Length: 5\r\n",
            "Content-Length: 5\r\n\r\n").as_bytes()),
            Err(Error::DuplicateContentLength));
        assert_matches!(parse_request(
            b"POST / HTTP/1.1\r\nContent-Length: five\r\n\r\n"),
            Err(Error::ContentLengthInvalid));
        assert_matches!(parse_request(
            b"POST / HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n"),
            Err(Error::UnsupportedBody));
    }

    #[test]
    fn bad_request_line() {
        assert_matches!(parse_request(b"GET / TTMP/2.0\r\n\r\n"),
            Err(Error::ParseError(..)));
        assert_matches!(parse_request(b"GET x/y HTTP/1.1\r\n\r\n"),
            Err(Error::BadRequestTarget));
    }

    #[test]
    fn folded_header_rejected() {
        assert_matches!(parse_request(
            b"GET / HTTP/1.1\r\nX-A: one\r\n two\r\n\r\n"),
            Err(Error::ParseError(..)));
    }

    #[test]
    fn expect_continue() {
        let (head, _) = parse_request(concat!(
            "PUT /f HTTP/1.1\r\nExpect: 100-continue\r\n",
            "Content-Length: 10\r\n\r\n").as_bytes())
            .unwrap().unwrap();
        assert!(head.expect_continue);
        assert!(head.has_body());
    }

    #[test]
    fn many_headers() {
        let mut data = String::from("GET / HTTP/1.1\r\n");
        for i in 0..100 {
            data.push_str(&format!("X-Header-{}: {}\r\n", i, i));
        }
        data.push_str("\r\n");
        let (head, _) = parse_request(data.as_bytes()).unwrap().unwrap();
        assert_eq!(head.headers.len(), 100);
    }
}
