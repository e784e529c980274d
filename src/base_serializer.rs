//! Serializer state shared by the client and server roles
//!
//! Every call writes into the output buffer at once and moves the state
//! forward, so nothing is serialized twice.

use std::fmt::Display;
use std::io::Write;

use netbuf::Buf;

use crate::enums::Version;
use crate::enums::status::code_has_body;
use crate::headers::{is_content_length, is_transfer_encoding};

quick_error! {
    /// Error adding a header to the message
    #[derive(Debug)]
    pub enum HeaderError {
        InvalidHeaderName {
            description("Header name contains invalid characters")
        }
        InvalidHeaderValue {
            description("Header value contains invalid characters")
        }
        DuplicateBodyLength {
            description("Body length of the message is already set")
        }
        CantDetermineBodySize {
            description("Neither Content-Length nor Transfer-Encoding \
                is present in the headers")
        }
        BodyLengthHeader {
            description("Content-Length and Transfer-Encoding must be set \
                using the specialized methods")
        }
        RequireBodyless {
            description("This message must not contain body length fields.")
        }
    }
}

/// How the end of the body is found by the peer
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length`, holds the number of bytes not written yet
    Fixed(u64),
    Chunked,
    /// Body ends when connection is closed (HTTP/1.0 streaming)
    Eof,
}

#[derive(Debug)]
pub enum MessageState {
    /// Nothing has been sent.
    ResponseStart { version: Version, body: Body, close: bool },
    /// `100 Continue` has been sent, final status line is pending.
    FinalResponseStart { version: Version, body: Body, close: bool },
    /// Nothing has been sent.
    RequestStart,
    /// Start line is in the buffer, body length is unknown yet.
    Headers { body: Body, close: bool },
    /// Body length is chosen, more headers may follow.
    Framed { framing: Framing, is_head: bool, close: bool },
    /// Headers are finished, the message has no body at all.
    Bodyless,
    /// Headers are finished, body is being written.
    Sending { framing: Framing, is_head: bool },
    Done,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Body {
    /// Message contains a body.
    Normal,
    /// Body length is sent but the body itself is not: responses to HEAD.
    Head,
    /// Message must not have a body: 1xx, 204 and 304 responses.
    Denied,
    /// Requests without length fields have an empty body.
    Request,
}

fn invalid_header(value: &[u8]) -> bool {
    value.iter().any(|&x| x == b'\r' || x == b'\n')
}

/// Writes `name: value\r\n`, nothing is left in the buffer on error
fn write_field<F>(buf: &mut Buf, name: &str, value: F)
    -> Result<(), HeaderError>
    where F: FnOnce(&mut Buf)
{
    if invalid_header(name.as_bytes()) {
        return Err(HeaderError::InvalidHeaderName);
    }
    let start = buf.len();
    buf.extend(name.as_bytes());
    buf.extend(b": ");
    let value_start = buf.len();
    value(buf);
    if invalid_header(&buf[value_start..]) {
        buf.remove_range(start..);
        return Err(HeaderError::InvalidHeaderValue);
    }
    buf.extend(b"\r\n");
    Ok(())
}

impl MessageState {
    /// Writes status line
    ///
    /// # Panics
    ///
    /// When status line is already written or the code is 100, which is
    /// not a final status.
    pub fn response_status(&mut self, buf: &mut Buf, code: u16, reason: &str) {
        use self::MessageState::*;
        match *self {
            ResponseStart { version, body, close } |
            FinalResponseStart { version, body, close } => {
                assert!(code != 100);
                write!(buf, "{} {} {}\r\n", version, code, reason).unwrap();
                let body = if code_has_body(code) { body } else { Body::Denied };
                *self = Headers { body: body, close: close };
            }
            ref state => {
                panic!("Called response_status() in state {:?}", state)
            }
        }
    }

    /// Writes request line
    ///
    /// # Panics
    ///
    /// When request line is already written.
    pub fn request_line(&mut self, buf: &mut Buf,
        method: &str, path: &str, version: Version)
    {
        match *self {
            MessageState::RequestStart => {
                write!(buf, "{} {} {}\r\n", method, path, version).unwrap();
                *self = MessageState::Headers {
                    body: Body::Request,
                    close: false,
                };
            }
            ref state => panic!("Called request_line() in state {:?}", state),
        }
    }

    /// Writes `100 Continue` interim response
    ///
    /// # Panics
    ///
    /// When anything is already written for this response.
    pub fn response_continue(&mut self, buf: &mut Buf) {
        use self::MessageState::*;
        match *self {
            ResponseStart { version, body, close } => {
                write!(buf, "{} 100 Continue\r\n\r\n", version).unwrap();
                *self = FinalResponseStart {
                    version: version,
                    body: body,
                    close: close,
                };
            }
            ref state => {
                panic!("Called response_continue() in state {:?}", state)
            }
        }
    }

    fn check_field(&self, name: &str) -> Result<(), HeaderError> {
        if is_content_length(name) || is_transfer_encoding(name) {
            return Err(HeaderError::BodyLengthHeader);
        }
        match *self {
            MessageState::Headers { .. } | MessageState::Framed { .. } => Ok(()),
            ref state => panic!("Header added in state {:?}", state),
        }
    }

    /// Adds a header
    ///
    /// `Content-Length` and `Transfer-Encoding` are rejected, they are
    /// written by `add_length`, `add_chunked` and `add_until_close`.
    pub fn add_header(&mut self, buf: &mut Buf, name: &str, value: &[u8])
        -> Result<(), HeaderError>
    {
        self.check_field(name)?;
        write_field(buf, name, |buf| buf.extend(value))
    }

    /// Same as `add_header` but formats the value directly into the buffer
    pub fn format_header<D: Display>(&mut self, buf: &mut Buf,
        name: &str, value: D)
        -> Result<(), HeaderError>
    {
        self.check_field(name)?;
        write_field(buf, name, |buf| { write!(buf, "{}", value).unwrap(); })
    }

    fn set_framing(&mut self, framing: Framing) -> Result<(), HeaderError> {
        use self::MessageState::*;
        match *self {
            Framed { .. } => Err(HeaderError::DuplicateBodyLength),
            Headers { body: Body::Denied, .. } => {
                Err(HeaderError::RequireBodyless)
            }
            Headers { body: Body::Request, .. } if framing == Framing::Eof => {
                Err(HeaderError::CantDetermineBodySize)
            }
            Headers { body, close } => {
                *self = Framed {
                    framing: framing,
                    is_head: body == Body::Head,
                    close: close,
                };
                Ok(())
            }
            ref state => panic!("Body length set in state {:?}", state),
        }
    }

    /// Writes `Content-Length`, the body written later must match it
    pub fn add_length(&mut self, buf: &mut Buf, n: u64)
        -> Result<(), HeaderError>
    {
        self.set_framing(Framing::Fixed(n))?;
        write_field(buf, "Content-Length", |buf| {
            write!(buf, "{}", n).unwrap();
        })
    }

    /// Writes `Transfer-Encoding: chunked`
    pub fn add_chunked(&mut self, buf: &mut Buf) -> Result<(), HeaderError> {
        self.set_framing(Framing::Chunked)?;
        write_field(buf, "Transfer-Encoding", |buf| buf.extend(b"chunked"))
    }

    /// Marks the body as delimited by closing the connection
    ///
    /// The only way to stream a body of unknown size to an HTTP/1.0 peer.
    /// `done_headers` adds `Connection: close` for such messages.
    pub fn add_until_close(&mut self) -> Result<(), HeaderError> {
        self.set_framing(Framing::Eof)
    }

    /// Finishes the header block, returns `true` if a body is expected
    ///
    /// `false` is returned for 1xx, 204 and 304 responses and for
    /// responses to HEAD, even if `Content-Length` is non-zero.
    pub fn done_headers(&mut self, buf: &mut Buf)
        -> Result<bool, HeaderError>
    {
        use self::MessageState::*;
        let (next, close) = match *self {
            Headers { body: Body::Denied, close } => (Bodyless, close),
            Headers { body: Body::Request, close } => {
                (Sending { framing: Framing::Fixed(0), is_head: false }, close)
            }
            Headers { .. } => return Err(HeaderError::CantDetermineBodySize),
            Framed { framing, is_head, close } => {
                (Sending { framing: framing, is_head: is_head },
                 close || framing == Framing::Eof)
            }
            ref state => panic!("Called done_headers() in state {:?}", state),
        };
        if close {
            self.add_header(buf, "Connection", b"close")?;
        }
        let expect_body = match next {
            Sending { is_head, .. } => !is_head,
            _ => false,
        };
        *self = next;
        buf.extend(b"\r\n");
        Ok(expect_body)
    }

    /// Writes a piece of the body
    ///
    /// Empty chunks are skipped for chunked bodies. For HEAD responses the
    /// data is counted but not sent.
    ///
    /// # Panics
    ///
    /// When headers are not finished, the message can't have a body, or
    /// more bytes are written than `Content-Length` allows.
    pub fn write_body(&mut self, buf: &mut Buf, data: &[u8]) {
        match *self {
            MessageState::Sending { ref mut framing, is_head } => {
                match *framing {
                    Framing::Fixed(ref mut left) => {
                        assert!(data.len() as u64 <= *left,
                            "{} body bytes left, got {}", left, data.len());
                        *left -= data.len() as u64;
                        if !is_head {
                            buf.extend(data);
                        }
                    }
                    Framing::Chunked => if !is_head && !data.is_empty() {
                        write!(buf, "{:x}\r\n", data.len()).unwrap();
                        buf.extend(data);
                        buf.extend(b"\r\n");
                    },
                    Framing::Eof => if !is_head {
                        buf.extend(data);
                    },
                }
            }
            ref state => panic!("Called write_body() in state {:?}", state),
        }
    }

    /// Writes the terminal chunk if needed, may be called multiple times
    ///
    /// # Panics
    ///
    /// When headers are not finished or fixed-size body is incomplete.
    pub fn done(&mut self, buf: &mut Buf) {
        use self::MessageState::*;
        match *self {
            Done => {}
            Bodyless => *self = Done,
            Sending { framing: Framing::Fixed(left), is_head: false }
            if left > 0 => {
                panic!("Message finished with {} body bytes missing", left);
            }
            Sending { framing: Framing::Chunked, is_head: false } => {
                buf.extend(b"0\r\n\r\n");
                *self = Done;
            }
            Sending { .. } => *self = Done,
            ref state => panic!("Called done() in state {:?}", state),
        }
    }
}

#[cfg(test)]
mod test {
    use netbuf::Buf;

    use super::{MessageState, Body, HeaderError};
    use crate::enums::Version;

    fn do_request<F>(fun: F) -> Buf
        where F: FnOnce(MessageState, &mut Buf)
    {
        let mut buf = Buf::new();
        fun(MessageState::RequestStart, &mut buf);
        buf
    }
    fn do_response10<F>(fun: F) -> Buf
        where F: FnOnce(MessageState, &mut Buf)
    {
        let mut buf = Buf::new();
        fun(MessageState::ResponseStart {
            version: Version::Http10,
            body: Body::Normal,
            close: false,
        }, &mut buf);
        buf
    }
    fn do_response11<F>(close: bool, fun: F) -> Buf
        where F: FnOnce(MessageState, &mut Buf)
    {
        let mut buf = Buf::new();
        fun(MessageState::ResponseStart {
            version: Version::Http11,
            body: Body::Normal,
            close: close,
        }, &mut buf);
        buf
    }

    fn do_head_response11<F>(close: bool, fun: F)
        -> Buf
        where F: FnOnce(MessageState, &mut Buf)
    {
        let mut buf = Buf::new();
        fun(MessageState::ResponseStart {
            version: Version::Http11,
            body: Body::Head,
            close: close,
        }, &mut buf);
        buf
    }

    #[test]
    fn minimal_request() {
        assert_eq!(&do_request(|mut msg, buf| {
            msg.request_line(buf, "GET", "/", Version::Http10);
            msg.done_headers(buf).unwrap();
        })[..], "GET / HTTP/1.0\r\n\r\n".as_bytes());
    }

    #[test]
    fn request_with_body() {
        assert_eq!(&do_request(|mut msg, buf| {
            msg.request_line(buf, "POST", "/items", Version::Http11);
            msg.add_header(buf, "Host", b"example.com").unwrap();
            msg.add_length(buf, 4).unwrap();
            msg.done_headers(buf).unwrap();
            msg.write_body(buf, b"data");
            msg.done(buf);
            assert_matches!(msg, MessageState::Done);
        })[..], concat!("POST /items HTTP/1.1\r\nHost: example.com\r\n",
                        "Content-Length: 4\r\n\r\ndata").as_bytes());
    }

    #[test]
    fn minimal_response() {
        assert_eq!(&do_response10(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 0).unwrap();
            msg.done_headers(buf).unwrap();
        })[..], "HTTP/1.0 200 OK\r\nContent-Length: 0\r\n\r\n".as_bytes());
    }

    #[test]
    fn close_response11() {
        assert_eq!(&do_response11(true, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 0).unwrap();
            msg.done_headers(buf).unwrap();
        })[..], concat!("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n",
                        "Connection: close\r\n\r\n").as_bytes());
    }

    #[test]
    fn chunked_response() {
        assert_eq!(&do_response11(false, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_chunked(buf).unwrap();
            msg.done_headers(buf).unwrap();
            msg.write_body(buf, b"hello");
            msg.write_body(buf, b"");
            msg.write_body(buf, b"0123456789abcdef!");
            msg.done(buf);
        })[..], concat!("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n",
                        "\r\n5\r\nhello\r\n11\r\n0123456789abcdef!\r\n",
                        "0\r\n\r\n").as_bytes());
    }

    #[test]
    fn until_close_response10() {
        assert_eq!(&do_response10(|mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_until_close().unwrap();
            msg.done_headers(buf).unwrap();
            msg.write_body(buf, b"stream");
            msg.done(buf);
        })[..], "HTTP/1.0 200 OK\r\nConnection: close\r\n\r\nstream"
                .as_bytes());
    }

    #[test]
    fn head_response() {
        // The response to a HEAD request may contain the real body length.
        assert_eq!(&do_head_response11(false, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 500).unwrap();
            msg.done_headers(buf).unwrap();
        })[..], "HTTP/1.1 200 OK\r\nContent-Length: 500\r\n\r\n".as_bytes());
    }

    #[test]
    fn informational_response() {
        // No response with an 1xx status code may contain a body length.
        assert_eq!(&do_response11(false, |mut msg, buf| {
            msg.response_status(buf, 142, "Foo");
            msg.add_length(buf, 500).unwrap_err();
            msg.done_headers(buf).unwrap();
        })[..], "HTTP/1.1 142 Foo\r\n\r\n".as_bytes());
    }

    #[test]
    fn continue_then_final() {
        assert_eq!(&do_response11(false, |mut msg, buf| {
            msg.response_continue(buf);
            msg.response_status(buf, 204, "No Content");
            msg.done_headers(buf).unwrap();
        })[..], "HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 204 No Content\r\n\r\n"
                .as_bytes());
    }

    #[test]
    fn rejects_bad_headers() {
        do_response11(false, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            let before = buf.len();
            assert!(msg.add_header(buf, "X-Bad", b"a\r\nb").is_err());
            assert_eq!(buf.len(), before);
            assert!(msg.add_header(buf, "content-length", b"1").is_err());
        });
    }

    #[test]
    fn body_length_is_set_once() {
        do_response11(false, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.add_length(buf, 2).unwrap();
            assert_matches!(msg.add_chunked(buf),
                Err(HeaderError::DuplicateBodyLength));
            assert_matches!(msg.add_until_close(),
                Err(HeaderError::DuplicateBodyLength));
        });
        do_request(|mut msg, buf| {
            msg.request_line(buf, "POST", "/", Version::Http11);
            assert_matches!(msg.add_until_close(),
                Err(HeaderError::CantDetermineBodySize));
        });
    }

    #[test]
    fn formatted_header() {
        assert_eq!(&do_response11(false, |mut msg, buf| {
            msg.response_status(buf, 200, "OK");
            msg.format_header(buf, "X-Answer", 42).unwrap();
            msg.add_length(buf, 0).unwrap();
            msg.done_headers(buf).unwrap();
        })[..], concat!("HTTP/1.1 200 OK\r\nX-Answer: 42\r\n",
                        "Content-Length: 0\r\n\r\n").as_bytes());
    }
}
