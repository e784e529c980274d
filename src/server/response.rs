use std::borrow::Cow;
use std::fmt;

use futures::Stream;

use crate::enums::Status;
use super::Error;


/// Body of the response
pub enum Body {
    /// No body, `Content-Length: 0` is sent (unless status forbids body)
    Empty,
    /// Body of known size, sent with `Content-Length`
    Fixed(Vec<u8>),
    /// Body of unknown size
    ///
    /// Sent with chunked encoding to HTTP/1.1 peers and delimited by
    /// closing connection for HTTP/1.0 ones.
    Stream(Box<dyn Stream<Item=Vec<u8>, Error=Error>>),
}

/// A response returned by a handler
///
/// `Content-Length` and `Transfer-Encoding` are derived from the body and
/// must not be added as headers.
pub struct Response {
    code: u16,
    reason: Cow<'static, str>,
    headers: Vec<(String, Vec<u8>)>,
    body: Body,
}

impl Response {
    /// Response with a known status and an empty body
    pub fn new(status: Status) -> Response {
        Response {
            code: status.code(),
            reason: Cow::Borrowed(status.reason()),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }
    /// Response with a custom status line
    pub fn custom<R: Into<String>>(code: u16, reason: R) -> Response {
        Response {
            code: code,
            reason: Cow::Owned(reason.into()),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }
    /// Adds a header, duplicates are sent as separate fields
    pub fn header<V: AsRef<[u8]>>(mut self, name: &str, value: V) -> Self {
        self.headers.push((name.to_string(), value.as_ref().to_vec()));
        self
    }
    /// Sets a body of known size
    pub fn body<B: Into<Vec<u8>>>(mut self, body: B) -> Self {
        self.body = Body::Fixed(body.into());
        self
    }
    /// Sets a streaming body
    pub fn stream<S>(mut self, stream: S) -> Self
        where S: Stream<Item=Vec<u8>, Error=Error> + 'static
    {
        self.body = Body::Stream(Box::new(stream));
        self
    }
    pub fn code(&self) -> u16 {
        self.code
    }
    pub fn reason(&self) -> &str {
        &self.reason
    }
    pub fn headers(&self) -> &[(String, Vec<u8>)] {
        &self.headers
    }
    pub(crate) fn into_parts(self)
        -> (u16, Cow<'static, str>, Vec<(String, Vec<u8>)>, Body)
    {
        (self.code, self.reason, self.headers, self.body)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Body::Empty => f.write_str("Empty"),
            Body::Fixed(ref v) => write!(f, "Fixed({} bytes)", v.len()),
            Body::Stream(..) => f.write_str("Stream"),
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Response")
            .field("code", &self.code)
            .field("reason", &self.reason)
            .field("headers", &self.headers.len())
            .field("body", &self.body)
            .finish()
    }
}
