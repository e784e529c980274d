use std::error::Error as StdError;
use std::io;

use httparse::Error as HttpError;

use crate::base_serializer::HeaderError;
use crate::chunked::ChunkError;
use crate::connection::Expired;
use crate::error::ErrorKind;


quick_error! {
    #[derive(Debug)]
    /// Client request error
    pub enum Error {
        /// Url can't be parsed
        InvalidUrl(err: url::ParseError) {
            description("invalid url")
            display("invalid url: {}", err)
            from()
        }
        /// Url has no host part
        NoHost {
            description("url has no host")
        }
        /// Scheme of the url is neither `http` nor `https`
        UnsupportedScheme {
            description("scheme of this url is not supported")
        }
        /// `https` url requested but no TLS connector is configured
        TlsNotConfigured {
            description("tls is not configured for this client")
        }
        /// Method is not a valid token
        InvalidMethod {
            description("invalid request method")
        }
        /// Can't write request head
        Request(err: HeaderError) {
            description("can't serialize request")
            display("can't serialize request: {}", err)
            from()
        }
        /// Error establishing TCP connection (includes name resolution)
        Connect(err: io::Error) {
            description("connection error")
            display("connection error: {}", err)
        }
        /// Connection wasn't established within `connect_timeout`
        ConnectTimeout {
            description("connection timed out")
        }
        /// TLS handshake failed
        Tls(err: Box<dyn StdError + Send + Sync>) {
            description("tls handshake error")
            display("tls handshake error: {}", err)
        }
        /// I/O (basically networking) error occured during request
        Io(err: io::Error) {
            description("IO error")
            display("IO error: {}", err)
            from()
        }
        /// Read or write timeout expired
        Timeout(which: Expired) {
            description("timeout")
            display("{:?} timeout", which)
        }
        /// Bad response headers received
        Header(err: HttpError) {
            description("bad headers")
            display("bad headers: {}", err)
            from()
        }
        /// Bad chunked encoding received
        ChunkSize(err: ChunkError) {
            description("bad chunked encoding")
            display("bad chunked encoding: {}", err)
            from()
        }
        /// Bad `Content-Length` header
        BadContentLength {
            description("bad content length")
        }
        /// Duplicate `Content-Length` header
        DuplicateContentLength {
            description("duplicate content length")
        }
        /// Response body is larger than `max_response_length`
        ResponseTooLong {
            description("response body is too long")
        }
        /// Response head is larger than `max_headers_size`
        HeadersTooLong {
            description("response headers are too long")
        }
        /// Connection reset by peer when reading response headers
        ResetOnResponseHeaders {
            description("connection closed prematurely while reading headers")
        }
        /// Connection reset by peer when response body
        ResetOnResponseBody {
            description("connection closed prematurely while reading body")
        }
        /// The call is canceled via `Call::cancel` or the client is gone
        Canceled {
            description("request canceled")
        }
    }
}

impl Error {
    /// Coarse classification of the error
    pub fn kind(&self) -> ErrorKind {
        use self::Error::*;
        match *self {
            InvalidUrl(..) | NoHost | UnsupportedScheme | TlsNotConfigured
            | InvalidMethod | Request(..)
            => ErrorKind::Configuration,
            Connect(..) | ConnectTimeout | Tls(..) | Io(..) | Timeout(..)
            | ResetOnResponseHeaders | ResetOnResponseBody | Canceled
            => ErrorKind::Transport,
            Header(..) | ChunkSize(..) | BadContentLength
            | DuplicateContentLength | ResponseTooLong | HeadersTooLong
            => ErrorKind::Protocol,
        }
    }
}

#[cfg(test)]
mod test {
    use std::io;
    use super::Error;
    use crate::{ErrorKind, Expired};

    #[test]
    fn kinds() {
        assert_eq!(Error::TlsNotConfigured.kind(), ErrorKind::Configuration);
        assert_eq!(Error::Timeout(Expired::Read).kind(),
                   ErrorKind::Transport);
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "no");
        assert_eq!(Error::Connect(refused).kind(), ErrorKind::Transport);
        assert_eq!(Error::DuplicateContentLength.kind(), ErrorKind::Protocol);
    }
}
