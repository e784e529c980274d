use std::io;
use std::convert::From;
use std::error::Error as StdError;

use httparse;

use crate::base_serializer::HeaderError;
use crate::chunked::ChunkError;
use crate::connection::Expired;
use crate::enums::Status;
use crate::error::ErrorKind;


quick_error! {
    /// HTTP server error
    #[derive(Debug)]
    pub enum Error {
        /// Socket IO error
        Io(err: io::Error) {
            description("I/O error")
            display("I/O error: {}", err)
            from()
        }
        /// Read or write deadline has expired
        Timeout(which: Expired) {
            description("timeout")
            display("{:?} timeout", which)
        }
        /// Error parsing http headers
        ParseError(err: httparse::Error) {
            description("parse error")
            display("parse error: {:?}", err)
            from()
        }
        /// Error parsing http chunk
        ChunkParseError(err: ChunkError) {
            description("chunk parse error")
            display("chunk parse error: {}", err)
            from()
        }
        /// Bad request target (middle line of the request line)
        BadRequestTarget {
            description("error parsing request target")
        }
        /// Host header is invalid (non-utf-8 for example)
        HostInvalid {
            description("invalid host header")
        }
        /// Duplicate host header in request
        DuplicateHost {
            description("duplicate host header")
        }
        /// Content length header is invalid (non-integer, or > 64bit)
        ContentLengthInvalid {
            description("invalid content-length header")
        }
        /// Duplicate content-length header, this is prohibited due to security
        DuplicateContentLength {
            description("duplicate content length header")
        }
        /// Unsupported kind of request body (`CONNECT` or unknown
        /// transfer encoding)
        UnsupportedBody {
            description("this kind of request body is not supported")
        }
        /// Request body is larger than configured limit
        RequestTooLong {
            description("request body is too big")
        }
        /// Request headers are larger than configured limit
        HeadersTooLong {
            description("request headers are too big")
        }
        /// Handler produced a response with invalid headers
        Header(err: HeaderError) {
            description("invalid response header")
            display("invalid response header: {}", err)
            from()
        }
        /// Error returned by request handler
        Custom(err: Box<dyn StdError + Send + Sync>) {
            description("handler error")
            display("handler error: {}", err)
        }
    }
}

impl Error {
    /// Wraps any error returned by a handler
    pub fn custom<E>(err: E) -> Error
        where E: Into<Box<dyn StdError + Send + Sync>>
    {
        Error::Custom(err.into())
    }
    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        use self::Error::*;
        match *self {
            Io(..) | Timeout(..) => ErrorKind::Transport,
            Header(..) | Custom(..) => ErrorKind::Handler,
            ParseError(..) | ChunkParseError(..) | BadRequestTarget |
            HostInvalid | DuplicateHost | ContentLengthInvalid |
            DuplicateContentLength | UnsupportedBody | RequestTooLong |
            HeadersTooLong => ErrorKind::Protocol,
        }
    }
    /// Status of the error page sent to the peer for this error
    ///
    /// Returns `None` for transport errors, there is no way to send
    /// anything in this case.
    pub fn status(&self) -> Option<Status> {
        use self::Error::*;
        match *self {
            Io(..) | Timeout(..) => None,
            Header(..) | Custom(..) => Some(Status::InternalServerError),
            RequestTooLong => Some(Status::RequestEntityTooLarge),
            HeadersTooLong => Some(Status::RequestHeaderFieldsTooLarge),
            UnsupportedBody => Some(Status::NotImplemented),
            _ => Some(Status::BadRequest),
        }
    }
}
