macro_rules! statuses {
    ($( $(#[$doc:meta])* $name:ident = $code:tt, $reason:expr; )*) => {
        /// Enum with some HTTP Status codes.
        ///
        /// Use `Response::custom` (or `Encoder::custom_status`) for codes
        /// which are not listed here.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Status {
            $( $(#[$doc])* $name, )*
        }

        impl Status {
            /// Numeric status code
            pub fn code(&self) -> u16 {
                match *self {
                    $( Status::$name => $code, )*
                }
            }
            /// Canonical reason phrase
            pub fn reason(&self) -> &'static str {
                match *self {
                    $( Status::$name => $reason, )*
                }
            }
            /// Returns `Status` for a known code, otherwise `None`
            pub fn from(code: u16) -> Option<Status> {
                match code {
                    $( $code => Some(Status::$name), )*
                    _ => None,
                }
            }
        }
    }
}

statuses! {
    //  1xx status codes
    Continue = 100, "Continue";
    SwitchingProtocol = 101, "Switching Protocols";
    //  2xx status codes
    Ok = 200, "OK";
    Created = 201, "Created";
    Accepted = 202, "Accepted";
    NonAuthoritativeInformation = 203, "Non-Authoritative Information";
    NoContent = 204, "No Content";
    ResetContent = 205, "Reset Content";
    PartialContent = 206, "Partial Content";
    //  3xx status codes
    MultipleChoices = 300, "Multiple Choices";
    MovedPermanently = 301, "Moved Permanently";
    Found = 302, "Found";
    SeeOther = 303, "See Other";
    NotModified = 304, "Not Modified";
    UseProxy = 305, "Use Proxy";
    TemporaryRedirect = 307, "Temporary Redirect";
    PermanentRedirect = 308, "Permanent Redirect";
    //  4xx status codes
    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    PaymentRequired = 402, "Payment Required";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    MethodNotAllowed = 405, "Method Not Allowed";
    NotAcceptable = 406, "Not Acceptable";
    ProxyAuthenticationRequired = 407, "Proxy Authentication Required";
    RequestTimeout = 408, "Request Timeout";
    Conflict = 409, "Conflict";
    Gone = 410, "Gone";
    LengthRequired = 411, "Length Required";
    PreconditionFailed = 412, "Precondition Failed";
    RequestEntityTooLarge = 413, "Request Entity Too Large";
    RequestURITooLong = 414, "Request-URI Too Long";
    UnsupportedMediaType = 415, "Unsupported Media Type";
    RequestRangeNotSatisfiable = 416, "Request Range Not Satisfiable";
    ExpectationFailed = 417, "Expectation Failed";
    UpgradeRequired = 426, "Upgrade Required";
    TooManyRequests = 429, "Too Many Requests";
    RequestHeaderFieldsTooLarge = 431, "Request Header Fields Too Large";
    //  5xx status codes
    InternalServerError = 500, "Internal Server Error";
    NotImplemented = 501, "Not Implemented";
    BadGateway = 502, "Bad Gateway";
    ServiceUnavailable = 503, "Service Unavailable";
    GatewayTimeout = 504, "Gateway Timeout";
    VersionNotSupported = 505, "HTTP Version Not Supported";
}

impl Status {
    /// Returns `false` for statuses which never carry a message body
    ///
    /// These are all 1xx (Informational), 204 (No Content) and
    /// 304 (Not Modified).
    pub fn response_has_body(&self) -> bool {
        code_has_body(self.code())
    }
}

pub(crate) fn code_has_body(code: u16) -> bool {
    !(code >= 100 && code < 200 || code == 204 || code == 304)
}

#[cfg(test)]
mod test {
    use super::Status;

    #[test]
    fn lookup() {
        assert_eq!(Status::from(404), Some(Status::NotFound));
        assert_eq!(Status::from(299), None);
        assert_eq!(Status::NotFound.reason(), "Not Found");
        assert_eq!(Status::RequestHeaderFieldsTooLarge.code(), 431);
    }

    #[test]
    fn bodyless() {
        assert!(!Status::NoContent.response_has_body());
        assert!(!Status::NotModified.response_has_body());
        assert!(!Status::Continue.response_has_body());
        assert!(Status::Ok.response_has_body());
    }
}
