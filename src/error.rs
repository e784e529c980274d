use std::fmt;


/// Coarse classification of any error produced by the crate
///
/// Both `server::Error` and `client::Error` have a `kind()` method returning
/// this value, so callers may decide on retry or logging policy without
/// matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Peer sent something that is not valid HTTP or exceeds configured
    /// limits
    Protocol,
    /// I/O error, timeout, connection refused or closed prematurely
    Transport,
    /// The call can't be made with current settings, e.g. `https` URL with
    /// no TLS connector configured
    Configuration,
    /// User-supplied handler failed
    Handler,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::ErrorKind::*;
        f.write_str(match *self {
            Protocol => "protocol error",
            Transport => "transport error",
            Configuration => "configuration error",
            Handler => "handler error",
        })
    }
}
