//! The HTTP/1.x client with connection pooling
//!
//! `Client::call` serializes the request, takes an idle keep-alive
//! connection to the destination from the pool (or connects a new one) and
//! returns a `Call` future resolving to the fully buffered `Response`.
//!
//! ```no_run
//! # extern crate futures;
//! # extern crate tokio_core;
//! # extern crate tk_duplex;
//! # use tokio_core::reactor::Core;
//! use tk_duplex::client::{Client, Config};
//!
//! # fn main() {
//! let mut core = Core::new().unwrap();
//! let client = Client::new(&core.handle(), &Config::new().done());
//! let call = client.call("http://example.com/", "GET", None, None).unwrap();
//! let response = core.run(call).unwrap();
//! println!("{} {}", response.code(), response.reason());
//! # }
//! ```
use std::time::Duration;

mod client;
mod config;
mod connect;
mod encoder;
mod errors;
mod parser;
mod pool;
mod proto;
mod response;

pub use self::client::{Client, Call, Stats};
pub use self::connect::{Connect, TlsConnect, TcpConnector};
pub use self::connect::{Destination, Io, Stream, StreamFuture};
pub use self::errors::Error;
pub use self::response::Response;


/// Fine-grained configuration of the HTTP client
#[derive(Debug, Clone)]
pub struct Config {
    read_timeout: Duration,
    write_timeout: Duration,
    connect_timeout: Duration,
    max_idle_per_destination: usize,
    idle_timeout: Duration,
    max_response_length: usize,
    max_headers_size: usize,
    user_agent: Option<String>,
}
