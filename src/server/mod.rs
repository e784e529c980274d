//! HTTP server protocol implementation
//!
//! The `Proto` future drives a single inbound connection: it parses
//! requests (pipelined ones too), dispatches them through the router and
//! writes responses strictly in the order requests were received.
//!
//! ```no_run
//! # extern crate futures;
//! # extern crate tokio_core;
//! # extern crate tk_duplex;
//! # use futures::Future;
//! # use tokio_core::reactor::Core;
//! # use tokio_core::net::TcpListener;
//! use tk_duplex::Status;
//! use tk_duplex::router::Params;
//! use tk_duplex::server::{Config, Server, Request, Response, Error};
//! use tk_duplex::server::RoutesBuilder;
//!
//! # fn main() {
//! let mut core = Core::new().unwrap();
//! let handle = core.handle();
//! let mut routes = RoutesBuilder::new();
//! routes.handle("/hello/{name}", |_: Request, params: Params| {
//!     let text = format!("Hello {}!", params.get("name").unwrap_or(""));
//!     Ok::<_, Error>(Response::new(Status::Ok).body(text))
//! }).unwrap();
//! let addr = "127.0.0.1:8080".parse().unwrap();
//! let listener = TcpListener::bind(&addr, &handle).unwrap();
//! let server = Server::new(&handle, &Config::new().done(), routes.done());
//! core.run(server.serve(listener)).unwrap();
//! # }
//! ```
use std::time::Duration;

use crate::enums::Version;
use crate::router::{Router, RouterBuilder};

mod config;
mod error;
mod error_page;
mod encoder;
mod handler;
mod headers;
mod listen;
mod proto;
mod request;
mod request_target;
mod response;

pub use self::error::Error;
pub use self::error_page::error_page;
pub use self::handler::Handler;
pub use self::listen::Server;
pub use self::proto::Proto;
pub use self::request::Request;
pub use self::request_target::RequestTarget;
pub use self::response::{Response, Body};


/// Fine-grained configuration of the HTTP server
#[derive(Debug, Clone)]
pub struct Config {
    inflight_request_limit: usize,
    inflight_request_prealloc: usize,
    read_timeout: Duration,
    write_timeout: Duration,
    max_request_body: u64,
    max_headers_size: usize,
}

/// Routing table used by the server
pub type Routes = Router<Box<dyn Handler>>;

/// Builder of the routing table, see `RouterBuilder::handle`
pub type RoutesBuilder = RouterBuilder<Box<dyn Handler>>;

/// This structure contains all needed info to start response of the request
/// in a correct manner
#[derive(Debug, Clone, Copy)]
pub struct ResponseConfig {
    /// Whether request is a HEAD request
    pub is_head: bool,
    /// Connection must be closed after the response
    pub do_close: bool,
    /// Version of HTTP request
    pub version: Version,
}
