//! Event-driven HTTP/1.x engine based on `tokio` tools
//!
//! The crate contains one connection state machine which is used in both
//! roles:
//!
//! * [`server`](server/index.html) reads requests (with pipelining),
//!   dispatches them through a [`Router`](router/struct.Router.html) and
//!   writes responses strictly in request order
//! * [`client`](client/index.html) writes requests, reads responses and
//!   keeps idle keep-alive connections in a per-destination pool
//!
//! Everything runs on a single `tokio_core` reactor. Protocol objects are
//! futures: each readiness or timer event resumes the state machine exactly
//! where it stopped, nothing is re-parsed and nothing blocks.
#![recursion_limit="100"]

extern crate futures;
extern crate futures_cpupool;
extern crate net2;
extern crate url;
extern crate regex;
extern crate httparse;
extern crate netbuf;
extern crate tokio_core;
extern crate tokio_io;
#[cfg(feature="date_header")] extern crate httpdate;
#[macro_use(quick_error)] extern crate quick_error;
#[macro_use] extern crate matches;
#[macro_use] extern crate log;


pub mod server;
pub mod client;
pub mod router;
pub mod mock;
mod enums;
mod error;
mod headers;
mod base_serializer;
mod body_parser;
mod chunked;
mod connection;

pub use crate::enums::{Version, Status};
pub use crate::error::ErrorKind;
pub use crate::headers::HeaderList;
pub use crate::base_serializer::HeaderError;
pub use crate::chunked::ChunkError;
pub use crate::connection::{Phase, Stats, Expired, ConnectionInfo};
pub use crate::connection::ConnectionRef;
