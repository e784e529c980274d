use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use futures::{Async, Future, Poll};
use futures::sync::oneshot;
use netbuf::Buf;
use tokio_core::reactor::{Handle, Timeout};
use url::{Position, Url};

use crate::connection::{Connection, Phase};
use super::connect::{Connect, Destination, StreamFuture, Stream, TcpConnector};
use super::encoder::{encode_request, RequestHead};
use super::pool::Pool;
use super::proto::Exchange;
use super::{Config, Error, Response};


/// Counters of the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Calls started
    pub requests: u64,
    /// New connections attempted
    pub connects: u64,
    /// Calls served by an idle pooled connection
    pub reuses: u64,
    /// Calls failed for any reason (cancellation included)
    pub failures: u64,
}

struct Inner {
    config: Arc<Config>,
    connector: Box<dyn Connect>,
    pool: RefCell<Pool>,
    stats: Cell<Stats>,
    handle: Handle,
}

/// HTTP client with a keep-alive connection pool
///
/// The client is bound to a single reactor. It's cheap to clone, all
/// clones share the pool.
#[derive(Clone)]
pub struct Client {
    inner: Rc<Inner>,
}

/// A pending response of `Client::call`
///
/// Dropping it (or calling `cancel`) aborts the request: the connection
/// used for it is closed rather than returned to the pool.
pub struct Call {
    rx: Option<oneshot::Receiver<Result<Response, Error>>>,
    phase: Rc<Cell<Phase>>,
}

enum State {
    Start,
    Connecting(StreamFuture, Timeout),
    Exchange(Exchange<Stream>),
    Done,
}

/// Drives a single call from connection checkout to the response
struct Dispatch {
    inner: Rc<Inner>,
    dest: Destination,
    request: Buf,
    is_head: bool,
    read_timeout: Duration,
    state: State,
    phase: Rc<Cell<Phase>>,
    tx: Option<oneshot::Sender<Result<Response, Error>>>,
}

impl Inner {
    fn update_stats<F: FnOnce(&mut Stats)>(&self, f: F) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl Client {
    /// Client connecting over plain TCP, `https` urls are rejected
    pub fn new(handle: &Handle, config: &Arc<Config>) -> Client {
        Client::with_connector(handle, config, TcpConnector::new(handle))
    }
    /// Client using a custom connector (e.g. `TcpConnector` with TLS)
    pub fn with_connector<C>(handle: &Handle, config: &Arc<Config>,
        connector: C)
        -> Client
        where C: Connect + 'static
    {
        Client {
            inner: Rc::new(Inner {
                config: config.clone(),
                connector: Box::new(connector),
                pool: RefCell::new(Pool::new(config.max_idle_per_destination,
                                              config.idle_timeout)),
                stats: Cell::new(Stats::default()),
                handle: handle.clone(),
            }),
        }
    }
    /// Starts a request
    ///
    /// Errors which don't need network (bad url, unsupported scheme,
    /// `https` without TLS connector) are returned immediately. The
    /// `timeout` overrides configured read timeout for this call.
    pub fn call(&self, uri: &str, method: &str, body: Option<Vec<u8>>,
        timeout: Option<Duration>)
        -> Result<Call, Error>
    {
        let url = Url::parse(uri)?;
        let dest = Destination::from_url(&url)?;
        if dest.is_tls() && !self.inner.connector.supports_tls() {
            return Err(Error::TlsNotConfigured);
        }
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::NoHost),
        };
        let mut request = Buf::new();
        encode_request(&mut request, &RequestHead {
            method: method,
            path: &url[Position::BeforePath..Position::AfterQuery],
            host: &host,
            user_agent: self.inner.config.user_agent.as_ref()
                .map(|x| &x[..]),
            body: body.as_ref().map(|x| &x[..]),
        })?;
        debug!("{} {} via {}", method, uri, dest);
        self.inner.update_stats(|s| s.requests += 1);
        let (tx, rx) = oneshot::channel();
        let phase = Rc::new(Cell::new(Phase::Idle));
        self.inner.handle.spawn(Dispatch {
            inner: self.inner.clone(),
            dest: dest,
            request: request,
            is_head: method.eq_ignore_ascii_case("HEAD"),
            read_timeout: timeout.unwrap_or(self.inner.config.read_timeout),
            state: State::Start,
            phase: phase.clone(),
            tx: Some(tx),
        });
        Ok(Call { rx: Some(rx), phase: phase })
    }
    /// A snapshot of the counters
    pub fn stats(&self) -> Stats {
        self.inner.stats.get()
    }
    /// Number of idle pooled connections to the destination
    pub fn idle_connections(&self, dest: &Destination) -> usize {
        self.inner.pool.borrow().idle_count(dest)
    }
}

impl Call {
    /// Aborts the call, subsequent poll fails with `Error::Canceled`
    pub fn cancel(&mut self) {
        self.rx = None;
    }
    /// Where the call is now
    ///
    /// `Connecting` until the connection (including TLS handshake) is
    /// established, then the phase of the connection used. `Idle` after a
    /// response on a reusable connection, `Closed` otherwise.
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }
}

impl Future for Call {
    type Item = Response;
    type Error = Error;
    fn poll(&mut self) -> Poll<Response, Error> {
        let result = match self.rx {
            Some(ref mut rx) => rx.poll(),
            None => return Err(Error::Canceled),
        };
        match result {
            Ok(Async::Ready(Ok(response))) => Ok(Async::Ready(response)),
            Ok(Async::Ready(Err(e))) => Err(e),
            Ok(Async::NotReady) => Ok(Async::NotReady),
            // dispatch was dropped with the reactor
            Err(oneshot::Canceled) => Err(Error::Canceled),
        }
    }
}

impl Dispatch {
    fn start_exchange(&self, mut conn: Connection<Stream>) -> State {
        conn.set_timeouts(self.read_timeout, self.inner.config.write_timeout);
        State::Exchange(Exchange::new(conn, &self.request, self.is_head,
                                      &self.inner.config))
    }
    fn finish(&mut self, result: Result<Response, Error>) -> Poll<(), ()> {
        if let Err(ref e) = result {
            debug!("Request to {} failed: {}", self.dest, e);
            self.inner.update_stats(|s| s.failures += 1);
        }
        self.state = State::Done;
        if result.is_err() {
            self.phase.set(Phase::Closed);
        }
        if let Some(tx) = self.tx.take() {
            tx.send(result).ok();
        }
        Ok(Async::Ready(()))
    }
}

impl Future for Dispatch {
    type Item = ();
    type Error = ();
    fn poll(&mut self) -> Poll<(), ()> {
        let canceled = match self.tx {
            Some(ref mut tx) => tx.poll_cancel() == Ok(Async::Ready(())),
            None => true,
        };
        if canceled {
            debug!("Request to {} is canceled", self.dest);
            self.inner.update_stats(|s| s.failures += 1);
            // drops connection if any
            self.state = State::Done;
            self.phase.set(Phase::Closed);
            return Ok(Async::Ready(()));
        }
        loop {
            self.state = match mem::replace(&mut self.state, State::Done) {
                State::Start => {
                    let idle = self.inner.pool.borrow_mut()
                        .checkout(&self.dest);
                    match idle {
                        Some(conn) => {
                            self.inner.update_stats(|s| s.reuses += 1);
                            self.start_exchange(conn)
                        }
                        None => {
                            self.inner.update_stats(|s| s.connects += 1);
                            let timeout = Timeout::new(
                                self.inner.config.connect_timeout,
                                &self.inner.handle);
                            self.phase.set(Phase::Connecting);
                            match timeout {
                                Ok(timeout) => State::Connecting(
                                    self.inner.connector.connect(&self.dest),
                                    timeout),
                                Err(e) => return self.finish(Err(e.into())),
                            }
                        }
                    }
                }
                State::Connecting(mut future, mut timeout) => {
                    match future.poll() {
                        Ok(Async::Ready(stream)) => {
                            let conn = Connection::new(stream,
                                &self.inner.handle, None);
                            self.start_exchange(conn)
                        }
                        Ok(Async::NotReady) => match timeout.poll() {
                            Ok(Async::Ready(())) => {
                                return self.finish(Err(Error::ConnectTimeout));
                            }
                            Ok(Async::NotReady) => {
                                self.state = State::Connecting(future,
                                                               timeout);
                                return Ok(Async::NotReady);
                            }
                            Err(e) => return self.finish(Err(e.into())),
                        },
                        Err(e) => return self.finish(Err(e)),
                    }
                }
                State::Exchange(mut exchange) => match exchange.poll() {
                    Ok(Async::Ready((response, conn))) => {
                        if let Some(conn) = conn {
                            self.inner.pool.borrow_mut()
                                .checkin(self.dest.clone(), conn);
                            self.phase.set(Phase::Idle);
                        } else {
                            self.phase.set(Phase::Closed);
                        }
                        return self.finish(Ok(response));
                    }
                    Ok(Async::NotReady) => {
                        self.phase.set(exchange.phase());
                        self.state = State::Exchange(exchange);
                        return Ok(Async::NotReady);
                    }
                    Err(e) => return self.finish(Err(e)),
                },
                State::Done => return Ok(Async::Ready(())),
            };
        }
    }
}
