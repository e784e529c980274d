use std::collections::VecDeque;
use std::mem;
use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::Arc;

use futures::{Async, Future, Poll};
use tokio_core::reactor::Handle;
use tokio_io::{AsyncRead, AsyncWrite};

use crate::body_parser::BodyProgress;
use crate::chunked;
use crate::connection::{Connection, Phase, Expired, Stats};
use crate::enums::{Status, Version};
use super::encoder::{ResponseWriter, write_continue};
use super::headers::{parse_request, Head, BodyKind};
use super::{Config, Error, Request, Response, ResponseConfig, Routes};
use super::error_page;


enum InFlight {
    Service(ResponseConfig, Box<dyn Future<Item=Response, Error=Error>>),
    Ready(ResponseConfig, Response),
    Writing(ResponseWriter),
}

enum Reading {
    Headers,
    Body { head: Head, progress: BodyProgress, continue_sent: bool },
    Closed,
}

/// A low-level HTTP/1.x server protocol handler
///
/// This is a future which resolves when connection is closed (either
/// by the peer or because of `Connection: close`). Requests are read and
/// dispatched while previous ones are being processed, up to the
/// `inflight_request_limit`. Responses are written in request order.
pub struct Proto<S> {
    conn: Connection<S>,
    peer_addr: SocketAddr,
    config: Arc<Config>,
    routes: Rc<Routes>,
    reading: Reading,
    in_flight: VecDeque<InFlight>,
    closing: bool,
}

impl<S: AsyncRead + AsyncWrite> Proto<S> {
    /// Create a new protocol implementation from a connection and a config
    pub fn new(conn: S, peer_addr: SocketAddr, cfg: &Arc<Config>,
        routes: &Rc<Routes>, handle: &Handle)
        -> Proto<S>
    {
        let mut conn = Connection::new(conn, handle, Some(peer_addr));
        conn.set_timeouts(cfg.read_timeout, cfg.write_timeout);
        Proto {
            conn: conn,
            peer_addr: peer_addr,
            config: cfg.clone(),
            routes: routes.clone(),
            reading: Reading::Headers,
            in_flight: VecDeque::with_capacity(cfg.inflight_request_prealloc),
            closing: false,
        }
    }
    /// Counters of the underlying connection
    pub fn stats(&self) -> Stats {
        self.conn.stats()
    }

    fn can_read(&self) -> bool {
        if self.closing || self.conn.is_eof() {
            return false;
        }
        match self.reading {
            Reading::Headers => {
                self.in_flight.len() < self.config.inflight_request_limit
            }
            Reading::Body { .. } => true,
            Reading::Closed => false,
        }
    }

    fn is_idle(&self) -> bool {
        matches!(self.reading, Reading::Headers) &&
            self.in_flight.is_empty() &&
            self.conn.in_buf.len() == 0
    }

    fn is_finished(&self) -> bool {
        (self.closing || matches!(self.reading, Reading::Closed)) &&
            self.in_flight.is_empty() &&
            self.conn.is_flushed()
    }

    /// Queues an error page and stops reading
    fn reject(&mut self, version: Version, err: Error) {
        debug!("Bad request from {}: {}", self.peer_addr, err);
        let status = err.status().unwrap_or(Status::BadRequest);
        let cfg = ResponseConfig {
            version: version,
            is_head: false,
            do_close: true,
        };
        self.in_flight.push_back(InFlight::Ready(cfg, error_page(status)));
        self.reading = Reading::Closed;
    }

    fn dispatch(&mut self, head: Head, body: Vec<u8>) {
        let cfg = head.response_config();
        let routes = self.routes.clone();
        let request = Request::new(head, body,
            self.peer_addr, self.conn.reference());
        let item = match routes.resolve(request.path()) {
            Some(m) => {
                debug!("{} {} matched {:?}",
                    request.method(), request.path(), m.pattern);
                InFlight::Service(cfg, m.handler.call(request, m.params))
            }
            None => {
                debug!("{} {} has no route",
                    request.method(), request.path());
                InFlight::Ready(cfg, error_page(Status::NotFound))
            }
        };
        self.in_flight.push_back(item);
    }

    /// Parses as many requests as possible from the input buffer
    fn parse_input(&mut self) -> Result<bool, Error> {
        let mut progress = false;
        loop {
            // every early return leaves the state `Closed` unless reset
            match mem::replace(&mut self.reading, Reading::Closed) {
                Reading::Closed => return Ok(progress),
                Reading::Headers => {
                    if self.closing || self.in_flight.len() >=
                        self.config.inflight_request_limit
                    {
                        self.reading = Reading::Headers;
                        return Ok(progress);
                    }
                    if self.conn.in_buf.len() == 0 {
                        if !self.conn.is_eof() {
                            self.reading = Reading::Headers;
                        }
                        return Ok(progress);
                    }
                    let (head, bytes) =
                        match parse_request(&self.conn.in_buf[..]) {
                            Ok(Some(pair)) => pair,
                            Ok(None) => {
                                if self.conn.in_buf.len() >
                                    self.config.max_headers_size
                                {
                                    self.reject(Version::Http11,
                                        Error::HeadersTooLong);
                                    return Ok(true);
                                }
                                if self.conn.is_eof() {
                                    debug!("Connection from {} closed \
                                        inside request headers",
                                        self.peer_addr);
                                } else {
                                    self.reading = Reading::Headers;
                                }
                                return Ok(progress);
                            }
                            Err(e) => {
                                self.reject(Version::Http11, e);
                                return Ok(true);
                            }
                        };
                    if bytes > self.config.max_headers_size {
                        self.reject(head.version, Error::HeadersTooLong);
                        return Ok(true);
                    }
                    self.conn.in_buf.consume(bytes);
                    let body = match head.body {
                        BodyKind::Fixed(n)
                        if n > self.config.max_request_body => {
                            self.reject(head.version, Error::RequestTooLong);
                            return Ok(true);
                        }
                        BodyKind::Fixed(n) => BodyProgress::Fixed(n),
                        BodyKind::Chunked => {
                            BodyProgress::Chunked(chunked::State::new())
                        }
                    };
                    trace!("Request {} {} from {}, body: {:?}",
                        head.method, head.target, self.peer_addr, head.body);
                    self.reading = Reading::Body {
                        head: head,
                        progress: body,
                        continue_sent: false,
                    };
                    progress = true;
                }
                Reading::Body { head, progress: mut body, continue_sent } => {
                    if let Err(e) = body.parse(&mut self.conn.in_buf) {
                        self.reject(head.version, e.into());
                        return Ok(true);
                    }
                    let (bytes, done) = body.check_buf(
                        &self.conn.in_buf, self.conn.is_eof());
                    if bytes as u64 > self.config.max_request_body {
                        self.reject(head.version, Error::RequestTooLong);
                        return Ok(true);
                    }
                    if done {
                        let data = self.conn.in_buf[..bytes].to_vec();
                        body.consume(&mut self.conn.in_buf, bytes);
                        let close = head.close;
                        self.dispatch(head, data);
                        if !close {
                            self.reading = Reading::Headers;
                        }
                        progress = true;
                        continue;
                    }
                    if self.conn.is_eof() {
                        debug!("Connection from {} closed inside request body",
                            self.peer_addr);
                        return Ok(progress);
                    }
                    let mut continue_sent = continue_sent;
                    if head.expect_continue && !continue_sent &&
                        head.version == Version::Http11 &&
                        self.in_flight.is_empty() &&
                        self.conn.out_buf.len() == 0
                    {
                        write_continue(head.version, &mut self.conn.out_buf);
                        continue_sent = true;
                        progress = true;
                    }
                    self.reading = Reading::Body {
                        head: head,
                        progress: body,
                        continue_sent: continue_sent,
                    };
                    return Ok(progress);
                }
            }
        }
    }

    /// Polls handlers and writes finished responses in order
    fn poll_in_flight(&mut self) -> Result<bool, Error> {
        let mut progress = false;
        for item in self.in_flight.iter_mut() {
            let resolved = match *item {
                InFlight::Service(cfg, ref mut fut) => match fut.poll() {
                    Ok(Async::NotReady) => None,
                    Ok(Async::Ready(resp)) => Some((cfg, resp)),
                    Err(e) => {
                        warn!("Handler error for {}: {}", self.peer_addr, e);
                        let status = e.status()
                            .unwrap_or(Status::InternalServerError);
                        let cfg = ResponseConfig { do_close: true, .. cfg };
                        Some((cfg, error_page(status)))
                    }
                },
                _ => None,
            };
            if let Some((cfg, resp)) = resolved {
                *item = InFlight::Ready(cfg, resp);
                progress = true;
            }
        }
        while let Some(item) = self.in_flight.pop_front() {
            match item {
                InFlight::Service(..) => {
                    self.in_flight.push_front(item);
                    break;
                }
                InFlight::Ready(cfg, resp) => {
                    let writer = ResponseWriter::start(resp, &cfg,
                        &mut self.conn.out_buf)?;
                    self.in_flight.push_front(InFlight::Writing(writer));
                    progress = true;
                }
                InFlight::Writing(mut writer) => {
                    match writer.poll(&mut self.conn.out_buf)? {
                        Async::Ready(()) => {
                            self.conn.finish_message();
                            progress = true;
                            if writer.is_close() {
                                if self.in_flight.len() > 0 {
                                    debug!("Dropping {} pipelined requests \
                                        on close", self.in_flight.len());
                                    self.in_flight.clear();
                                }
                                self.closing = true;
                                self.reading = Reading::Closed;
                                break;
                            }
                        }
                        Async::NotReady => {
                            self.in_flight.push_front(
                                InFlight::Writing(writer));
                            break;
                        }
                    }
                }
            }
        }
        Ok(progress)
    }

    fn update_phase(&mut self) {
        let phase = match self.in_flight.front() {
            _ if self.closing => Phase::Closing,
            Some(&InFlight::Writing(..)) => Phase::WritingBody,
            Some(&InFlight::Ready(..)) => Phase::WritingHeader,
            Some(&InFlight::Service(..)) => Phase::Dispatched,
            None => match self.reading {
                Reading::Headers if self.conn.in_buf.len() == 0 => Phase::Idle,
                Reading::Headers => Phase::ReadingHeader,
                Reading::Body { .. } => Phase::ReadingBody,
                Reading::Closed => Phase::Closing,
            },
        };
        self.conn.set_phase(phase);
    }
}

impl<S: AsyncRead + AsyncWrite> Future for Proto<S> {
    type Item = ();
    type Error = Error;

    fn poll(&mut self) -> Poll<(), Error> {
        loop {
            let mut progress = false;
            if self.can_read() && self.conn.read()? > 0 {
                progress = true;
            }
            if self.parse_input()? {
                progress = true;
            }
            if self.poll_in_flight()? {
                progress = true;
            }
            let buffered = self.conn.out_buf.len();
            self.conn.flush()?;
            if self.conn.out_buf.len() < buffered {
                progress = true;
            }
            if !progress {
                break;
            }
        }
        self.update_phase();
        if self.is_finished() {
            if self.conn.shutdown()?.is_ready() {
                debug!("Connection from {} finished, {:?}",
                    self.peer_addr, self.conn.stats());
                return Ok(Async::Ready(()));
            }
            return Ok(Async::NotReady);
        }
        let waiting_input = self.in_flight.is_empty() && !self.closing &&
            !matches!(self.reading, Reading::Closed);
        match self.conn.poll_deadlines(waiting_input)? {
            None => Ok(Async::NotReady),
            Some(Expired::Read) if self.is_idle() => {
                debug!("Keep-alive connection from {} expired",
                    self.peer_addr);
                self.conn.shutdown()?;
                Ok(Async::Ready(()))
            }
            Some(which) => Err(Error::Timeout(which)),
        }
    }
}
