use std::mem;

use futures::{Async, Future, Poll};
use netbuf::Buf;
use tokio_io::{AsyncRead, AsyncWrite};

use crate::body_parser::BodyProgress;
use crate::chunked;
use crate::connection::{Connection, Phase};
use super::parser::{parse_response, BodyKind, Head};
use super::{Config, Error, Response};


enum State {
    Writing,
    Headers,
    Body { head: Head, progress: BodyProgress },
    Done,
}

/// A single request-response exchange over an established connection
///
/// Resolves to the response and the connection itself, if it may be
/// reused for another request. The connection is not reusable when the
/// server asked to close it, when the body was delimited by EOF, or when
/// the server sent more bytes than the response contains.
pub struct Exchange<S> {
    conn: Option<Connection<S>>,
    state: State,
    is_head: bool,
    max_response_length: usize,
    max_headers_size: usize,
}

impl<S: AsyncRead + AsyncWrite> Exchange<S> {
    /// Starts the exchange, `request` is a fully serialized request
    pub fn new(mut conn: Connection<S>, request: &Buf, is_head: bool,
        config: &Config)
        -> Exchange<S>
    {
        conn.out_buf.extend(&request[..]);
        conn.set_phase(Phase::WritingHeader);
        Exchange {
            conn: Some(conn),
            state: State::Writing,
            is_head: is_head,
            max_response_length: config.max_response_length,
            max_headers_size: config.max_headers_size,
        }
    }

    /// Phase of the underlying connection
    pub fn phase(&self) -> Phase {
        self.conn.as_ref().map(|c| c.phase()).unwrap_or(Phase::Closed)
    }

    /// Advances parser over the bytes already in the buffer
    fn parse(&mut self) -> Result<Option<Response>, Error> {
        let conn = self.conn.as_mut().expect("exchange is not finished");
        loop {
            match mem::replace(&mut self.state, State::Done) {
                State::Done => unreachable!(),
                state @ State::Writing | state @ State::Headers => {
                    let parsed = parse_response(&conn.in_buf[..],
                                                self.is_head)?;
                    let (head, bytes) = match parsed {
                        Some(pair) => pair,
                        None => {
                            if conn.in_buf.len() > self.max_headers_size {
                                return Err(Error::HeadersTooLong);
                            }
                            if conn.is_eof() {
                                return Err(Error::ResetOnResponseHeaders);
                            }
                            self.state = state;
                            return Ok(None);
                        }
                    };
                    conn.in_buf.consume(bytes);
                    if head.is_informational() {
                        trace!("Skipping interim response {}", head.code);
                        self.state = state;
                        continue;
                    }
                    let progress = match head.body {
                        BodyKind::Fixed(n)
                        if n > self.max_response_length as u64 => {
                            return Err(Error::ResponseTooLong);
                        }
                        BodyKind::Fixed(n) => BodyProgress::Fixed(n),
                        BodyKind::Chunked => {
                            BodyProgress::Chunked(chunked::State::new())
                        }
                        BodyKind::Eof => BodyProgress::Eof,
                    };
                    conn.set_phase(Phase::ReadingBody);
                    self.state = State::Body { head, progress };
                }
                State::Body { head, mut progress } => {
                    progress.parse(&mut conn.in_buf)?;
                    let (bytes, done) = progress.check_buf(
                        &conn.in_buf, conn.is_eof());
                    if bytes > self.max_response_length {
                        return Err(Error::ResponseTooLong);
                    }
                    if !done {
                        if conn.is_eof() {
                            return Err(Error::ResetOnResponseBody);
                        }
                        self.state = State::Body { head, progress };
                        return Ok(None);
                    }
                    let body = conn.in_buf[..bytes].to_vec();
                    progress.consume(&mut conn.in_buf, bytes);
                    conn.finish_message();
                    let reusable = !head.close &&
                        !progress.is_eof_delimited() &&
                        !conn.is_eof() &&
                        conn.in_buf.len() == 0;
                    if !reusable {
                        debug!("Connection {} is not reusable", conn.id());
                        self.conn = None;
                    }
                    // `self.state` is left `Done`
                    return Ok(Some(Response::new(head.version, head.code,
                        head.reason, head.headers, body)));
                }
            }
        }
    }
}

impl<S: AsyncRead + AsyncWrite> Future for Exchange<S> {
    type Item = (Response, Option<Connection<S>>);
    type Error = Error;

    fn poll(&mut self) -> Poll<Self::Item, Error> {
        loop {
            {
                let conn = self.conn.as_mut()
                    .expect("exchange is not finished");
                conn.flush()?;
                if matches!(self.state, State::Writing) && conn.is_flushed() {
                    conn.set_phase(Phase::ReadingHeader);
                    self.state = State::Headers;
                }
            }
            if let Some(response) = self.parse()? {
                let conn = self.conn.take();
                if let Some(mut conn) = conn {
                    if conn.is_flushed() {
                        conn.set_phase(Phase::Idle);
                        return Ok(Async::Ready((response, Some(conn))));
                    }
                    // response came before the whole request is written
                    debug!("Connection {} responded early", conn.id());
                }
                return Ok(Async::Ready((response, None)));
            }
            let conn = self.conn.as_mut().expect("exchange is not finished");
            // on EOF parser reports the error or completes the body
            if conn.read()? == 0 && !conn.is_eof() {
                let waiting_input = !matches!(self.state, State::Writing);
                return match conn.poll_deadlines(waiting_input)? {
                    Some(which) => Err(Error::Timeout(which)),
                    None => Ok(Async::NotReady),
                };
            }
        }
    }
}
