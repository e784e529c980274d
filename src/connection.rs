//! Connection state shared by both server and client protocols
use std::cell::Cell;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use futures::{Async, Future};
use netbuf::Buf;
use tokio_core::reactor::{Handle, Timeout};
use tokio_io::{AsyncRead, AsyncWrite};

/// Size of a single `read()` call
const READ_CHUNK: usize = 16384;
/// Max bytes read in a single `Connection::read()` before giving the
/// protocol a chance to process them
const READ_BATCH: usize = 65536;

static CONNECTION_ID: AtomicUsize = AtomicUsize::new(0);


/// Phase of the message cycle the connection is in
///
/// `Connecting` is used only by outbound connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Connecting,
    ReadingHeader,
    ReadingBody,
    Dispatched,
    WritingHeader,
    WritingBody,
    Closing,
    Closed,
}

/// Which deadline has expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expired {
    /// No input for the duration of read timeout while waiting for it
    Read,
    /// Output buffer made no progress for the duration of write timeout
    Write,
}

/// Information about the connection, shared with requests
///
/// Requests only hold a weak reference to it (`ConnectionRef`), so this
/// structure is freed together with connection.
pub struct ConnectionInfo {
    id: usize,
    peer_addr: Option<SocketAddr>,
    created: Instant,
    bytes_read: Cell<u64>,
    bytes_written: Cell<u64>,
    messages: Cell<u64>,
}

/// A snapshot of connection counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub messages: u64,
}

/// Weak reference to a live connection
///
/// Stays valid only while the connection exists, use `get()` to check.
#[derive(Clone)]
pub struct ConnectionRef(Weak<ConnectionInfo>);

pub struct Connection<S> {
    io: S,
    pub(crate) in_buf: Buf,
    pub(crate) out_buf: Buf,
    phase: Phase,
    eof: bool,
    read_timeout: Duration,
    write_timeout: Duration,
    last_read: Instant,
    last_write: Instant,
    read_armed: bool,
    write_pending: bool,
    timer: Option<(Instant, Timeout)>,
    handle: Handle,
    info: Rc<ConnectionInfo>,
}

impl ConnectionInfo {
    /// Unique (per process) connection number
    pub fn id(&self) -> usize {
        self.id
    }
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }
    /// Time when connection has been established
    pub fn created(&self) -> Instant {
        self.created
    }
    pub fn stats(&self) -> Stats {
        Stats {
            bytes_read: self.bytes_read.get(),
            bytes_written: self.bytes_written.get(),
            messages: self.messages.get(),
        }
    }
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ConnectionRef {
    /// Returns connection info if connection is still alive
    pub fn get(&self) -> Option<Rc<ConnectionInfo>> {
        self.0.upgrade()
    }
    pub fn is_alive(&self) -> bool {
        self.0.upgrade().is_some()
    }
}

impl fmt::Debug for ConnectionRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get() {
            Some(info) => write!(f, "ConnectionRef({})", info.id),
            None => f.write_str("ConnectionRef(<closed>)"),
        }
    }
}

impl<S: AsyncRead + AsyncWrite> Connection<S> {
    pub fn new(io: S, handle: &Handle, peer_addr: Option<SocketAddr>)
        -> Connection<S>
    {
        let now = Instant::now();
        let id = CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        debug!("Connection {} to {:?} created", id, peer_addr);
        Connection {
            io: io,
            in_buf: Buf::new(),
            out_buf: Buf::new(),
            phase: Phase::Idle,
            eof: false,
            read_timeout: Duration::new(30, 0),
            write_timeout: Duration::new(30, 0),
            last_read: now,
            last_write: now,
            read_armed: false,
            write_pending: false,
            timer: None,
            handle: handle.clone(),
            info: Rc::new(ConnectionInfo {
                id: id,
                peer_addr: peer_addr,
                created: now,
                bytes_read: Cell::new(0),
                bytes_written: Cell::new(0),
                messages: Cell::new(0),
            }),
        }
    }
    pub fn set_timeouts(&mut self, read: Duration, write: Duration) {
        self.read_timeout = read;
        self.write_timeout = write;
        // clocks restart and timer is recreated on next poll
        self.read_armed = false;
        self.timer = None;
    }
    pub fn id(&self) -> usize {
        self.info.id
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            trace!("Connection {}: {:?} -> {:?}",
                self.info.id, self.phase, phase);
            self.phase = phase;
        }
    }
    /// Reads available bytes into `in_buf`
    ///
    /// Returns number of bytes read, zero means either "would block" or
    /// end of stream, check `is_eof()` to tell them apart.
    pub fn read(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let mut total = 0;
        while !self.eof && total < READ_BATCH {
            match self.io.read(&mut chunk) {
                Ok(0) => {
                    trace!("Connection {}: end of input", self.info.id);
                    self.eof = true;
                }
                Ok(n) => {
                    self.in_buf.extend(&chunk[..n]);
                    total += n;
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        if total > 0 {
            self.last_read = Instant::now();
            let counter = &self.info.bytes_read;
            counter.set(counter.get() + total as u64);
        }
        Ok(total)
    }
    /// Writes as much of `out_buf` as transport accepts
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.write_pending {
            // write clock starts when there is something to write
            self.last_write = Instant::now();
        }
        while self.out_buf.len() > 0 {
            match self.io.write(&self.out_buf[..]) {
                Ok(0) => {
                    return Err(io::Error::new(io::ErrorKind::WriteZero,
                        "connection closed while writing"));
                }
                Ok(n) => {
                    self.out_buf.consume(n);
                    self.last_write = Instant::now();
                    let counter = &self.info.bytes_written;
                    counter.set(counter.get() + n as u64);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        if self.out_buf.len() == 0 {
            self.io.flush()?;
        }
        self.write_pending = self.out_buf.len() > 0;
        Ok(())
    }
    /// Checks read and write deadlines and arms the timer for the nearest one
    ///
    /// `waiting_input` is true when the protocol can't progress without
    /// more bytes from the peer. The read clock starts when waiting starts
    /// and is restarted by every successful read.
    pub fn poll_deadlines(&mut self, waiting_input: bool)
        -> io::Result<Option<Expired>>
    {
        if waiting_input && !self.read_armed {
            self.read_armed = true;
            self.last_read = Instant::now();
        } else if !waiting_input {
            self.read_armed = false;
        }
        let read = if self.read_armed {
            Some((self.last_read + self.read_timeout, Expired::Read))
        } else {
            None
        };
        let write = if self.write_pending {
            Some((self.last_write + self.write_timeout, Expired::Write))
        } else {
            None
        };
        let (deadline, kind) = match (read, write) {
            (Some(r), Some(w)) => if w.0 < r.0 { w } else { r },
            (Some(r), None) => r,
            (None, Some(w)) => w,
            (None, None) => {
                self.timer = None;
                return Ok(None);
            }
        };
        loop {
            let now = Instant::now();
            if deadline <= now {
                self.timer = None;
                debug!("Connection {}: {:?} timeout", self.info.id, kind);
                return Ok(Some(kind));
            }
            let stale = match self.timer {
                Some((at, _)) => at > deadline,
                None => true,
            };
            if stale {
                let timeout = Timeout::new(deadline - now, &self.handle)?;
                self.timer = Some((deadline, timeout));
            }
            let fired = match self.timer {
                Some((_, ref mut timeout)) => timeout.poll()?.is_ready(),
                None => false,
            };
            if !fired {
                return Ok(None);
            }
            // fired for an older deadline, rearm
            self.timer = None;
        }
    }
    /// Checks that idle connection can be reused
    ///
    /// Returns false if the peer closed connection or sent unsolicited
    /// bytes.
    pub fn probe_idle(&mut self) -> io::Result<bool> {
        if self.read()? > 0 || self.eof {
            debug!("Connection {}: unusable after idle (eof: {})",
                self.info.id, self.eof);
            return Ok(false);
        }
        Ok(true)
    }
    /// Shuts down the write side of the transport
    pub fn shutdown(&mut self) -> io::Result<Async<()>> {
        self.set_phase(Phase::Closing);
        let result = self.io.shutdown()?;
        if result.is_ready() {
            self.set_phase(Phase::Closed);
        }
        Ok(result)
    }
    pub fn is_eof(&self) -> bool {
        self.eof
    }
    /// Output buffer is fully flushed
    pub fn is_flushed(&self) -> bool {
        self.out_buf.len() == 0
    }
    /// Counts a complete message cycle (request and response)
    pub fn finish_message(&mut self) {
        let counter = &self.info.messages;
        counter.set(counter.get() + 1);
    }
    pub fn reference(&self) -> ConnectionRef {
        ConnectionRef(Rc::downgrade(&self.info))
    }
    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }
    pub fn stats(&self) -> Stats {
        self.info.stats()
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        debug!("Connection {} closed in phase {:?}",
            self.info.id, self.phase);
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use futures::future::{lazy, Future};
    use tokio_core::reactor::{Core, Timeout};

    use super::{Connection, Phase, Expired};
    use crate::mock::MockData;

    #[test]
    fn read_and_flush_count_bytes() {
        let core = Core::new().unwrap();
        let mock = MockData::new();
        let mut conn = Connection::new(mock.clone(), &core.handle(), None);
        mock.add_input("hello");
        assert_eq!(conn.read().unwrap(), 5);
        assert!(!conn.is_eof());
        assert_eq!(&conn.in_buf[..], b"hello");
        conn.out_buf.extend(b"world");
        conn.flush().unwrap();
        assert_eq!(mock.output(), b"world");
        assert!(conn.is_flushed());
        mock.close_input();
        assert_eq!(conn.read().unwrap(), 0);
        assert!(conn.is_eof());
        let stats = conn.stats();
        assert_eq!(stats.bytes_read, 5);
        assert_eq!(stats.bytes_written, 5);
    }

    #[test]
    fn partial_write_is_resumed() {
        let core = Core::new().unwrap();
        let mock = MockData::new();
        mock.write_budget(Some(3));
        let mut conn = Connection::new(mock.clone(), &core.handle(), None);
        conn.out_buf.extend(b"abcdefgh");
        conn.flush().unwrap();
        assert_eq!(mock.output(), b"abc");
        assert_eq!(&conn.out_buf[..], b"defgh");
        mock.write_budget(None);
        conn.flush().unwrap();
        assert_eq!(mock.output(), b"abcdefgh");
    }

    #[test]
    fn reference_is_weak() {
        let core = Core::new().unwrap();
        let conn = Connection::new(MockData::new(), &core.handle(), None);
        let r = conn.reference();
        assert!(r.is_alive());
        assert_eq!(r.get().unwrap().id(), conn.id());
        drop(conn);
        assert!(!r.is_alive());
        assert!(r.get().is_none());
    }

    #[test]
    fn read_deadline() {
        let mut core = Core::new().unwrap();
        let handle = core.handle();
        let mut conn = Connection::new(MockData::new(), &handle, None);
        conn.set_timeouts(Duration::from_millis(50), Duration::new(10, 0));
        conn.set_phase(Phase::ReadingHeader);
        let first = core.run(lazy(|| conn.poll_deadlines(true))).unwrap();
        assert_eq!(first, None);
        core.run(Timeout::new(Duration::from_millis(80), &handle).unwrap()
            .map_err(|e| panic!("timer error: {}", e))).unwrap();
        let second = core.run(lazy(|| conn.poll_deadlines(true))).unwrap();
        assert_eq!(second, Some(Expired::Read));
    }

    #[test]
    fn no_deadline_when_not_waiting() {
        let mut core = Core::new().unwrap();
        let handle = core.handle();
        let mut conn = Connection::new(MockData::new(), &handle, None);
        conn.set_timeouts(Duration::from_millis(10), Duration::from_millis(10));
        core.run(Timeout::new(Duration::from_millis(30), &handle).unwrap()
            .map_err(|e| panic!("timer error: {}", e))).unwrap();
        let res = core.run(lazy(|| conn.poll_deadlines(false))).unwrap();
        assert_eq!(res, None);
    }
}
