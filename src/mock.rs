//! In-memory transport for tests and demos
//!
//! `MockData` is a cheaply clonable handle: one clone is given to the
//! protocol as a socket, another one is kept by the test to feed input and
//! inspect output. The transport never notifies the task, so all input
//! should be added before the protocol is polled (or a timer must wake it).
use std::cell::RefCell;
use std::cmp::min;
use std::io::{self, Read, Write};
use std::rc::Rc;

use futures::{Async, Poll};
use tokio_io::{AsyncRead, AsyncWrite};


#[derive(Debug, Default)]
struct Inner {
    input: Vec<u8>,
    input_closed: bool,
    output: Vec<u8>,
    write_budget: Option<usize>,
    shutdown: bool,
}

/// A mock stream
#[derive(Debug, Clone)]
pub struct MockData(Rc<RefCell<Inner>>);

impl MockData {
    pub fn new() -> MockData {
        MockData(Rc::new(RefCell::new(Inner::default())))
    }
    /// Append bytes to be read by the protocol
    pub fn add_input<D: AsRef<[u8]>>(&self, data: D) {
        self.0.borrow_mut().input.extend_from_slice(data.as_ref());
    }
    /// After already added input is read, reads return end of stream
    pub fn close_input(&self) {
        self.0.borrow_mut().input_closed = true;
    }
    /// Everything written by the protocol so far
    pub fn output(&self) -> Vec<u8> {
        self.0.borrow().output.clone()
    }
    /// Output decoded as utf-8 (lossy)
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow().output).into_owned()
    }
    /// Limits number of bytes accepted by writes, `None` is unlimited
    ///
    /// When budget is exhausted writes return `WouldBlock`.
    pub fn write_budget(&self, budget: Option<usize>) {
        self.0.borrow_mut().write_budget = budget;
    }
    /// Whether protocol has shut down the stream
    pub fn is_shutdown(&self) -> bool {
        self.0.borrow().shutdown
    }
}

impl Read for MockData {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        if inner.input.is_empty() {
            if inner.input_closed {
                return Ok(0);
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = min(buf.len(), inner.input.len());
        buf[..n].copy_from_slice(&inner.input[..n]);
        inner.input.drain(..n);
        Ok(n)
    }
}

impl AsyncRead for MockData {}

impl Write for MockData {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.0.borrow_mut();
        if inner.shutdown {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        let n = match inner.write_budget {
            Some(0) => return Err(io::ErrorKind::WouldBlock.into()),
            Some(budget) => min(budget, buf.len()),
            None => buf.len(),
        };
        if let Some(ref mut budget) = inner.write_budget {
            *budget -= n;
        }
        inner.output.extend_from_slice(&buf[..n]);
        Ok(n)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsyncWrite for MockData {
    fn shutdown(&mut self) -> Poll<(), io::Error> {
        self.0.borrow_mut().shutdown = true;
        Ok(Async::Ready(()))
    }
}
