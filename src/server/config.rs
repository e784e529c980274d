use std::time::Duration;
use std::sync::Arc;

use crate::server::Config;

impl Config {
    /// Create a config with defaults
    pub fn new() -> Config {
        Config {
            inflight_request_limit: 2,
            inflight_request_prealloc: 0,
            read_timeout: Duration::new(30, 0),
            write_timeout: Duration::new(30, 0),
            max_request_body: 10 << 20,
            max_headers_size: 16384,
        }
    }
    /// A number of inflight requests until we stop reading more requests
    ///
    /// Requests are pipelined up to this limit, when the limit is reached
    /// no more bytes are read from the socket.
    pub fn inflight_request_limit(&mut self, value: usize) -> &mut Self {
        assert!(value > 0, "at least one request must be allowed");
        self.inflight_request_limit = value;
        self
    }
    /// Size of the queue that is preallocated for holding requests
    ///
    /// Should be smaller than `inflight_request_limit`.
    pub fn inflight_request_prealloc(&mut self, value: usize) -> &mut Self {
        self.inflight_request_prealloc = value;
        self
    }
    /// Close connection if no bytes received for this long while we wait
    /// for request (including idle keep-alive connections)
    pub fn read_timeout(&mut self, value: Duration) -> &mut Self {
        self.read_timeout = value;
        self
    }
    /// Close connection if the peer doesn't accept response bytes for
    /// this long
    pub fn write_timeout(&mut self, value: Duration) -> &mut Self {
        self.write_timeout = value;
        self
    }
    /// Requests with larger body are rejected with `413`
    pub fn max_request_body(&mut self, value: u64) -> &mut Self {
        self.max_request_body = value;
        self
    }
    /// Requests with larger header block are rejected with `431`
    pub fn max_headers_size(&mut self, value: usize) -> &mut Self {
        self.max_headers_size = value;
        self
    }
    /// Create a Arc'd config clone to pass to the constructor
    ///
    /// This is just a convenience method.
    pub fn done(&mut self) -> Arc<Config> {
        Arc::new(self.clone())
    }
}
