use std::sync::Arc;
use std::time::Duration;

use crate::client::Config;


impl Config {
    /// Create a config with defaults
    pub fn new() -> Config {
        Config {
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_idle_per_destination: 8,
            idle_timeout: Duration::from_secs(90),
            max_response_length: 10 << 20,
            max_headers_size: 16384,
            user_agent: Some(concat!("tk-duplex/",
                env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
    /// Time to wait for response bytes before failing the call
    ///
    /// May be overridden per call in `Client::call`.
    pub fn read_timeout(&mut self, value: Duration) -> &mut Self {
        self.read_timeout = value;
        self
    }
    /// Time to wait for output buffer to make progress
    pub fn write_timeout(&mut self, value: Duration) -> &mut Self {
        self.write_timeout = value;
        self
    }
    /// Time limit of establishing a connection (including TLS handshake)
    pub fn connect_timeout(&mut self, value: Duration) -> &mut Self {
        self.connect_timeout = value;
        self
    }
    /// Number of idle keep-alive connections kept for each destination
    ///
    /// When a connection is returned to a full pool the oldest idle
    /// connection is closed. Zero disables connection reuse.
    pub fn max_idle_per_destination(&mut self, value: usize) -> &mut Self {
        self.max_idle_per_destination = value;
        self
    }
    /// Time after which an unused pooled connection is closed
    pub fn idle_timeout(&mut self, value: Duration) -> &mut Self {
        self.idle_timeout = value;
        self
    }
    /// Maximum size of the response body, larger responses are errors
    pub fn max_response_length(&mut self, value: usize) -> &mut Self {
        self.max_response_length = value;
        self
    }
    /// Maximum size of the response status line and headers
    pub fn max_headers_size(&mut self, value: usize) -> &mut Self {
        self.max_headers_size = value;
        self
    }
    /// Value of `User-Agent` header, `None` to skip the header
    pub fn user_agent<S: Into<String>>(&mut self, value: Option<S>)
        -> &mut Self
    {
        self.user_agent = value.map(Into::into);
        self
    }
    /// Create a Arc'd config clone to pass to the constructor
    ///
    /// This is just a convenience method.
    pub fn done(&mut self) -> Arc<Config> {
        Arc::new(self.clone())
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;
    use super::Config;

    #[test]
    fn defaults() {
        let cfg = Config::new();
        assert_eq!(cfg.max_idle_per_destination, 8);
        assert_eq!(cfg.read_timeout, Duration::from_secs(30));
        assert_eq!(cfg.idle_timeout, Duration::from_secs(90));
        assert!(cfg.user_agent.as_ref().unwrap().starts_with("tk-duplex/"));
    }

    #[test]
    fn builder() {
        let cfg = Config::new()
            .max_idle_per_destination(1)
            .idle_timeout(Duration::from_secs(5))
            .user_agent(None::<String>)
            .done();
        assert_eq!(cfg.max_idle_per_destination, 1);
        assert_eq!(cfg.idle_timeout, Duration::from_secs(5));
        assert!(cfg.user_agent.is_none());
    }
}
