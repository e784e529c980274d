use std::fmt;
use std::io::{self, Read, Write};
use std::net::{self, IpAddr, SocketAddr, ToSocketAddrs};
use std::rc::Rc;

use futures::{Future, Poll};
use futures::future;
use futures_cpupool::CpuPool;
use net2::TcpBuilder;
use tokio_core::net::TcpStream;
use tokio_core::reactor::Handle;
use tokio_io::{AsyncRead, AsyncWrite};
use url::{Host, Url};

use super::Error;


/// Future returned by connectors
pub type StreamFuture = Box<dyn Future<Item=Stream, Error=Error>>;

type TcpFuture = Box<dyn Future<Item=TcpStream, Error=Error>>;

/// Transport which may be used by the client
pub trait Io: AsyncRead + AsyncWrite {}

impl<T: AsyncRead + AsyncWrite> Io for T {}

/// A type-erased transport: plain TCP or TLS stream
pub struct Stream(Box<dyn Io>);

/// Where requests are sent, connections are pooled per destination
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    host: String,
    port: u16,
    tls: bool,
}

/// Establishes connections for the client
///
/// Implement this to connect through a proxy, to unix sockets or to mock
/// the network in tests.
pub trait Connect {
    /// Returns a future which resolves to a ready-to-use stream
    ///
    /// For TLS destinations the handshake must be finished too.
    fn connect(&self, dest: &Destination)
        -> StreamFuture;
    /// Whether `https` destinations are supported
    fn supports_tls(&self) -> bool;
}

/// TLS handshake hook for `TcpConnector`
///
/// Certificate handling is up to the implementation, `host` is the name
/// to verify the certificate against.
pub trait TlsConnect {
    fn handshake(&self, host: &str, stream: TcpStream)
        -> StreamFuture;
}

/// Default connector: resolves the name and connects over TCP
///
/// Name resolution is done on a thread pool so it never blocks the
/// reactor. IP literals are connected directly.
pub struct TcpConnector {
    handle: Handle,
    resolver: CpuPool,
    bind_addr: Option<SocketAddr>,
    tls: Option<Rc<dyn TlsConnect>>,
}

impl Stream {
    pub fn new<S: Io + 'static>(stream: S) -> Stream {
        Stream(Box::new(stream))
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Stream")
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl AsyncRead for Stream {}

impl AsyncWrite for Stream {
    fn shutdown(&mut self) -> Poll<(), io::Error> {
        self.0.shutdown()
    }
}

impl Destination {
    pub fn new<S: Into<String>>(host: S, port: u16, tls: bool) -> Destination {
        Destination {
            host: host.into(),
            port: port,
            tls: tls,
        }
    }
    /// Destination of the url, only `http` and `https` are supported
    pub fn from_url(url: &Url) -> Result<Destination, Error> {
        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            _ => return Err(Error::UnsupportedScheme),
        };
        let host = match url.host() {
            Some(Host::Domain(name)) => name.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(Error::NoHost),
        };
        let port = url.port_or_known_default()
            .unwrap_or(if tls { 443 } else { 80 });
        Ok(Destination::new(host, port, tls))
    }
    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn port(&self) -> u16 {
        self.port
    }
    pub fn is_tls(&self) -> bool {
        self.tls
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let scheme = if self.tls { "https" } else { "http" };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

impl TcpConnector {
    pub fn new(handle: &Handle) -> TcpConnector {
        TcpConnector {
            handle: handle.clone(),
            resolver: CpuPool::new(1),
            bind_addr: None,
            tls: None,
        }
    }
    /// Binds outgoing sockets to this local address before connecting
    ///
    /// Port zero lets the system pick a port.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }
    /// Enables `https` destinations
    pub fn with_tls<T: TlsConnect + 'static>(mut self, tls: T) -> Self {
        self.tls = Some(Rc::new(tls));
        self
    }
    fn resolve(&self, dest: &Destination)
        -> Box<dyn Future<Item=SocketAddr, Error=Error>>
    {
        if let Ok(ip) = dest.host.parse::<IpAddr>() {
            return Box::new(future::ok(SocketAddr::new(ip, dest.port)));
        }
        let host = dest.host.clone();
        let port = dest.port;
        Box::new(self.resolver.spawn_fn(move || -> io::Result<SocketAddr> {
            let mut addrs = (&host[..], port).to_socket_addrs()?;
            addrs.next().ok_or_else(|| io::Error::new(io::ErrorKind::NotFound,
                format!("no addresses for {:?}", host)))
        }).map_err(Error::Connect))
    }
}

fn bound_socket(local: SocketAddr) -> io::Result<net::TcpStream> {
    let builder = if local.is_ipv4() {
        TcpBuilder::new_v4()?
    } else {
        TcpBuilder::new_v6()?
    };
    builder.bind(local)?;
    builder.to_tcp_stream()
}

impl Connect for TcpConnector {
    fn connect(&self, dest: &Destination)
        -> StreamFuture
    {
        let tls = if dest.tls {
            match self.tls {
                Some(ref tls) => Some(tls.clone()),
                None => return Box::new(future::err::<Stream, _>(
                    Error::TlsNotConfigured)),
            }
        } else {
            None
        };
        let handle = self.handle.clone();
        let host = dest.host.clone();
        let bind_addr = self.bind_addr;
        Box::new(self.resolve(dest)
            .and_then(move |addr| -> TcpFuture {
                trace!("Connecting to {}", addr);
                let local = match bind_addr {
                    Some(local) => local,
                    None => return Box::new(TcpStream::connect(&addr, &handle)
                        .map_err(Error::Connect)),
                };
                match bound_socket(local) {
                    Ok(sock) => Box::new(
                        TcpStream::connect_stream(sock, &addr, &handle)
                        .map_err(Error::Connect)),
                    Err(e) => Box::new(future::err::<TcpStream, _>(
                        Error::Connect(e))),
                }
            })
            .and_then(move |sock| -> StreamFuture {
                match tls {
                    Some(tls) => tls.handshake(&host, sock),
                    None => Box::new(future::ok::<_, Error>(Stream::new(sock))),
                }
            }))
    }
    fn supports_tls(&self) -> bool {
        self.tls.is_some()
    }
}
