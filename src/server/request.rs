use std::net::SocketAddr;

use crate::connection::ConnectionRef;
use crate::enums::Version;
use crate::headers::HeaderList;
use super::headers::Head;


/// A fully received request
///
/// The body is already decoded (chunked encoding removed). Request holds
/// only a weak reference to the connection it was received on, use
/// `connection().get()` to check whether the peer is still there.
#[derive(Debug)]
pub struct Request {
    method: String,
    target: String,
    path: String,
    query: Option<String>,
    version: Version,
    host: Option<String>,
    headers: HeaderList,
    body: Vec<u8>,
    peer_addr: SocketAddr,
    connection: ConnectionRef,
}

impl Request {
    pub(crate) fn new(head: Head, body: Vec<u8>, peer_addr: SocketAddr,
        connection: ConnectionRef)
        -> Request
    {
        Request {
            method: head.method,
            target: head.target,
            path: head.path,
            query: head.query,
            version: head.version,
            host: head.host,
            headers: head.headers,
            body: body,
            peer_addr: peer_addr,
            connection: connection,
        }
    }
    pub fn method(&self) -> &str {
        &self.method
    }
    /// Request target as received (path with query or absolute url)
    pub fn target(&self) -> &str {
        &self.target
    }
    /// Path without query string, it's what routes are matched against
    pub fn path(&self) -> &str {
        &self.path
    }
    /// Query string without question mark
    pub fn query(&self) -> Option<&str> {
        self.query.as_ref().map(|x| &x[..])
    }
    pub fn version(&self) -> Version {
        self.version
    }
    /// Host from absolute request target or from `Host` header
    pub fn host(&self) -> Option<&str> {
        self.host.as_ref().map(|x| &x[..])
    }
    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }
    pub fn body(&self) -> &[u8] {
        &self.body
    }
    /// Takes the body out of the request
    pub fn take_body(&mut self) -> Vec<u8> {
        ::std::mem::replace(&mut self.body, Vec::new())
    }
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
    pub fn connection(&self) -> &ConnectionRef {
        &self.connection
    }
}
