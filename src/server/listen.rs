use std::io;
use std::rc::Rc;
use std::sync::Arc;

use futures::{Future, Stream};
use tokio_core::net::TcpListener;
use tokio_core::reactor::Handle;

use super::{Config, Proto, Routes};


/// Accepts connections and runs `Proto` for each of them
///
/// All connections share a single routing table and a config.
pub struct Server {
    config: Arc<Config>,
    routes: Rc<Routes>,
    handle: Handle,
}

impl Server {
    pub fn new(handle: &Handle, config: &Arc<Config>, routes: Routes)
        -> Server
    {
        Server {
            config: config.clone(),
            routes: Rc::new(routes),
            handle: handle.clone(),
        }
    }
    /// Returns a future which accepts connections until the listener fails
    ///
    /// Errors of individual connections are logged and don't stop the
    /// server.
    pub fn serve(&self, listener: TcpListener)
        -> Box<dyn Future<Item=(), Error=io::Error>>
    {
        let config = self.config.clone();
        let routes = self.routes.clone();
        let handle = self.handle.clone();
        Box::new(listener.incoming().for_each(move |(socket, addr)| {
            trace!("Accepted connection from {}", addr);
            let proto = Proto::new(socket, addr, &config, &routes, &handle);
            handle.spawn(proto.map_err(move |e| {
                debug!("Connection from {} failed: {}", addr, e);
            }));
            Ok(())
        }))
    }
}
