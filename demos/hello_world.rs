extern crate futures;
extern crate tokio_core;
extern crate tk_duplex;
#[macro_use] extern crate log;
extern crate env_logger;

use std::env;
use std::time::Duration;

use futures::Future;
use futures::future;
use tokio_core::reactor::{Core, Timeout};
use tokio_core::net::TcpListener;

use tk_duplex::Status;
use tk_duplex::router::Params;
use tk_duplex::server::{Config, Error, Request, Response};
use tk_duplex::server::{RoutesBuilder, Server};


const BODY: &'static str = "Hello World!";

fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let mut lp = Core::new().unwrap();
    let handle = lp.handle();

    let mut routes = RoutesBuilder::new();
    routes.handle("/", |_: Request, _: Params| {
        Ok::<_, Error>(Response::new(Status::Ok)
            .header("Server", concat!("tk-duplex/",
                                      env!("CARGO_PKG_VERSION")))
            .body(BODY))
    }).unwrap();
    routes.handle("/hello/{name}", |req: Request, params: Params| {
        info!("Greeting {} from {}",
            params.get("name").unwrap_or(""), req.peer_addr());
        Ok::<_, Error>(Response::new(Status::Ok)
            .header("Content-Type", "text/plain")
            .body(format!("Hello {}!", params.get("name").unwrap_or(""))))
    }).unwrap();
    let timer = handle.clone();
    routes.handle("/sleep/{ms}", move |_: Request, params: Params|
        -> Box<dyn Future<Item=Response, Error=Error>>
    {
        let ms = params.get("ms").and_then(|x| x.parse().ok()).unwrap_or(0);
        match Timeout::new(Duration::from_millis(ms), &timer) {
            Ok(timeout) => Box::new(timeout.map_err(Error::from)
                .map(move |()| Response::new(Status::Ok)
                    .body(format!("slept {} ms", ms)))),
            Err(e) => Box::new(future::err(e.into())),
        }
    }).unwrap();

    let addr = "0.0.0.0:8080".parse().unwrap();
    let listener = TcpListener::bind(&addr, &handle).unwrap();
    let server = Server::new(&handle, &Config::new().done(), routes.done());
    info!("Listening on {}", addr);

    lp.run(server.serve(listener)).unwrap();
}
