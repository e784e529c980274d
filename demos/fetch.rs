extern crate futures;
extern crate tokio_core;
extern crate tk_duplex;
#[macro_use] extern crate log;
extern crate env_logger;

use std::env;
use std::io::{self, Write};

use futures::future::join_all;
use tokio_core::reactor::Core;

use tk_duplex::client::{Client, Config};


fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "warn");
    }
    env_logger::init();

    let urls: Vec<String> = env::args().skip(1).collect();
    if urls.is_empty() {
        eprintln!("Usage: fetch URL [URL...]");
        return;
    }

    let mut lp = Core::new().unwrap();
    let client = Client::new(&lp.handle(), &Config::new().done());

    let mut calls = Vec::new();
    for url in &urls {
        match client.call(url, "GET", None, None) {
            Ok(call) => calls.push(call),
            Err(e) => error!("Can't fetch {}: {} ({})", url, e, e.kind()),
        }
    }
    match lp.run(join_all(calls)) {
        Ok(responses) => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for response in responses {
                info!("{} {}, {} bytes",
                    response.code(), response.reason(),
                    response.body().len());
                out.write_all(response.body()).unwrap();
            }
        }
        Err(e) => error!("Request failed: {} ({})", e, e.kind()),
    }
    info!("Client stats: {:?}", client.stats());
}
