extern crate futures;
extern crate tokio_core;
extern crate tk_duplex;

use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use futures::{Future, Async, stream};
use futures::future::lazy;
use tokio_core::reactor::{Core, Timeout};

use tk_duplex::{ErrorKind, Expired, Status};
use tk_duplex::mock::MockData;
use tk_duplex::router::Params;
use tk_duplex::server::{Config, Error, Proto, Request, Response};
use tk_duplex::server::{Routes, RoutesBuilder};


fn routes(core: &Core) -> Routes {
    let handle = core.handle();
    let mut routes = RoutesBuilder::new();
    routes.handle("/hello/{name}", |_: Request, params: Params| {
        let text = format!("Hello {}!", params.get("name").unwrap_or(""));
        Ok::<_, Error>(Response::new(Status::Ok).body(text))
    }).unwrap();
    routes.handle("/echo", |mut req: Request, _: Params| {
        Ok::<_, Error>(Response::new(Status::Ok).body(req.take_body()))
    }).unwrap();
    routes.handle("/slow", move |_: Request, _: Params| {
        Timeout::new(Duration::from_millis(50), &handle).unwrap()
            .map_err(Error::from)
            .map(|()| Response::new(Status::Ok).body("slow"))
    }).unwrap();
    routes.handle("/fast", |_: Request, _: Params| {
        Ok::<_, Error>(Response::new(Status::Ok).body("fast"))
    }).unwrap();
    routes.handle("/fail", |_: Request, _: Params| {
        Err::<Response, _>(Error::custom("handler failed"))
    }).unwrap();
    routes.handle("/stream", |_: Request, _: Params| {
        let chunks = vec![b"ab".to_vec(), b"cd".to_vec()];
        Ok::<_, Error>(Response::new(Status::Ok)
            .stream(stream::iter_ok::<_, Error>(chunks)))
    }).unwrap();
    routes.handle("/conn", |req: Request, _: Params| {
        let alive = req.connection().get().is_some();
        Ok::<_, Error>(Response::new(Status::Ok)
            .body(format!("{} {}", alive, req.peer_addr())))
    }).unwrap();
    routes.done()
}

fn proto(core: &Core, mock: &MockData, config: &Arc<Config>)
    -> Proto<MockData>
{
    let addr = "127.0.0.1:12345".parse().unwrap();
    Proto::new(mock.clone(), addr, config,
        &Rc::new(routes(core)), &core.handle())
}

/// Feeds the whole input and runs connection to the end
fn serve(config: &Arc<Config>, input: &str) -> (Result<(), Error>, MockData)
{
    let mut core = Core::new().unwrap();
    let mock = MockData::new();
    mock.add_input(input);
    mock.close_input();
    let proto = proto(&core, &mock, config);
    let result = core.run(proto);
    (result, mock)
}

#[test]
fn simple_get() {
    let (result, mock) = serve(&Config::new().done(),
        "GET /hello/world HTTP/1.1\r\nHost: example.com\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.contains("\r\nContent-Length: 12\r\n"));
    assert!(out.ends_with("\r\n\r\nHello world!"));
    assert!(mock.is_shutdown());
}

#[test]
fn pipelined_responses_keep_request_order() {
    let (result, mock) = serve(&Config::new().done(),
        "GET /slow HTTP/1.1\r\nHost: x\r\n\r\n\
         GET /fast HTTP/1.1\r\nHost: x\r\n\r\n\
         GET /hello/3 HTTP/1.1\r\nHost: x\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    let slow = out.find("slow").unwrap();
    let fast = out.find("fast").unwrap();
    let third = out.find("Hello 3!").unwrap();
    assert!(slow < fast);
    assert!(fast < third);
    assert_eq!(out.matches("HTTP/1.1 200 OK").count(), 3);
}

#[test]
fn pipelining_with_limit_one() {
    let (result, mock) = serve(
        &Config::new().inflight_request_limit(1).done(),
        "GET /slow HTTP/1.1\r\nHost: x\r\n\r\n\
         GET /fast HTTP/1.1\r\nHost: x\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.find("slow").unwrap() < out.find("fast").unwrap());
}

#[test]
fn not_found() {
    let (result, mock) = serve(&Config::new().done(),
        "GET /nope HTTP/1.1\r\nHost: x\r\n\r\n\
         GET /fast HTTP/1.1\r\nHost: x\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"));
    // connection is kept alive after 404
    assert!(out.ends_with("\r\n\r\nfast"));
}

#[test]
fn bad_request_closes() {
    let (result, mock) = serve(&Config::new().done(),
        "GET / TTMP/2.0\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(out.contains("\r\nConnection: close\r\n"));
    assert!(mock.is_shutdown());
}

#[test]
fn folded_request_header_is_rejected() {
    let (result, mock) = serve(&Config::new().done(),
        "GET /fast HTTP/1.1\r\nHost: x\r\nX-A: one\r\n two\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(!out.contains("fast"));
}

#[test]
fn bad_request_after_accepted_one() {
    let (result, mock) = serve(&Config::new().done(),
        "GET /slow HTTP/1.1\r\nHost: x\r\n\r\n\
         BROKEN\r\n\r\n\
         GET /fast HTTP/1.1\r\nHost: x\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.find("slow").unwrap() <
            out.find("HTTP/1.1 400 Bad Request").unwrap());
    assert!(!out.contains("fast"));
}

#[test]
fn body_too_large() {
    let (result, mock) = serve(&Config::new().max_request_body(10).done(),
        "POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 100\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.starts_with("HTTP/1.1 413 Request Entity Too Large\r\n"));
    assert!(out.contains("\r\nConnection: close\r\n"));
}

#[test]
fn headers_too_large() {
    let long = "x".repeat(200);
    let (result, mock) = serve(&Config::new().max_headers_size(100).done(),
        &format!("GET / HTTP/1.1\r\nX-Long: {}\r\n\r\n", long));
    result.unwrap();
    assert!(mock.output_str()
        .starts_with("HTTP/1.1 431 Request Header Fields Too Large\r\n"));
}

#[test]
fn fixed_body() {
    let (result, mock) = serve(&Config::new().done(),
        "POST /echo HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhello");
    result.unwrap();
    assert!(mock.output_str().ends_with("\r\n\r\nhello"));
}

#[test]
fn chunked_body() {
    let (result, mock) = serve(&Config::new().done(),
        "POST /echo HTTP/1.1\r\nHost: x\r\n\
         Transfer-Encoding: chunked\r\n\r\n\
         5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n\
         GET /fast HTTP/1.1\r\nHost: x\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.contains("\r\nContent-Length: 11\r\n\r\nhello world"));
    assert!(out.ends_with("\r\n\r\nfast"));
}

#[test]
fn handler_error() {
    let (result, mock) = serve(&Config::new().done(),
        "GET /fail HTTP/1.1\r\nHost: x\r\n\r\n\
         GET /fast HTTP/1.1\r\nHost: x\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(out.contains("\r\nConnection: close\r\n"));
    assert!(!out.contains("fast"));
}

#[test]
fn http10_closes_by_default() {
    let (result, mock) = serve(&Config::new().done(),
        "GET /fast HTTP/1.0\r\n\r\nGET /fast HTTP/1.0\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.starts_with("HTTP/1.0 200 OK\r\n"));
    assert!(out.contains("\r\nConnection: close\r\n"));
    assert_eq!(out.matches("fast").count(), 1);
}

#[test]
fn http10_keep_alive() {
    let (result, mock) = serve(&Config::new().done(),
        "GET /fast HTTP/1.0\r\nConnection: keep-alive\r\n\r\n\
         GET /fast HTTP/1.0\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.contains("\r\nConnection: keep-alive\r\n"));
    assert_eq!(out.matches("fast").count(), 2);
}

#[test]
fn head_request() {
    let (result, mock) = serve(&Config::new().done(),
        "HEAD /fast HTTP/1.1\r\nHost: x\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.contains("\r\nContent-Length: 4\r\n"));
    assert!(out.ends_with("\r\n\r\n"));
}

#[test]
fn streaming_response() {
    let (result, mock) = serve(&Config::new().done(),
        "GET /stream HTTP/1.1\r\nHost: x\r\n\r\n");
    result.unwrap();
    let out = mock.output_str();
    assert!(out.contains("\r\nTransfer-Encoding: chunked\r\n"));
    assert!(out.ends_with("\r\n\r\n2\r\nab\r\n2\r\ncd\r\n0\r\n\r\n"));
}

#[test]
fn request_knows_connection() {
    let (result, mock) = serve(&Config::new().done(),
        "GET /conn HTTP/1.1\r\nHost: x\r\n\r\n");
    result.unwrap();
    assert!(mock.output_str().ends_with("\r\n\r\ntrue 127.0.0.1:12345"));
}

#[test]
fn expect_continue() {
    let mut core = Core::new().unwrap();
    let mock = MockData::new();
    mock.add_input("POST /echo HTTP/1.1\r\nHost: x\r\n\
                    Expect: 100-continue\r\nContent-Length: 5\r\n\r\n");
    let mut proto = proto(&core, &mock, &Config::new().done());
    let first = core.run(lazy(|| proto.poll())).unwrap();
    assert_eq!(first, Async::NotReady);
    assert_eq!(mock.output_str(), "HTTP/1.1 100 Continue\r\n\r\n");
    mock.add_input("hello");
    mock.close_input();
    core.run(proto).unwrap();
    let out = mock.output_str();
    assert!(out.starts_with("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK"));
    assert!(out.ends_with("\r\n\r\nhello"));
}

#[test]
fn read_timeout_is_transport_error() {
    let mut core = Core::new().unwrap();
    let mock = MockData::new();
    mock.add_input("GET /fast HTTP/1.1\r\n");
    let config = Config::new()
        .read_timeout(Duration::from_millis(100))
        .done();
    let proto = proto(&core, &mock, &config);
    match core.run(proto) {
        Err(e @ Error::Timeout(Expired::Read)) => {
            assert_eq!(e.kind(), ErrorKind::Transport);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(mock.output_str(), "");
}

#[test]
fn idle_keep_alive_timeout() {
    let mut core = Core::new().unwrap();
    let mock = MockData::new();
    mock.add_input("GET /fast HTTP/1.1\r\nHost: x\r\n\r\n");
    let config = Config::new()
        .read_timeout(Duration::from_millis(100))
        .done();
    let proto = proto(&core, &mock, &config);
    core.run(proto).unwrap();
    assert!(mock.output_str().ends_with("\r\n\r\nfast"));
    assert!(mock.is_shutdown());
}
