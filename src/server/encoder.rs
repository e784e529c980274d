use futures::{Async, Poll, Stream};
use netbuf::Buf;

use crate::base_serializer::{MessageState, Body as MessageBody};
use crate::enums::Version;
use crate::enums::status::code_has_body;
use crate::headers::{is_close, is_connection};
use super::{Body, Error, Response, ResponseConfig};

/// Stop polling streaming body when this many bytes are not yet written
const BODY_WATERMARK: usize = 65536;


/// Writes a single response into the output buffer
///
/// Headers and fixed-size bodies are serialized at once in `start`. For
/// streaming bodies the stream is polled in `poll` while output buffer is
/// below watermark.
pub struct ResponseWriter {
    state: MessageState,
    body: Option<Box<dyn Stream<Item=Vec<u8>, Error=Error>>>,
    close: bool,
}

#[cfg(feature="date_header")]
fn add_date(state: &mut MessageState, buf: &mut Buf) -> Result<(), Error> {
    use httpdate::HttpDate;
    use std::time::SystemTime;
    state.format_header(buf, "Date", HttpDate::from(SystemTime::now()))?;
    Ok(())
}

#[cfg(not(feature="date_header"))]
fn add_date(_: &mut MessageState, _: &mut Buf) -> Result<(), Error> {
    Ok(())
}

/// Writes `100 Continue` interim response
pub fn write_continue(version: Version, buf: &mut Buf) {
    let mut state = MessageState::ResponseStart {
        version: version,
        body: MessageBody::Normal,
        close: false,
    };
    state.response_continue(buf);
}

impl ResponseWriter {
    pub fn start(response: Response, cfg: &ResponseConfig, buf: &mut Buf)
        -> Result<ResponseWriter, Error>
    {
        let (code, reason, headers, body) = response.into_parts();
        let has_connection = headers.iter()
            .any(|&(ref name, _)| is_connection(name));
        let explicit_close = headers.iter()
            .filter(|&&(ref name, _)| is_connection(name))
            .any(|&(_, ref value)| value.split(|&x| x == b',').any(is_close));
        let streaming = matches!(body, Body::Stream(..));
        let close = cfg.do_close || explicit_close ||
            (streaming && cfg.version == Version::Http10);
        let mut state = MessageState::ResponseStart {
            version: cfg.version,
            body: if cfg.is_head { MessageBody::Head }
                  else { MessageBody::Normal },
            // explicit header is already in the list
            close: close && !explicit_close,
        };
        state.response_status(buf, code, &reason);
        add_date(&mut state, buf)?;
        for &(ref name, ref value) in &headers {
            if let Err(e) = state.add_header(buf, name, value) {
                warn!("Response header {:?} is skipped: {}", name, e);
            }
        }
        if cfg.version == Version::Http10 && !close && !has_connection {
            state.add_header(buf, "Connection", b"keep-alive")?;
        }
        let has_body = code_has_body(code);
        let (fixed, stream) = match body {
            Body::Empty => {
                if has_body {
                    state.add_length(buf, 0)?;
                }
                (None, None)
            }
            Body::Fixed(data) => {
                if has_body {
                    state.add_length(buf, data.len() as u64)?;
                    (Some(data), None)
                } else {
                    if data.len() > 0 {
                        warn!("Body of {} response is discarded", code);
                    }
                    (None, None)
                }
            }
            Body::Stream(stream) => {
                if !has_body {
                    (None, None)
                } else if cfg.version == Version::Http11 {
                    state.add_chunked(buf)?;
                    (None, Some(stream))
                } else {
                    state.add_until_close()?;
                    (None, Some(stream))
                }
            }
        };
        let expect_body = state.done_headers(buf)?;
        if let Some(data) = fixed {
            state.write_body(buf, &data);
        }
        let stream = if expect_body { stream } else { None };
        if stream.is_none() {
            state.done(buf);
        }
        Ok(ResponseWriter {
            state: state,
            body: stream,
            close: close,
        })
    }
    /// Pulls streaming body into the buffer
    ///
    /// Resolves when the whole response is in the buffer.
    pub fn poll(&mut self, buf: &mut Buf) -> Poll<(), Error> {
        loop {
            let chunk = match self.body {
                None => return Ok(Async::Ready(())),
                Some(_) if buf.len() >= BODY_WATERMARK => {
                    return Ok(Async::NotReady);
                }
                Some(ref mut stream) => match stream.poll()? {
                    Async::Ready(chunk) => chunk,
                    Async::NotReady => return Ok(Async::NotReady),
                },
            };
            match chunk {
                Some(data) => self.state.write_body(buf, &data),
                None => {
                    self.body = None;
                    self.state.done(buf);
                }
            }
        }
    }
    /// Connection must be closed after this response
    pub fn is_close(&self) -> bool {
        self.close
    }
}
