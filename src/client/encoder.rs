use netbuf::Buf;

use crate::base_serializer::MessageState;
use crate::enums::Version;
use super::Error;


/// Everything needed to serialize a request
pub struct RequestHead<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub host: &'a str,
    pub user_agent: Option<&'a str>,
    pub body: Option<&'a [u8]>,
}

fn is_token(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|c| match c {
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-'
        | b'.' | b'^' | b'_' | b'`' | b'|' | b'~' => true,
        _ => c.is_ascii_alphanumeric(),
    })
}

/// Writes the whole request into the buffer
///
/// The body (if any) is sent with `Content-Length`.
pub fn encode_request(buf: &mut Buf, req: &RequestHead) -> Result<(), Error> {
    if !is_token(req.method) {
        return Err(Error::InvalidMethod);
    }
    let mut state = MessageState::RequestStart;
    state.request_line(buf, req.method, req.path, Version::Http11);
    state.add_header(buf, "Host", req.host.as_bytes())?;
    if let Some(agent) = req.user_agent {
        state.add_header(buf, "User-Agent", agent.as_bytes())?;
    }
    if let Some(body) = req.body {
        state.add_length(buf, body.len() as u64)?;
    }
    state.done_headers(buf)?;
    if let Some(body) = req.body {
        state.write_body(buf, body);
    }
    state.done(buf);
    Ok(())
}
