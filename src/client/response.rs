use crate::enums::{Status, Version};
use crate::headers::HeaderList;


/// Fully received response
#[derive(Debug, Clone)]
pub struct Response {
    version: Version,
    code: u16,
    reason: String,
    headers: HeaderList,
    body: Vec<u8>,
}

impl Response {
    pub(crate) fn new(version: Version, code: u16, reason: String,
        headers: HeaderList, body: Vec<u8>)
        -> Response
    {
        Response {
            version: version,
            code: code,
            reason: reason,
            headers: headers,
            body: body,
        }
    }
    pub fn version(&self) -> Version {
        self.version
    }
    pub fn code(&self) -> u16 {
        self.code
    }
    /// Status, if the code is a known one
    pub fn status(&self) -> Option<Status> {
        Status::from(self.code)
    }
    pub fn reason(&self) -> &str {
        &self.reason
    }
    pub fn headers(&self) -> &HeaderList {
        &self.headers
    }
    /// Decoded body (chunked encoding is already removed)
    pub fn body(&self) -> &[u8] {
        &self.body
    }
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}
