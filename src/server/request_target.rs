/// Request target, the middle part of the request line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTarget<'a> {
    /// Usual form of `/hello?name=world`
    Origin(&'a str),
    /// Full url: `http://example.com:8080/hello`
    ///
    /// Note in this case (unlike in Origin) path may be empty
    Absolute { scheme: &'a str, authority: &'a str, path: &'a str },
    /// Only hostname `example.com:8080`, only useful for `CONNECT` method
    Authority(&'a str),
    /// Asterisk `*`
    Asterisk,
}


// Authority can't contain `/` or `?` or `#`, user and password
// is not supported in HTTP either (so no `@` but otherwise we accept
// anything as rules are quite complex)
fn authority_end_char(&x: &u8) -> bool {
    x == b'/' || x == b'?' || x == b'#' || x == b'@'
}

fn absolute<'a>(scheme: &'a str, rest: &'a str) -> RequestTarget<'a> {
    let auth_end = rest.as_bytes().iter()
        .position(authority_end_char)
        .unwrap_or(rest.len());
    RequestTarget::Absolute {
        scheme: scheme,
        authority: &rest[..auth_end],
        path: &rest[auth_end..],
    }
}

impl<'a> RequestTarget<'a> {
    pub fn parse(s: &'a str) -> Option<RequestTarget<'a>> {
        use self::RequestTarget::*;

        if s.len() == 0 {
            return None;
        }
        if s.starts_with("/") {
            return Some(Origin(s));
        }
        if s.starts_with("http://") {
            return Some(absolute("http", &s[7..]));
        }
        if s.starts_with("https://") {
            return Some(absolute("https", &s[8..]));
        }
        if s == "*" {
            return Some(Asterisk);
        }
        if s.as_bytes().iter().position(authority_end_char).is_none() {
            return Some(Authority(s));
        }

        return None;
    }
    /// Path and query part of the target
    ///
    /// Returns `/` for absolute targets with empty path and `*` for
    /// asterisk form. Authority form has no path.
    pub fn path_and_query(&self) -> Option<&'a str> {
        use self::RequestTarget::*;
        match *self {
            Origin(p) => Some(p),
            Absolute { path: "", .. } => Some("/"),
            Absolute { path, .. } => Some(path),
            Authority(..) => None,
            Asterisk => Some("*"),
        }
    }
    /// Host part of absolute-form target
    pub fn authority(&self) -> Option<&'a str> {
        match *self {
            RequestTarget::Absolute { authority, .. } => Some(authority),
            RequestTarget::Authority(a) => Some(a),
            _ => None,
        }
    }
}
