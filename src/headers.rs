use std::borrow::Cow;
use std::fmt;
use std::str::from_utf8;

use httparse;

use crate::enums::Version;


pub fn is_transfer_encoding(val: &str) -> bool {
    val.eq_ignore_ascii_case("Transfer-Encoding")
}

pub fn is_content_length(val: &str) -> bool {
    val.eq_ignore_ascii_case("Content-Length")
}

pub fn is_connection(val: &str) -> bool {
    val.eq_ignore_ascii_case("Connection")
}

pub fn is_expect(val: &str) -> bool {
    val.eq_ignore_ascii_case("Expect")
}

fn is_space(ch: u8) -> bool {
    matches!(ch, b'\r' | b'\n' | b' ' | b'\t')
}

// header value is byte sequence
// we need case insensitive comparison and strip out of the whitespace
fn token_eq(val: &[u8], token: &[u8]) -> bool {
    let start = match val.iter().position(|&x| !is_space(x)) {
        Some(x) => x,
        None => return false,
    };
    let end = val.iter().rposition(|&x| !is_space(x)).map(|x| x+1)
        .unwrap_or(val.len());
    val[start..end].eq_ignore_ascii_case(token)
}

pub fn is_close(val: &[u8]) -> bool {
    token_eq(val, b"close")
}

pub fn is_keep_alive(val: &[u8]) -> bool {
    token_eq(val, b"keep-alive")
}

pub fn is_chunked(val: &[u8]) -> bool {
    token_eq(val, b"chunked")
}

pub fn is_continue(val: &[u8]) -> bool {
    token_eq(val, b"100-continue")
}

/// Decides whether connection may be reused after the message
///
/// `Connection: close` always wins. HTTP/1.0 closes unless there is
/// `Connection: keep-alive`, HTTP/1.1 keeps connection by default.
pub fn keep_alive(version: Version, headers: &HeaderList) -> bool {
    if headers.has_token("Connection", is_close) {
        return false;
    }
    match version {
        Version::Http11 => true,
        Version::Http10 => headers.has_token("Connection", is_keep_alive),
    }
}

/// Replaces obsolete line folding (CRLF followed by whitespace) with single
/// space and strips surrounding whitespace
pub fn unfold(value: &[u8]) -> Cow<[u8]> {
    let start = value.iter().position(|&x| !is_space(x))
        .unwrap_or(value.len());
    let end = value.iter().rposition(|&x| !is_space(x)).map(|x| x+1)
        .unwrap_or(start);
    let value = &value[start..end];
    if !value.iter().any(|&x| x == b'\r' || x == b'\n') {
        return Cow::Borrowed(value);
    }
    let mut result = Vec::with_capacity(value.len());
    let mut folding = false;
    for &ch in value {
        if is_space(ch) {
            if !folding {
                result.push(b' ');
            }
            folding = true;
        } else {
            folding = false;
            result.push(ch);
        }
    }
    Cow::Owned(result)
}

/// Ordered list of header fields
///
/// Lookup is case-insensitive, duplicate names are kept in the order they
/// were received. Use `get_joined` to get a combined value as described in
/// RFC 7230 section 3.2.2.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, Vec<u8>)>,
}

impl HeaderList {
    /// Create an empty header list
    pub fn new() -> HeaderList {
        HeaderList { entries: Vec::new() }
    }
    pub(crate) fn from_httparse(headers: &[httparse::Header]) -> HeaderList {
        HeaderList {
            entries: headers.iter().map(|h| {
                (h.name.to_string(), unfold(h.value).into_owned())
            }).collect(),
        }
    }
    /// Append a header, never replaces existing ones
    pub fn add<V: AsRef<[u8]>>(&mut self, name: &str, value: V) {
        self.entries.push((name.to_string(), value.as_ref().to_vec()));
    }
    /// Number of header fields (duplicates counted separately)
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// All header fields in the order received
    pub fn iter(&self) -> impl Iterator<Item=(&str, &[u8])> {
        self.entries.iter().map(|&(ref k, ref v)| (&k[..], &v[..]))
    }
    /// Value of the first header with this name
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.get_all(name).next()
    }
    /// Value of the first header with this name, if it's valid utf-8
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|x| from_utf8(x).ok())
    }
    /// Values of all headers with this name, in order
    pub fn get_all<'a, 'n>(&'a self, name: &'n str)
        -> impl Iterator<Item=&'a [u8]> + 'n
        where 'a: 'n
    {
        self.entries.iter()
            .filter(move |&&(ref k, _)| k.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| &v[..])
    }
    /// Combined value of all headers with this name
    ///
    /// Values are joined with `", "` in the order they were received. This
    /// is not meaningful for `Set-Cookie`, use `get_all` for it.
    pub fn get_joined(&self, name: &str) -> Option<Cow<[u8]>> {
        let mut iter = self.get_all(name);
        let first = iter.next()?;
        let mut result = None::<Vec<u8>>;
        for value in iter {
            let buf = result.get_or_insert_with(|| first.to_vec());
            buf.extend_from_slice(b", ");
            buf.extend_from_slice(value);
        }
        Some(result.map(Cow::Owned).unwrap_or(Cow::Borrowed(first)))
    }
    /// Returns true if any comma-separated element of any header with this
    /// name satisfies the predicate
    pub fn has_token<F>(&self, name: &str, pred: F) -> bool
        where F: Fn(&[u8]) -> bool
    {
        self.get_all(name).any(|v| v.split(|&x| x == b',').any(|t| pred(t)))
    }
}

impl fmt::Debug for HeaderList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|&(ref k, ref v)| {
                (k, String::from_utf8_lossy(v))
            }))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use std::borrow::Cow;
    use super::{is_content_length, is_transfer_encoding, is_connection};
    use super::{is_expect, is_keep_alive, keep_alive, unfold};
    use super::{is_chunked, is_close, is_continue, HeaderList};
    use crate::enums::Version;

    #[test]
    fn test_content_len() {
        assert!(is_content_length("Content-Length"));
        assert!(is_content_length("content-length"));
        assert!(is_content_length("CONTENT-LENGTH"));
    }

    #[test]
    fn test_transfer_encoding() {
        assert!(is_transfer_encoding("Transfer-Encoding"));
        assert!(is_transfer_encoding("transfer-ENCODING"));
    }

    #[test]
    fn test_connection() {
        assert!(is_connection("Connection"));
        assert!(is_connection("ConneCTION"));
        assert!(is_expect("ExpECT"));
    }

    #[test]
    fn test_chunked() {
        assert!(is_chunked(b"chunked"));
        assert!(is_chunked(b"chuNKED"));
        assert!(is_chunked(b"   CHUNKED  "));
        assert!(!is_chunked(b"   CHUNKED 1 "));
        assert!(!is_chunked(b""));
    }

    #[test]
    fn test_close() {
        assert!(is_close(b"close"));
        assert!(is_close(b"   clOSE   "));
        assert!(!is_close(b"Close  1 "));
        assert!(!is_close(b" xclose   "));
        assert!(is_keep_alive(b" Keep-Alive"));
    }

    #[test]
    fn test_continue() {
        assert!(is_continue(b"100-continue"));
        assert!(is_continue(b"   100-CONTINUE   "));
        assert!(!is_continue(b"100-continue y  "));
    }

    #[test]
    fn duplicates_joined_in_order() {
        let mut h = HeaderList::new();
        h.add("Accept", "text/html");
        h.add("X-Other", "1");
        h.add("accept", "application/json");
        assert_eq!(&h.get_joined("ACCEPT").unwrap()[..],
                   &b"text/html, application/json"[..]);
        assert_eq!(h.get("accept"), Some(&b"text/html"[..]));
        assert_eq!(h.get_all("Accept").count(), 2);
        assert!(h.get_joined("Missing").is_none());
        match h.get_joined("x-other") {
            Some(Cow::Borrowed(v)) => assert_eq!(v, &b"1"[..]),
            other => panic!("single value must not be copied: {:?}", other),
        }
    }

    #[test]
    fn values_outlive_name() {
        let mut h = HeaderList::new();
        h.add("Accept", "text/html");
        h.add("Accept", "text/plain");
        let (first, joined) = {
            let name = String::from("accept");
            (h.get(&name), h.get_joined(&name))
        };
        assert_eq!(first, Some(&b"text/html"[..]));
        assert_eq!(&joined.unwrap()[..], &b"text/html, text/plain"[..]);
    }

    #[test]
    fn folded_value() {
        assert_eq!(&unfold(b"  plain value ")[..], &b"plain value"[..]);
        assert_eq!(&unfold(b"first\r\n  second\r\n\tthird")[..],
                   &b"first second third"[..]);
    }

    #[test]
    fn keep_alive_rules() {
        let mut h = HeaderList::new();
        assert!(keep_alive(Version::Http11, &h));
        assert!(!keep_alive(Version::Http10, &h));
        h.add("Connection", "Keep-Alive");
        assert!(keep_alive(Version::Http10, &h));
        h.add("Connection", "upgrade, close");
        assert!(!keep_alive(Version::Http11, &h));
        assert!(!keep_alive(Version::Http10, &h));
    }
}
