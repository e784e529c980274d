//! URL pattern router
//!
//! Patterns are slash-separated segments where each segment is either a
//! literal or contains a single `{name}` placeholder, optionally surrounded
//! by literal text: `/users/{id}`, `/files/{name}.json`. A placeholder
//! matches anything up to the next slash.
//!
//! A pattern that starts with `^` is a raw regular expression, named groups
//! of it become parameters.
//!
//! ```
//! # use tk_duplex::router::RouterBuilder;
//! let mut builder = RouterBuilder::new();
//! builder.add("/users/{id}", "user").unwrap();
//! builder.add("^/static/(?P<path>.*)$", "static").unwrap();
//! let router = builder.done();
//! let m = router.resolve("/users/42").unwrap();
//! assert_eq!(*m.handler, "user");
//! assert_eq!(m.params.get("id"), Some("42"));
//! ```
use std::fmt;

use regex::{self, Regex};
use url::percent_encoding::percent_decode;


quick_error! {
    /// Error compiling URL pattern
    #[derive(Debug)]
    pub enum PatternError {
        /// `{` without `}` or the other way around
        UnbalancedBraces(pattern: String) {
            description("unbalanced braces in pattern")
            display("unbalanced braces in pattern {:?}", pattern)
        }
        /// Two placeholders with the same name
        DuplicateName(name: String) {
            description("duplicate placeholder name")
            display("duplicate placeholder name {:?}", name)
        }
        /// Placeholder name is empty or not an identifier
        InvalidName(name: String) {
            description("invalid placeholder name")
            display("invalid placeholder name {:?}", name)
        }
        /// More than one placeholder in a single segment
        StrayBrace(segment: String) {
            description("only one placeholder is allowed per segment")
            display("only one placeholder is allowed per segment {:?}",
                    segment)
        }
        /// Resulting (or raw) regular expression is invalid
        Regex(err: regex::Error) {
            description("invalid regular expression")
            display("invalid regular expression: {}", err)
            from()
        }
    }
}

/// A compiled pattern
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

/// Parameters captured by placeholders, in pattern order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: Vec<(String, String)>,
}

struct Route<H> {
    pattern: Pattern,
    handler: H,
}

/// Collects routes, registration order is the matching order
pub struct RouterBuilder<H> {
    routes: Vec<Route<H>>,
}

/// Immutable list of routes
pub struct Router<H> {
    routes: Vec<Route<H>>,
}

/// Result of successful resolution
#[derive(Debug)]
pub struct Match<'a, H: 'a> {
    pub handler: &'a H,
    pub params: Params,
    pub pattern: &'a str,
}

fn is_raw(pattern: &str) -> bool {
    pattern.is_empty() || pattern.starts_with('^')
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn translate_segment(segment: &str, names: &mut Vec<String>,
    pattern: &str, result: &mut String)
    -> Result<(), PatternError>
{
    let open = segment.find('{');
    let close = segment.find('}');
    match (open, close) {
        (None, None) => {
            result.push_str(&regex::escape(segment));
        }
        (Some(open), Some(close)) if open < close => {
            let head = &segment[..open];
            let name = &segment[open+1..close];
            let tail = &segment[close+1..];
            if name.contains('{') {
                return Err(PatternError::UnbalancedBraces(pattern.into()));
            }
            if tail.contains('{') || tail.contains('}') {
                return Err(PatternError::StrayBrace(segment.into()));
            }
            if !valid_name(name) {
                return Err(PatternError::InvalidName(name.into()));
            }
            if names.iter().any(|n| n == name) {
                return Err(PatternError::DuplicateName(name.into()));
            }
            names.push(name.to_string());
            result.push_str(&regex::escape(head));
            result.push_str("(?P<");
            result.push_str(name);
            result.push_str(">[^/]*)");
            result.push_str(&regex::escape(tail));
        }
        _ => return Err(PatternError::UnbalancedBraces(pattern.into())),
    }
    Ok(())
}

/// Translates pattern to regular expression (without anchors)
///
/// Raw patterns (starting with `^`) are returned unchanged.
pub fn to_regex(pattern: &str) -> Result<String, PatternError> {
    if is_raw(pattern) {
        return Ok(pattern.to_string());
    }
    let mut result = String::with_capacity(pattern.len() + 16);
    let mut names = Vec::new();
    // leading slash is implied, empty segments are dropped
    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        result.push('/');
        translate_segment(segment, &mut names, pattern, &mut result)?;
    }
    if pattern.ends_with('/') {
        result.push('/');
    }
    Ok(result)
}

impl Pattern {
    /// Compiles the pattern, non-raw patterns must match the whole path
    pub fn compile(pattern: &str) -> Result<Pattern, PatternError> {
        let regex = if is_raw(pattern) {
            Regex::new(pattern)?
        } else {
            Regex::new(&format!("^(?:{})$", to_regex(pattern)?))?
        };
        Ok(Pattern {
            source: pattern.to_string(),
            regex: regex,
        })
    }
    /// The pattern as it was registered
    pub fn as_str(&self) -> &str {
        &self.source
    }
    /// Matches path and returns captured (percent-decoded) parameters
    pub fn matches(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let mut values = Vec::new();
        for name in self.regex.capture_names().filter_map(|n| n) {
            if let Some(value) = caps.name(name) {
                let decoded = percent_decode(value.as_str().as_bytes())
                    .decode_utf8_lossy()
                    .into_owned();
                values.push((name.to_string(), decoded));
            }
        }
        Some(Params { values: values })
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.iter()
            .find(|&&(ref k, _)| k == name)
            .map(|&(_, ref v)| &v[..])
    }
    pub fn iter(&self) -> impl Iterator<Item=(&str, &str)> {
        self.values.iter().map(|&(ref k, ref v)| (&k[..], &v[..]))
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<H> RouterBuilder<H> {
    pub fn new() -> RouterBuilder<H> {
        RouterBuilder { routes: Vec::new() }
    }
    /// Adds a route, earlier routes take precedence
    pub fn add(&mut self, pattern: &str, handler: H)
        -> Result<&mut Self, PatternError>
    {
        let pattern = Pattern::compile(pattern)?;
        debug!("Route {:?} added", pattern.as_str());
        self.routes.push(Route {
            pattern: pattern,
            handler: handler,
        });
        Ok(self)
    }
    pub fn done(self) -> Router<H> {
        Router { routes: self.routes }
    }
}

impl<H> Router<H> {
    /// Finds the first route matching path
    ///
    /// Query string should be stripped by the caller.
    pub fn resolve(&self, path: &str) -> Option<Match<H>> {
        for route in &self.routes {
            if let Some(params) = route.pattern.matches(path) {
                trace!("Path {:?} matched {:?}", path, route.pattern);
                return Some(Match {
                    handler: &route.handler,
                    params: params,
                    pattern: route.pattern.as_str(),
                });
            }
        }
        None
    }
    pub fn len(&self) -> usize {
        self.routes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H> fmt::Debug for Router<H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| &r.pattern))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::{to_regex, Pattern, PatternError, RouterBuilder};

    #[test]
    fn translate() {
        assert_eq!(to_regex("/users/{id}").unwrap(),
                   "/users/(?P<id>[^/]*)");
        assert_eq!(to_regex("/files/{name}.json").unwrap(),
                   r"/files/(?P<name>[^/]*)\.json");
        assert_eq!(to_regex("/a/b/").unwrap(), "/a/b/");
        assert_eq!(to_regex("^/raw$").unwrap(), "^/raw$");
    }

    #[test]
    fn errors() {
        assert_matches!(Pattern::compile("/a/{id"),
                        Err(PatternError::UnbalancedBraces(..)));
        assert_matches!(Pattern::compile("/a/id}"),
                        Err(PatternError::UnbalancedBraces(..)));
        assert_matches!(Pattern::compile("/{x}/{x}"),
                        Err(PatternError::DuplicateName(..)));
        assert_matches!(Pattern::compile("/{}"),
                        Err(PatternError::InvalidName(..)));
        assert_matches!(Pattern::compile("/{1x}"),
                        Err(PatternError::InvalidName(..)));
        assert_matches!(Pattern::compile("/{a}-{b}"),
                        Err(PatternError::StrayBrace(..)));
        assert_matches!(Pattern::compile("^/(unclosed"),
                        Err(PatternError::Regex(..)));
    }

    #[test]
    fn full_match() {
        let p = Pattern::compile("/users/{id}").unwrap();
        assert!(p.matches("/users/12").is_some());
        assert!(p.matches("/users/12/more").is_none());
        assert!(p.matches("/prefix/users/12").is_none());
        let p = Pattern::compile("/dir/").unwrap();
        assert!(p.matches("/dir/").is_some());
        assert!(p.matches("/dir").is_none());
    }

    #[test]
    fn params_are_decoded() {
        let p = Pattern::compile("/files/{name}.json").unwrap();
        let params = p.matches("/files/hello%20world.json").unwrap();
        assert_eq!(params.get("name"), Some("hello world"));
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn first_match_wins() {
        let mut builder = RouterBuilder::new();
        builder
            .add("/items/special", 1).unwrap()
            .add("/items/{id}", 2).unwrap()
            .add("^/items/.*", 3).unwrap();
        let router = builder.done();
        assert_eq!(*router.resolve("/items/special").unwrap().handler, 1);
        let m = router.resolve("/items/7").unwrap();
        assert_eq!(*m.handler, 2);
        assert_eq!(m.pattern, "/items/{id}");
        assert_eq!(*router.resolve("/items/7/8").unwrap().handler, 3);
        assert!(router.resolve("/other").is_none());
    }

    #[test]
    fn registration_order_decides() {
        let mut builder = RouterBuilder::new();
        builder
            .add("/users/{id}", "by-id").unwrap()
            .add("/users/new", "new").unwrap();
        let router = builder.done();
        let m = router.resolve("/users/new").unwrap();
        assert_eq!(*m.handler, "by-id");
        assert_eq!(m.params.get("id"), Some("new"));

        let mut builder = RouterBuilder::new();
        builder
            .add("/users/new", "new").unwrap()
            .add("/users/{id}", "by-id").unwrap();
        let router = builder.done();
        assert_eq!(*router.resolve("/users/new").unwrap().handler, "new");
        let m = router.resolve("/users/42").unwrap();
        assert_eq!(*m.handler, "by-id");
        assert_eq!(m.params.get("id"), Some("42"));
    }
}
