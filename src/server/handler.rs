use futures::{Future, IntoFuture};

use crate::router::{Params, PatternError, RouterBuilder};
use super::{Error, Request, Response};


/// Request handler
///
/// Implemented for any `Fn(Request, Params) -> impl IntoFuture`, so usually
/// closures are registered directly.
pub trait Handler {
    fn call(&self, request: Request, params: Params)
        -> Box<dyn Future<Item=Response, Error=Error>>;
}

impl<F, R> Handler for F
    where F: Fn(Request, Params) -> R,
          R: IntoFuture<Item=Response, Error=Error>,
          R::Future: 'static,
{
    fn call(&self, request: Request, params: Params)
        -> Box<dyn Future<Item=Response, Error=Error>>
    {
        Box::new(self(request, params).into_future())
    }
}

impl RouterBuilder<Box<dyn Handler>> {
    /// Registers a handler for the pattern
    pub fn handle<H>(&mut self, pattern: &str, handler: H)
        -> Result<&mut Self, PatternError>
        where H: Handler + 'static
    {
        self.add(pattern, Box::new(handler))
    }
}
