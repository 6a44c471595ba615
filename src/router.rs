//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. The application state is
//! owned by the router and cloned into every handler call.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router<S> {
    state: S,
    routes: HashMap<Method, MatchitRouter<BoxedHandler<S>>>,
}

enum Lookup<S> {
    Found(BoxedHandler<S>, HashMap<String, String>),
    WrongMethod,
    Missing,
}

impl<S: Clone + Send + Sync + 'static> Router<S> {
    pub fn new(state: S) -> Self {
        Self { state, routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup, so this is a
    /// programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler<S>) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Routes one request to its handler and runs it.
    ///
    /// Unknown paths answer `404`; a path registered only under other
    /// methods answers `405`.
    pub async fn handle(&self, mut req: Request) -> Response {
        match self.lookup(req.method, &req.path) {
            Lookup::Found(handler, params) => {
                req.params = params;
                handler.call(self.state.clone(), req).await
            }
            Lookup::WrongMethod => {
                Response::error(Status::MethodNotAllowed, Status::MethodNotAllowed.reason())
            }
            Lookup::Missing => Response::error(Status::NotFound, Status::NotFound.reason()),
        }
    }

    fn lookup(&self, method: Method, path: &str) -> Lookup<S> {
        if let Some(matched) = self.routes.get(&method).and_then(|tree| tree.at(path).ok()) {
            let handler = Arc::clone(matched.value);
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Lookup::Found(handler, params);
        }
        let elsewhere = self.routes.iter()
            .any(|(m, tree)| *m != method && tree.at(path).is_ok());
        if elsewhere { Lookup::WrongMethod } else { Lookup::Missing }
    }
}
