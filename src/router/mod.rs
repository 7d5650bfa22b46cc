//! Request routing — exact and longest-prefix ("partial path") registration.
//!
//! Two collections, matching how this routes in practice: an exact table for
//! `(verb, path)` lookups and a partial table scanned linearly for the
//! longest matching prefix. At the registration counts this system expects
//! (tens of routes), a linear scan sorted by descending prefix length is
//! simpler than a trie and just as fast.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::start_line::{StartLine, Verb};

/// A plain request/response handler — the common case.
pub type Handler = Arc<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

/// A handler that sees the [`StartLine`] before the body has even been read
/// and decides, at dispatch time, which `Handler` to run. Kept as its own
/// type rather than folded into `Handler` — the two shapes answer different
/// questions (respond to a request vs. choose how to respond) and conflating
/// them behind one polymorphic type would hide that distinction at every
/// call site.
pub type DispatchHandler = Arc<dyn Fn(&StartLine) -> Handler + Send + Sync>;

/// Conversion trait so `Router::register` and friends can accept a plain
/// async closure directly, without the caller spelling out the `Arc<dyn Fn...>`
/// boilerplate.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, req: Request) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(req))
    }
}

fn into_handler(f: impl IntoHandler + 'static) -> Handler {
    Arc::new(move |req| f.call(req))
}

/// What a route resolves to: either a handler to run directly, or a
/// dispatch-time function that picks the handler once it has seen the
/// [`StartLine`].
#[derive(Clone)]
pub enum RouteTarget {
    Direct(Handler),
    Dispatch(DispatchHandler),
}

impl RouteTarget {
    /// Resolves this target into a concrete [`Handler`] for `start_line`.
    fn resolve(&self, start_line: &StartLine) -> Handler {
        match self {
            RouteTarget::Direct(handler) => Arc::clone(handler),
            RouteTarget::Dispatch(dispatch) => dispatch(start_line),
        }
    }
}

/// The route table. Mutated only at configuration time, before the accept
/// loop binds — immutable (read-only) for the server's entire running
/// lifetime thereafter.
#[derive(Clone, Default)]
pub struct Router {
    exact: HashMap<(Verb, String), RouteTarget>,
    partial: Vec<(Verb, String, RouteTarget)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for an exact `(verb, path)` pair. `path` is
    /// compared against `StartLine::path_details.isolated_path` — no leading
    /// slash.
    pub fn register(&mut self, verb: Verb, exact_path: impl Into<String>, handler: impl IntoHandler + 'static) {
        self.exact
            .insert((verb, exact_path.into()), RouteTarget::Direct(into_handler(handler)));
    }

    /// As [`Router::register`], but for a [`DispatchHandler`].
    pub fn register_dispatch(&mut self, verb: Verb, exact_path: impl Into<String>, dispatch: DispatchHandler) {
        self.exact
            .insert((verb, exact_path.into()), RouteTarget::Dispatch(dispatch));
    }

    /// Registers a handler for any path sharing `prefix` under `verb`. A path
    /// equal to `prefix` also matches — the trailing slash is not required.
    pub fn register_partial_path(
        &mut self,
        verb: Verb,
        prefix: impl Into<String>,
        handler: impl IntoHandler + 'static,
    ) {
        self.partial
            .push((verb, prefix.into(), RouteTarget::Direct(into_handler(handler))));
    }

    /// As [`Router::register_partial_path`], but for a [`DispatchHandler`].
    pub fn register_partial_path_dispatch(&mut self, verb: Verb, prefix: impl Into<String>, dispatch: DispatchHandler) {
        self.partial.push((verb, prefix.into(), RouteTarget::Dispatch(dispatch)));
    }

    /// Resolves `start_line` to a handler.
    ///
    /// 1. Try the exact table on `(verb, isolated_path)`.
    /// 2. On miss, scan the partial table for entries whose verb matches and
    ///    whose prefix is a prefix of `isolated_path`; return the one with
    ///    the longest prefix. Ties should not occur by construction; if they
    ///    do, the first-registered wins.
    /// 3. On total miss, `None` — the connection handler renders this as
    ///    `404 NOT FOUND`.
    pub fn find(&self, start_line: &StartLine) -> Option<Handler> {
        let verb = start_line.verb?;
        let path = start_line.path_details.isolated_path.as_str();

        if let Some(target) = self.exact.get(&(verb, path.to_string())) {
            return Some(target.resolve(start_line));
        }

        self.partial
            .iter()
            .filter(|(v, prefix, _)| *v == verb && path.starts_with(prefix.as_str()))
            .max_by_key(|(_, prefix, _)| prefix.len())
            .map(|(_, _, target)| target.resolve(start_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::response::Response;

    fn start_line(verb: Verb, path: &str) -> StartLine {
        let raw = format!("{} /{} HTTP/1.1", verb.as_str(), path);
        crate::http::start_line::extract(Some(&raw), &Config::default()).unwrap()
    }

    async fn noop_handler(_req: Request) -> Response {
        Response::html_ok("ok")
    }

    #[test]
    fn exact_match_wins_over_partial() {
        let mut router = Router::new();
        router.register(Verb::Get, "a/b", noop_handler);
        router.register_partial_path(Verb::Get, "a", noop_handler);

        assert!(router.find(&start_line(Verb::Get, "a/b")).is_some());
    }

    #[test]
    fn longest_partial_prefix_wins() {
        let mut router = Router::new();
        router.register_partial_path(Verb::Get, "a", noop_handler);
        router.register_partial_path(Verb::Get, "a/b", noop_handler);

        let resolved = router.find(&start_line(Verb::Get, "a/b/c"));
        assert!(resolved.is_some());
    }

    #[test]
    fn partial_match_requires_matching_verb() {
        let mut router = Router::new();
        router.register_partial_path(Verb::Get, "a", noop_handler);

        assert!(router.find(&start_line(Verb::Post, "a/b")).is_none());
    }

    #[test]
    fn well_known_prefix_matches_any_suffix() {
        let mut router = Router::new();
        router.register_partial_path(Verb::Get, ".well-known/acme-challenge", noop_handler);

        let sl = start_line(Verb::Get, ".well-known/acme-challenge/foobar");
        assert!(router.find(&sl).is_some());
        assert_eq!(sl.path_details.isolated_path, ".well-known/acme-challenge/foobar");
    }

    #[test]
    fn total_miss_is_none() {
        let router = Router::new();
        assert!(router.find(&start_line(Verb::Get, "nowhere")).is_none());
    }

    #[test]
    fn equal_path_and_prefix_is_a_match() {
        let mut router = Router::new();
        router.register_partial_path(Verb::Get, "a", noop_handler);
        assert!(router.find(&start_line(Verb::Get, "a")).is_some());
    }
}
