//! Ordered route table.
//!
//! Routes are tried in registration order and the first matcher that accepts
//! the path decides the outcome: if its method differs from the request's,
//! the lookup fails with method-not-allowed without looking any further.
//! Matchers are allowed to overlap, so registration order is the tie-break.
//! The engine registers the built-in protocol routes first; custom routes
//! come after them.

use axum::http::Method;
use axum::response::Response;
use once_cell::sync::Lazy;
use regex::Regex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{GitHttp, RequestContext};

/// Repository and file path carved out of a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Path of the repository, e.g. `/base/foo.git`.
    pub repo_path: String,
    /// Remainder below the repository, e.g. `info/refs`. May be empty.
    pub file_path: String,
}

impl RouteMatch {
    /// Splits `path` at byte offset `at`, where the recognised suffix starts.
    pub fn split_at(path: &str, at: usize) -> Self {
        let (repo, rest) = path.split_at(at);
        Self {
            repo_path: repo.to_string(),
            file_path: rest.strip_prefix('/').unwrap_or(rest).to_string(),
        }
    }
}

/// Future returned by route handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = crate::Result<Response>> + Send>>;

/// A route handler.
pub type Handler = Arc<dyn Fn(GitHttp, RequestContext) -> HandlerFuture + Send + Sync>;

/// A path matcher: accepts a request path or returns `None`.
pub type Matcher = Arc<dyn Fn(&str) -> Option<RouteMatch> + Send + Sync>;

/// Wraps an async function as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(GitHttp, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = crate::Result<Response>> + Send + 'static,
{
    Arc::new(move |ghx: GitHttp, ctx: RequestContext| -> HandlerFuture {
        Box::pin(f(ghx, ctx))
    })
}

/// A (method, matcher, handler) entry.
#[derive(Clone)]
pub struct Route {
    method: Method,
    matcher: Matcher,
    handler: Handler,
}

impl Route {
    /// Creates a route.
    pub fn new<M>(method: Method, matcher: M, handler: Handler) -> Self
    where
        M: Fn(&str) -> Option<RouteMatch> + Send + Sync + 'static,
    {
        Self {
            method,
            matcher: Arc::new(matcher),
            handler,
        }
    }

    /// Method the route is registered for.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Runs the route's matcher against a path.
    pub fn matches(&self, path: &str) -> Option<RouteMatch> {
        (self.matcher)(path)
    }

    /// The route's handler.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Route lookup failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No matcher accepted the path.
    #[error("url not found: method {method}, path {path}")]
    UrlNotFound { method: Method, path: String },

    /// The first matching route is registered for another method.
    #[error("method not allowed: method {method}, path {path}")]
    MethodNotAllowed { method: Method, path: String },
}

/// Ordered list of routes.
#[derive(Clone, Default, Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. No deduplication is done.
    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true when no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolves a request to the first route whose matcher accepts `path`.
    pub fn match_route(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<(RouteMatch, &Route), RouteError> {
        for route in &self.routes {
            if let Some(found) = route.matches(path) {
                if route.method != *method {
                    return Err(RouteError::MethodNotAllowed {
                        method: method.clone(),
                        path: path.to_string(),
                    });
                }
                return Ok((found, route));
            }
        }
        Err(RouteError::UrlNotFound {
            method: method.clone(),
            path: path.to_string(),
        })
    }
}

/// Built-in matchers for the git HTTP protocol grammar.
pub mod matchers {
    use super::*;

    static INFO_FILE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"/objects/info/[^/]*$").expect("Invalid regex"));
    static LOOSE_OBJECT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"/objects/[0-9a-f]{2}/[0-9a-f]{38}$").expect("Invalid regex")
    });
    static PACK_FILE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"/objects/pack/pack-[0-9a-f]{40}\.pack$").expect("Invalid regex")
    });
    static IDX_FILE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"/objects/pack/pack-[0-9a-f]{40}\.idx$").expect("Invalid regex")
    });

    /// Matches paths ending in a fixed suffix.
    pub fn suffix(path: &str, suffix: &str) -> Option<RouteMatch> {
        path.strip_suffix(suffix)
            .map(|repo| RouteMatch::split_at(path, repo.len()))
    }

    /// Matches paths whose tail matches `re` (which must be `$`-anchored).
    pub fn pattern(path: &str, re: &Regex) -> Option<RouteMatch> {
        re.find(path).map(|m| RouteMatch::split_at(path, m.start()))
    }

    /// `…/git-upload-pack`
    pub fn upload_pack(path: &str) -> Option<RouteMatch> {
        suffix(path, "/git-upload-pack")
    }

    /// `…/git-receive-pack`
    pub fn receive_pack(path: &str) -> Option<RouteMatch> {
        suffix(path, "/git-receive-pack")
    }

    /// `…/info/refs`
    pub fn info_refs(path: &str) -> Option<RouteMatch> {
        suffix(path, "/info/refs")
    }

    /// `…/HEAD`
    pub fn head(path: &str) -> Option<RouteMatch> {
        suffix(path, "/HEAD")
    }

    /// `…/objects/info/alternates`
    pub fn alternates(path: &str) -> Option<RouteMatch> {
        suffix(path, "/objects/info/alternates")
    }

    /// `…/objects/info/http-alternates`
    pub fn http_alternates(path: &str) -> Option<RouteMatch> {
        suffix(path, "/objects/info/http-alternates")
    }

    /// `…/objects/info/packs`
    pub fn info_packs(path: &str) -> Option<RouteMatch> {
        suffix(path, "/objects/info/packs")
    }

    /// `…/objects/info/<file>`
    pub fn info_file(path: &str) -> Option<RouteMatch> {
        pattern(path, &INFO_FILE)
    }

    /// `…/objects/xx/<38 hex>`
    pub fn loose_object(path: &str) -> Option<RouteMatch> {
        pattern(path, &LOOSE_OBJECT)
    }

    /// `…/objects/pack/pack-<40 hex>.pack`
    pub fn pack_file(path: &str) -> Option<RouteMatch> {
        pattern(path, &PACK_FILE)
    }

    /// `…/objects/pack/pack-<40 hex>.idx`
    pub fn idx_file(path: &str) -> Option<RouteMatch> {
        pattern(path, &IDX_FILE)
    }
}
