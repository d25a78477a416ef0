//! Engine construction and request dispatch.

use axum::{
    extract::{Request, State},
    http::{Method, Version},
    response::{IntoResponse, Response},
};
use gitway_git::{BufferPool, GatewayConfig, ProcessGateway};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::event::{Event, Events};
use crate::handlers;
use crate::router::{handler_fn, matchers, Route, Router};
use crate::{Error, RequestContext, Result};

/// The git HTTP transport engine.
///
/// Cheap to clone; every clone shares the same immutable routes, hooks and
/// gateway.
#[derive(Clone, Debug)]
pub struct GitHttp {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    git: ProcessGateway,
    router: Router,
    events: Events,
    buffers: BufferPool,
}

impl GitHttp {
    /// Starts building an engine serving repositories below `root` with the
    /// git executable at `git_bin`.
    pub fn builder(root: impl Into<PathBuf>, git_bin: impl Into<PathBuf>) -> GitHttpBuilder {
        GitHttpBuilder {
            gateway: GatewayConfig::new(root, git_bin),
            dumb_proto: true,
            events: Events::new(),
            routes: Vec::new(),
            buffers: BufferPool::default(),
        }
    }

    /// The process gateway.
    pub fn git(&self) -> &ProcessGateway {
        &self.inner.git
    }

    /// The route table.
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// The hook registry.
    pub fn events(&self) -> &Events {
        &self.inner.events
    }

    /// Buffers used by the streaming copies.
    pub fn buffers(&self) -> &BufferPool {
        &self.inner.buffers
    }

    /// Handles one request from routing to rendered response.
    pub async fn serve(&self, request: Request) -> Response {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    async fn dispatch(&self, request: Request) -> Result<Response> {
        let http11 = request.version() == Version::HTTP_11;
        let (found, handler) = {
            let path = decode_path(request.uri().path())?;
            match self.router().match_route(request.method(), &path) {
                Ok((found, route)) => (found, Arc::clone(route.handler())),
                Err(err) => {
                    tracing::debug!(error = %err, "no route");
                    return Err(Error::from_route(err, http11));
                }
            }
        };

        let mut ctx = RequestContext::new(request, found.repo_path, found.file_path);
        self.events().emit(Event::AfterMatchRouting, &mut ctx)?;

        if !self.git().repository_exists(ctx.repo_path()) {
            tracing::debug!(repo = %ctx.repo_path(), "repository not found");
            return Err(Error::NotFound(ctx.repo_path().to_string()));
        }

        handler(self.clone(), ctx).await
    }

    /// Wraps the engine in an axum router that sends every request through
    /// [`GitHttp::serve`].
    pub fn into_router(self) -> axum::Router {
        axum::Router::new()
            .fallback(fallback)
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }
}

/// Percent-decodes a request path the way git clients encode repository
/// names. Encoded slashes and paths that do not decode to UTF-8 are refused.
fn decode_path(raw: &str) -> Result<Cow<'_, str>> {
    if raw.contains("%2F") || raw.contains("%2f") {
        tracing::debug!(path = %raw, "refusing encoded slash");
        return Err(Error::NotFound(raw.to_string()));
    }
    percent_decode_str(raw).decode_utf8().map_err(|_| {
        tracing::debug!(path = %raw, "path is not valid UTF-8 once decoded");
        Error::NotFound(raw.to_string())
    })
}

async fn fallback(State(ghx): State<GitHttp>, request: Request) -> Response {
    ghx.serve(request).await
}

/// Builder for [`GitHttp`].
pub struct GitHttpBuilder {
    gateway: GatewayConfig,
    dumb_proto: bool,
    events: Events,
    routes: Vec<Route>,
    buffers: BufferPool,
}

impl GitHttpBuilder {
    /// Stops serving `git-upload-pack` (fetch and clone).
    pub fn disable_upload_pack(mut self) -> Self {
        self.gateway.upload_pack = false;
        self
    }

    /// Stops serving `git-receive-pack` (push).
    pub fn disable_receive_pack(mut self) -> Self {
        self.gateway.receive_pack = false;
        self
    }

    /// Does not register the dumb-protocol file routes.
    pub fn without_dumb_proto(mut self) -> Self {
        self.dumb_proto = false;
        self
    }

    /// Registers a hook, replacing any earlier one for the same event.
    pub fn on<F>(mut self, event: Event, hook: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<()> + Send + Sync + 'static,
    {
        self.events.on(event, hook);
        self
    }

    /// Appends a custom route. Custom routes are tried after every built-in
    /// protocol route, in the order they were added.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Replaces the buffer pool used by streaming copies.
    pub fn buffers(mut self, buffers: BufferPool) -> Self {
        self.buffers = buffers;
        self
    }

    /// Builds the engine.
    pub fn build(self) -> std::io::Result<GitHttp> {
        let git = ProcessGateway::new(self.gateway)?;

        let mut router = Router::new();
        router.add(Route::new(
            Method::POST,
            matchers::upload_pack,
            handler_fn(handlers::rpc::upload_pack),
        ));
        router.add(Route::new(
            Method::POST,
            matchers::receive_pack,
            handler_fn(handlers::rpc::receive_pack),
        ));
        router.add(Route::new(
            Method::GET,
            matchers::info_refs,
            handler_fn(handlers::refs::info_refs),
        ));

        if self.dumb_proto {
            let text = handler_fn(handlers::files::text_file);
            router.add(Route::new(Method::GET, matchers::head, text.clone()));
            router.add(Route::new(Method::GET, matchers::alternates, text.clone()));
            router.add(Route::new(Method::GET, matchers::http_alternates, text.clone()));
            router.add(Route::new(
                Method::GET,
                matchers::info_packs,
                handler_fn(handlers::files::info_packs),
            ));
            router.add(Route::new(Method::GET, matchers::info_file, text));
            router.add(Route::new(
                Method::GET,
                matchers::loose_object,
                handler_fn(handlers::files::loose_object),
            ));
            router.add(Route::new(
                Method::GET,
                matchers::pack_file,
                handler_fn(handlers::files::pack_file),
            ));
            router.add(Route::new(
                Method::GET,
                matchers::idx_file,
                handler_fn(handlers::files::idx_file),
            ));
        }

        for route in self.routes {
            router.add(route);
        }

        tracing::debug!(
            root = %git.root().display(),
            routes = router.len(),
            dumb_proto = self.dumb_proto,
            "git http engine ready"
        );

        Ok(GitHttp {
            inner: Arc::new(Inner {
                git,
                router,
                events: self.events,
                buffers: self.buffers,
            }),
        })
    }
}
