//! # gitway HTTP engine
//!
//! Serves a tree of bare repositories over the git "smart" and "dumb" HTTP
//! transports by bridging each request to the `git` executable.
//!
//! ## Request flow
//!
//! ```text
//!  request ──► Router ──► RequestContext ──► after-match-routing hook
//!                                                   │
//!               404 ◄── repository missing? ◄───────┘
//!                                                   │
//!                              handler ◄────────────┘
//!                 ┌────────────────┼───────────────────┐
//!           smart RPC         info/refs           static files
//!        (stdin ⇄ stdout)  (pkt-line advert)   (ServeFile + cache
//!                                                    headers)
//! ```
//!
//! Every failure is rendered as a `text/plain` reason phrase by [`Error`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use gitway_http::{Event, GitHttp};
//!
//! # async fn run() -> std::io::Result<()> {
//! let engine = GitHttp::builder("/srv/git", "/usr/bin/git")
//!     .disable_receive_pack()
//!     .on(Event::BeforeUploadPack, |ctx| {
//!         ctx.set_env(vec!["GIT_PROTOCOL=version=2".to_string()]);
//!         Ok(())
//!     })
//!     .build()?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, engine.into_router()).await
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`router`] - ordered route table and the built-in protocol matchers
//! - [`context`] - per-request state threaded through hooks and handlers
//! - [`event`] - lifecycle hooks
//! - [`handlers`] - smart RPC bridge, reference advertisement, static files,
//!   and the archive add-on
//! - [`config`] - server configuration for the `gitway` binary
//! - [`observability`] - logging and request-id middleware

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod event;
pub mod handlers;
pub mod observability;
pub mod response;
pub mod router;

pub use context::RequestContext;
pub use engine::{GitHttp, GitHttpBuilder};
pub use error::Error;
pub use event::{Event, Events, Hook};
pub use response::GitResponse;
pub use router::{handler_fn, Handler, Route, RouteError, RouteMatch, Router};

/// Result type for request handling.
pub type Result<T> = std::result::Result<T, Error>;
