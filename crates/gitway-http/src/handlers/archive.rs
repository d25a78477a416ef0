//! `GET <repo>/archive/<tree>.(zip|tar)` download add-on.
//!
//! Not a protocol route; embedders opt in by registering [`route`] on the
//! builder. The archive is produced by `git archive` and streamed as it is
//! written.

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    response::Response,
};
use gitway_git::ProcessGroup;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;

use super::git_command;
use super::stream::{self, Label};
use crate::router::{handler_fn, matchers, Route, RouteMatch};
use crate::{Error, GitHttp, RequestContext, Result};

static ARCHIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/archive/.+\.(?:zip|tar)$").expect("Invalid regex"));

const CONTENT_TRANSFER_ENCODING: HeaderName = HeaderName::from_static("content-transfer-encoding");

/// `…/archive/<tree>.zip` and `…/archive/<tree>.tar`
pub fn matcher(path: &str) -> Option<RouteMatch> {
    matchers::pattern(path, &ARCHIVE)
}

/// The archive route, ready to be passed to [`GitHttpBuilder::route`](crate::GitHttpBuilder::route).
pub fn route() -> Route {
    Route::new(Method::GET, matcher, handler_fn(archive))
}

/// What an archive request asks for.
#[derive(Debug, PartialEq, Eq)]
struct ArchiveRequest<'a> {
    repo_name: &'a str,
    file_name: &'a str,
    tree: &'a str,
    format: &'a str,
}

impl<'a> ArchiveRequest<'a> {
    fn parse(repo_path: &'a str, file_path: &'a str) -> Option<Self> {
        let repo_base = base_name(repo_path);
        let repo_name = repo_base.split('.').next().unwrap_or(repo_base);
        let file_name = base_name(file_path);
        let (tree, format) = file_name.rsplit_once('.')?;
        if tree.is_empty() || tree.starts_with('-') {
            return None;
        }
        Some(Self {
            repo_name,
            file_name,
            tree,
            format,
        })
    }
}

fn base_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("")
}

/// Streams `git archive` for the requested tree.
pub async fn archive(ghx: GitHttp, mut ctx: RequestContext) -> Result<Response> {
    let Some(req) = ArchiveRequest::parse(ctx.repo_path(), ctx.file_path()) else {
        return Err(Error::NotFound(ctx.file_path().to_string()));
    };
    let format = format!("--format={}", req.format);
    let prefix = format!("--prefix={}-{}/", req.repo_name, req.tree);
    let disposition = format!("attachment; filename=\"{}\"", req.file_name);

    let mut cmd = git_command(&ghx, &ctx, &["archive", &format, &prefix, req.tree])?;
    cmd.stdin(Stdio::null()).stdout(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        tracing::error!(repo = %ctx.repo_path(), error = %e, "failed to spawn git archive");
        Error::Internal(e.to_string())
    })?;
    let group = ProcessGroup::new(child.id());
    let Some(stdout) = child.stdout.take() else {
        return Err(Error::Internal("git archive stdout unavailable".into()));
    };

    let body = stream::stream_stdout(
        ghx.buffers().clone(),
        child,
        group,
        stdout,
        None,
        Label {
            command: "archive",
            repo: ctx.repo_path().to_string(),
        },
    );

    let staged = ctx.response_mut();
    staged.set_content_type("application/octet-stream");
    staged.set(header::CONTENT_DISPOSITION, &disposition);
    staged.set(CONTENT_TRANSFER_ENCODING, "binary");
    Ok(ctx.finish(StatusCode::OK, body))
}
