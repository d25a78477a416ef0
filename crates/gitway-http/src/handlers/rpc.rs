//! Smart-protocol RPC: `POST <repo>/git-upload-pack` and `POST <repo>/git-receive-pack`.
//!
//! The request body is decoded (gzip if the client compressed it) and piped
//! into `git <service> --stateless-rpc .`, whose stdout is streamed back as
//! the response body.

use axum::{
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures::StreamExt;
use gitway_git::{BodyDecoder, ProcessGroup, Service};
use std::process::Stdio;

use super::git_command;
use super::stream::{self, Label};
use crate::event::Event;
use crate::{Error, GitHttp, RequestContext, Result};

/// Serves `git-upload-pack` after the `BeforeUploadPack` hook.
pub async fn upload_pack(ghx: GitHttp, mut ctx: RequestContext) -> Result<Response> {
    ghx.events().emit(Event::BeforeUploadPack, &mut ctx)?;
    service_rpc(ghx, ctx, Service::UploadPack).await
}

/// Serves `git-receive-pack` after the `BeforeReceivePack` hook.
pub async fn receive_pack(ghx: GitHttp, mut ctx: RequestContext) -> Result<Response> {
    ghx.events().emit(Event::BeforeReceivePack, &mut ctx)?;
    service_rpc(ghx, ctx, Service::ReceivePack).await
}

async fn service_rpc(ghx: GitHttp, mut ctx: RequestContext, service: Service) -> Result<Response> {
    let svc = service.as_str();
    if !ghx
        .git()
        .has_access(svc, ctx.header(&header::CONTENT_TYPE), true)
    {
        tracing::debug!(service = svc, repo = %ctx.repo_path(), "rpc refused");
        return Err(Error::AccessDenied(ctx.repo_path().to_string()));
    }

    let mut decoder = BodyDecoder::new(ctx.header(&header::CONTENT_ENCODING));
    let mut body = ctx.take_body().into_data_stream();

    // A body that fails to decode up front is answered with 500 before git
    // is ever started.
    let first = match body.next().await {
        Some(Ok(chunk)) => decoder.feed(chunk)?,
        Some(Err(e)) => return Err(Error::Internal(format!("reading request body: {e}"))),
        None => Bytes::new(),
    };

    let mut cmd = git_command(&ghx, &ctx, &[svc, "--stateless-rpc", "."])?;
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(service = svc, repo = %ctx.repo_path(), error = %e, "failed to spawn git");
            return Err(Error::Internal(e.to_string()));
        }
    };
    let group = ProcessGroup::new(child.id());
    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        return Err(Error::Internal("git pipes unavailable".into()));
    };

    tracing::debug!(
        service = svc,
        repo = %ctx.repo_path(),
        gzip = decoder.is_gzip(),
        pid = ?child.id(),
        "git rpc started"
    );

    let input = tokio::spawn(stream::copy_request_body(body, decoder, first, stdin));
    let body = stream::stream_stdout(
        ghx.buffers().clone(),
        child,
        group,
        stdout,
        Some(input),
        Label {
            command: svc,
            repo: ctx.repo_path().to_string(),
        },
    );

    ctx.response_mut()
        .set_content_type(&service.result_content_type());
    Ok(ctx.finish(StatusCode::OK, body))
}
