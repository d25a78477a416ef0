//! `GET <repo>/info/refs`.
//!
//! With `?service=git-<svc>` naming an enabled service the smart
//! advertisement is generated by git. Anything else falls back to the dumb
//! protocol: `update-server-info` refreshes the static file, which is then
//! served as is.

use axum::{
    extract::Query,
    http::StatusCode,
    response::Response,
};
use gitway_git::{PktLineWriter, Service};
use std::collections::HashMap;
use std::process::Stdio;

use super::{files, git_command};
use crate::{Error, GitHttp, RequestContext, Result};

/// Serves the ref advertisement for a smart service or the dumb `info/refs`.
pub async fn info_refs(ghx: GitHttp, mut ctx: RequestContext) -> Result<Response> {
    let requested = Query::<HashMap<String, String>>::try_from_uri(ctx.request().uri())
        .ok()
        .and_then(|Query(mut params)| params.remove("service"))
        .unwrap_or_default();
    let svc = Service::from_query_value(&requested);

    let service = match Service::parse(svc) {
        Some(service) if ghx.git().has_access(svc, None, false) => service,
        _ => return dumb_info_refs(ghx, ctx).await,
    };

    let mut cmd = git_command(
        &ghx,
        &ctx,
        &[service.as_str(), "--stateless-rpc", "--advertise-refs", "."],
    )?;
    cmd.stdin(Stdio::null());

    let refs = match cmd.output().await {
        Ok(output) if output.status.success() => output.stdout,
        Ok(output) => {
            tracing::warn!(
                service = %service,
                repo = %ctx.repo_path(),
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "ref advertisement failed"
            );
            return Err(Error::NotFound(ctx.repo_path().to_string()));
        }
        Err(e) => {
            tracing::error!(service = %service, repo = %ctx.repo_path(), error = %e, "failed to run git");
            return Err(Error::NotFound(ctx.repo_path().to_string()));
        }
    };

    let mut body = PktLineWriter::new(Vec::with_capacity(refs.len() + 64));
    body.write_line(&format!("# service=git-{service}\n"))?;
    body.flush_pkt()?;
    body.write_raw(&refs)?;

    let staged = ctx.response_mut();
    staged.hdr_nocache();
    staged.set_content_type(&service.advertisement_content_type());
    Ok(ctx.finish(StatusCode::OK, body.into_inner().into()))
}

async fn dumb_info_refs(ghx: GitHttp, mut ctx: RequestContext) -> Result<Response> {
    let mut cmd = git_command(&ghx, &ctx, &["update-server-info"])?;
    cmd.stdin(Stdio::null());
    match cmd.output().await {
        Ok(output) if !output.status.success() => tracing::debug!(
            repo = %ctx.repo_path(),
            status = %output.status,
            "update-server-info failed"
        ),
        Ok(_) => {}
        Err(e) => tracing::debug!(repo = %ctx.repo_path(), error = %e, "update-server-info failed"),
    }

    ctx.response_mut().hdr_nocache();
    files::send_file(&ghx, ctx, "text/plain; charset=utf-8").await
}
