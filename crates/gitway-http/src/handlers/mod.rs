//! Protocol handlers.
//!
//! - [`rpc`] - smart-protocol `upload-pack`/`receive-pack` streaming bridge
//! - [`refs`] - `info/refs` advertisement with the dumb fallback
//! - [`files`] - dumb-protocol static files
//! - [`archive`] - `git archive` download route, registered as a custom route

pub mod archive;
pub mod files;
pub mod refs;
pub mod rpc;
mod stream;

use tokio::process::Command;

use crate::{GitHttp, RequestContext, Result};

/// Builds a git invocation for the context's repository with the context's
/// environment overrides applied on top of the inherited environment.
pub(crate) fn git_command(ghx: &GitHttp, ctx: &RequestContext, args: &[&str]) -> Result<Command> {
    let mut cmd = ghx.git().command(ctx.repo_path(), args)?;
    cmd.envs(ctx.env_pairs());
    Ok(cmd)
}
