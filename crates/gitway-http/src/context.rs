//! Per-request context.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, StatusCode},
    response::Response,
};

use crate::response::GitResponse;

/// State threaded through hooks and handlers for one request.
///
/// Hooks run before the handler and may rewrite any field; the handler sees
/// the rewritten values.
#[derive(Debug)]
pub struct RequestContext {
    response: GitResponse,
    request: Request,
    repo_path: String,
    file_path: String,
    env: Option<Vec<String>>,
}

impl RequestContext {
    /// Creates a context for a routed request.
    pub fn new(request: Request, repo_path: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            response: GitResponse::new(),
            request,
            repo_path: repo_path.into(),
            file_path: file_path.into(),
            env: None,
        }
    }

    /// Response headers staged so far.
    pub fn response(&self) -> &GitResponse {
        &self.response
    }

    /// Mutable access to the staged response headers.
    pub fn response_mut(&mut self) -> &mut GitResponse {
        &mut self.response
    }

    /// The incoming request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Mutable access to the incoming request.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Replaces the incoming request.
    pub fn set_request(&mut self, request: Request) {
        self.request = request;
    }

    /// Repository path relative to the root, e.g. `/base/foo.git`.
    pub fn repo_path(&self) -> &str {
        &self.repo_path
    }

    /// Points the request at another repository.
    pub fn set_repo_path(&mut self, repo_path: impl Into<String>) {
        self.repo_path = repo_path.into();
    }

    /// Path below the repository, e.g. `info/refs`.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Replaces the path below the repository.
    pub fn set_file_path(&mut self, file_path: impl Into<String>) {
        self.file_path = file_path.into();
    }

    /// Extra `KEY=VALUE` variables for git subprocesses.
    pub fn env(&self) -> Option<&[String]> {
        self.env.as_deref()
    }

    /// Sets the `KEY=VALUE` variables added to every git subprocess.
    pub fn set_env(&mut self, env: Vec<String>) {
        self.env = Some(env);
    }

    /// The environment overrides split into pairs. Entries without `=` are
    /// skipped.
    pub fn env_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.env
            .iter()
            .flatten()
            .filter_map(|entry| match entry.split_once('=') {
                Some((key, _)) if key.is_empty() => None,
                Some(pair) => Some(pair),
                None => {
                    tracing::debug!(entry = %entry, "ignoring env entry without '='");
                    None
                }
            })
    }

    /// A request header as text, if present and valid.
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Takes the request body, leaving an empty one behind.
    pub fn take_body(&mut self) -> Body {
        std::mem::replace(self.request.body_mut(), Body::empty())
    }

    /// Finishes the request with the staged response headers.
    pub fn finish(self, status: StatusCode, body: Body) -> Response {
        self.response.finish(status, body)
    }

    /// Splits the context into the request and the staged response headers.
    pub fn into_parts(self) -> (Request, GitResponse) {
        (self.request, self.response)
    }
}
