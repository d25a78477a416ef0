//! Error taxonomy and rendering.
//!
//! Every failure a request can hit collapses into one of four kinds, each
//! rendered as the plain-text reason phrase of its status code.

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use gitway_git::{GatewayError, GitError};

use crate::router::RouteError;

/// Request handling error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No route, repository or file for the request path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The path matched a route registered for another method.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        /// Whether the request came in over HTTP/1.1.
        http11: bool,
    },

    /// The service is disabled or the request content type is wrong.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Subprocess, pipe, decoding or filesystem failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Builds the error for a failed route lookup.
    pub fn from_route(err: RouteError, http11: bool) -> Self {
        match err {
            RouteError::UrlNotFound { path, .. } => Error::NotFound(path),
            RouteError::MethodNotAllowed { method, path } => Error::MethodNotAllowed {
                method,
                path,
                http11,
            },
        }
    }

    /// HTTP status the error renders as.
    ///
    /// A 405 is only sent to HTTP/1.1 clients; other protocol versions get
    /// 400.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed { http11: true, .. } => StatusCode::METHOD_NOT_ALLOWED,
            Error::MethodNotAllowed { http11: false, .. } => StatusCode::BAD_REQUEST,
            Error::AccessDenied(_) => StatusCode::FORBIDDEN,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = status.as_u16(), error = %self, "rendering error");
        (
            status,
            [(header::CONTENT_TYPE, "text/plain")],
            status.canonical_reason().unwrap_or_default(),
        )
            .into_response()
    }
}

impl From<GitError> for Error {
    fn from(err: GitError) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<GatewayError> for Error {
    fn from(err: GatewayError) -> Self {
        if err.is_not_found() {
            Error::NotFound(err.to_string())
        } else {
            Error::Internal(err.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    async fn rendered(err: Error) -> (StatusCode, String, String) {
        let response = err.into_response();
        let status = response.status();
        let content_type = response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_render_not_found() {
        let (status, ct, body) = rendered(Error::NotFound("/x".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(ct, "text/plain");
        assert_eq!(body, "Not Found");
    }

    #[tokio::test]
    async fn test_render_access_denied() {
        let (status, _, body) = rendered(Error::AccessDenied("/repo.git".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "Forbidden");
    }

    #[tokio::test]
    async fn test_render_internal() {
        let (status, _, body) = rendered(Error::Internal("pipe".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_render_method_not_allowed_by_protocol() {
        let err = |http11| Error::MethodNotAllowed {
            method: Method::GET,
            path: "/repo.git/git-upload-pack".into(),
            http11,
        };
        let (status, _, body) = rendered(err(true)).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, "Method Not Allowed");

        let (status, _, body) = rendered(err(false)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Bad Request");
    }

    #[test]
    fn test_gateway_errors_map_by_kind() {
        let missing = Error::from(GatewayError::NotFound(PathBuf::from("/x/HEAD")));
        assert!(matches!(missing, Error::NotFound(_)));

        let escape = Error::from(GatewayError::PathEscapesRoot("../x".into()));
        assert!(matches!(escape, Error::NotFound(_)));

        let io = Error::from(GatewayError::Io(std::io::Error::other("disk")));
        assert!(matches!(io, Error::Internal(_)));
    }
}
