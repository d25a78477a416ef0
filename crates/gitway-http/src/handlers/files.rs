//! Dumb-protocol static files.
//!
//! Files are located through the gateway and served with tower-http's
//! [`ServeFile`], which also takes care of conditional and range requests.
//! Mutable files (`HEAD`, `objects/info/*`) are never cached; content
//! addressed objects and packs are cacheable for a year.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::{Error, GitHttp, RequestContext, Result};

/// `HEAD`, `objects/info/alternates` and other mutable text files.
pub async fn text_file(ghx: GitHttp, mut ctx: RequestContext) -> Result<Response> {
    ctx.response_mut().hdr_nocache();
    send_file(&ghx, ctx, "text/plain").await
}

/// `objects/info/packs`.
pub async fn info_packs(ghx: GitHttp, mut ctx: RequestContext) -> Result<Response> {
    ctx.response_mut().hdr_cache_forever();
    send_file(&ghx, ctx, "text/plain; charset=utf-8").await
}

/// A loose object under `objects/xx/`.
pub async fn loose_object(ghx: GitHttp, mut ctx: RequestContext) -> Result<Response> {
    ctx.response_mut().hdr_cache_forever();
    send_file(&ghx, ctx, "application/x-git-loose-object").await
}

/// A `.pack` file.
pub async fn pack_file(ghx: GitHttp, mut ctx: RequestContext) -> Result<Response> {
    ctx.response_mut().hdr_cache_forever();
    send_file(&ghx, ctx, "application/x-git-packed-objects").await
}

/// A pack index.
pub async fn idx_file(ghx: GitHttp, mut ctx: RequestContext) -> Result<Response> {
    ctx.response_mut().hdr_cache_forever();
    send_file(&ghx, ctx, "application/x-git-packed-objects-toc").await
}

/// Sends `<repo>/<file>` with the given content type on top of the headers
/// already staged on the context.
///
/// A missing file, or one that is not a regular file, is a 404.
pub(crate) async fn send_file(
    ghx: &GitHttp,
    mut ctx: RequestContext,
    content_type: &str,
) -> Result<Response> {
    let file = ghx
        .git()
        .stat_requested_file(ctx.repo_path(), ctx.file_path())?;

    let staged = ctx.response_mut();
    staged.set_content_type(content_type);
    staged.set_content_length(file.size);
    staged.set_last_modified(file.modified);

    let (request, mut staged) = ctx.into_parts();
    let mut response = match ServeFile::new(&file.path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };

    match response.status() {
        StatusCode::NOT_FOUND => return Err(Error::NotFound(file.path.display().to_string())),
        StatusCode::OK => {}
        // 206 and 304 carry their own length
        _ => {
            staged.headers_mut().remove(header::CONTENT_LENGTH);
        }
    }

    staged.apply_to(&mut response);
    tracing::trace!(
        path = %file.path.display(),
        status = response.status().as_u16(),
        bytes = file.size,
        "file served"
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, extract::Request};
    use std::fs;
    use tempfile::TempDir;

    fn engine(root: &std::path::Path) -> GitHttp {
        GitHttp::builder(root, "git").build().unwrap()
    }

    fn ctx(repo: &str, file: &str, request: Request) -> RequestContext {
        RequestContext::new(request, repo, file)
    }

    fn get(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_send_file_sets_headers() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("r.git")).unwrap();
        fs::write(dir.path().join("r.git/HEAD"), "ref: refs/heads/main\n").unwrap();

        let ghx = engine(dir.path());
        let response = text_file(ghx, ctx("/r.git", "HEAD", get("/r.git/HEAD")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers[header::CONTENT_LENGTH], "21");
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert!(headers.contains_key(header::LAST_MODIFIED));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ref: refs/heads/main\n");
    }

    #[tokio::test]
    async fn test_pack_is_cacheable() {
        let dir = TempDir::new().unwrap();
        let pack_dir = dir.path().join("r.git/objects/pack");
        fs::create_dir_all(&pack_dir).unwrap();
        let name = format!("pack-{}.pack", "a".repeat(40));
        fs::write(pack_dir.join(&name), b"PACK\0\0\0\x02").unwrap();

        let file = format!("objects/pack/{name}");
        let uri = format!("/r.git/{file}");
        let response = pack_file(engine(dir.path()), ctx("/r.git", &file, get(&uri)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-git-packed-objects"
        );
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=31536000"
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("r.git/objects/info")).unwrap();

        let result = text_file(
            engine(dir.path()),
            ctx(
                "/r.git",
                "objects/info/http-alternates",
                get("/r.git/objects/info/http-alternates"),
            ),
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("r.git/objects/info/packs")).unwrap();

        let result = info_packs(
            engine(dir.path()),
            ctx("/r.git", "objects/info/packs", get("/r.git/objects/info/packs")),
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_not_modified_drops_length() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("r.git")).unwrap();
        fs::write(dir.path().join("r.git/HEAD"), "ref: refs/heads/main\n").unwrap();
        let ghx = engine(dir.path());

        let first = text_file(ghx.clone(), ctx("/r.git", "HEAD", get("/r.git/HEAD")))
            .await
            .unwrap();
        let last_modified = first.headers()[header::LAST_MODIFIED].clone();

        let conditional = Request::builder()
            .uri("/r.git/HEAD")
            .header(header::IF_MODIFIED_SINCE, last_modified)
            .body(Body::empty())
            .unwrap();
        let response = text_file(ghx, ctx("/r.git", "HEAD", conditional))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_ne!(
            response.headers().get(header::CONTENT_LENGTH).map(|v| v.as_bytes()),
            Some(&b"21"[..])
        );
    }
}
