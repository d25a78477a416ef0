//! Response headers accumulated while a request is handled.
//!
//! Hooks and handlers stage headers on a [`GitResponse`]; the handler turns
//! it into the final response once the status and body are known.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use std::time::SystemTime;

/// Seconds in the one-year lifetime given to immutable objects.
pub const CACHE_FOREVER_SECS: i64 = 31_536_000;

/// Already-expired date used by no-cache responses.
const EXPIRED: &str = "Fri, 01 Jan 1980 00:00:00 GMT";

/// Formats a timestamp as an RFC 7231 HTTP-date.
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Pending response headers.
#[derive(Debug, Default, Clone)]
pub struct GitResponse {
    headers: HeaderMap,
}

impl GitResponse {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Staged headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the staged headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header from a string, ignoring values that are not valid
    /// header text.
    pub fn set(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(_) => tracing::warn!(header = %name, value, "dropping invalid header value"),
        }
    }

    /// Sets `Content-Type`.
    pub fn set_content_type(&mut self, value: &str) {
        self.set(header::CONTENT_TYPE, value);
    }

    /// Sets `Content-Length`.
    pub fn set_content_length(&mut self, len: u64) {
        self.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }

    /// Sets `Last-Modified`.
    pub fn set_last_modified(&mut self, modified: SystemTime) {
        self.set(header::LAST_MODIFIED, &http_date(modified.into()));
    }

    /// Marks the response as never cacheable.
    pub fn hdr_nocache(&mut self) {
        self.set(header::EXPIRES, EXPIRED);
        self.set(header::PRAGMA, "no-cache");
        self.set(header::CACHE_CONTROL, "no-cache, max-age=0, must-revalidate");
    }

    /// Marks the response as cacheable for a year from now.
    pub fn hdr_cache_forever(&mut self) {
        self.hdr_cache_forever_at(Utc::now());
    }

    /// Marks the response as cacheable for a year from `now`.
    pub fn hdr_cache_forever_at(&mut self, now: DateTime<Utc>) {
        let expires = now + Duration::seconds(CACHE_FOREVER_SECS);
        self.set(header::DATE, &http_date(now));
        self.set(header::EXPIRES, &http_date(expires));
        self.set(
            header::CACHE_CONTROL,
            &format!("public, max-age={CACHE_FOREVER_SECS}"),
        );
    }

    /// Builds the final response with the staged headers.
    pub fn finish(self, status: StatusCode, body: Body) -> Response {
        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }

    /// Copies the staged headers onto an already built response,
    /// replacing any header of the same name.
    pub fn apply_to(self, response: &mut Response) {
        let headers = response.headers_mut();
        let mut last = None;
        for (name, value) in self.headers {
            // continuation entries of a multi-valued header come with no name
            let name = match name {
                Some(name) => {
                    headers.remove(&name);
                    last = Some(name.clone());
                    name
                }
                None => match &last {
                    Some(name) => name.clone(),
                    None => continue,
                },
            };
            headers.append(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_http_date() {
        let t = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(http_date(t), "Wed, 21 Oct 2015 07:28:00 GMT");
    }

    #[test]
    fn test_nocache_headers() {
        let mut res = GitResponse::new();
        res.hdr_nocache();
        let h = res.headers();
        assert_eq!(h[header::EXPIRES], "Fri, 01 Jan 1980 00:00:00 GMT");
        assert_eq!(h[header::PRAGMA], "no-cache");
        assert_eq!(h[header::CACHE_CONTROL], "no-cache, max-age=0, must-revalidate");
    }

    #[test]
    fn test_cache_forever_headers() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        let mut res = GitResponse::new();
        res.hdr_cache_forever_at(now);
        let h = res.headers();
        assert_eq!(h[header::DATE], "Thu, 29 Feb 2024 12:00:00 GMT");
        assert_eq!(h[header::EXPIRES], "Fri, 28 Feb 2025 12:00:00 GMT");
        assert_eq!(h[header::CACHE_CONTROL], "public, max-age=31536000");
    }

    #[test]
    fn test_file_metadata_headers() {
        let mut res = GitResponse::new();
        res.set_content_type("application/x-git-loose-object");
        res.set_content_length(1234);
        res.set_last_modified(SystemTime::UNIX_EPOCH);
        let h = res.headers();
        assert_eq!(h[header::CONTENT_TYPE], "application/x-git-loose-object");
        assert_eq!(h[header::CONTENT_LENGTH], "1234");
        assert_eq!(h[header::LAST_MODIFIED], "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn test_invalid_value_is_dropped() {
        let mut res = GitResponse::new();
        res.set_content_type("bad\nvalue");
        assert!(res.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_finish_and_apply() {
        let mut res = GitResponse::new();
        res.set_content_type("text/plain");
        let response = res.clone().finish(StatusCode::OK, Body::empty());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");

        let mut served = Response::new(Body::empty());
        served
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
        served
            .headers_mut()
            .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        res.apply_to(&mut served);
        assert_eq!(served.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(served.headers()[header::ACCEPT_RANGES], "bytes");
    }
}
