//! Smart-protocol service names.

use std::fmt;

/// A git service reachable over the smart protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// `git-upload-pack` (fetch, clone).
    UploadPack,
    /// `git-receive-pack` (push).
    ReceivePack,
}

impl Service {
    /// The service name as passed to the git executable.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadPack => "upload-pack",
            Self::ReceivePack => "receive-pack",
        }
    }

    /// Parses a bare service name (`upload-pack`, `receive-pack`).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "upload-pack" => Some(Self::UploadPack),
            "receive-pack" => Some(Self::ReceivePack),
            _ => None,
        }
    }

    /// Extracts the service name from an `info/refs?service=` value.
    ///
    /// Only values carrying the `git-` prefix name a service; anything else
    /// yields an empty string, which no gateway grants access to.
    pub fn from_query_value(value: &str) -> &str {
        value.strip_prefix("git-").unwrap_or("")
    }

    /// Content type a client must send with an RPC request body.
    pub fn request_content_type(&self) -> String {
        format!("application/x-git-{}-request", self.as_str())
    }

    /// Content type of an RPC response body.
    pub fn result_content_type(&self) -> String {
        format!("application/x-git-{}-result", self.as_str())
    }

    /// Content type of a smart `info/refs` response.
    pub fn advertisement_content_type(&self) -> String {
        format!("application/x-git-{}-advertisement", self.as_str())
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Service::parse("upload-pack"), Some(Service::UploadPack));
        assert_eq!(Service::parse("receive-pack"), Some(Service::ReceivePack));
        assert_eq!(Service::parse("git-upload-pack"), None);
        assert_eq!(Service::parse("archive"), None);
    }

    #[test]
    fn test_from_query_value() {
        assert_eq!(Service::from_query_value("git-upload-pack"), "upload-pack");
        assert_eq!(Service::from_query_value("git-receive-pack"), "receive-pack");
        assert_eq!(Service::from_query_value("upload-pack"), "");
        assert_eq!(Service::from_query_value(""), "");
    }

    #[test]
    fn test_content_types() {
        let svc = Service::ReceivePack;
        assert_eq!(
            svc.request_content_type(),
            "application/x-git-receive-pack-request"
        );
        assert_eq!(
            svc.result_content_type(),
            "application/x-git-receive-pack-result"
        );
        assert_eq!(
            Service::UploadPack.advertisement_content_type(),
            "application/x-git-upload-pack-advertisement"
        );
    }
}
