//! Gateway to the git executable and the repository tree.
//!
//! The gateway maps request paths onto directories under the configured root,
//! answers access-control questions for the smart services, and builds the
//! subprocess invocations the HTTP handlers run.

use crate::error::GatewayError;
use crate::service::Service;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::process::Command;

/// Configuration of a [`ProcessGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Directory every repository path is resolved against.
    pub root: PathBuf,
    /// Path of the git executable.
    pub git_bin: PathBuf,
    /// Whether `upload-pack` (fetch) is served.
    pub upload_pack: bool,
    /// Whether `receive-pack` (push) is served.
    pub receive_pack: bool,
}

impl GatewayConfig {
    /// Creates a configuration with both services enabled.
    pub fn new(root: impl Into<PathBuf>, git_bin: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            git_bin: git_bin.into(),
            upload_pack: true,
            receive_pack: true,
        }
    }
}

/// A file requested through the dumb protocol.
#[derive(Debug, Clone)]
pub struct RequestedFile {
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Absolute path on disk.
    pub path: PathBuf,
}

/// Runs git against repositories below a root directory.
#[derive(Debug, Clone)]
pub struct ProcessGateway {
    root: PathBuf,
    git_bin: PathBuf,
    upload_pack: bool,
    receive_pack: bool,
}

impl ProcessGateway {
    /// Creates a gateway. An empty root means the current directory.
    ///
    /// An existing root is canonicalized so that resolved paths can be checked
    /// for containment after symlinks are followed.
    pub fn new(config: GatewayConfig) -> std::io::Result<Self> {
        let root = if config.root.as_os_str().is_empty() {
            std::env::current_dir()?
        } else {
            config.root
        };
        let root = match root.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(root = %root.display(), "repository root does not exist");
                root
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            root,
            git_bin: config.git_bin,
            upload_pack: config.upload_pack,
            receive_pack: config.receive_pack,
        })
    }

    /// Repository root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the git executable.
    pub fn git_bin(&self) -> &Path {
        &self.git_bin
    }

    /// Whether the given service is enabled, regardless of request headers.
    pub fn is_enabled(&self, service: Service) -> bool {
        match service {
            Service::UploadPack => self.upload_pack,
            Service::ReceivePack => self.receive_pack,
        }
    }

    /// Resolves a request's repository path to a directory under the root.
    ///
    /// Paths are joined component by component; `..`, absolute and prefix
    /// components are refused. An existing path is returned canonicalized and
    /// must still lie under the root once symlinks are resolved.
    pub fn resolve_repo_dir(&self, repo_path: &str) -> Result<PathBuf, GatewayError> {
        let joined = join_under(&self.root, repo_path)?;
        self.contain(joined, repo_path)
    }

    /// Returns true if the repository directory exists.
    pub fn repository_exists(&self, repo_path: &str) -> bool {
        match self.resolve_repo_dir(repo_path) {
            Ok(dir) => dir.is_dir(),
            Err(e) => {
                tracing::debug!(repo = %repo_path, error = %e, "refusing repository path");
                false
            }
        }
    }

    /// Decides whether a request may use `service`.
    ///
    /// With `check_content_type`, the request's `Content-Type` must be exactly
    /// `application/x-git-<service>-request`. Unknown services are refused.
    pub fn has_access(
        &self,
        service: &str,
        content_type: Option<&str>,
        check_content_type: bool,
    ) -> bool {
        let Some(service) = Service::parse(service) else {
            return false;
        };
        if check_content_type && content_type != Some(service.request_content_type().as_str()) {
            return false;
        }
        self.is_enabled(service)
    }

    /// Builds a git invocation running inside the repository directory.
    ///
    /// On Unix the child leads its own process group; the returned command is
    /// killed when its `Child` handle is dropped.
    pub fn command<I, S>(&self, repo_path: &str, args: I) -> Result<Command, GatewayError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let dir = self.resolve_repo_dir(repo_path)?;
        let mut cmd = Command::new(&self.git_bin);
        cmd.args(args).current_dir(dir).kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        Ok(cmd)
    }

    /// Stats a file inside a repository.
    pub fn stat_requested_file(
        &self,
        repo_path: &str,
        file_path: &str,
    ) -> Result<RequestedFile, GatewayError> {
        let repo_dir = self.resolve_repo_dir(repo_path)?;
        let path = join_under(&repo_dir, file_path)?;
        let path = self.contain(path, file_path)?;
        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GatewayError::NotFound(path));
            }
            Err(e) => return Err(e.into()),
        };
        if !meta.is_file() {
            return Err(GatewayError::NotFound(path));
        }
        Ok(RequestedFile {
            size: meta.len(),
            modified: meta.modified()?,
            path,
        })
    }

    /// Canonicalizes `path` and refuses it unless it stays under the root.
    /// A path that does not exist is returned as is.
    fn contain(&self, path: PathBuf, requested: &str) -> Result<PathBuf, GatewayError> {
        match path.canonicalize() {
            Ok(real) if real.starts_with(&self.root) => Ok(real),
            Ok(real) => {
                tracing::debug!(
                    requested = %requested,
                    resolved = %real.display(),
                    "path resolves outside the repository root"
                );
                Err(GatewayError::PathEscapesRoot(requested.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(path),
            Err(e) => Err(e.into()),
        }
    }
}

fn join_under(base: &Path, relative: &str) -> Result<PathBuf, GatewayError> {
    let mut joined = base.to_path_buf();
    for component in Path::new(relative.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(GatewayError::PathEscapesRoot(relative.to_string()));
            }
        }
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn gateway(root: &Path) -> ProcessGateway {
        ProcessGateway::new(GatewayConfig::new(root, "/usr/bin/git")).unwrap()
    }

    #[test]
    fn test_resolve_repo_dir() {
        let gw = gateway(Path::new("/srv/git"));
        assert_eq!(
            gw.resolve_repo_dir("/base/foo.git").unwrap(),
            PathBuf::from("/srv/git/base/foo.git")
        );
        assert_eq!(
            gw.resolve_repo_dir("foo.git/./").unwrap(),
            PathBuf::from("/srv/git/foo.git")
        );
        assert_eq!(gw.resolve_repo_dir("").unwrap(), PathBuf::from("/srv/git"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let gw = gateway(Path::new("/srv/git"));
        assert!(matches!(
            gw.resolve_repo_dir("/../etc"),
            Err(GatewayError::PathEscapesRoot(_))
        ));
        assert!(gw.resolve_repo_dir("/a/../../b").is_err());
    }

    #[test]
    fn test_empty_root_is_current_dir() {
        let gw = ProcessGateway::new(GatewayConfig::new("", "git")).unwrap();
        assert_eq!(gw.root(), std::env::current_dir().unwrap().canonicalize().unwrap());
    }

    #[test]
    fn test_repository_exists() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("test.git")).unwrap();
        std::fs::write(tmp.path().join("plain-file"), b"x").unwrap();
        let gw = gateway(tmp.path());

        assert!(gw.repository_exists("/test.git"));
        assert!(!gw.repository_exists("/missing.git"));
        assert!(!gw.repository_exists("/plain-file"));
        assert!(!gw.repository_exists("/test.git/../test.git"));
    }

    #[test]
    fn test_has_access_content_type_gate() {
        let gw = gateway(Path::new("/srv/git"));
        let upload = Some("application/x-git-upload-pack-request");

        assert!(gw.has_access("upload-pack", upload, true));
        assert!(!gw.has_access("upload-pack", Some("text/plain"), true));
        assert!(!gw.has_access("upload-pack", None, true));
        assert!(!gw.has_access("receive-pack", upload, true));
        // content type ignored without the check
        assert!(gw.has_access("receive-pack", None, false));
    }

    #[test]
    fn test_has_access_enabled_flags() {
        let mut config = GatewayConfig::new("/srv/git", "git");
        config.upload_pack = false;
        let gw = ProcessGateway::new(config).unwrap();

        let upload = Some("application/x-git-upload-pack-request");
        assert!(!gw.has_access("upload-pack", upload, true));
        assert!(!gw.has_access("upload-pack", None, false));
        assert!(gw.has_access("receive-pack", None, false));
        assert!(!gw.has_access("archive", None, false));
        assert!(!gw.has_access("", None, false));
    }

    #[test]
    fn test_stat_requested_file() {
        let tmp = TempDir::new().unwrap();
        let repo = tmp.path().join("test.git");
        std::fs::create_dir_all(repo.join("objects/info")).unwrap();
        std::fs::write(repo.join("HEAD"), b"ref: refs/heads/main\n").unwrap();
        let gw = gateway(tmp.path());

        let file = gw.stat_requested_file("/test.git", "HEAD").unwrap();
        assert_eq!(file.size, 21);
        assert_eq!(file.path, repo.join("HEAD").canonicalize().unwrap());

        let missing = gw.stat_requested_file("/test.git", "objects/info/http-alternates");
        assert!(matches!(missing, Err(GatewayError::NotFound(_))));
        assert!(missing.unwrap_err().is_not_found());

        // directories are not served
        assert!(gw.stat_requested_file("/test.git", "objects/info").is_err());

        let escape = gw.stat_requested_file("/test.git", "../secret");
        assert!(matches!(escape, Err(GatewayError::PathEscapesRoot(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_root_is_refused() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let srv = tmp.path().join("srv");
        let outside = tmp.path().join("outside.git");
        std::fs::create_dir_all(srv.join("inside.git")).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("HEAD"), b"ref: refs/heads/secret\n").unwrap();
        std::fs::write(srv.join("inside.git/HEAD"), b"ref: refs/heads/main\n").unwrap();
        symlink(&outside, srv.join("link.git")).unwrap();
        symlink(outside.join("HEAD"), srv.join("inside.git/ORIG_HEAD")).unwrap();
        symlink(srv.join("inside.git"), srv.join("alias.git")).unwrap();
        let gw = gateway(&srv);

        assert!(matches!(
            gw.resolve_repo_dir("/link.git"),
            Err(GatewayError::PathEscapesRoot(_))
        ));
        assert!(!gw.repository_exists("/link.git"));
        assert!(matches!(
            gw.stat_requested_file("/link.git", "HEAD"),
            Err(GatewayError::PathEscapesRoot(_))
        ));
        assert!(matches!(
            gw.stat_requested_file("/inside.git", "ORIG_HEAD"),
            Err(GatewayError::PathEscapesRoot(_))
        ));
        assert!(gw.command("/link.git", ["status"]).is_err());

        // links that stay under the root still work
        assert!(gw.repository_exists("/alias.git"));
        let file = gw.stat_requested_file("/alias.git", "HEAD").unwrap();
        assert_eq!(file.path, srv.join("inside.git/HEAD").canonicalize().unwrap());
    }

    #[tokio::test]
    async fn test_command_runs_in_repo_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("test.git")).unwrap();
        let gw = ProcessGateway::new(GatewayConfig::new(tmp.path(), "pwd")).unwrap();

        let output = gw
            .command("/test.git", std::iter::empty::<&str>())
            .unwrap()
            .output()
            .await
            .unwrap();
        assert!(output.status.success());
        let cwd = String::from_utf8(output.stdout).unwrap();
        let expected = tmp.path().join("test.git").canonicalize().unwrap();
        assert_eq!(PathBuf::from(cwd.trim()).canonicalize().unwrap(), expected);
    }
}
