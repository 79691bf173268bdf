//! Where the allocation table and the ledger text live.
//!
//! [`FileStore`] reads and writes a plain file. [`GitStore`] keeps the same
//! file inside a git checkout: every read first resets the checkout to the
//! remote branch, and every write is committed and pushed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::error::{Error, Result};

/// Whole-file text storage.
pub trait TextStore {
    /// Current contents, `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<String>>;

    /// Replace the contents.
    fn write(&self, contents: &str) -> Result<()>;

    /// Human-readable location, for messages.
    fn location(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> Error {
        Error::File {
            path: self.path.clone(),
            source,
        }
    }
}

impl TextStore for FileStore {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| self.io_err(e))
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        fs::write(&self.path, contents).map_err(|e| self.io_err(e))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Remote settings for [`GitStore`].
#[derive(Debug, Clone)]
pub struct GitRemote {
    pub remote: String,
    pub branch: String,
    /// Private key handed to ssh through `GIT_SSH_COMMAND`.
    pub ssh_key: Option<PathBuf>,
    pub push: bool,
}

/// A file tracked in a git checkout.
#[derive(Debug, Clone)]
pub struct GitStore {
    file: FileStore,
    repo: PathBuf,
    remote: GitRemote,
}

impl GitStore {
    /// `path` must sit directly inside the checkout.
    pub fn new(path: impl Into<PathBuf>, remote: GitRemote) -> Result<Self> {
        let file = FileStore::new(path);
        let repo = match file.path().parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if file.path().file_name().is_none() {
            return Err(Error::Store(format!(
                "{} does not name a file",
                file.location()
            )));
        }
        Ok(Self { file, repo, remote })
    }

    fn file_name(&self) -> String {
        self.file
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.repo);
        if let Some(key) = &self.remote.ssh_key {
            cmd.env("GIT_SSH_COMMAND", format!("ssh -i {}", key.display()));
        }
        debug!("git {} in {}", args.join(" "), self.repo.display());

        let output = cmd
            .output()
            .map_err(|e| Error::Store(format!("failed to run git: {e}")))?;
        if !output.status.success() {
            return Err(Error::Store(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    /// Discard local state and match the remote branch.
    fn sync(&self) -> Result<()> {
        self.git(&["fetch", "-p", &self.remote.remote])?;
        let upstream = format!("{}/{}", self.remote.remote, self.remote.branch);
        self.git(&["reset", "--hard", &upstream])
    }
}

impl TextStore for GitStore {
    fn read(&self) -> Result<Option<String>> {
        self.sync()?;
        self.file.read()
    }

    fn write(&self, contents: &str) -> Result<()> {
        self.sync()?;
        self.file.write(contents)?;

        let name = self.file_name();
        self.git(&["add", &name])?;
        self.git(&["commit", "-m", &format!("stock-balancer: Updated {name}")])?;
        if self.remote.push {
            let refspec = format!("HEAD:{}", self.remote.branch);
            self.git(&["push", &self.remote.remote, &refspec])?;
        }
        info!("Committed {name} to {}", self.repo.display());
        Ok(())
    }

    fn location(&self) -> String {
        format!(
            "{} ({}/{})",
            self.file.location(),
            self.remote.remote,
            self.remote.branch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.tsv"));
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn file_store_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("a").join("b.csv"));
        store.write("x\n").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("x\n"));
    }

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn git_in(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap()
            .status;
        assert!(status.success(), "git {args:?}");
    }

    /// Bare remote plus a clone with one commit on `master`.
    fn checkout(root: &Path) -> PathBuf {
        let remote = root.join("remote.git");
        let work = root.join("work");
        fs::create_dir_all(&remote).unwrap();
        git_in(&remote, &["init", "--bare", "-q"]);
        git_in(root, &["clone", "-q", "remote.git", "work"]);
        git_in(&work, &["config", "user.email", "balancer@example.com"]);
        git_in(&work, &["config", "user.name", "balancer"]);
        fs::write(work.join("alloc.tsv"), "VTI\t1\n").unwrap();
        git_in(&work, &["add", "alloc.tsv"]);
        git_in(&work, &["commit", "-q", "-m", "init"]);
        git_in(&work, &["push", "-q", "origin", "HEAD:master"]);
        work
    }

    fn remote() -> GitRemote {
        GitRemote {
            remote: "origin".into(),
            branch: "master".into(),
            ssh_key: None,
            push: true,
        }
    }

    #[test]
    fn git_store_commits_and_pushes_writes() {
        if !git_available() {
            return;
        }
        let root = tempfile::tempdir().unwrap();
        let work = checkout(root.path());
        let store = GitStore::new(work.join("alloc.tsv"), remote()).unwrap();

        store.write("VTI\t0.5\nBND\t0.5\n").unwrap();

        let log = Command::new("git")
            .args(["log", "-1", "--format=%s", "master"])
            .current_dir(root.path().join("remote.git"))
            .output()
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&log.stdout).trim(),
            "stock-balancer: Updated alloc.tsv"
        );
    }

    #[test]
    fn git_store_read_discards_local_edits() {
        if !git_available() {
            return;
        }
        let root = tempfile::tempdir().unwrap();
        let work = checkout(root.path());
        fs::write(work.join("alloc.tsv"), "local edit\n").unwrap();

        let store = GitStore::new(work.join("alloc.tsv"), remote()).unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("VTI\t1\n"));
    }

    #[test]
    fn git_store_reports_git_failure() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let store = GitStore::new(dir.path().join("alloc.tsv"), remote()).unwrap();
        assert!(matches!(store.read(), Err(Error::Store(_))));
    }
}
