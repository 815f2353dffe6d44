//! Read-only access to a local git checkout through the `git` CLI

use crate::error::GitError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Swap files left by editors are not considered changes
const IGNORED_SUFFIXES: [&str; 2] = [".swo", ".swp"];

/// Walk upward from `from` to the first directory containing `.git`
///
/// `.git` may be a directory or, for linked worktrees and submodules, a file
/// pointing at the real git directory.
///
/// Falls back to `from` unchanged when the path cannot be made absolute or no
/// checkout is found before the filesystem root.
pub fn find_git_root(from: &Path) -> PathBuf {
    let abs = match std::path::absolute(from) {
        Ok(p) => p,
        Err(_) => return from.to_path_buf(),
    };

    abs.ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| from.to_path_buf())
}

/// One tag reference and the commit it ultimately points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    /// Commit hash, with annotated tags dereferenced to their target
    pub commit: String,
}

/// A checkout opened for reading
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Open the checkout rooted at `root`
    pub fn open(root: &Path) -> Result<Self, GitError> {
        let repo = Self {
            root: root.to_path_buf(),
        };
        repo.run(&["rev-parse", "--git-dir"])?;
        debug!(root = %root.display(), "Opened git repository");
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full hash of the commit HEAD resolves to
    pub fn head(&self) -> Result<String, GitError> {
        let out = self.run(&["rev-parse", "--verify", "HEAD^{commit}"])?;
        let hash = out.trim();
        if hash.is_empty() {
            return Err(GitError::Output("empty HEAD hash".to_string()));
        }
        Ok(hash.to_string())
    }

    /// Author timestamp of `commit` in strict ISO 8601
    pub fn author_time(&self, commit: &str) -> Result<String, GitError> {
        let out = self.run(&["show", "-s", "--format=%aI", commit])?;
        Ok(out.trim().to_string())
    }

    /// First URL of the first configured remote, if any
    pub fn first_remote_url(&self) -> Result<Option<String>, GitError> {
        let remotes = self.run(&["remote"])?;
        let Some(remote) = remotes.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return Ok(None);
        };

        let key = format!("remote.{}.url", remote);
        // `git config --get-all` exits 1 when the key is unset
        match self.run(&["config", "--get-all", &key]) {
            Ok(urls) => Ok(urls
                .lines()
                .map(str::trim)
                .find(|u| !u.is_empty())
                .map(str::to_string)),
            Err(GitError::Failed { code: Some(1), .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// All tags in git's enumeration order
    pub fn tags(&self) -> Result<Vec<TagRef>, GitError> {
        let out = self.run(&[
            "for-each-ref",
            // `refname:short` turns into `tags/<name>` when a branch shares the name
            "--format=%(refname:strip=2) %(objectname) %(*objectname)",
            "refs/tags",
        ])?;

        let mut tags = Vec::new();
        for line in out.lines() {
            let mut fields = line.split_whitespace();
            let (Some(name), Some(object)) = (fields.next(), fields.next()) else {
                continue;
            };
            // `*objectname` is only present for annotated tags
            let commit = fields.next().unwrap_or(object);
            tags.push(TagRef {
                name: name.to_string(),
                commit: commit.to_string(),
            });
        }
        Ok(tags)
    }

    /// Paths with uncommitted changes, untracked files included, swap files excluded
    pub fn changed_paths(&self) -> Result<Vec<String>, GitError> {
        let out = self.run(&["status", "--porcelain=v1", "-z", "--untracked-files=all"])?;
        Ok(parse_porcelain(&out)
            .into_iter()
            .filter(|p| !IGNORED_SUFFIXES.iter().any(|s| p.ends_with(s)))
            .collect())
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()?;

        if !output.status.success() {
            return Err(GitError::Failed {
                args: args.join(" "),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| GitError::Output(e.to_string()))
    }
}

/// Paths from NUL-separated `git status --porcelain=v1 -z` output
///
/// Rename and copy records carry the original path as an extra field, which
/// is skipped.
fn parse_porcelain(out: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut records = out.split('\0').filter(|r| !r.is_empty());
    while let Some(record) = records.next() {
        if record.len() < 4 {
            continue;
        }
        let (xy, path) = record.split_at(3);
        paths.push(path.to_string());
        if xy.starts_with('R') || xy.starts_with('C') {
            records.next();
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_porcelain() {
        let out = " M src/lib.rs\0?? notes.txt\0R  new.rs\0old.rs\0?? .main.rs.swp\0";
        assert_eq!(
            parse_porcelain(out),
            vec!["src/lib.rs", "notes.txt", "new.rs", ".main.rs.swp"]
        );
    }

    #[test]
    fn test_parse_porcelain_empty() {
        assert!(parse_porcelain("").is_empty());
    }

    #[test]
    fn test_find_git_root_falls_back_to_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("mkdir");

        // tempdirs normally live outside any checkout
        if dir.path().ancestors().any(|p| p.join(".git").exists()) {
            return;
        }
        assert_eq!(find_git_root(&nested), nested);
    }

    #[test]
    fn test_find_git_root_walks_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join(".git")).expect("mkdir .git");
        let nested = dir.path().join("src/deep");
        std::fs::create_dir_all(&nested).expect("mkdir");

        assert_eq!(find_git_root(&nested), dir.path());
    }

    #[test]
    fn test_find_git_root_accepts_git_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(".git"), "gitdir: /elsewhere/.git/worktrees/wt\n")
            .expect("write .git");
        let nested = dir.path().join("pkg");
        std::fs::create_dir_all(&nested).expect("mkdir");

        assert_eq!(find_git_root(&nested), dir.path());
    }
}
