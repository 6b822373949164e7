//! Version-control status of the listed paths.
//!
//! Git is run as a subprocess. Any failure to run it, including the path not
//! being inside a repository, leaves the status map empty.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, trace};

/// Runs `git` with arguments in a working directory and returns its stdout.
pub trait GitRunner {
    fn run(&self, cwd: &Path, args: &[&str]) -> io::Result<Vec<u8>>;
}

/// The `git` executable on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitRunner for GitCli {
    fn run(&self, cwd: &Path, args: &[&str]) -> io::Result<Vec<u8>> {
        let output = Command::new("git").args(args).current_dir(cwd).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(io::Error::other(stderr.trim().to_string()));
        }
        Ok(output.stdout)
    }
}

/// Tracked files plus untracked ones, expanded to individual files.
const TRACKED_QUERY: &[&str] = &["status", "--porcelain", "-z", "--untracked-files=all"];
/// Ignored paths, with untracked directories reported as single entries.
const IGNORED_QUERY: &[&str] = &[
    "status",
    "--porcelain",
    "-z",
    "--untracked-files=normal",
    "--ignored=matching",
];

/// Root of the repository containing `dir`, if any.
pub fn repo_root(runner: &dyn GitRunner, dir: &Path) -> Option<PathBuf> {
    match runner.run(dir, &["rev-parse", "--show-toplevel"]) {
        Ok(stdout) => {
            let text = String::from_utf8_lossy(&stdout);
            let root = text.trim_end_matches(['\n', '\r']);
            (!root.is_empty()).then(|| PathBuf::from(root))
        }
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "not in a git repository");
            None
        }
    }
}

/// Two-character status codes keyed by path relative to the repository root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsStatusMap {
    root: Option<PathBuf>,
    statuses: HashMap<PathBuf, String>,
}

impl VcsStatusMap {
    /// Query the repository at `root`. The tracked query runs first and its
    /// entries take precedence.
    pub fn build(runner: &dyn GitRunner, root: &Path) -> Self {
        let mut map = Self {
            root: Some(root.to_path_buf()),
            statuses: HashMap::new(),
        };
        for query in [TRACKED_QUERY, IGNORED_QUERY] {
            match runner.run(root, query) {
                Ok(stdout) => map.parse_into(&old_name_first(&stdout)),
                Err(err) => {
                    debug!(root = %root.display(), error = %err, "git status failed");
                    return Self::default();
                }
            }
        }
        debug!(root = %root.display(), entries = map.len(), "loaded git status");
        map
    }

    /// Locate the repository for `dir` and build its map, or return an empty one.
    pub fn discover(runner: &dyn GitRunner, dir: &Path) -> Self {
        match repo_root(runner, dir) {
            Some(root) => Self::build(runner, &root),
            None => Self::default(),
        }
    }

    /// Add entries from NUL-delimited status entries. A rename or copy is an
    /// entry holding the code and old name followed by a token with the new
    /// name, and is keyed by the new name only. Paths already present keep
    /// their first status.
    pub fn parse_into(&mut self, output: &[u8]) {
        let mut tokens = output
            .split(|b| *b == 0)
            .filter(|token| !token.is_empty())
            .map(String::from_utf8_lossy);

        while let Some(token) = tokens.next() {
            let Some((code, path)) = split_entry(&token) else {
                trace!(entry = %token, "skipping malformed status entry");
                continue;
            };
            let key = if code.contains(['R', 'C']) {
                match tokens.next() {
                    Some(renamed) => renamed.to_string(),
                    None => path.to_string(),
                }
            } else {
                path.to_string()
            };
            self.statuses
                .entry(PathBuf::from(key))
                .or_insert_with(|| code.to_string());
        }
    }

    /// Status of a path relative to the repository root.
    pub fn get(&self, relative: &Path) -> Option<&str> {
        self.statuses.get(relative).map(String::as_str)
    }

    /// Status of an absolute path, if it lies inside the repository.
    pub fn status_for(&self, path: &Path) -> Option<&str> {
        let root = self.root.as_deref()?;
        self.get(path.strip_prefix(root).ok()?)
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// `git status -z` writes a rename or copy as `XY new\0old\0`. Rewrite such
/// pairs as `XY old\0new\0`, the order [`VcsStatusMap::parse_into`] reads.
fn old_name_first(output: &[u8]) -> Vec<u8> {
    let mut tokens = output.split(|b| *b == 0).filter(|token| !token.is_empty());
    let mut out = Vec::with_capacity(output.len());
    while let Some(token) = tokens.next() {
        let is_pair = token.len() > 3 && token[..2].iter().any(|b| matches!(b, b'R' | b'C'));
        let old = if is_pair { tokens.next() } else { None };
        match old {
            Some(old) => {
                out.extend_from_slice(&token[..3]);
                out.extend_from_slice(old);
                out.push(0);
                out.extend_from_slice(&token[3..]);
            }
            None => out.extend_from_slice(token),
        }
        out.push(0);
    }
    out
}

/// Split `XY path` into its code and path.
fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let code = entry.get(..2)?;
    let path = entry.get(3..)?;
    (!path.is_empty()).then_some((code, path))
}
