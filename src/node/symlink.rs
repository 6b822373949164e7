//! One-hop symlink resolution with loop and broken-link detection.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::Node;

/// Upper bound on links followed while looking for a cycle, matching the usual
/// kernel limit.
pub const MAX_HOPS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymlinkState {
    Ok,
    Broken,
    Loop,
}

impl SymlinkState {
    pub fn key(self) -> &'static str {
        match self {
            SymlinkState::Ok => "ok",
            SymlinkState::Broken => "broken",
            SymlinkState::Loop => "loop",
        }
    }
}

/// What a link points to after one hop.
#[derive(Debug, Clone)]
pub enum Dest {
    /// The target exists. It is classified on its own and may be a link itself.
    Node(Box<Node>),
    /// The raw link text, for targets that cannot be reached.
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct SymlinkHop {
    pub state: SymlinkState,
    pub dest: Dest,
}

impl SymlinkHop {
    pub fn dest_node(&self) -> Option<&Node> {
        match &self.dest {
            Dest::Node(node) => Some(node),
            Dest::Raw(_) => None,
        }
    }
}

/// Resolve the link at `link` by one hop.
pub fn resolve(link: &Path) -> SymlinkHop {
    let raw = match fs::read_link(link) {
        Ok(target) => target,
        Err(err) => {
            debug!(path = %link.display(), error = %err, "unreadable link");
            return SymlinkHop {
                state: SymlinkState::Broken,
                dest: Dest::Raw("?".to_string()),
            };
        }
    };
    let raw_text = raw.to_string_lossy().to_string();

    if is_cyclic(link) {
        debug!(path = %link.display(), target = %raw_text, "symlink loop");
        return SymlinkHop {
            state: SymlinkState::Loop,
            dest: Dest::Raw(raw_text),
        };
    }

    let target = hop_target(link, &raw);
    if fs::symlink_metadata(&target).is_err() {
        debug!(path = %link.display(), target = %raw_text, "broken symlink");
        return SymlinkHop {
            state: SymlinkState::Broken,
            dest: Dest::Raw(raw_text),
        };
    }

    SymlinkHop {
        state: SymlinkState::Ok,
        dest: Dest::Node(Box::new(Node::named(raw_text, target))),
    }
}

/// Follow the whole chain starting at `link` and report whether it revisits a
/// link or exceeds [`MAX_HOPS`].
pub fn is_cyclic(link: &Path) -> bool {
    let mut current = normalize(link);
    let mut seen = HashSet::new();
    seen.insert(current.clone());

    for _ in 0..MAX_HOPS {
        let Ok(raw) = fs::read_link(&current) else {
            return false;
        };
        let next = hop_target(&current, &raw);
        if !seen.insert(next.clone()) {
            return true;
        }
        match fs::symlink_metadata(&next) {
            Ok(meta) if meta.file_type().is_symlink() => current = next,
            _ => return false,
        }
    }
    true
}

/// Absolute location a link's raw text points at, relative targets being taken
/// from the link's own directory.
fn hop_target(link: &Path, raw: &Path) -> PathBuf {
    let joined = match link.parent() {
        Some(parent) if raw.is_relative() => parent.join(raw),
        _ => raw.to_path_buf(),
    };
    normalize(&joined)
}

/// Lexically remove `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
