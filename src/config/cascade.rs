//! Discovery of the `.pls.yml` files that apply to a target, and the merge rules
//! used to layer them.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use super::source::CONFIG_FILE_NAME;

/// Environment variable overriding [`CascadePolicy::DEFAULT_MAX_HEIGHT`].
pub const MAX_HEIGHT_ENV: &str = "PLS_MAX_HEIGHT";

/// Where to look for configuration files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadePolicy {
    /// Ancestors walked when the target is not inside a repository.
    pub max_height: usize,
    /// Root of the enclosing repository, if any. Ancestors are walked up to and
    /// including it, with no height limit.
    pub repo_root: Option<PathBuf>,
    /// User-level configuration directory, e.g. `~/.config/pls`.
    pub user_config_dir: Option<PathBuf>,
    pub home_dir: Option<PathBuf>,
}

impl CascadePolicy {
    pub const DEFAULT_MAX_HEIGHT: usize = 8;

    /// Policy that only considers the target and its ancestors.
    pub fn new(max_height: usize, repo_root: Option<PathBuf>) -> Self {
        Self {
            max_height,
            repo_root,
            user_config_dir: None,
            home_dir: None,
        }
    }

    /// Policy for the current user, honouring `PLS_MAX_HEIGHT`.
    pub fn from_env(repo_root: Option<PathBuf>) -> Self {
        let max_height = match std::env::var(MAX_HEIGHT_ENV) {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "ignoring invalid {MAX_HEIGHT_ENV}");
                Self::DEFAULT_MAX_HEIGHT
            }),
            Err(_) => Self::DEFAULT_MAX_HEIGHT,
        };
        Self {
            max_height,
            repo_root,
            user_config_dir: dirs::config_dir().map(|dir| dir.join("pls")),
            home_dir: dirs::home_dir(),
        }
    }
}

/// Configuration files applicable to `target`, nearest first.
///
/// `target` may be a directory or a file; for a file, or a symlink of any kind,
/// the search starts in the directory containing it.
pub fn discover(target: &Path, policy: &CascadePolicy) -> Vec<PathBuf> {
    let target_is_dir = std::fs::symlink_metadata(target).is_ok_and(|meta| meta.is_dir());
    let start = if target_is_dir {
        target
    } else {
        target.parent().unwrap_or(target)
    };

    let mut found = Vec::new();
    push_if_file(&mut found, start);

    let within_repo = policy
        .repo_root
        .as_deref()
        .filter(|root| start.starts_with(root));
    for (height, dir) in start.ancestors().skip(1).enumerate() {
        match within_repo {
            Some(root) if !dir.starts_with(root) => break,
            None if height >= policy.max_height => break,
            _ => {}
        }
        push_if_file(&mut found, dir);
    }

    for dir in [&policy.user_config_dir, &policy.home_dir]
        .into_iter()
        .flatten()
    {
        push_if_file(&mut found, dir);
    }

    debug!(target = %target.display(), files = found.len(), "discovered config files");
    found
}

fn push_if_file(found: &mut Vec<PathBuf>, dir: &Path) {
    let candidate = dir.join(CONFIG_FILE_NAME);
    if candidate.is_file() && !found.contains(&candidate) {
        found.push(candidate);
    }
}

/// Overlay `over` onto `base`: scalar keys are replaced, nested maps merge with
/// the same rule.
pub fn deep_merge(base: &mut Mapping, over: &Mapping) {
    for (key, value) in over {
        match (base.get_mut(key), value) {
            (Some(Value::Mapping(inner)), Value::Mapping(incoming)) => deep_merge(inner, incoming),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
