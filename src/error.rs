//! Errors that abort a listing.
//!
//! Only configuration problems are fatal. Unreadable entries, broken symlinks and a
//! missing `git` are reported as data on the nodes instead.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Label used in messages for the configuration embedded in the binary.
pub const BUILT_IN: &str = "<built-in>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}: failed to read config: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: not a valid config: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{}invalid node spec {entry}: {reason}", file_label(.file))]
    Spec {
        file: Option<PathBuf>,
        entry: String,
        reason: String,
    },

    #[error("invalid preference `{key}`: {reason}")]
    Pref { key: String, reason: String },
}

impl ConfigError {
    pub(crate) fn spec(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Spec {
            file: None,
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn pref(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Pref {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Attach the file a spec error came from. Other variants already name theirs.
    pub(crate) fn in_file(self, path: &Path) -> Self {
        match self {
            ConfigError::Spec {
                file: None,
                entry,
                reason,
            } => ConfigError::Spec {
                file: Some(path.to_path_buf()),
                entry,
                reason,
            },
            other => other,
        }
    }
}

fn file_label(file: &Option<PathBuf>) -> String {
    match file {
        Some(path) => format!("{}: ", path.display()),
        None => String::new(),
    }
}
