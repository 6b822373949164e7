//! Node type detection from metadata that does not follow the final symlink.

use std::fs::{self, FileType, Metadata};
use std::io;
use std::path::Path;

use time::OffsetDateTime;
use tracing::warn;

use super::{NodeType, Stat};

/// Result of querying one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub node_type: NodeType,
    pub exists: bool,
    pub stat: Option<Stat>,
    /// Why metadata could not be read, when the path exists but is unreadable.
    pub error: Option<String>,
}

type Predicate = fn(&FileType) -> bool;

/// Checked in order. Symlinks come first since `symlink_metadata` reports the
/// link itself, not what it points to.
const TYPE_PREDICATES: &[(NodeType, Predicate)] = &[
    (NodeType::Symlink, FileType::is_symlink),
    (NodeType::Dir, FileType::is_dir),
    (NodeType::Fifo, is_fifo),
    (NodeType::Socket, is_socket),
    (NodeType::CharDevice, is_char_device),
    (NodeType::BlockDevice, is_block_device),
    (NodeType::File, FileType::is_file),
];

pub fn classify(path: &Path) -> Classification {
    match fs::symlink_metadata(path) {
        Ok(meta) => Classification {
            node_type: type_of(&meta.file_type()),
            exists: true,
            stat: Some(Stat::from_metadata(&meta)),
            error: None,
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => Classification {
            node_type: NodeType::Unknown,
            exists: false,
            stat: None,
            error: None,
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "could not read metadata");
            Classification {
                node_type: NodeType::Unknown,
                exists: false,
                stat: None,
                error: Some(err.to_string()),
            }
        }
    }
}

pub fn type_of(ft: &FileType) -> NodeType {
    TYPE_PREDICATES
        .iter()
        .find(|(_, matches)| matches(ft))
        .map_or(NodeType::Unknown, |(node_type, _)| *node_type)
}

#[cfg(unix)]
mod special {
    use std::fs::FileType;
    use std::os::unix::fs::FileTypeExt;

    pub fn is_fifo(ft: &FileType) -> bool {
        ft.is_fifo()
    }
    pub fn is_socket(ft: &FileType) -> bool {
        ft.is_socket()
    }
    pub fn is_char_device(ft: &FileType) -> bool {
        ft.is_char_device()
    }
    pub fn is_block_device(ft: &FileType) -> bool {
        ft.is_block_device()
    }
}

#[cfg(not(unix))]
mod special {
    use std::fs::FileType;

    pub fn is_fifo(_: &FileType) -> bool {
        false
    }
    pub fn is_socket(_: &FileType) -> bool {
        false
    }
    pub fn is_char_device(_: &FileType) -> bool {
        false
    }
    pub fn is_block_device(_: &FileType) -> bool {
        false
    }
}

use special::{is_block_device, is_char_device, is_fifo, is_socket};

impl Stat {
    #[cfg(unix)]
    pub fn from_metadata(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        let at = |secs: i64, nanos: i64| {
            OffsetDateTime::from_unix_timestamp(secs)
                .ok()
                .map(|t| t + time::Duration::nanoseconds(nanos))
        };
        Stat {
            dev: meta.dev(),
            inode: meta.ino(),
            links: meta.nlink(),
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
            size: meta.size(),
            btime: meta.created().ok().map(OffsetDateTime::from),
            ctime: at(meta.ctime(), meta.ctime_nsec()),
            mtime: at(meta.mtime(), meta.mtime_nsec()),
            atime: at(meta.atime(), meta.atime_nsec()),
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(meta: &Metadata) -> Self {
        Stat {
            dev: 0,
            inode: 0,
            links: 1,
            mode: if meta.permissions().readonly() { 0o444 } else { 0o644 },
            uid: 0,
            gid: 0,
            size: meta.len(),
            btime: meta.created().ok().map(OffsetDateTime::from),
            ctime: None,
            mtime: meta.modified().ok().map(OffsetDateTime::from),
            atime: meta.accessed().ok().map(OffsetDateTime::from),
        }
    }
}
