//! Sort keys and the composite, stable multi-field sort.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use time::OffsetDateTime;

use crate::node::spec::extension_of;
use crate::node::{Node, NodeId, NodeType, Owners};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SortField {
    Name,
    Ext,
    /// Directories before everything else.
    Cat,
    #[value(alias = "typ")]
    Type,
    Dev,
    #[value(alias = "ino")]
    Inode,
    #[value(alias = "nlink")]
    Links,
    /// Permission bits, compared as a number.
    #[value(alias = "perm")]
    Oct,
    /// Owner user name.
    User,
    Uid,
    /// Owner group name.
    Group,
    Gid,
    Size,
    Btime,
    Ctime,
    Mtime,
    Atime,
}

/// A comparable key value. Values of one field always share a variant, except
/// [`SortValue::Missing`], which sorts first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Missing,
    Int(u64),
    Text(String),
    Time(OffsetDateTime),
}

/// One requested sort field. Written as `size` or `size-` for descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, descending) = match s.strip_suffix('-') {
            Some(name) => (name, true),
            None => (s, false),
        };
        let field = SortField::from_str(name, true)
            .map_err(|_| format!("unknown sort field `{name}`"))?;
        Ok(Self { field, descending })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .field
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default();
        write!(f, "{name}{}", if self.descending { "-" } else { "" })
    }
}

pub type SortKeys = HashMap<SortField, SortValue>;

/// Every key available for `node`. Metadata keys are only present when the node
/// has metadata.
pub fn sort_keys(node: &Node, owners: &Owners) -> SortKeys {
    let mut keys = SortKeys::new();
    let name = node.name.to_lowercase();
    keys.insert(
        SortField::Name,
        SortValue::Text(name.strip_prefix('.').unwrap_or(&name).to_string()),
    );
    keys.insert(
        SortField::Ext,
        SortValue::Text(extension_of(&node.name).to_lowercase()),
    );
    keys.insert(
        SortField::Cat,
        SortValue::Int(u64::from(node.node_type != NodeType::Dir)),
    );
    keys.insert(
        SortField::Type,
        SortValue::Text(node.node_type.default_char().to_string()),
    );

    if let Some(stat) = &node.stat {
        keys.insert(SortField::Dev, SortValue::Int(stat.dev));
        keys.insert(SortField::Inode, SortValue::Int(stat.inode));
        keys.insert(SortField::Links, SortValue::Int(stat.links));
        keys.insert(SortField::Oct, SortValue::Int(u64::from(stat.mode & 0o7777)));
        keys.insert(SortField::Uid, SortValue::Int(u64::from(stat.uid)));
        keys.insert(SortField::Gid, SortValue::Int(u64::from(stat.gid)));
        keys.insert(SortField::User, SortValue::Text(owners.user(stat.uid).label()));
        keys.insert(SortField::Group, SortValue::Text(owners.group(stat.gid).label()));
        keys.insert(SortField::Size, SortValue::Int(stat.size));
        let times = [
            (SortField::Btime, stat.btime),
            (SortField::Ctime, stat.ctime),
            (SortField::Mtime, stat.mtime),
            (SortField::Atime, stat.atime),
        ];
        for (field, at) in times {
            if let Some(at) = at {
                keys.insert(field, SortValue::Time(at));
            }
        }
    }
    keys
}

/// Reorder `ids` by `fields`, the first field dominant. Passes run from the last
/// field to the first with a stable sort. With `dirs_first`, a final pass puts
/// directories ahead of all other nodes.
pub fn sort_ids(
    ids: &mut [NodeId],
    nodes: &[Node],
    fields: &[SortKey],
    dirs_first: bool,
    owners: &Owners,
) {
    let mut entries: Vec<(NodeId, SortKeys)> = ids
        .iter()
        .map(|&id| (id, sort_keys(&nodes[id], owners)))
        .collect();

    let missing = SortValue::Missing;
    let value = |keys: &SortKeys, field: SortField| keys.get(&field).unwrap_or(&missing).clone();

    for key in fields.iter().rev() {
        entries.sort_by(|(_, a), (_, b)| {
            let ordering = value(a, key.field).cmp(&value(b, key.field));
            if key.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
    if dirs_first {
        entries.sort_by_key(|(_, keys)| value(keys, SortField::Cat));
    }

    for (slot, (id, _)) in ids.iter_mut().zip(entries) {
        *slot = id;
    }
}
