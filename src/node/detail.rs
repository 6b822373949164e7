//! Per-column cell values for the detail view.

use clap::ValueEnum;
use time::OffsetDateTime;
use tracing::debug;

use super::owner::{Owner, Owners};
use super::{Node, NodeType, Stat};
use crate::config::Config;
use crate::options::{Options, Units};

/// A metadata column. `none`, `std` and `all` are shorthands expanded by
/// [`DetailField::clean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DetailField {
    Dev,
    #[value(alias = "ino")]
    Inode,
    #[value(alias = "nlink")]
    Links,
    #[value(alias = "typ")]
    Type,
    #[value(alias = "perm")]
    Perms,
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
    Git,

    None,
    Std,
    All,
}

const STD_FIELDS: &[DetailField] = &[
    DetailField::Links,
    DetailField::Type,
    DetailField::Perms,
    DetailField::User,
    DetailField::Group,
    DetailField::Size,
    DetailField::Mtime,
];

/// One detail value with its optional style tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub style: Option<String>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    fn owner(owner: &Owner, text: String, config: &Config) -> Self {
        Self {
            text,
            style: owner.style(&config.constants).map(str::to_string),
        }
    }
}

impl DetailField {
    /// Expand shorthands and drop repeats, keeping first occurrences. `none`
    /// clears everything requested before it.
    pub fn clean(input: &[Self]) -> Vec<Self> {
        let mut cleaned: Vec<Self> = Vec::new();
        for field in input {
            match field {
                DetailField::None => cleaned.clear(),
                DetailField::Std => cleaned.extend_from_slice(STD_FIELDS),
                DetailField::All => {
                    cleaned.clear();
                    cleaned.extend(
                        Self::value_variants()
                            .iter()
                            .copied()
                            .filter(|f| !f.is_shorthand()),
                    );
                }
                other => cleaned.push(*other),
            }
        }
        let mut seen = Vec::with_capacity(cleaned.len());
        cleaned.retain(|f| {
            if seen.contains(f) {
                false
            } else {
                seen.push(*f);
                true
            }
        });
        cleaned
    }

    pub fn is_shorthand(self) -> bool {
        matches!(self, DetailField::None | DetailField::Std | DetailField::All)
    }

    /// Numeric columns are right-aligned by the renderer.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DetailField::Dev
                | DetailField::Inode
                | DetailField::Links
                | DetailField::Uid
                | DetailField::Gid
                | DetailField::Size
        )
    }

    pub fn header(self) -> &'static str {
        match self {
            DetailField::Dev => "dev",
            DetailField::Inode => "inode",
            DetailField::Links => "links",
            DetailField::Type => "T",
            DetailField::Perms => "perms",
            DetailField::Oct => "oct",
            DetailField::User => "user",
            DetailField::Uid => "uid",
            DetailField::Group => "group",
            DetailField::Gid => "gid",
            DetailField::Size => "size",
            DetailField::Btime => "created",
            DetailField::Ctime => "changed",
            DetailField::Mtime => "modified",
            DetailField::Atime => "accessed",
            DetailField::Git => "git",
            DetailField::None | DetailField::Std | DetailField::All => "",
        }
    }

    /// Value shown in this column for `node`. Unavailable values render as `-`.
    /// Owner columns carry the style for the current or another owner.
    pub fn cell(self, node: &Node, config: &Config, options: &Options, owners: &Owners) -> Cell {
        if self == DetailField::Type {
            return Cell::plain(
                node.node_type
                    .constant(&config.constants, "char")
                    .map(str::to_string)
                    .unwrap_or_else(|| node.node_type.default_char().to_string()),
            );
        }
        if self == DetailField::Git {
            return Cell::plain(
                node.presentation
                    .git
                    .clone()
                    .unwrap_or_else(|| "--".to_string()),
            );
        }

        let Some(stat) = &node.stat else {
            return Cell::plain("-");
        };
        match self {
            DetailField::User => {
                let user = owners.user(stat.uid);
                Cell::owner(&user, user.label(), config)
            }
            DetailField::Uid => {
                let user = owners.user(stat.uid);
                Cell::owner(&user, user.id.to_string(), config)
            }
            DetailField::Group => {
                let group = owners.group(stat.gid);
                Cell::owner(&group, group.label(), config)
            }
            DetailField::Gid => {
                let group = owners.group(stat.gid);
                Cell::owner(&group, group.id.to_string(), config)
            }
            other => Cell::plain(stat_text(other, node, stat, options)),
        }
    }
}

fn stat_text(field: DetailField, node: &Node, stat: &Stat, options: &Options) -> String {
    match field {
        DetailField::Dev => stat.dev.to_string(),
        DetailField::Inode => stat.inode.to_string(),
        DetailField::Links => stat.links.to_string(),
        DetailField::Perms => symbolic_perms(stat.mode),
        DetailField::Oct => format!("{:04o}", stat.mode & 0o7777),
        DetailField::Size if node.node_type == NodeType::File => {
            format_size(stat.size, options.units)
        }
        DetailField::Size => "-".to_string(),
        DetailField::Btime => format_time(stat.btime, options),
        DetailField::Ctime => format_time(stat.ctime, options),
        DetailField::Mtime => format_time(stat.mtime, options),
        DetailField::Atime => format_time(stat.atime, options),
        _ => String::new(),
    }
}

/// `rwxr-xr-x` style permissions, with `s`/`S` for setuid and setgid and `t`/`T`
/// for the sticky bit.
pub fn symbolic_perms(mode: u32) -> String {
    const SPECIAL: [(u32, char); 3] = [(0o4000, 's'), (0o2000, 's'), (0o1000, 't')];

    let mut out = String::with_capacity(9);
    for (triplet, (special_bit, special_ch)) in SPECIAL.iter().enumerate() {
        let bits = (mode >> (6 - 3 * triplet as u32)) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        let exec = bits & 0o1 != 0;
        out.push(match (mode & special_bit != 0, exec) {
            (true, true) => *special_ch,
            (true, false) => special_ch.to_ascii_uppercase(),
            (false, true) => 'x',
            (false, false) => '-',
        });
    }
    out
}

const BINARY_PREFIXES: &[&str] = &["Ki", "Mi", "Gi", "Ti", "Pi", "Ei"];
const DECIMAL_PREFIXES: &[&str] = &["k", "M", "G", "T", "P", "E"];

pub fn format_size(size: u64, units: Units) -> String {
    let (base, prefixes) = match units {
        Units::None => return format!("{size} B"),
        Units::Binary => (1024.0, BINARY_PREFIXES),
        Units::Decimal => (1000.0, DECIMAL_PREFIXES),
    };

    let mut magnitude = size as f64;
    if magnitude < base {
        return format!("{size} B");
    }
    let mut prefix = prefixes[0];
    for &candidate in prefixes {
        magnitude /= base;
        prefix = candidate;
        if magnitude < base {
            break;
        }
    }
    format!("{magnitude:.1} {prefix}B")
}

fn format_time(at: Option<OffsetDateTime>, options: &Options) -> String {
    let Some(at) = at else {
        return "-".to_string();
    };
    at.format(&options.time_format).unwrap_or_else(|err| {
        debug!(error = %err, "could not format timestamp");
        "-".to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    #[rstest]
    #[case(0o644, "rw-r--r--")]
    #[case(0o755, "rwxr-xr-x")]
    #[case(0o4755, "rwsr-xr-x")]
    #[case(0o4644, "rwSr--r--")]
    #[case(0o2750, "rwxr-s---")]
    #[case(0o1777, "rwxrwxrwt")]
    #[case(0o1776, "rwxrwxrwT")]
    #[case(0o100600, "rw-------")]
    fn perms(#[case] mode: u32, #[case] expected: &str) {
        assert_eq!(symbolic_perms(mode), expected);
    }

    #[rstest]
    #[case(617, Units::None, "617 B")]
    #[case(1_522_756, Units::None, "1522756 B")]
    #[case(512, Units::Binary, "512 B")]
    #[case(1024, Units::Binary, "1.0 KiB")]
    #[case(1536, Units::Binary, "1.5 KiB")]
    #[case(1024 * 1024 * 3, Units::Binary, "3.0 MiB")]
    #[case(999, Units::Decimal, "999 B")]
    #[case(1000, Units::Decimal, "1.0 kB")]
    #[case(2_500_000_000, Units::Decimal, "2.5 GB")]
    fn sizes(#[case] size: u64, #[case] units: Units, #[case] expected: &str) {
        assert_eq!(format_size(size, units), expected);
    }

    fn text(field: DetailField, node: &Node) -> String {
        let config = Config::built_in().unwrap();
        field
            .cell(node, &config, &Options::default(), &Owners::new())
            .text
    }

    #[test]
    fn clean_expands_and_dedups() {
        use DetailField::*;
        assert_eq!(DetailField::clean(&[Mtime, None, Group]), vec![Group]);
        assert_eq!(DetailField::clean(&[User, Group, User]), vec![User, Group]);
        assert_eq!(
            DetailField::clean(&[Std]),
            vec![Links, Type, Perms, User, Group, Size, Mtime]
        );
        let all = DetailField::clean(&[All]);
        assert_eq!(all.len(), 16);
        assert!(!all.iter().any(|f| f.is_shorthand()));
    }

    #[test]
    fn parses_aliases() {
        assert_eq!(DetailField::from_str("ino", true), Ok(DetailField::Inode));
        assert_eq!(DetailField::from_str("PERMS", true), Ok(DetailField::Perms));
        assert_eq!(DetailField::from_str("uid", true), Ok(DetailField::Uid));
        assert_eq!(DetailField::from_str("user", true), Ok(DetailField::User));
        assert!(DetailField::from_str("bogus", true).is_err());
    }

    #[test]
    fn cells_for_file_and_dir() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("f.txt");
        fs::write(&file, vec![0u8; 2048]).unwrap();

        let node = Node::new(&file);
        assert_eq!(text(DetailField::Type, &node), "f");
        assert_eq!(text(DetailField::Size, &node), "2.0 KiB");
        assert_eq!(text(DetailField::Git, &node), "--");
        let mtime = text(DetailField::Mtime, &node);
        assert_eq!(mtime.len(), "2024-01-01 00:00".len(), "{mtime}");

        let dir = Node::new(tmp.path());
        assert_eq!(text(DetailField::Size, &dir), "-");
        assert_eq!(text(DetailField::Type, &dir), "d");
    }

    #[cfg(unix)]
    #[test]
    fn owner_columns_show_names_and_ids() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("mine.txt");
        fs::write(&file, "").unwrap();
        let node = Node::new(&file);
        let stat = node.stat.clone().unwrap();

        let config = Config::built_in().unwrap();
        let owners = Owners::new();
        let user = DetailField::User.cell(&node, &config, &Options::default(), &owners);
        assert_eq!(user.text, owners.user(stat.uid).label());
        assert_eq!(user.style.as_deref(), Some("blue bold"));

        assert_eq!(text(DetailField::Uid, &node), stat.uid.to_string());
        assert_eq!(text(DetailField::Gid, &node), stat.gid.to_string());
        assert_eq!(text(DetailField::Dev, &node), stat.dev.to_string());
        assert!(DetailField::Uid.is_numeric());
        assert!(!DetailField::User.is_numeric());
    }

    #[test]
    fn missing_node_has_placeholder_cells() {
        let tmp = TempDir::new().unwrap();
        let node = Node::new(tmp.path().join("gone"));
        assert_eq!(text(DetailField::Inode, &node), "-");
        assert_eq!(text(DetailField::Perms, &node), "-");
        assert_eq!(text(DetailField::User, &node), "-");
        assert_eq!(text(DetailField::Type, &node), "?");
    }
}
