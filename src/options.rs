//! The runtime option set: command-line flags over cascade preferences over
//! built-in defaults.

use clap::ValueEnum;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use time::format_description::{self, BorrowedFormatItem, OwnedFormatItem};
use time::macros::format_description;
use tracing::debug;

use crate::cli::Args;
use crate::error::ConfigError;
use crate::node::DetailField;
use crate::tree::sort::{SortField, SortKey};

/// Timestamp format used when neither `--time-fmt` nor the `time_fmt` pref is set.
pub const DEFAULT_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Preference keys understood in a `prefs:` section.
const KNOWN_PREFS: &[&str] = &[
    "all",
    "details",
    "sort",
    "dirs_first",
    "dirs",
    "files",
    "icon",
    "units",
    "time_fmt",
    "collapse",
    "tree",
    "depth",
    "exclude",
    "only",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IconStyle {
    #[default]
    Nerd,
    Emoji,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Units {
    /// Powers of 1024.
    #[default]
    Binary,
    /// Powers of 1000.
    Decimal,
    /// Plain byte counts.
    None,
}

#[derive(Debug, Clone)]
pub struct Options {
    /// How much of the hidden importance range to reveal.
    pub all: u8,
    pub details: Vec<DetailField>,
    pub sort: Vec<SortKey>,
    pub dirs_first: bool,
    pub dirs: bool,
    pub files: bool,
    pub icon: IconStyle,
    pub units: Units,
    pub time_format: OwnedFormatItem,
    /// 0 lists everything flat, 1 nests subs under their main node, 2 hides subs.
    pub collapse: u8,
    pub tree: bool,
    pub depth: Option<usize>,
    pub exclude: Option<Regex>,
    pub only: Option<Regex>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            all: 0,
            details: Vec::new(),
            sort: vec![SortKey::asc(SortField::Name)],
            dirs_first: true,
            dirs: true,
            files: true,
            icon: IconStyle::Nerd,
            units: Units::Binary,
            time_format: OwnedFormatItem::from(DEFAULT_TIME_FORMAT),
            collapse: 1,
            tree: false,
            depth: None,
            exclude: None,
            only: None,
        }
    }
}

impl Options {
    /// Combine parsed arguments with merged preferences. Arguments always win.
    pub fn resolve(args: &Args, prefs: &Mapping) -> Result<Self, ConfigError> {
        for key in prefs.keys() {
            let known = key.as_str().is_some_and(|k| KNOWN_PREFS.contains(&k));
            if !known {
                debug!(key = ?key, "ignoring unknown preference");
            }
        }
        let defaults = Options::default();

        let all = match args.all {
            0 => match pref_int(prefs, "all")? {
                Some(n) => {
                    u8::try_from(n).map_err(|_| ConfigError::pref("all", "must be 0 to 255"))?
                }
                None => defaults.all,
            },
            n => n,
        };

        let details = if !args.details.is_empty() {
            DetailField::clean(&args.details)
        } else {
            let requested = pref_list(prefs, "details")?
                .iter()
                .map(|name| {
                    DetailField::from_str(name, true).map_err(|_| {
                        ConfigError::pref("details", format!("unknown detail field `{name}`"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            DetailField::clean(&requested)
        };

        let sort = if !args.sort.is_empty() {
            args.sort.clone()
        } else {
            let requested = pref_list(prefs, "sort")?;
            if requested.is_empty() {
                defaults.sort
            } else {
                requested
                    .iter()
                    .map(|s| s.parse().map_err(|e: String| ConfigError::pref("sort", e)))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let flag = |on: bool, off: bool| match (on, off) {
            (_, true) => Some(false),
            (true, false) => Some(true),
            _ => None,
        };
        let dirs_first = match flag(args.dirs_first, args.no_dirs_first) {
            Some(value) => value,
            None => pref_bool(prefs, "dirs_first")?.unwrap_or(defaults.dirs_first),
        };
        let dirs = match flag(false, args.no_dirs) {
            Some(value) => value,
            None => pref_bool(prefs, "dirs")?.unwrap_or(defaults.dirs),
        };
        let files = match flag(false, args.no_files) {
            Some(value) => value,
            None => pref_bool(prefs, "files")?.unwrap_or(defaults.files),
        };

        let icon = match args.icon {
            Some(icon) => icon,
            None => pref_enum(prefs, "icon")?.unwrap_or(defaults.icon),
        };
        let units = match args.units {
            Some(units) => units,
            None => pref_enum(prefs, "units")?.unwrap_or(defaults.units),
        };

        let time_fmt = match &args.time_fmt {
            Some(text) => Some(text.clone()),
            None => pref_str(prefs, "time_fmt")?,
        };
        let time_format = match time_fmt {
            Some(text) => format_description::parse_owned::<2>(&text)
                .map_err(|e| ConfigError::pref("time_fmt", e.to_string()))?,
            None => defaults.time_format,
        };

        let collapse = match args.collapse {
            Some(level) => level,
            None => match pref_int(prefs, "collapse")? {
                Some(level @ 0..=2) => level as u8,
                Some(_) => return Err(ConfigError::pref("collapse", "must be 0, 1 or 2")),
                None => defaults.collapse,
            },
        };

        let depth = match args.depth {
            Some(depth) => Some(depth),
            None => match pref_int(prefs, "depth")? {
                Some(n) => Some(
                    usize::try_from(n)
                        .map_err(|_| ConfigError::pref("depth", "must not be negative"))?,
                ),
                None => None,
            },
        };
        let tree = if args.tree || args.depth.is_some() {
            true
        } else {
            pref_bool(prefs, "tree")?.unwrap_or(defaults.tree)
        };

        let exclude = regex_option(args.exclude.as_deref(), prefs, "exclude")?;
        let only = regex_option(args.only.as_deref(), prefs, "only")?;

        Ok(Self {
            all,
            details,
            sort,
            dirs_first,
            dirs,
            files,
            icon,
            units,
            time_format,
            collapse,
            tree,
            depth,
            exclude,
            only,
        })
    }
}

fn pref_bool(prefs: &Mapping, key: &str) -> Result<Option<bool>, ConfigError> {
    match prefs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ConfigError::pref(key, "must be true or false")),
    }
}

fn pref_int(prefs: &Mapping, key: &str) -> Result<Option<i64>, ConfigError> {
    match prefs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| ConfigError::pref(key, "must be an integer")),
        Some(_) => Err(ConfigError::pref(key, "must be an integer")),
    }
}

fn pref_str(prefs: &Mapping, key: &str) -> Result<Option<String>, ConfigError> {
    match prefs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ConfigError::pref(key, "must be a string")),
    }
}

/// A list of strings. A single string counts as a one-item list.
fn pref_list(prefs: &Mapping, key: &str) -> Result<Vec<String>, ConfigError> {
    match prefs.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ConfigError::pref(key, "must be a list of strings"))
            })
            .collect(),
        Some(_) => Err(ConfigError::pref(key, "must be a string or a list of strings")),
    }
}

fn pref_enum<T: ValueEnum>(prefs: &Mapping, key: &str) -> Result<Option<T>, ConfigError> {
    pref_str(prefs, key)?
        .map(|s| {
            T::from_str(&s, true)
                .map_err(|_| ConfigError::pref(key, format!("invalid value `{s}`")))
        })
        .transpose()
}

fn regex_option(
    cli: Option<&str>,
    prefs: &Mapping,
    key: &str,
) -> Result<Option<Regex>, ConfigError> {
    let source = match cli {
        Some(s) => Some(s.to_string()),
        None => pref_str(prefs, key)?,
    };
    source
        .map(|s| Regex::new(&s).map_err(|e| ConfigError::pref(key, e.to_string())))
        .transpose()
}
