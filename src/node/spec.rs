//! Presentation rules and how a node's name is matched against them.

use std::fmt;
use std::path::Path;

use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;

/// How a spec identifies the nodes it applies to.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact node name.
    Name(String),
    /// Regular expression, matched from the first character of the name.
    Pattern(Regex),
    /// Glob matched against the node's full path.
    Glob(GlobMatcher),
    /// Text after the last `.` of the name.
    Extension(String),
}

impl Matcher {
    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{source})")).map(Matcher::Pattern)
    }

    pub fn glob(source: &str) -> Result<Self, globset::Error> {
        Glob::new(source).map(|g| Matcher::Glob(g.compile_matcher()))
    }

    pub fn is_match(&self, name: &str, path: &Path) -> bool {
        match self {
            Matcher::Name(expected) => expected == name,
            Matcher::Pattern(re) => re.is_match(name),
            Matcher::Glob(glob) => glob.is_match(path),
            Matcher::Extension(ext) => ext == extension_of(name),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Name(name) => write!(f, "{name}"),
            Matcher::Pattern(re) => write!(f, "<{}>", re.as_str()),
            Matcher::Glob(glob) => write!(f, "{}", glob.glob()),
            Matcher::Extension(ext) => write!(f, "*.{ext}"),
        }
    }
}

/// The sibling a node should be nested under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collapse {
    /// Literal name of the main node.
    Name(String),
    /// The node's own name with its extension replaced by this one.
    Extension(String),
}

impl Collapse {
    /// Name of the main node for a sub node called `name`.
    pub fn main_name(&self, name: &str) -> String {
        match self {
            Collapse::Name(main) => main.clone(),
            Collapse::Extension(ext) => {
                let own = extension_of(name);
                if own.is_empty() {
                    format!("{name}.{ext}")
                } else {
                    format!("{}{ext}", &name[..name.len() - own.len()])
                }
            }
        }
    }
}

/// A single presentation rule. Built once per configuration load, then immutable.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub matcher: Matcher,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub importance: Option<i64>,
    pub collapse: Option<Collapse>,
}

impl NodeSpec {
    pub fn new(matcher: Matcher) -> Self {
        Self {
            matcher,
            icon: None,
            color: None,
            importance: None,
            collapse: None,
        }
    }

    pub fn icon(self, icon: &str) -> Self {
        Self {
            icon: Some(icon.to_string()),
            ..self
        }
    }

    pub fn color(self, color: &str) -> Self {
        Self {
            color: Some(color.to_string()),
            ..self
        }
    }

    pub fn importance(self, importance: i64) -> Self {
        Self {
            importance: Some(importance),
            ..self
        }
    }

    pub fn collapse(self, collapse: Collapse) -> Self {
        Self {
            collapse: Some(collapse),
            ..self
        }
    }

    /// Build a spec from one already-expanded entry, i.e. one holding singular
    /// identification and collapse fields only.
    pub fn from_entry(entry: &Mapping) -> Result<Self, ConfigError> {
        let fail = |reason: String| ConfigError::spec(describe(&Value::Mapping(entry.clone())), reason);

        let matcher = if let Some(name) = scalar(entry, "name").map_err(fail)? {
            Matcher::Name(name)
        } else if let Some(pattern) = scalar(entry, "pattern").map_err(fail)? {
            Matcher::pattern(&pattern)
                .map_err(|e| fail(format!("`pattern` is not a valid regex: {e}")))?
        } else if let Some(glob) = scalar(entry, "glob").map_err(fail)? {
            Matcher::glob(&glob).map_err(|e| fail(format!("`glob` is not a valid glob: {e}")))?
        } else if let Some(ext) = scalar(entry, "extension").map_err(fail)? {
            Matcher::Extension(ext)
        } else {
            return Err(fail(
                "one of `name`, `pattern`, `glob`, `extension` is required".to_string(),
            ));
        };

        let importance = match entry.get("importance") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(
                n.as_i64()
                    .ok_or_else(|| fail("`importance` must be an integer".to_string()))?,
            ),
            Some(_) => return Err(fail("`importance` must be an integer".to_string())),
        };

        let collapse = match entry.get("collapse") {
            None | Some(Value::Null) => None,
            Some(Value::Mapping(rule)) => {
                if let Some(name) = scalar(rule, "name").map_err(fail)? {
                    Some(Collapse::Name(name))
                } else if let Some(ext) = scalar(rule, "extension").map_err(fail)? {
                    Some(Collapse::Extension(ext))
                } else {
                    return Err(fail(
                        "`collapse` needs one of `name`, `extension`".to_string(),
                    ));
                }
            }
            Some(_) => return Err(fail("`collapse` must be a mapping".to_string())),
        };

        Ok(Self {
            matcher,
            icon: scalar(entry, "icon").map_err(fail)?,
            color: scalar(entry, "color").map_err(fail)?,
            importance,
            collapse,
        })
    }

    pub fn is_match(&self, name: &str, path: &Path) -> bool {
        self.matcher.is_match(name, path)
    }
}

/// Read a scalar field as text. Lists get the plural-form hint.
fn scalar(entry: &Mapping, key: &str) -> Result<Option<String>, String> {
    match entry.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Sequence(_)) => Err(format!("`{key}` cannot be a list; use `{key}s`")),
        Some(_) => Err(format!("`{key}` must be a plain value")),
    }
}

/// Compact single-line rendering of a raw entry for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "~".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => {
            let items: Vec<String> = items.iter().map(describe).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            let pairs: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", describe(k), describe(v)))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        }
        Value::Tagged(tagged) => format!("{} {}", tagged.tag, describe(&tagged.value)),
    }
}

/// Text after the last `.` of `name`, or `""` when there is none.
pub fn extension_of(name: &str) -> &str {
    name.rfind('.').map_or("", |idx| &name[idx + 1..])
}

/// Importance of a node that no matching spec assigns one to.
pub fn default_importance(name: &str, has_specs: bool) -> i64 {
    match (name.starts_with('.'), has_specs) {
        (true, false) => -2,
        (true, true) => -1,
        (false, _) => 0,
    }
}

/// The specs matching one node, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct SpecMatches<'c> {
    specs: Vec<&'c NodeSpec>,
}

impl<'c> SpecMatches<'c> {
    pub fn new(specs: Vec<&'c NodeSpec>) -> Self {
        Self { specs }
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'c NodeSpec> + '_ {
        self.specs.iter().copied()
    }

    /// First non-null value of one attribute. Each attribute is resolved on its
    /// own, so different attributes may come from different specs.
    pub fn resolve<T, F>(&self, attr: F) -> Option<T>
    where
        F: Fn(&'c NodeSpec) -> Option<T>,
    {
        self.specs.iter().copied().find_map(attr)
    }

    pub fn icon(&self) -> Option<&'c str> {
        self.resolve(|spec| spec.icon.as_deref())
    }

    pub fn color(&self) -> Option<&'c str> {
        self.resolve(|spec| spec.color.as_deref())
    }

    pub fn importance(&self) -> Option<i64> {
        self.resolve(|spec| spec.importance)
    }

    pub fn collapse(&self) -> Option<&'c Collapse> {
        self.resolve(|spec| spec.collapse.as_ref())
    }

    /// Spec-supplied importance, or the default policy for `name`.
    pub fn importance_for(&self, name: &str) -> i64 {
        self.importance()
            .unwrap_or_else(|| default_importance(name, !self.is_empty()))
    }
}

/// Visibility threshold shared by importance filtering and collapse.
pub fn is_important_enough(importance: i64, all_level: u8) -> bool {
    importance.saturating_add(i64::from(all_level)) >= -1
}
