//! Loading and parsing of individual `.pls.yml` files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, trace};

use crate::error::{ConfigError, BUILT_IN};

/// The file name looked for in every directory of a cascade.
pub const CONFIG_FILE_NAME: &str = ".pls.yml";

const BUILT_IN_YAML: &str = include_str!("defaults.yml");

/// Parsed contents of one configuration file. Every section is optional.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    /// Raw spec entries, expanded later by the spec catalog.
    pub node_specs: Vec<Mapping>,
    pub nerd_icons: HashMap<String, String>,
    pub emoji_icons: HashMap<String, String>,
    /// Nested map of named constants (type glyphs, colors, tree shapes, ...).
    pub constants: Mapping,
    /// Flat map of option name to value.
    pub prefs: Mapping,
}

impl ConfigDocument {
    /// Parse YAML text. `origin` is only used to label errors.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let malformed = |source| ConfigError::Malformed {
            path: origin.to_path_buf(),
            source,
        };
        let value: Value = serde_yaml::from_str(text).map_err(malformed)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(malformed)
    }

    /// The configuration compiled into the binary.
    pub fn built_in() -> Result<Self, ConfigError> {
        Self::parse(BUILT_IN_YAML, Path::new(BUILT_IN))
    }
}

/// Reads config files, parsing each absolute path at most once per process.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    cache: HashMap<PathBuf, Rc<ConfigDocument>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<Rc<ConfigDocument>, ConfigError> {
        let key = absolute(path);
        if let Some(doc) = self.cache.get(&key) {
            trace!(path = %key.display(), "config cache hit");
            return Ok(Rc::clone(doc));
        }

        let text = fs::read_to_string(&key).map_err(|source| ConfigError::Unreadable {
            path: key.clone(),
            source,
        })?;
        let doc = Rc::new(ConfigDocument::parse(&text, &key)?);
        debug!(
            path = %key.display(),
            specs = doc.node_specs.len(),
            "loaded config"
        );
        self.cache.insert(key, Rc::clone(&doc));
        Ok(doc)
    }

    /// Number of distinct files parsed so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_is_empty_document() {
        let doc = ConfigDocument::parse("# only a comment\n", Path::new("x")).unwrap();
        assert_eq!(doc, ConfigDocument::default());
    }

    #[test]
    fn parses_all_sections() {
        let text = r#"
node_specs:
  - name: README.md
    importance: 2
nerd_icons:
  book: "B"
emoji_icons:
  book: "📖"
constants:
  tree:
    tee: "+- "
prefs:
  all: 1
"#;
        let doc = ConfigDocument::parse(text, Path::new("x")).unwrap();
        assert_eq!(doc.node_specs.len(), 1);
        assert_eq!(doc.nerd_icons.get("book").map(String::as_str), Some("B"));
        assert_eq!(doc.emoji_icons.len(), 1);
        assert!(doc.constants.contains_key("tree"));
        assert!(doc.prefs.contains_key("all"));
    }

    #[test]
    fn wrong_section_type_names_file() {
        let err = ConfigDocument::parse("nerd_icons: [a, b]\n", Path::new("/p/.pls.yml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
        assert!(err.to_string().starts_with("/p/.pls.yml"));
    }

    #[test]
    fn invalid_yaml_is_malformed() {
        let err = ConfigDocument::parse("prefs: {all: [", Path::new("f")).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn built_in_parses() {
        let doc = ConfigDocument::built_in().unwrap();
        assert!(!doc.node_specs.is_empty());
        assert!(!doc.nerd_icons.is_empty());
        assert!(doc.constants.contains_key("types"));
    }

    #[test]
    fn loader_memoizes_by_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "prefs:\n  all: 1\n").unwrap();

        let mut loader = ConfigLoader::new();
        let first = loader.load(&path).unwrap();
        // A later edit is not observed: the parse is cached for the process.
        fs::write(&path, "prefs:\n  all: 2\n").unwrap();
        let second = loader.load(&path).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(loader.cached(), 1);
    }

    #[test]
    fn missing_file_is_unreadable() {
        let tmp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::new();
        let err = loader.load(&tmp.path().join("nope.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}
