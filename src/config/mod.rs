//! Layered configuration, resolved once per invocation.
//!
//! A [`Config`] is built from every `.pls.yml` file that applies to the listed
//! path, nearest first, with the built-in defaults as the farthest layer.

pub mod cascade;
pub mod source;
pub mod specs;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{ConfigError, BUILT_IN};
use crate::options::IconStyle;

pub use cascade::{deep_merge, discover, CascadePolicy};
pub use source::{ConfigDocument, ConfigLoader, CONFIG_FILE_NAME};
pub use specs::SpecCatalog;

/// Merged, read-only view of named constants such as type glyphs and tree shapes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constants(Mapping);

impl Constants {
    pub fn new(tree: Mapping) -> Self {
        Self(tree)
    }

    /// Follow `keys` through nested maps and return the scalar found there.
    pub fn lookup(&self, keys: &[&str]) -> Option<&str> {
        let (last, parents) = keys.split_last()?;
        let mut map = &self.0;
        for key in parents {
            map = map.get(*key)?.as_mapping()?;
        }
        map.get(*last)?.as_str()
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }
}

/// Everything the cascade produces for one target.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Files that contributed, nearest first. The built-in layer is not listed.
    pub files: Vec<PathBuf>,
    pub nerd_icons: HashMap<String, String>,
    pub emoji_icons: HashMap<String, String>,
    pub constants: Constants,
    pub prefs: Mapping,
    pub specs: SpecCatalog,
}

impl Config {
    /// Discover, load and merge the configuration for `target`.
    pub fn resolve(
        target: &Path,
        policy: &CascadePolicy,
        loader: &mut ConfigLoader,
    ) -> Result<Self, ConfigError> {
        let files = discover(target, policy);
        let docs = files
            .iter()
            .map(|path| loader.load(path))
            .collect::<Result<Vec<_>, _>>()?;
        let built_in = ConfigDocument::built_in()?;

        let mut layers: Vec<(&Path, &ConfigDocument)> = files
            .iter()
            .map(PathBuf::as_path)
            .zip(docs.iter().map(|doc| &**doc))
            .collect();
        layers.push((Path::new(BUILT_IN), &built_in));

        let mut config = Self::merge(&layers)?;
        config.files = files;
        Ok(config)
    }

    /// Configuration made of the built-in layer only.
    pub fn built_in() -> Result<Self, ConfigError> {
        let doc = ConfigDocument::built_in()?;
        Self::merge(&[(Path::new(BUILT_IN), &doc)])
    }

    /// Merge documents given nearest first. Tables are applied farthest first so
    /// nearer keys overwrite; spec lists are concatenated in the given order.
    pub fn merge(layers: &[(&Path, &ConfigDocument)]) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        let mut constants = Mapping::new();

        for (_, doc) in layers.iter().rev() {
            config
                .nerd_icons
                .extend(doc.nerd_icons.iter().map(|(k, v)| (k.clone(), v.clone())));
            config
                .emoji_icons
                .extend(doc.emoji_icons.iter().map(|(k, v)| (k.clone(), v.clone())));
            deep_merge(&mut constants, &doc.constants);
            for (key, value) in &doc.prefs {
                config.prefs.insert(key.clone(), value.clone());
            }
        }
        config.constants = Constants(constants);

        for (path, doc) in layers {
            let catalog = SpecCatalog::expand(&doc.node_specs).map_err(|e| e.in_file(path))?;
            config.specs.append(catalog);
        }

        debug!(
            layers = layers.len(),
            specs = config.specs.len(),
            prefs = config.prefs.len(),
            "merged configuration"
        );
        Ok(config)
    }

    /// Glyph for a logical icon key in the requested icon set.
    pub fn icon(&self, key: &str, style: IconStyle) -> Option<&str> {
        let table = match style {
            IconStyle::Nerd => &self.nerd_icons,
            IconStyle::Emoji => &self.emoji_icons,
            IconStyle::None => return None,
        };
        table.get(key).map(String::as_str)
    }

    pub fn pref(&self, key: &str) -> Option<&Value> {
        self.prefs.get(key)
    }
}
