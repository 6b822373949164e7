//! Expansion of raw `node_specs` entries into a flat, ordered list of [`NodeSpec`]s.
//!
//! Entries may group several names, patterns, globs or extensions under a plural
//! key, and may do the same inside their `collapse` rule. Each group is split into
//! one spec per value, keeping every other field, so that the catalog only holds
//! singular matchers.

use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::ConfigError;
use crate::node::spec::{describe, NodeSpec, SpecMatches};

/// Identification families as `(singular, plural)` pairs.
const ID_FIELDS: &[(&str, &str)] = &[
    ("name", "names"),
    ("pattern", "patterns"),
    ("glob", "globs"),
    ("extension", "extensions"),
];

const COLLAPSE_FIELDS: &[(&str, &str)] = &[("name", "names"), ("extension", "extensions")];

/// Ordered list of specs, nearest configuration first.
#[derive(Debug, Clone, Default)]
pub struct SpecCatalog {
    specs: Vec<NodeSpec>,
}

impl SpecCatalog {
    pub fn new(specs: Vec<NodeSpec>) -> Self {
        Self { specs }
    }

    /// Expand raw entries, preserving their order.
    pub fn expand(entries: &[Mapping]) -> Result<Self, ConfigError> {
        let mut specs = Vec::with_capacity(entries.len());
        for entry in entries {
            for split in massage(entry)? {
                specs.push(NodeSpec::from_entry(&split)?);
            }
        }
        debug!(entries = entries.len(), specs = specs.len(), "expanded node specs");
        Ok(Self { specs })
    }

    /// Append a farther catalog after this one.
    pub fn append(&mut self, farther: SpecCatalog) {
        self.specs.extend(farther.specs);
    }

    pub fn specs(&self) -> &[NodeSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// All specs that apply to the node `name` at `path`, in catalog order.
    pub fn matches(&self, name: &str, path: &Path) -> SpecMatches<'_> {
        SpecMatches::new(
            self.specs
                .iter()
                .filter(|spec| spec.is_match(name, path))
                .collect(),
        )
    }
}

/// Split one raw entry into entries that each carry exactly one singular
/// identification value and at most one singular collapse target.
pub fn massage(entry: &Mapping) -> Result<Vec<Mapping>, ConfigError> {
    let collapses = match entry.get("collapse") {
        None | Some(Value::Null) => None,
        Some(Value::Mapping(rule)) => {
            check_conflicts(rule, COLLAPSE_FIELDS, entry)?;
            Some(break_plurals(rule, COLLAPSE_FIELDS, entry)?)
        }
        Some(_) => {
            return Err(ConfigError::spec(
                describe(&Value::Mapping(entry.clone())),
                "`collapse` must be a mapping",
            ))
        }
    };

    check_conflicts(entry, ID_FIELDS, entry)?;
    let bases = break_plurals(entry, ID_FIELDS, entry)?;

    let Some(collapses) = collapses else {
        return Ok(bases);
    };
    let mut out = Vec::with_capacity(bases.len() * collapses.len());
    for base in &bases {
        for rule in &collapses {
            let mut split = base.clone();
            split.insert("collapse".into(), Value::Mapping(rule.clone()));
            out.push(split);
        }
    }
    Ok(out)
}

/// Exactly one key of all the given families must be present in `map`.
fn check_conflicts(
    map: &Mapping,
    families: &[(&str, &str)],
    entry: &Mapping,
) -> Result<(), ConfigError> {
    let present: Vec<&str> = families
        .iter()
        .flat_map(|(s, p)| [*s, *p])
        .filter(|key| map.contains_key(*key))
        .collect();
    if present.len() == 1 {
        return Ok(());
    }

    let allowed: Vec<String> = families
        .iter()
        .flat_map(|(s, p)| [format!("`{s}`"), format!("`{p}`")])
        .collect();
    let mut reason = format!("exactly one of {} is allowed", allowed.join(", "));
    if !present.is_empty() {
        let found: Vec<String> = present.iter().map(|k| format!("`{k}`")).collect();
        reason.push_str(&format!(", found {}", found.join(" and ")));
    }
    Err(ConfigError::spec(describe(&Value::Mapping(entry.clone())), reason))
}

/// Split `map` on the first plural key present. Checks that singular keys do not
/// hold lists and plural keys do.
fn break_plurals(
    map: &Mapping,
    families: &[(&str, &str)],
    entry: &Mapping,
) -> Result<Vec<Mapping>, ConfigError> {
    let fail = |reason: String| ConfigError::spec(describe(&Value::Mapping(entry.clone())), reason);

    for (singular, plural) in families {
        if let Some(Value::Sequence(_)) = map.get(*singular) {
            return Err(fail(format!("`{singular}` cannot be a list; use `{plural}`")));
        }
        let Some(values) = map.get(*plural) else {
            continue;
        };
        let Value::Sequence(values) = values else {
            return Err(fail(format!("`{plural}` must be a list; use `{singular}`")));
        };

        let mut common = map.clone();
        common.remove(*plural);
        return Ok(values
            .iter()
            .map(|value| {
                let mut split = common.clone();
                split.insert(Value::from(*singular), value.clone());
                split
            })
            .collect());
    }
    Ok(vec![map.clone()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::spec::Matcher;
    use rstest::rstest;

    fn yaml(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    #[rstest]
    #[case("{names: [name_a, name_b]}", &["{name: name_a}", "{name: name_b}"])]
    #[case("{extensions: [ext_a, ext_b]}", &["{extension: ext_a}", "{extension: ext_b}"])]
    #[case("{patterns: [pat_a, pat_b]}", &["{pattern: pat_a}", "{pattern: pat_b}"])]
    #[case("{globs: ['*.a', '*.b']}", &["{glob: '*.a'}", "{glob: '*.b'}"])]
    #[case(
        "{name: n, collapse: {names: [name_a, name_b]}}",
        &["{name: n, collapse: {name: name_a}}", "{name: n, collapse: {name: name_b}}"]
    )]
    #[case(
        "{names: [a, b], collapse: {names: [c, d]}}",
        &[
            "{name: a, collapse: {name: c}}",
            "{name: a, collapse: {name: d}}",
            "{name: b, collapse: {name: c}}",
            "{name: b, collapse: {name: d}}",
        ]
    )]
    fn massages_plurals_to_singulars(#[case] entry: &str, #[case] expected: &[&str]) {
        let got = massage(&yaml(entry)).unwrap();
        let expected: Vec<Mapping> = expected.iter().map(|e| yaml(e)).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn plural_split_shares_other_fields() {
        let entry = yaml("{extensions: [a, b, c], icon: x, color: red, importance: 2}");
        let got = massage(&entry).unwrap();
        assert_eq!(got.len(), 3);
        for (split, ext) in got.iter().zip(["a", "b", "c"]) {
            assert!(!split.contains_key("extensions"));
            assert_eq!(split.get("extension"), Some(&Value::from(ext)));
            assert_eq!(split.get("icon"), Some(&Value::from("x")));
            assert_eq!(split.get("color"), Some(&Value::from("red")));
            assert_eq!(split.get("importance"), Some(&Value::from(2)));
        }
    }

    #[rstest]
    #[case("{name: name, extension: ext}")]
    #[case("{names: [name], extensions: [ext]}")]
    #[case("{name: name, extensions: [ext]}")]
    #[case("{name: a, names: [b]}")]
    #[case("{icon: lonely}")]
    #[case("{name: name, collapse: {name: name, extension: ext}}")]
    #[case("{name: name, collapse: {names: [name], extensions: [ext]}}")]
    #[case("{name: name, collapse: {name: name, extensions: [ext]}}")]
    fn conflicting_fields_are_rejected(#[case] entry: &str) {
        let err = massage(&yaml(entry)).unwrap_err();
        assert!(err.to_string().contains("exactly one of"), "{err}");
    }

    #[test]
    fn conflict_message_names_fields() {
        let err = massage(&yaml("{name: a, extension: b}")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("found `name` and `extension`"), "{msg}");
    }

    #[rstest]
    #[case("{name: [name]}", "`name` cannot be a list; use `names`")]
    #[case("{extension: [ext]}", "`extension` cannot be a list; use `extensions`")]
    #[case("{pattern: [p]}", "`pattern` cannot be a list; use `patterns`")]
    #[case("{name: n, collapse: {extension: [e]}}", "`extension` cannot be a list")]
    #[case("{names: name}", "`names` must be a list; use `name`")]
    #[case("{extensions: ext}", "`extensions` must be a list; use `extension`")]
    #[case("{name: n, collapse: {names: a}}", "`names` must be a list")]
    fn cardinality_mismatch_is_rejected(#[case] entry: &str, #[case] message: &str) {
        let err = massage(&yaml(entry)).unwrap_err();
        assert!(err.to_string().contains(message), "{err}");
    }

    #[test]
    fn expand_preserves_order() {
        let entries = vec![
            yaml("{names: [b, a]}"),
            yaml("{extension: rs, icon: rust}"),
            yaml("{pattern: 'READ'}"),
        ];
        let catalog = SpecCatalog::expand(&entries).unwrap();
        let shown: Vec<String> = catalog.specs().iter().map(|s| s.matcher.to_string()).collect();
        assert_eq!(shown, vec!["b", "a", "*.rs", "<^(?:READ)>"]);
    }

    #[test]
    fn matches_in_catalog_order() {
        let catalog = SpecCatalog::new(vec![
            NodeSpec::new(Matcher::Extension("css".into())).color("yellow"),
            NodeSpec::new(Matcher::Name("other".into())).icon("nope"),
            NodeSpec::new(Matcher::Name("style.css".into())).icon("pls").color("red"),
        ]);
        let matches = catalog.matches("style.css", Path::new("/w/style.css"));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches.icon(), Some("pls"));
        assert_eq!(matches.color(), Some("yellow"));
    }

    #[test]
    fn empty_plural_yields_no_specs() {
        let catalog = SpecCatalog::expand(&[yaml("{names: [], icon: x}")]).unwrap();
        assert!(catalog.is_empty());
    }
}
