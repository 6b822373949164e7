#![allow(dead_code)]

use pls::config::Config;
use pls::git::VcsStatusMap;
use pls::node::Owners;
use pls::options::{IconStyle, Options};
use pls::render::{listing_to_lines, RenderConfig};
use pls::tree::{Context, Listing};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Create a directory structure from a list of relative paths.
/// Paths ending with '/' create directories; others create empty files.
pub fn create_fixture(paths: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for p in paths {
        let full = tmp.path().join(p);
        if p.ends_with('/') {
            fs::create_dir_all(&full).unwrap();
        } else {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&full, "").unwrap();
        }
    }
    tmp
}

/// Options with icons off so rendered text is easy to compare.
pub fn plain_options() -> Options {
    Options {
        icon: IconStyle::None,
        ..Options::default()
    }
}

/// Read `dir` with the built-in configuration and no VCS data.
pub fn read_listing(dir: &Path, options: &Options) -> Listing {
    let config = Config::built_in().unwrap();
    let vcs = VcsStatusMap::default();
    let owners = Owners::new();
    let ctx = Context {
        config: &config,
        vcs: &vcs,
        options,
        owners: &owners,
    };
    Listing::read(dir, &ctx).unwrap()
}

/// Render `dir` without color and return one string per line.
pub fn render_plain(dir: &Path, options: &Options) -> Vec<String> {
    let config = Config::built_in().unwrap();
    let vcs = VcsStatusMap::default();
    let owners = Owners::new();
    let ctx = Context {
        config: &config,
        vcs: &vcs,
        options,
        owners: &owners,
    };
    let listing = Listing::read(dir, &ctx).unwrap();
    listing_to_lines(&listing, &ctx, &RenderConfig { use_color: false })
        .iter()
        .map(line_to_text)
        .collect()
}

/// Extract plain text from a ratatui Line.
pub fn line_to_text(line: &ratatui::text::Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}
