use std::io;
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{collapse, is_visible, sort, Context, Listing};
use crate::node::{Node, NodeId};

/// Read one directory level into `listing` and return its top-level ids in
/// display order. In tree mode, visible subdirectories are read recursively
/// and linked under their directory node.
///
/// Only a failure to read `dir` itself is an error. Entries that cannot be
/// inspected are kept as nodes carrying the error text.
pub(super) fn read_level(
    listing: &mut Listing,
    dir: &Path,
    ctx: &Context<'_>,
    level: usize,
) -> io::Result<Vec<NodeId>> {
    let options = ctx.options;
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    let mut ids = Vec::new();
    for entry in walker {
        let mut node = match entry {
            Ok(entry) => Node::new(entry.into_path()),
            Err(err) => {
                let path = match err.path() {
                    Some(path) if err.depth() > 0 => path.to_path_buf(),
                    _ => return Err(err.into()),
                };
                let message = match err.io_error() {
                    Some(io_err) => io_err.to_string(),
                    None => err.to_string(),
                };
                warn!(path = %path.display(), error = %message, "unreadable entry");
                let mut node = Node::new(path);
                node.error.get_or_insert(message);
                node
            }
        };
        node.present(ctx.config, ctx.vcs);
        node.visible = is_visible(&node, options);
        ids.push(listing.push(node));
    }
    debug!(dir = %dir.display(), entries = ids.len(), level, "read directory");

    if options.collapse >= 1 {
        collapse::compose(listing, &ids);
        if options.collapse >= 2 {
            for &id in &ids {
                let node = listing.get_mut(id);
                if node.is_sub() {
                    node.visible = false;
                }
            }
        }
    }

    let mut top: Vec<NodeId> = ids
        .iter()
        .copied()
        .filter(|&id| !listing.get(id).is_sub())
        .collect();
    sort::sort_ids(
        &mut top,
        listing.nodes(),
        &options.sort,
        options.dirs_first,
        ctx.owners,
    );
    for &id in &ids {
        if listing.get(id).children.len() > 1 {
            let mut children = std::mem::take(&mut listing.get_mut(id).children);
            sort::sort_ids(
                &mut children,
                listing.nodes(),
                &options.sort,
                options.dirs_first,
                ctx.owners,
            );
            listing.get_mut(id).children = children;
        }
    }

    let descend = options.tree && options.depth.map_or(true, |depth| level < depth);
    if descend {
        for &id in &ids {
            let node = listing.get(id);
            if !node.visible || !node.is_dir() {
                continue;
            }
            let path = node.path.clone();
            match read_level(listing, &path, ctx, level + 1) {
                Ok(contents) => {
                    for &child in &contents {
                        listing.get_mut(child).parent = Some(id);
                    }
                    listing.get_mut(id).children.extend(contents);
                }
                Err(err) => {
                    warn!(dir = %path.display(), error = %err, "cannot expand directory");
                    listing.get_mut(id).error = Some(err.to_string());
                }
            }
        }
    }

    Ok(top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::VcsStatusMap;
    use crate::node::Owners;
    use crate::options::Options;
    use std::fs;
    use tempfile::TempDir;

    fn names(listing: &Listing, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| listing.get(id).name.clone()).collect()
    }

    fn read(dir: &Path, options: &Options) -> (Listing, Vec<NodeId>) {
        let config = Config::built_in().unwrap();
        let vcs = VcsStatusMap::default();
        let owners = Owners::new();
        let ctx = Context {
            config: &config,
            vcs: &vcs,
            options,
            owners: &owners,
        };
        let mut listing = Listing::default();
        let top = read_level(&mut listing, dir, &ctx, 1).unwrap();
        (listing, top)
    }

    #[test]
    fn reads_one_level_sorted_dirs_first() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "").unwrap();
        fs::write(tmp.path().join("A.txt"), "").unwrap();
        fs::create_dir(tmp.path().join("zdir")).unwrap();
        fs::write(tmp.path().join("zdir/inner.txt"), "").unwrap();

        let (listing, top) = read(tmp.path(), &Options::default());
        assert_eq!(names(&listing, &top), vec!["zdir", "A.txt", "b.txt"]);
        assert_eq!(listing.len(), 3);
    }

    #[test]
    fn tree_mode_links_contents_under_dirs() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src/bin")).unwrap();
        fs::write(tmp.path().join("src/lib.rs"), "").unwrap();
        fs::write(tmp.path().join("src/bin/main.rs"), "").unwrap();

        let options = Options {
            tree: true,
            ..Options::default()
        };
        let (listing, top) = read(tmp.path(), &options);
        assert_eq!(names(&listing, &top), vec!["src"]);
        let src = listing.get(top[0]);
        assert_eq!(names(&listing, &src.children), vec!["bin", "lib.rs"]);
        let bin = listing.get(src.children[0]);
        assert_eq!(names(&listing, &bin.children), vec!["main.rs"]);
        assert_eq!(listing.get(bin.children[0]).parent, Some(src.children[0]));
    }

    #[test]
    fn depth_bounds_expansion() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b/c")).unwrap();

        let options = Options {
            tree: true,
            depth: Some(2),
            ..Options::default()
        };
        let (listing, top) = read(tmp.path(), &options);
        let a = listing.get(top[0]);
        assert_eq!(names(&listing, &a.children), vec!["b"]);
        assert!(listing.get(a.children[0]).children.is_empty());
    }

    #[test]
    fn hidden_dirs_are_not_expanded() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".cache/deep")).unwrap();

        let options = Options {
            tree: true,
            ..Options::default()
        };
        let (listing, top) = read(tmp.path(), &options);
        assert_eq!(listing.len(), 1);
        assert!(!listing.get(top[0]).visible);
    }

    #[test]
    fn missing_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = Config::built_in().unwrap();
        let vcs = VcsStatusMap::default();
        let options = Options::default();
        let owners = Owners::new();
        let ctx = Context {
            config: &config,
            vcs: &vcs,
            options: &options,
            owners: &owners,
        };
        let mut listing = Listing::default();
        assert!(read_level(&mut listing, &tmp.path().join("gone"), &ctx, 1).is_err());
    }
}
