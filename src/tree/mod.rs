//! Listing construction: reading, filtering, collapse, sorting and tree layout.

pub mod collapse;
pub mod layout;
pub mod sort;
mod walk;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::git::VcsStatusMap;
use crate::node::spec::is_important_enough;
use crate::node::symlink::normalize;
use crate::node::{Node, NodeId, NodeType, Owners};
use crate::options::Options;

pub use layout::TreeShapes;

/// Everything resolved once per invocation that building a listing reads.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub config: &'a Config,
    pub vcs: &'a VcsStatusMap,
    pub options: &'a Options,
    /// Owner name lookups shared by sorting and rendering.
    pub owners: &'a Owners,
}

/// The nodes of one listing. Nodes refer to each other by index into the arena.
#[derive(Debug, Default)]
pub struct Listing {
    nodes: Vec<Node>,
    /// Top-level nodes in display order, hidden ones included.
    roots: Vec<NodeId>,
}

impl Listing {
    /// List `path`: its entries when it is a directory, otherwise the node itself.
    /// A symlink is never followed here, even one pointing at a directory.
    pub fn read(path: &Path, ctx: &Context<'_>) -> io::Result<Self> {
        if is_real_dir(path) {
            Self::read_dir(path, ctx)
        } else {
            Ok(Self::single(path, ctx))
        }
    }

    /// Read the entries of `dir`, expanding subdirectories in tree mode.
    pub fn read_dir(dir: &Path, ctx: &Context<'_>) -> io::Result<Self> {
        let mut listing = Self::default();
        listing.roots = walk::read_level(&mut listing, dir, ctx, 1)?;
        layout::compute_prefixes(&mut listing, &TreeShapes::from_constants(&ctx.config.constants));
        Ok(listing)
    }

    /// A listing holding just `path`. A missing path is kept as a node that
    /// does not exist.
    pub fn single(path: &Path, ctx: &Context<'_>) -> Self {
        let mut node = Node::new(path);
        node.present(ctx.config, ctx.vcs);
        let mut listing = Self::default();
        let id = listing.push(node);
        listing.roots.push(id);
        listing
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by its path.
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.nodes.iter().position(|node| node.path == path)
    }

    /// Visible members of `ids`, in order.
    pub fn visible<'l>(&'l self, ids: &'l [NodeId]) -> impl Iterator<Item = NodeId> + 'l {
        ids.iter().copied().filter(|&id| self.nodes[id].visible)
    }

    /// Visible nodes in display order, depth first, with their nesting depth.
    /// Children of a hidden node are never reached.
    pub fn walk_visible(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(NodeId, usize)> =
            self.visible(&self.roots).map(|id| (id, 0)).collect();
        stack.reverse();
        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            let children: Vec<NodeId> = self.visible(&self.nodes[id].children).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
        out
    }
}

/// Whether `path` is a directory itself, not a symlink to one.
pub fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
}

/// `path` made absolute without resolving its last component, so a symlink
/// argument names the link and not its target. The directory part is
/// canonicalized when it exists so paths line up with the repository root.
pub fn absolute_target(path: &Path) -> io::Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let lexical = normalize(&joined);
    let canonical = match (lexical.parent(), lexical.file_name()) {
        (Some(parent), Some(name)) => parent.canonicalize().ok().map(|dir| dir.join(name)),
        _ => None,
    };
    Ok(canonical.unwrap_or(lexical))
}

/// Whether `node` passes the importance, type and name filters.
pub fn is_visible(node: &Node, options: &Options) -> bool {
    if !is_important_enough(node.importance(), options.all) {
        return false;
    }
    let type_shown = match node.node_type {
        NodeType::Unknown => true,
        NodeType::Dir => options.dirs,
        _ => options.files,
    };
    if !type_shown {
        return false;
    }
    if let Some(exclude) = &options.exclude {
        if exclude.is_match(&node.name) {
            return false;
        }
    }
    if let Some(only) = &options.only {
        if !only.is_match(&node.name) {
            return false;
        }
    }
    true
}
