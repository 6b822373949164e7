use super::Listing;
use crate::config::Constants;
use crate::node::NodeId;

/// Glyphs used to draw nesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeShapes {
    /// Leaf of a node with siblings after it.
    pub tee: String,
    /// Leaf of the last sibling.
    pub bend: String,
    /// Segment under an ancestor that has siblings after it.
    pub pipe: String,
    /// Segment under an ancestor that was the last sibling.
    pub space: String,
}

impl Default for TreeShapes {
    fn default() -> Self {
        Self {
            tee: "\u{251c}\u{2500}\u{2500} ".to_string(),  // ├──
            bend: "\u{2514}\u{2500}\u{2500} ".to_string(), // └──
            pipe: "\u{2502}   ".to_string(),               // │
            space: "    ".to_string(),
        }
    }
}

impl TreeShapes {
    /// Shapes from `constants.tree`, falling back to box-drawing defaults.
    pub fn from_constants(constants: &Constants) -> Self {
        let defaults = Self::default();
        let get = |key: &str, fallback: String| {
            constants
                .lookup(&["tree", key])
                .map(str::to_string)
                .unwrap_or(fallback)
        };
        Self {
            tee: get("tee", defaults.tee),
            bend: get("bend", defaults.bend),
            pipe: get("pipe", defaults.pipe),
            space: get("space", defaults.space),
        }
    }
}

/// Set the prefix of every nested node, top down. Only visible siblings count
/// when deciding which one is last.
pub(super) fn compute_prefixes(listing: &mut Listing, shapes: &TreeShapes) {
    let roots: Vec<NodeId> = listing.visible(listing.roots()).collect();
    for id in roots {
        listing.get_mut(id).prefix.clear();
        prefix_children(listing, id, "", shapes);
    }
}

/// `above` is the accumulated segment text for `parent`'s children.
fn prefix_children(listing: &mut Listing, parent: NodeId, above: &str, shapes: &TreeShapes) {
    let children: Vec<NodeId> = listing.visible(&listing.get(parent).children).collect();
    let count = children.len();
    for (index, child) in children.into_iter().enumerate() {
        let is_last = index + 1 == count;
        let leaf = if is_last { &shapes.bend } else { &shapes.tee };
        listing.get_mut(child).prefix = format!("{above}{leaf}");

        let segment = if is_last { &shapes.space } else { &shapes.pipe };
        prefix_children(listing, child, &format!("{above}{segment}"), shapes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use serde_yaml::Mapping;
    use std::path::PathBuf;

    fn node(name: &str) -> Node {
        Node::new(PathBuf::from("/nonexistent-pls-layout").join(name))
    }

    /// root
    /// ├── a
    /// │   └── a1
    /// └── b
    ///     ├── b1
    ///     └── b2
    fn sample() -> (Listing, [NodeId; 6]) {
        let mut listing = Listing::default();
        let ids = ["root", "a", "a1", "b", "b1", "b2"].map(|name| listing.push(node(name)));
        let [root, a, a1, b, b1, b2] = ids;
        for (parent, child) in [(root, a), (a, a1), (root, b), (b, b1), (b, b2)] {
            listing.get_mut(child).parent = Some(parent);
            listing.get_mut(parent).children.push(child);
        }
        listing.roots = vec![root];
        (listing, ids)
    }

    #[test]
    fn prefixes_follow_sibling_position() {
        let (mut listing, [root, a, a1, b, b1, b2]) = sample();
        compute_prefixes(&mut listing, &TreeShapes::default());

        assert_eq!(listing.get(root).prefix, "");
        assert_eq!(listing.get(a).prefix, "├── ");
        assert_eq!(listing.get(a1).prefix, "│   └── ");
        assert_eq!(listing.get(b).prefix, "└── ");
        assert_eq!(listing.get(b1).prefix, "    ├── ");
        assert_eq!(listing.get(b2).prefix, "    └── ");
    }

    #[test]
    fn hidden_siblings_do_not_count() {
        let (mut listing, [_, a, a1, b, ..]) = sample();
        listing.get_mut(b).visible = false;
        compute_prefixes(&mut listing, &TreeShapes::default());

        assert_eq!(listing.get(a).prefix, "└── ");
        assert_eq!(listing.get(a1).prefix, "    └── ");
    }

    #[test]
    fn shapes_from_constants() {
        let constants: Mapping = serde_yaml::from_str("tree:\n  tee: '|-'\n").unwrap();
        let shapes = TreeShapes::from_constants(&Constants::new(constants));
        assert_eq!(shapes.tee, "|-");
        assert_eq!(shapes.bend, TreeShapes::default().bend);
    }
}
