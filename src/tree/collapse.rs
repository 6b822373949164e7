//! Nesting of generated files under the sibling they are derived from.

use std::collections::HashMap;

use tracing::trace;

use super::Listing;
use crate::node::NodeId;

/// Link each node in `siblings` whose collapse rule names a visible sibling as
/// a child of that sibling. Nodes without a rule, or whose main node is missing
/// or hidden, stay top level. A link that would close a cycle is skipped.
pub fn compose(listing: &mut Listing, siblings: &[NodeId]) {
    let by_name: HashMap<&str, NodeId> = siblings
        .iter()
        .map(|&id| (listing.get(id).name.as_str(), id))
        .collect();

    let mut links = Vec::new();
    for &id in siblings {
        let node = listing.get(id);
        let Some(rule) = &node.presentation.collapse else {
            continue;
        };
        let main_name = rule.main_name(&node.name);
        match by_name.get(main_name.as_str()) {
            Some(&main) if main != id && listing.get(main).visible => links.push((id, main)),
            _ => trace!(node = %node.name, main = %main_name, "no main node to collapse into"),
        }
    }

    for (sub, main) in links {
        if is_ancestor_or_self(listing, sub, main) {
            trace!(node = %listing.get(sub).name, "collapse would form a cycle");
            continue;
        }
        listing.get_mut(sub).parent = Some(main);
        listing.get_mut(main).children.push(sub);
    }
}

/// Whether `candidate` is `node` or already nested somewhere beneath it.
fn is_ancestor_or_self(listing: &Listing, node: NodeId, candidate: NodeId) -> bool {
    let mut cursor = Some(candidate);
    while let Some(id) = cursor {
        if id == node {
            return true;
        }
        cursor = listing.get(id).parent;
    }
    false
}
