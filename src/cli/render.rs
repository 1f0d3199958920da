//! Tree display with termtree

use colored::Colorize;
use termtree::Tree;

use crate::domain::{Node, Orphaned, ShapeSource, ShapeTree};
use crate::infrastructure::KeyDocument;

/// One line per node: name, kind, evaluated weight; invalid nodes are marked.
fn label(tree: &ShapeTree, key: &KeyDocument, node: &Node) -> String {
    let index = node.index();
    let weight = tree
        .params(key, index)
        .and_then(|p| key.evaluate_property(&p.weight))
        .map(|w| format!("w={w:.3}"))
        .unwrap_or_else(|| "w=?".to_string());
    let kind = format!("[{}]", node.node_type().label());

    let mut line = format!("{} {} {}", node.name().bold(), kind.dimmed(), weight);
    if index == tree.active_index() {
        line = format!("{line} {}", "*".cyan());
    }
    let marker = match tree.orphaned(key, index) {
        Some(Orphaned::MissingShape(_)) => Some("(missing shape)"),
        Some(Orphaned::UnresolvedData(_)) => Some("(missing data)"),
        None => None,
    };
    if let Some(marker) = marker {
        line = format!("{} {}", line.red(), marker.red());
    }
    line
}

fn build(tree: &ShapeTree, key: &KeyDocument, node: &Node) -> Tree<String> {
    let nav = tree.navigator();
    let leaves = nav
        .children(node.index())
        .into_iter()
        .map(|child| build(tree, key, child));
    Tree::new(label(tree, key, node)).with_leaves(leaves)
}

/// Renders all root subtrees under the key name.
pub fn render(tree: &ShapeTree, key: &KeyDocument) -> Tree<String> {
    let roots = tree
        .navigator()
        .roots()
        .into_iter()
        .map(|root| build(tree, key, root));
    Tree::new(key.key_name().cyan().bold().to_string()).with_leaves(roots)
}
