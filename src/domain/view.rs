//! Rendering trees for terminal display.

use termtree::Tree;

use crate::domain::node::Node;

pub trait TreeView {
    fn to_tree_string(&self, label: &str) -> Tree<String>;
}

impl TreeView for Node {
    /// Groups become branches labelled with their name, leaves become
    /// `name: value (dtype)` lines.
    fn to_tree_string(&self, label: &str) -> Tree<String> {
        match self {
            Node::Leaf(leaf) => Tree::new(format!("{}: {} ({})", label, leaf, leaf.dtype())),
            Node::Group(children) => Tree::new(label.to_string()).with_leaves(
                children
                    .iter()
                    .map(|(name, child)| child.to_tree_string(name)),
            ),
            Node::OrderedGroup(children) => Tree::new(format!("{label} [{}]", children.len()))
                .with_leaves(
                    children
                        .iter()
                        .enumerate()
                        .map(|(index, child)| child.to_tree_string(&index.to_string())),
                ),
        }
    }
}
