//! Text serialisation: flatten the cleaned body into paragraph-separated text.

use crate::error::GDocDownError;
use crate::pipeline::markup::{MarkupTree, NodeId};

/// Remove the root's `<head>` (styles, title, meta) if present.
pub fn drop_head(tree: &mut MarkupTree) -> bool {
    match tree.child_by_name(tree.root(), "head") {
        Some(head) => tree.detach(head),
        None => false,
    }
}

/// The root's `<body>` child.
pub fn find_body(tree: &MarkupTree) -> Result<NodeId, GDocDownError> {
    tree.child_by_name(tree.root(), "body")
        .ok_or_else(|| GDocDownError::MissingElement {
            element: "body".to_string(),
        })
}

/// Each direct child of `body` as collected text followed by `separator`,
/// the last block included. Text directly inside `body` and between its
/// blocks is layout whitespace and is dropped.
pub fn serialize(tree: &MarkupTree, body: NodeId, separator: &str) -> String {
    let mut out = String::new();
    for &block in tree.children(body) {
        out.push_str(&tree.collect_text(block));
        out.push_str(separator);
    }
    out
}
