//! Comment inlining: fold Google's comment footnotes back into the body text.
//!
//! The HTML export renders each comment twice: a superscript `[a]` link at
//! the commented text (id `cmnt_ref{n}`) and a numbered footnote block after
//! the body (the `[a]` link inside it has id `cmnt{n}`). This stage removes
//! the footnote and puts its text at the reference as `\pdfcomment{...}`.
//!
//! Numbering is assumed contiguous: the scan walks `n = 1, 2, ...` and stops
//! at the first `n` whose body or reference marker is missing, even when
//! higher numbers exist.

use crate::config::AnnotationLayout;
use crate::error::GDocDownError;
use crate::pipeline::markup::{MarkupTree, NodeId};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// The two markers found for one comment number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationRef {
    pub sequence: u32,
    /// The `cmnt{n}` marker inside the footnote.
    pub body: NodeId,
    /// The `cmnt_ref{n}` marker at the commented text.
    pub reference: NodeId,
}

/// A comment that was spliced into the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlinedAnnotation {
    pub sequence: u32,
    pub text: String,
}

/// Look up both markers for `sequence`; `None` if either is absent or was
/// already removed from the tree.
fn locate(
    tree: &MarkupTree,
    index: &HashMap<String, NodeId>,
    layout: &AnnotationLayout,
    sequence: u32,
) -> Option<AnnotationRef> {
    let attached = |id: String| index.get(&id).copied().filter(|&n| tree.is_attached(n));
    Some(AnnotationRef {
        sequence,
        body: attached(layout.body_id(sequence))?,
        reference: attached(layout.reference_id(sequence))?,
    })
}

/// Inline every contiguous comment, starting at 1.
///
/// For comment `n`:
/// 1. the `[a]` glyph (`cmnt{n}`) is removed from the footnote,
/// 2. the footnote block, `footnote_depth` hops above the glyph, is read as
///    text and the reference marker's parent gets `\pdfcomment{<text>}` as
///    its text, the reference marker itself being removed (text after either
///    marker stays in place),
/// 3. the footnote block is removed from its container.
///
/// Returns what was inlined, in order. A tree without comment ids comes back
/// unchanged.
pub fn inline_annotations(
    tree: &mut MarkupTree,
    layout: &AnnotationLayout,
) -> Result<Vec<InlinedAnnotation>, GDocDownError> {
    let index = tree.id_index();
    let mut inlined = Vec::new();

    for sequence in 1..=layout.max_annotations {
        let Some(found) = locate(tree, &index, layout, sequence) else {
            debug!("No comment {}; {} inlined", sequence, inlined.len());
            return Ok(inlined);
        };
        inlined.push(inline_one(tree, layout, found)?);
    }

    if locate(tree, &index, layout, layout.max_annotations.saturating_add(1)).is_some() {
        warn!(
            "Stopped after {} comments; raise max_annotations to inline the rest",
            layout.max_annotations
        );
    }
    Ok(inlined)
}

fn inline_one(
    tree: &mut MarkupTree,
    layout: &AnnotationLayout,
    found: AnnotationRef,
) -> Result<InlinedAnnotation, GDocDownError> {
    let layout_error = |detail: String| GDocDownError::AnnotationLayout {
        sequence: found.sequence,
        detail,
    };

    let block = tree
        .ancestor(found.body, layout.footnote_depth)
        .ok_or_else(|| layout_error(format!("fewer than {} ancestors", layout.footnote_depth)))?;
    if tree.parent(block).is_none() {
        return Err(layout_error("footnote block is the document root".into()));
    }
    let reference_parent = tree
        .parent(found.reference)
        .ok_or_else(|| layout_error("reference marker has no parent".into()))?;
    if is_within(tree, reference_parent, block) {
        return Err(layout_error("reference marker sits inside its own footnote".into()));
    }

    tree.detach(found.body);
    let text = tree.collect_text(block);

    // Set before detaching, so the marker's tail lands after the directive.
    tree.set_text(reference_parent, layout.directive(&text));
    tree.detach(found.reference);

    tree.detach(block);

    debug!("Inlined comment {} ({} chars)", found.sequence, text.len());
    Ok(InlinedAnnotation {
        sequence: found.sequence,
        text,
    })
}

/// True when `node` is `ancestor` or lies below it.
fn is_within(tree: &MarkupTree, node: NodeId, ancestor: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(n) = current {
        if n == ancestor {
            return true;
        }
        current = tree.parent(n);
    }
    false
}
