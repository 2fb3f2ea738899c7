//! Pipeline stages for exporting a Drive document.
//!
//! Each submodule implements exactly one step, so each is testable without
//! the others and without a network.
//!
//! ## Data Flow
//!
//! ```text
//! pointer ──▶ formats ──▶ export ──▶ sanitize ──▶ annotations ──▶ serialize
//! (.gdoc)    (MIME type)  (Drive)    (markup)     (\pdfcomment)    (text)
//! ```
//!
//! 1. [`pointer`]: read the pointer file (document kind and Drive id)
//! 2. [`formats`]: the (kind, format) registry and the output-spec rules
//! 3. [`export`]: the one network call, behind the [`export::ExportClient`]
//!    trait
//! 4. [`sanitize`]: regex cleanup of the HTML export, then parse into a
//!    [`markup::MarkupTree`]
//! 5. [`annotations`]: move reviewer comments from footnotes into the text
//! 6. [`serialize`]: flatten `<body>` into paragraph-separated text
//!
//! Steps 4–6 only run for typeset formats; everything else is written as
//! exported.

pub mod annotations;
pub mod export;
pub mod formats;
pub mod markup;
pub mod pointer;
pub mod sanitize;
pub mod serialize;
