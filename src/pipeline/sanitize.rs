//! Sanitising: make Google's HTML export parseable and strip presentational noise.
//!
//! The export is HTML, not XHTML: `<meta>` and `<br>` are never closed,
//! entities like `&nbsp;` are undefined in XML, and images and page breaks
//! carry nothing the typeset output can use. These string-level rules turn
//! the export into well-formed markup before [`MarkupTree::parse`] sees it.
//!
//! ## Rule Order
//!
//! Void-tag normalisation and page-break removal run before `<br>` becomes a
//! newline, and entities are substituted before images are stripped, so each
//! later pattern sees input that the earlier ones already normalised.
//!
//! ## Strictness
//!
//! Only the entities in the substitution table and the five XML ones are
//! understood. Any other named entity (`&eacute;`, `&hellip;`), and any tag
//! the rules don't close, makes the parse fail with
//! [`GDocDownError::MarkupParseError`] instead of being dropped silently.
//! Extend [`ExportConfig::entity_substitutions`] to accept more.

use crate::config::ExportConfig;
use crate::error::GDocDownError;
use crate::pipeline::markup::MarkupTree;
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use regex::Regex;
use tracing::debug;

/// Entity substitutions applied before parsing, in order.
///
/// Accented letters become TeX accent commands in braces so a following
/// letter cannot merge into the control sequence; punctuation becomes the
/// TeX ligature spelling.
pub static DEFAULT_ENTITY_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&#160;", " "),
    ("&Auml;", "{\\\"A}"),
    ("&auml;", "{\\\"a}"),
    ("&Ouml;", "{\\\"O}"),
    ("&ouml;", "{\\\"o}"),
    ("&Uuml;", "{\\\"U}"),
    ("&uuml;", "{\\\"u}"),
    ("&ndash;", "--"),
    ("&mdash;", "---"),
    ("&lsquo;", "`"),
    ("&rsquo;", "'"),
    ("&ldquo;", "``"),
    ("&rdquo;", "''"),
    ("&sim;", "~"),
];

/// Clean the raw export and parse it into a tree.
pub fn sanitize(raw: &str, config: &ExportConfig) -> Result<MarkupTree, GDocDownError> {
    let cleaned = clean_markup(raw, &config.entity_substitutions);
    debug!("Sanitised markup: {} → {} bytes", raw.len(), cleaned.len());
    MarkupTree::parse(&cleaned)
}

/// Apply all string-level rules to the raw export.
///
/// Rules (applied in order):
/// 1. Self-close void `<meta>` and `<link>` tags
/// 2. Remove forced page-break rules (`<hr style="page-break-before:...">`)
/// 3. Turn `<br>` into a literal newline
/// 4. Substitute entities from `entities`
/// 5. Strip `<img>` elements over their full tag span
pub fn clean_markup<S: AsRef<str>>(raw: &str, entities: &[(S, S)]) -> String {
    let s = close_void_tags(raw);
    let s = remove_page_breaks(&s);
    let s = line_breaks_to_newlines(&s);
    let s = substitute_entities(&s, entities);
    strip_images(&s)
}

// ── Rule 1: Self-close void tags ─────────────────────────────────────────────

static RE_VOID_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(meta|link)\b([^>]*?)\s*/?>").unwrap());

fn close_void_tags(input: &str) -> String {
    RE_VOID_TAG.replace_all(input, "<$1$2/>").into_owned()
}

// ── Rule 2: Remove forced page breaks ────────────────────────────────────────

static RE_PAGE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<hr\b[^>]*page-break-before[^>]*>(?:\s*</hr>)?").unwrap());

fn remove_page_breaks(input: &str) -> String {
    RE_PAGE_BREAK.replace_all(input, "").into_owned()
}

// ── Rule 3: Line breaks ──────────────────────────────────────────────────────

static RE_LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

fn line_breaks_to_newlines(input: &str) -> String {
    RE_LINE_BREAK.replace_all(input, "\n").into_owned()
}

// ── Rule 4: Entity substitution ──────────────────────────────────────────────

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Replace entities in text as-is; inside tags the replacement is
/// XML-escaped so a `"` or `&` cannot end or corrupt an attribute value.
fn substitute_entities<S: AsRef<str>>(input: &str, entities: &[(S, S)]) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for tag in RE_TAG.find_iter(input) {
        out.push_str(&replace_entities(&input[last..tag.start()], entities, false));
        out.push_str(&replace_entities(tag.as_str(), entities, true));
        last = tag.end();
    }
    out.push_str(&replace_entities(&input[last..], entities, false));
    out
}

fn replace_entities<S: AsRef<str>>(segment: &str, entities: &[(S, S)], in_tag: bool) -> String {
    entities.iter().fold(segment.to_string(), |acc, (from, to)| {
        let from = from.as_ref();
        if !acc.contains(from) {
            return acc;
        }
        if in_tag {
            acc.replace(from, &escape(to.as_ref()))
        } else {
            acc.replace(from, to.as_ref())
        }
    })
}

// ── Rule 5: Strip images ─────────────────────────────────────────────────────

static RE_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>(?:\s*</img>)?").unwrap());

fn strip_images(input: &str) -> String {
    RE_IMAGE.replace_all(input, "").into_owned()
}

// ── Tests ────────────────────────────────────────────────────────────────────
