//! Answer slot patching for the document body part.
//!
//! The answer slot is the single `<w:t>` element carrying `answer="true"`.
//! Patching works on the raw markup so that everything outside the slot is
//! left byte-for-byte intact.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::PatchError;

/// Closing tag of a text node.
const TEXT_CLOSE: &str = "</w:t>";

static MARKER_RE: OnceLock<Regex> = OnceLock::new();
static ANCHOR_RE: OnceLock<Regex> = OnceLock::new();

/// Opening (or self-closing) `<w:t>` tag carrying the answer marker.
fn marker_re() -> &'static Regex {
    MARKER_RE.get_or_init(|| {
        Regex::new(r#"<w:t(?:\s[^>]*)?\sanswer="true"[^>]*>"#).expect("valid marker regex")
    })
}

/// Section-properties element, but not e.g. `<w:sectPrChange>`.
fn anchor_re() -> &'static Regex {
    ANCHOR_RE.get_or_init(|| Regex::new(r"<w:sectPr[\s/>]").expect("valid anchor regex"))
}

/// The markup inserted when the part has no answer slot yet.
pub fn answer_paragraph(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t answer="true">{text}</w:t></w:r></w:p>"#)
}

/// How a patch was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// An existing answer slot had its text replaced.
    Replaced,
    /// A new paragraph holding the answer slot was inserted before the anchor.
    Inserted,
}

/// Apply the answer `text` to `content`, returning the new markup.
///
/// `text` is inserted verbatim; escaping is the caller's job. `part` is only
/// used for error reporting.
pub fn patch_content(
    content: &str,
    text: &str,
    part: &Path,
) -> Result<(String, PatchOutcome), PatchError> {
    if let Some(open) = marker_re().find(content) {
        let tag = open.as_str();
        if let Some(attrs) = tag.strip_suffix("/>") {
            // `<w:t answer="true"/>` becomes an open/close pair.
            let patched = format!(
                "{}{}>{}{}{}",
                &content[..open.start()],
                attrs.trim_end(),
                text,
                TEXT_CLOSE,
                &content[open.end()..]
            );
            return Ok((patched, PatchOutcome::Replaced));
        }

        let text_start = open.end();
        let text_end = content[text_start..]
            .find(TEXT_CLOSE)
            .map(|offset| text_start + offset)
            .ok_or_else(|| PatchError::UnterminatedNode(part.to_path_buf()))?;

        let patched = format!("{}{}{}", &content[..text_start], text, &content[text_end..]);
        return Ok((patched, PatchOutcome::Replaced));
    }

    let anchor = anchor_re()
        .find(content)
        .ok_or_else(|| PatchError::AnchorNotFound(part.to_path_buf()))?;

    let patched = format!(
        "{}{}{}",
        &content[..anchor.start()],
        answer_paragraph(text),
        &content[anchor.start()..]
    );
    Ok((patched, PatchOutcome::Inserted))
}

/// Read the current text of the answer slot, if any.
#[cfg(test)]
pub fn read_answer(content: &str) -> Option<&str> {
    let open = marker_re().find(content)?;
    if open.as_str().ends_with("/>") {
        return Some("");
    }
    let rest = &content[open.end()..];
    rest.find(TEXT_CLOSE).map(|end| &rest[..end])
}

/// Patch the part file at `part` in place.
pub fn patch(part: &Path, text: &str) -> Result<PatchOutcome, PatchError> {
    let io_err = |source| PatchError::Io {
        path: part.to_path_buf(),
        source,
    };

    let content = std::fs::read_to_string(part).map_err(io_err)?;
    let (patched, outcome) = patch_content(&content, text, part)?;
    if patched != content {
        std::fs::write(part, patched).map_err(io_err)?;
    }
    Ok(outcome)
}
