//! Well-formedness checks and pretty-print normalization for watched parts.
//!
//! Normalization drops whitespace-only text between elements and re-indents
//! the tree, so that after every unpack the watched parts have a stable,
//! line-oriented layout. Whitespace that is the sole content of an element
//! (e.g. `<w:t xml:space="preserve"> </w:t>`) is kept.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesText, Event};

use crate::error::{Result, SyncError};

/// What the previously written event was, for blank-text decisions.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Prev {
    Markup,
    Start,
    Text,
}

/// Parse `content` and re-emit it indented. Returns the reason on malformed input.
pub fn normalize_xml(content: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut reader = Reader::from_reader(content);
    let mut writer = Writer::new_with_indent(Vec::with_capacity(content.len()), b' ', 2);
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut pending_blank: Option<BytesText<'static>> = None;
    let mut prev = Prev::Markup;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("at byte {}: {e}", reader.error_position()))?;

        // A held-back blank is kept when it turns out to be the whole content
        // of an element or the start of a text run.
        if let Some(blank) = pending_blank.take()
            && matches!(event, Event::End(_) | Event::Text(_) | Event::GeneralRef(_))
        {
            writer.write_event(Event::Text(blank)).map_err(|e| e.to_string())?;
        }

        let event = match event {
            Event::Eof => break,
            Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => match prev {
                Prev::Text => Event::Text(text),
                Prev::Start => {
                    pending_blank = Some(text.into_owned());
                    prev = Prev::Markup;
                    continue;
                }
                Prev::Markup => continue,
            },
            Event::GeneralRef(entity) => {
                let escaped = format!("&{};", String::from_utf8_lossy(&entity));
                Event::Text(BytesText::from_escaped(escaped))
            }
            Event::Start(start) => {
                depth += 1;
                seen_root = true;
                Event::Start(start)
            }
            Event::Empty(empty) => {
                seen_root = true;
                Event::Empty(empty)
            }
            Event::End(end) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "closing tag without matching opening tag".to_string())?;
                Event::End(end)
            }
            other => other,
        };
        prev = match event {
            Event::Start(_) => Prev::Start,
            Event::Text(_) => Prev::Text,
            _ => Prev::Markup,
        };

        writer.write_event(event).map_err(|e| e.to_string())?;
    }

    if depth > 0 {
        return Err(format!("{depth} element(s) left unclosed at end of input"));
    }
    if !seen_root {
        return Err("no root element".to_string());
    }

    Ok(writer.into_inner())
}

/// Check that `content` is well-formed markup.
pub fn check_well_formed(content: &[u8]) -> std::result::Result<(), String> {
    normalize_xml(content).map(|_| ())
}

/// Rewrite the part at `path` in normalized form.
pub fn normalize_part(path: &Path) -> Result<()> {
    let content = std::fs::read(path)?;
    let normalized = normalize_xml(&content).map_err(|reason| SyncError::MalformedPart {
        path: path.to_path_buf(),
        reason,
    })?;
    std::fs::write(path, normalized)?;
    Ok(())
}

/// Check that the part at `path` parses.
pub fn validate_part(path: &Path) -> Result<()> {
    let content = std::fs::read(path)?;
    check_well_formed(&content).map_err(|reason| SyncError::MalformedPart {
        path: path.to_path_buf(),
        reason,
    })
}
