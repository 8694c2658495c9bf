//! Ignored-tag pruning ahead of validation.
//!
//! Some elements carry content that is not the document author's HTML:
//! code samples, preformatted text, inline SVG. Linting inside them
//! produces noise, so those subtrees are removed before the text
//! reaches the engine. Everything outside them must survive byte for
//! byte. Entity references stay encoded and untouched text keeps its
//! line and column positions, which the violation frames depend on.
//!
//! The scan is a single streaming pass that copies raw input spans
//! between events instead of re-serializing a parse tree, so nothing
//! the parser tolerates gets normalized away.

use log::debug;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Removes every element named in `ignore_tags`, content and all, and
/// returns the remaining markup. Tag names match case-insensitively.
///
/// Malformed markup never fails the scan. An ignored element left open
/// swallows the rest of the document, and input the parser cannot make
/// sense of is kept as-is from the point of the error.
pub fn strip_ignored_tags(html: &str, ignore_tags: &[String]) -> String {
    if ignore_tags.is_empty() {
        return html.to_string();
    }
    let ignored: Vec<String> = ignore_tags
        .iter()
        .map(|tag| tag.to_ascii_lowercase())
        .collect();

    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(false);
    // Stray and mismatched closing tags are routine in the wild.
    config.check_end_names = false;

    let mut output = String::with_capacity(html.len());
    // Depth within the ignored element currently being skipped;
    // 0 means copying. Only elements matching `skip_name` count, so
    // nesting the same tag inside itself stays balanced.
    let mut skip_name = String::new();
    let mut skip_depth = 0usize;
    let mut span_start = 0usize;

    loop {
        let event = reader.read_event();
        let span_end = (reader.buffer_position() as usize).min(html.len());
        let span = &html[span_start..span_end];

        match event {
            Ok(Event::Start(ref e)) => {
                let name = tag_name(e.name().as_ref());
                if skip_depth > 0 {
                    if name == skip_name {
                        skip_depth += 1;
                    }
                } else if ignored.contains(&name) {
                    skip_name = name;
                    skip_depth = 1;
                } else {
                    output.push_str(span);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = tag_name(e.name().as_ref());
                if skip_depth > 0 {
                    if name == skip_name {
                        skip_depth -= 1;
                    }
                } else {
                    output.push_str(span);
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = tag_name(e.name().as_ref());
                if skip_depth == 0 && !ignored.contains(&name) {
                    output.push_str(span);
                }
            }
            Ok(Event::Eof) => break,
            // Text, comments, CDATA, doctype, processing instructions:
            // copied verbatim unless inside an ignored subtree. Entity
            // references ride along in text spans without decoding.
            Ok(_) => {
                if skip_depth == 0 {
                    output.push_str(span);
                }
            }
            Err(err) => {
                debug!("tolerating markup error at byte {span_start}: {err}");
                if skip_depth == 0 {
                    output.push_str(&html[span_start..]);
                }
                break;
            }
        }

        span_start = span_end;
    }

    output
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}
