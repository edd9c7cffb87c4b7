//! Source ranges of catalog elements.
//!
//! The XML tree carries no positions, so a second lightweight pass over the
//! raw text records where every `<context>` and `<message>` sits. Messages are
//! numbered in document order, the same order the parser assigns.

use crate::types::{
    LineIndex,
    SourceRange,
};

/// Ranges of the interesting parts of a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogSpans {
    /// The `<TS ...>` start tag.
    pub root: Option<SourceRange>,
    pub contexts: Vec<ContextSpan>,
    /// Every `<message>` directly inside a `<context>`, in document order.
    pub messages: Vec<MessageSpan>,
}

impl CatalogSpans {
    /// Document-order index of the message containing `position`.
    #[must_use]
    pub fn message_at(&self, position: crate::types::SourcePosition) -> Option<usize> {
        self.messages.iter().position(|span| span.element.contains(position))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextSpan {
    pub element: SourceRange,
    /// The `<name>` element.
    pub name: Option<SourceRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageSpan {
    /// From `<message` to `</message>`.
    pub element: SourceRange,
    pub start_tag: SourceRange,
    pub source: Option<SourceRange>,
    pub locations: Vec<SourceRange>,
    pub translation: Option<SourceRange>,
    /// The ` type="..."` attribute of `<translation>`, leading whitespace included.
    pub translation_type: Option<SourceRange>,
}

impl MessageSpan {
    /// Range to point diagnostics at: the source text when known.
    #[must_use]
    pub fn anchor(&self) -> SourceRange {
        self.source.unwrap_or(self.start_tag)
    }
}

/// An element that has been opened but not closed yet.
#[derive(Debug)]
struct OpenElement {
    name: String,
    start: usize,
    /// Index into `contexts` or `messages` for the two tracked elements.
    slot: Option<usize>,
}

/// Scans `text` and returns the spans of its contexts and messages.
///
/// Malformed input never fails: unterminated constructs end the scan and
/// unclosed elements keep the range of their start tag.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn scan_spans(text: &str) -> CatalogSpans {
    let index = LineIndex::new(text);
    let mut spans = CatalogSpans::default();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut cursor = 0;

    while let Some(relative) = text.get(cursor..).and_then(|rest| rest.find('<')) {
        let start = cursor + relative;
        let rest = text.get(start..).unwrap_or_default();

        let skip_to = |terminator: &str| {
            rest.find(terminator).map(|end| start + end + terminator.len())
        };
        if rest.starts_with("<!--") {
            let Some(next) = skip_to("-->") else { break };
            cursor = next;
            continue;
        }
        if rest.starts_with("<![CDATA[") {
            let Some(next) = skip_to("]]>") else { break };
            cursor = next;
            continue;
        }
        if rest.starts_with("<?") {
            let Some(next) = skip_to("?>") else { break };
            cursor = next;
            continue;
        }
        if rest.starts_with("<!") {
            let Some(next) = skip_to(">") else { break };
            cursor = next;
            continue;
        }

        let Some(tag_len) = tag_length(rest) else { break };
        let end = start + tag_len;
        let tag = rest.get(..tag_len).unwrap_or_default();
        cursor = end;

        if let Some(closing) = tag.strip_prefix("</") {
            let name = closing.trim_end_matches('>').trim();
            close_element(&mut spans, &mut stack, &index, text, name, end);
            continue;
        }

        let name = tag_name(tag);
        let self_closing = tag.ends_with("/>");
        let tag_range = index.range(text, start, end);
        let parent = stack.last().map(|open| open.name.as_str());

        let slot = match (name, parent) {
            ("TS", None) => {
                spans.root = Some(tag_range);
                None
            }
            ("context", Some("TS")) => {
                spans.contexts.push(ContextSpan { element: tag_range, name: None });
                Some(spans.contexts.len() - 1)
            }
            ("message", Some("context")) => {
                spans.messages.push(MessageSpan {
                    element: tag_range,
                    start_tag: tag_range,
                    ..MessageSpan::default()
                });
                Some(spans.messages.len() - 1)
            }
            ("location", Some("message")) => {
                if let Some(message) = current_message(&mut spans, &stack) {
                    message.locations.push(tag_range);
                }
                None
            }
            ("translation", Some("message")) => {
                let type_attribute = attribute_range(tag, "type")
                    .map(|(from, to)| index.range(text, start + from, start + to));
                if let Some(message) = current_message(&mut spans, &stack) {
                    message.translation = Some(tag_range);
                    message.translation_type = type_attribute;
                }
                None
            }
            ("source", Some("message")) => {
                if let Some(message) = current_message(&mut spans, &stack) {
                    message.source = Some(tag_range);
                }
                None
            }
            _ => None,
        };

        if !self_closing {
            stack.push(OpenElement { name: name.to_string(), start, slot });
        }
    }

    spans
}

fn close_element(
    spans: &mut CatalogSpans,
    stack: &mut Vec<OpenElement>,
    index: &LineIndex,
    text: &str,
    name: &str,
    end: usize,
) {
    // Pop up to the matching element so that a stray end tag does not
    // desynchronize everything after it.
    let Some(depth) = stack.iter().rposition(|open| open.name == name) else {
        return;
    };
    let closed: Vec<OpenElement> = stack.drain(depth..).collect();
    let Some(element) = closed.into_iter().next() else {
        return;
    };
    let range = index.range(text, element.start, end);
    let parent = stack.last().map(|open| open.name.as_str());

    match (element.name.as_str(), parent) {
        ("context", _) => {
            if let Some(context) = element.slot.and_then(|slot| spans.contexts.get_mut(slot)) {
                context.element = range;
            }
        }
        ("message", _) => {
            if let Some(message) = element.slot.and_then(|slot| spans.messages.get_mut(slot)) {
                message.element = range;
            }
        }
        ("name", Some("context")) => {
            let slot = stack.last().and_then(|open| open.slot);
            if let Some(context) = slot.and_then(|slot| spans.contexts.get_mut(slot)) {
                context.name = Some(range);
            }
        }
        ("source", Some("message")) => {
            if let Some(message) = current_message(spans, stack) {
                message.source = Some(range);
            }
        }
        ("translation", Some("message")) => {
            if let Some(message) = current_message(spans, stack) {
                message.translation = Some(range);
            }
        }
        _ => {}
    }
}

fn current_message<'a>(
    spans: &'a mut CatalogSpans,
    stack: &[OpenElement],
) -> Option<&'a mut MessageSpan> {
    let open = stack.last().filter(|open| open.name == "message")?;
    spans.messages.get_mut(open.slot?)
}

/// Length in bytes of the tag starting at the beginning of `rest`,
/// honouring quoted attribute values.
fn tag_length(rest: &str) -> Option<usize> {
    let mut quote = None;
    for (offset, ch) in rest.char_indices().skip(1) {
        match (quote, ch) {
            (Some(open), ch) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '>') => return Some(offset + 1),
            (None, _) => {}
        }
    }
    None
}

fn tag_name(tag: &str) -> &str {
    let body = tag.trim_start_matches('<');
    let end = body
        .find(|ch: char| ch.is_whitespace() || ch == '>' || ch == '/')
        .unwrap_or(body.len());
    body.get(..end).unwrap_or_default()
}

/// Byte range of ` name="value"` inside a start tag, including the
/// whitespace before the attribute name.
fn attribute_range(tag: &str, wanted: &str) -> Option<(usize, usize)> {
    let name_end = 1 + tag_name(tag).len();
    let bytes = tag.as_bytes();
    let mut pos = name_end;

    while pos < bytes.len() {
        let attr_start = pos;
        while bytes.get(pos).is_some_and(u8::is_ascii_whitespace) {
            pos += 1;
        }
        let name_start = pos;
        while bytes.get(pos).is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/')) {
            pos += 1;
        }
        if pos == name_start {
            return None;
        }
        let name = tag.get(name_start..pos)?;
        while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace() || *b == b'=') {
            pos += 1;
        }
        let quote = *bytes.get(pos)?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_len = tag.get(pos + 1..)?.find(char::from(quote))?;
        pos += value_len + 2;
        if name == wanted {
            return Some((attr_start, pos));
        }
    }

    None
}
