//! `.ts` XML reader.
//!
//! Builds a [`TranslationCatalog`] from catalog text. The reader is lenient:
//! unknown attributes and `extra-*` elements are skipped, and messages without
//! a `<source>` are dropped and reported instead of failing the whole file.

use std::collections::HashMap;
use std::fmt::Write as _;

use xmltree::{
    Element,
    ParserConfig,
    XMLNode,
};

use super::error::CatalogError;
use super::model::{
    Context,
    Location,
    Message,
    Translation,
    TranslationBody,
    TranslationCatalog,
    TranslationKind,
};

/// Separator Qt uses between length variants of one translation.
pub const LENGTH_VARIANT_SEPARATOR: char = '\u{9c}';

/// A catalog together with what the reader had to leave out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedCatalog {
    pub catalog: TranslationCatalog,
    /// Document-order index of every kept message, aligned with
    /// `catalog.contexts[i].messages[j]`.
    pub message_indices: Vec<Vec<usize>>,
    /// Messages dropped because they had no `<source>`.
    pub dropped: Vec<DroppedMessage>,
}

impl ParsedCatalog {
    /// Document-order index of the `j`-th message of the `i`-th context.
    #[must_use]
    pub fn document_index(&self, context: usize, message: usize) -> Option<usize> {
        self.message_indices.get(context)?.get(message).copied()
    }

    /// Inverse of [`Self::document_index`]: `(context, message)` indices of
    /// a kept message.
    #[must_use]
    pub fn message_position(&self, document_index: usize) -> Option<(usize, usize)> {
        self.message_indices.iter().enumerate().find_map(|(context, indices)| {
            indices.iter().position(|index| *index == document_index).map(|message| (context, message))
        })
    }
}

/// A `<message>` the reader could not turn into a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedMessage {
    pub context: String,
    pub document_index: usize,
}

/// Returns true if `text` looks like a Qt Linguist catalog.
///
/// `.ts` is also the TypeScript extension, so files are sniffed for a `<TS`
/// root element before the XML parser runs.
#[must_use]
pub fn is_catalog_text(text: &str) -> bool {
    let mut rest = text.trim_start_matches('\u{feff}').trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("<?") {
            let Some(end) = after.find("?>") else { return false };
            rest = after.get(end + 2..).unwrap_or_default().trim_start();
        } else if let Some(after) = rest.strip_prefix("<!--") {
            let Some(end) = after.find("-->") else { return false };
            rest = after.get(end + 3..).unwrap_or_default().trim_start();
        } else if let Some(after) = rest.strip_prefix("<!") {
            let Some(end) = after.find('>') else { return false };
            rest = after.get(end + 1..).unwrap_or_default().trim_start();
        } else {
            break;
        }
    }

    rest.strip_prefix("<TS")
        .and_then(|after| after.chars().next())
        .is_some_and(|ch| ch.is_whitespace() || ch == '>' || ch == '/')
}

/// Parses catalog text.
///
/// # Errors
/// - [`CatalogError::Xml`] if the text is not well-formed XML
/// - [`CatalogError::NotACatalog`] if the root element is not `<TS>`
pub fn parse_catalog(text: &str) -> Result<ParsedCatalog, CatalogError> {
    let text = text.trim_start_matches('\u{feff}');
    // 空白だけのテキストも文字列の一部 (`Name:<byte value="x9"/> ` など)
    let config = ParserConfig::new().trim_whitespace(false).whitespace_to_characters(true);
    let root = Element::parse_with_config(text.as_bytes(), config)?;
    if root.name != "TS" {
        return Err(CatalogError::NotACatalog(root.name));
    }

    let mut reader = CatalogReader::default();
    let mut parsed = ParsedCatalog {
        catalog: TranslationCatalog {
            version: root.attributes.get("version").cloned(),
            language: root.attributes.get("language").cloned().filter(|lang| !lang.is_empty()),
            source_language: root
                .attributes
                .get("sourcelanguage")
                .cloned()
                .filter(|lang| !lang.is_empty()),
            ..TranslationCatalog::default()
        },
        ..ParsedCatalog::default()
    };

    for child in child_elements(&root) {
        match child.name.as_str() {
            "context" => {
                let (context, indices) = reader.read_context(child, &mut parsed.dropped);
                parsed.catalog.contexts.push(context);
                parsed.message_indices.push(indices);
            }
            "defaultcodec" => parsed.catalog.default_codec = Some(element_text(child)),
            "dependencies" => {
                parsed.catalog.dependencies = child_elements(child)
                    .filter(|dependency| dependency.name == "dependency")
                    .filter_map(|dependency| dependency.attributes.get("catalog").cloned())
                    .collect();
            }
            other => {
                tracing::debug!(element = other, "Skipping unknown catalog element");
            }
        }
    }

    Ok(parsed)
}

/// Reader state that spans messages: relative `<location>` resolution.
#[derive(Debug, Default)]
struct CatalogReader {
    /// Next document-order message index.
    next_index: usize,
    /// File of the first location of the last message that named one.
    current_file: Option<String>,
    /// Last line seen per file, for `line="+N"` locations.
    current_lines: HashMap<String, i64>,
}

impl CatalogReader {
    fn read_context(
        &mut self,
        element: &Element,
        dropped: &mut Vec<DroppedMessage>,
    ) -> (Context, Vec<usize>) {
        let mut context = Context::default();
        let mut indices = Vec::new();

        for child in child_elements(element) {
            match child.name.as_str() {
                "name" => context.name = element_text(child),
                "comment" => context.comment = Some(element_text(child)),
                "message" => {
                    let index = self.next_index;
                    self.next_index += 1;
                    match self.read_message(child) {
                        Some(message) => {
                            context.messages.push(message);
                            indices.push(index);
                        }
                        None => dropped.push(DroppedMessage {
                            context: context.name.clone(),
                            document_index: index,
                        }),
                    }
                }
                _ => {}
            }
        }

        (context, indices)
    }

    fn read_message(&mut self, element: &Element) -> Option<Message> {
        let mut source = None;
        let mut message = Message {
            id: element.attributes.get("id").cloned(),
            numerus: element.attributes.get("numerus").is_some_and(|value| is_yes(value)),
            ..Message::default()
        };

        let mut message_file = self.current_file.clone();
        for child in child_elements(element) {
            match child.name.as_str() {
                "location" => {
                    let location = self.read_location(child, &mut message_file, &message);
                    message.locations.push(location);
                }
                "source" => source = Some(element_text(child)),
                "oldsource" => message.old_source = Some(element_text(child)),
                "comment" => message.comment = Some(element_text(child)),
                "oldcomment" => message.old_comment = Some(element_text(child)),
                "extracomment" => message.extra_comment = Some(element_text(child)),
                "translatorcomment" => message.translator_comment = Some(element_text(child)),
                "translation" => message.translation = read_translation(child, message.numerus),
                name if name.starts_with("extra-") => {}
                name => tracing::debug!(element = name, "Skipping unknown message element"),
            }
        }

        message.source = source?;
        Some(message)
    }

    fn read_location(
        &mut self,
        element: &Element,
        message_file: &mut Option<String>,
        message: &Message,
    ) -> Location {
        let filename = match element.attributes.get("filename").filter(|name| !name.is_empty()) {
            Some(name) => {
                if message.locations.is_empty() {
                    self.current_file = Some(name.clone());
                }
                *message_file = Some(name.clone());
                Some(name.clone())
            }
            None => message_file.clone(),
        };

        let line = element.attributes.get("line").and_then(|raw| {
            let raw = raw.trim();
            let value: i64 = raw.parse().ok()?;
            if raw.starts_with('+') || raw.starts_with('-') {
                let key = filename.clone().unwrap_or_default();
                let current = self.current_lines.entry(key).or_insert(0);
                *current += value;
                u32::try_from(*current).ok()
            } else {
                u32::try_from(value).ok()
            }
        });

        Location { filename, line }
    }
}

fn read_translation(element: &Element, numerus: bool) -> Translation {
    let kind = element
        .attributes
        .get("type")
        .map_or(TranslationKind::Finished, |value| {
            value.parse().unwrap_or_else(|err| {
                tracing::debug!(%err, "Treating unknown translation type as finished");
                TranslationKind::Finished
            })
        });

    let forms: Vec<String> = child_elements(element)
        .filter(|child| child.name == "numerusform")
        .map(variant_text)
        .collect();

    let body = if !forms.is_empty() {
        TranslationBody::NumerusForms(forms)
    } else if numerus {
        let text = variant_text(element);
        TranslationBody::NumerusForms(if text.trim().is_empty() { Vec::new() } else { vec![text] })
    } else {
        TranslationBody::Text(variant_text(element))
    };

    Translation { kind, body }
}

/// Text of an element that may hold `<lengthvariant>` children.
fn variant_text(element: &Element) -> String {
    let variants: Vec<String> = child_elements(element)
        .filter(|child| child.name == "lengthvariant")
        .map(element_text)
        .collect();

    if variants.is_empty() {
        element_text(element)
    } else {
        variants.join(&LENGTH_VARIANT_SEPARATOR.to_string())
    }
}

/// Concatenated character data of an element, with `<byte>` escapes decoded.
fn element_text(element: &Element) -> String {
    let mut text = String::new();
    for node in &element.children {
        match node {
            XMLNode::Text(chunk) | XMLNode::CData(chunk) => text.push_str(chunk),
            XMLNode::Element(child) if child.name == "byte" => {
                if let Some(ch) = child.attributes.get("value").and_then(|value| decode_byte(value))
                {
                    let _ = write!(text, "{ch}");
                }
            }
            _ => {}
        }
    }
    text
}

/// Decodes the `value` of a `<byte>` element: decimal, `x3e8` or `0x3e8`.
fn decode_byte(value: &str) -> Option<char> {
    let code = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix('x')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        value.parse().ok()?
    };
    if code == 0 { None } else { char::from_u32(code) }
}

fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|node| match node {
        XMLNode::Element(child) => Some(child),
        _ => None,
    })
}

fn is_yes(value: &str) -> bool {
    matches!(value, "yes" | "true")
}
