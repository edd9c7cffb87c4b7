//! `.ts` XML writer.
//!
//! Output follows the layout lupdate produces: document declaration, doctype,
//! four-space indentation and message children in a fixed order. Locations are
//! always written with absolute line numbers.
//!
//! Indentation is inserted as explicit text nodes between child elements only.
//! Elements that carry character data are written verbatim, since the reader
//! keeps whitespace-only runs as part of the text.

use xmltree::{
    Element,
    EmitterConfig,
    XMLNode,
};

use super::error::CatalogError;
use super::model::{
    Context,
    Location,
    Message,
    TranslationBody,
    TranslationCatalog,
};
use super::parser::LENGTH_VARIANT_SEPARATOR;

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!DOCTYPE TS>\n";

/// Serializes a catalog to `.ts` text.
///
/// # Errors
/// - [`CatalogError::Write`] if the XML emitter fails
/// - [`CatalogError::Encoding`] if the emitted bytes are not UTF-8
pub fn write_catalog(catalog: &TranslationCatalog) -> Result<String, CatalogError> {
    let mut root = catalog_element(catalog);
    indent_children(&mut root, 0);

    let config = EmitterConfig::new()
        .perform_indent(false)
        .pad_self_closing(false)
        .write_document_declaration(false);

    let mut buffer = HEADER.as_bytes().to_vec();
    root.write_with_config(&mut buffer, config)?;
    buffer.push(b'\n');

    Ok(String::from_utf8(buffer)?)
}

const INDENT: &str = "    ";

/// Interleaves newline and indentation text between the children of container
/// elements. `<TS>` children start at column 0 like lupdate output.
fn indent_children(element: &mut Element, depth: usize) {
    let is_container = !element.children.is_empty()
        && element.children.iter().all(|node| {
            matches!(node, XMLNode::Element(child) if child.name != "byte")
        });
    if !is_container {
        return;
    }

    let children = std::mem::take(&mut element.children);
    for mut node in children {
        element.children.push(XMLNode::Text(format!("\n{}", INDENT.repeat(depth))));
        if let XMLNode::Element(child) = &mut node {
            indent_children(child, depth + 1);
        }
        element.children.push(node);
    }
    element.children.push(XMLNode::Text(format!("\n{}", INDENT.repeat(depth.saturating_sub(1)))));
}

fn catalog_element(catalog: &TranslationCatalog) -> Element {
    let mut root = Element::new("TS");
    if let Some(version) = &catalog.version {
        root.attributes.insert("version".to_string(), version.clone());
    }
    if let Some(language) = &catalog.language {
        root.attributes.insert("language".to_string(), language.clone());
    }
    if let Some(source_language) = &catalog.source_language {
        root.attributes.insert("sourcelanguage".to_string(), source_language.clone());
    }

    if let Some(codec) = &catalog.default_codec {
        push_child(&mut root, text_element("defaultcodec", codec));
    }
    if !catalog.dependencies.is_empty() {
        let mut dependencies = Element::new("dependencies");
        for name in &catalog.dependencies {
            let mut dependency = Element::new("dependency");
            dependency.attributes.insert("catalog".to_string(), name.clone());
            push_child(&mut dependencies, dependency);
        }
        push_child(&mut root, dependencies);
    }

    for context in &catalog.contexts {
        push_child(&mut root, context_element(context));
    }

    root
}

fn context_element(context: &Context) -> Element {
    let mut element = Element::new("context");
    push_child(&mut element, text_element("name", &context.name));
    if let Some(comment) = &context.comment {
        push_child(&mut element, text_element("comment", comment));
    }
    for message in &context.messages {
        push_child(&mut element, message_element(message));
    }
    element
}

fn message_element(message: &Message) -> Element {
    let mut element = Element::new("message");
    if let Some(id) = &message.id {
        element.attributes.insert("id".to_string(), id.clone());
    }
    if message.numerus {
        element.attributes.insert("numerus".to_string(), "yes".to_string());
    }

    for location in &message.locations {
        push_child(&mut element, location_element(location));
    }
    push_child(&mut element, text_element("source", &message.source));

    let optional = [
        ("oldsource", &message.old_source),
        ("comment", &message.comment),
        ("oldcomment", &message.old_comment),
        ("extracomment", &message.extra_comment),
        ("translatorcomment", &message.translator_comment),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            push_child(&mut element, text_element(name, value));
        }
    }

    let mut translation = Element::new("translation");
    if let Some(kind) = message.translation.kind.attribute() {
        translation.attributes.insert("type".to_string(), kind.to_string());
    }
    match &message.translation.body {
        TranslationBody::Text(text) => write_variants(&mut translation, text),
        TranslationBody::NumerusForms(forms) if forms.is_empty() => push_empty_text(&mut translation),
        TranslationBody::NumerusForms(forms) => {
            for form in forms {
                let mut numerus_form = Element::new("numerusform");
                write_variants(&mut numerus_form, form);
                push_child(&mut translation, numerus_form);
            }
        }
    }
    push_child(&mut element, translation);

    element
}

fn location_element(location: &Location) -> Element {
    let mut element = Element::new("location");
    if let Some(filename) = &location.filename {
        element.attributes.insert("filename".to_string(), filename.clone());
    }
    if let Some(line) = location.line {
        element.attributes.insert("line".to_string(), line.to_string());
    }
    element
}

/// Writes `text` into `element`, splitting length variants into
/// `<lengthvariant>` children.
fn write_variants(element: &mut Element, text: &str) {
    if text.is_empty() {
        push_empty_text(element);
        return;
    }
    if !text.contains(LENGTH_VARIANT_SEPARATOR) {
        push_text(element, text);
        return;
    }

    element.attributes.insert("variants".to_string(), "yes".to_string());
    for variant in text.split(LENGTH_VARIANT_SEPARATOR) {
        push_child(element, text_element("lengthvariant", variant));
    }
}

fn text_element(name: &str, text: &str) -> Element {
    let mut element = Element::new(name);
    push_text(&mut element, text);
    element
}

/// Appends character data, escaping characters XML cannot carry as
/// `<byte value="xN"/>` elements.
fn push_text(element: &mut Element, text: &str) {
    let mut chunk = String::new();
    for ch in text.chars() {
        if needs_byte_escape(ch) {
            if !chunk.is_empty() {
                element.children.push(XMLNode::Text(std::mem::take(&mut chunk)));
            }
            let mut byte = Element::new("byte");
            byte.attributes.insert("value".to_string(), format!("x{:x}", u32::from(ch)));
            push_child(element, byte);
        } else {
            chunk.push(ch);
        }
    }
    if !chunk.is_empty() {
        element.children.push(XMLNode::Text(chunk));
    }
}

/// `<translation type="unfinished"></translation>` のように開始・終了タグを
/// 両方書かせる（空要素のままだと `<translation/>` に正規化される）
fn push_empty_text(element: &mut Element) {
    element.children.push(XMLNode::Text(String::new()));
}

const fn needs_byte_escape(ch: char) -> bool {
    (ch as u32) < 0x20 && ch != '\n' && ch != '\t'
}

fn push_child(parent: &mut Element, child: Element) {
    parent.children.push(XMLNode::Element(child));
}
