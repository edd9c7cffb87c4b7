//! Translation catalog data model.
//!
//! One [`TranslationCatalog`] is one `.ts` file: a locale plus an ordered list
//! of contexts, each holding an ordered list of messages.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Key identifying a message inside a catalog.
///
/// This is the key the runtime lookup uses: `(context, source, disambiguation)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageKey {
    pub context: String,
    pub source: String,
    pub disambiguation: Option<String>,
}

impl MessageKey {
    #[must_use]
    pub fn new(
        context: impl Into<String>,
        source: impl Into<String>,
        disambiguation: Option<String>,
    ) -> Self {
        Self {
            context: context.into(),
            source: source.into(),
            disambiguation: disambiguation.filter(|comment| !comment.is_empty()),
        }
    }
}

/// A whole `.ts` document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TranslationCatalog {
    /// Format version of the `<TS>` element (`2.0`, `2.1`).
    pub version: Option<String>,
    /// Target locale, e.g. `uk_UA`.
    pub language: Option<String>,
    pub source_language: Option<String>,
    /// Legacy `<defaultcodec>` element, kept so that it survives a rewrite.
    pub default_codec: Option<String>,
    /// Catalogs listed under `<dependencies>`.
    pub dependencies: Vec<String>,
    pub contexts: Vec<Context>,
}

impl TranslationCatalog {
    #[must_use]
    pub fn new(language: Option<String>) -> Self {
        Self { version: Some("2.1".to_string()), language, ..Self::default() }
    }

    /// Iterates over every message in document order together with its context.
    pub fn messages(&self) -> impl Iterator<Item = (&Context, &Message)> {
        self.contexts
            .iter()
            .flat_map(|context| context.messages.iter().map(move |message| (context, message)))
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.contexts.iter().map(|context| context.messages.len()).sum()
    }

    #[must_use]
    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|context| context.name == name)
    }

    /// Returns the context with the given name, appending it if missing.
    #[allow(clippy::indexing_slicing)]
    pub fn context_mut_or_insert(&mut self, name: &str) -> &mut Context {
        let index = match self.contexts.iter().position(|context| context.name == name) {
            Some(index) => index,
            None => {
                self.contexts.push(Context::new(name));
                self.contexts.len() - 1
            }
        };
        &mut self.contexts[index]
    }

    /// Finds the first message matching the given key parts.
    #[must_use]
    pub fn find(
        &self,
        context: &str,
        source: &str,
        disambiguation: Option<&str>,
    ) -> Option<&Message> {
        self.context(context)?
            .messages
            .iter()
            .find(|message| message.source == source && message.disambiguation() == disambiguation)
    }
}

/// A `<context>` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Context {
    pub name: String,
    pub comment: Option<String>,
    pub messages: Vec<Message>,
}

impl Context {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), comment: None, messages: Vec::new() }
    }
}

/// A `<message>` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub id: Option<String>,
    /// `numerus="yes"`: the translation is a list of plural forms.
    pub numerus: bool,
    pub locations: Vec<Location>,
    pub source: String,
    pub old_source: Option<String>,
    /// Disambiguation comment, part of the lookup key.
    pub comment: Option<String>,
    pub old_comment: Option<String>,
    /// Developer comment (`//:` in C++ sources).
    pub extra_comment: Option<String>,
    pub translator_comment: Option<String>,
    pub translation: Translation,
}

impl Message {
    /// Creates an untranslated message for `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), ..Self::default() }
    }

    /// Disambiguation comment, with an empty comment treated as none.
    #[must_use]
    pub fn disambiguation(&self) -> Option<&str> {
        self.comment.as_deref().filter(|comment| !comment.is_empty())
    }

    #[must_use]
    pub fn key(&self, context: &str) -> MessageKey {
        MessageKey::new(context, self.source.clone(), self.disambiguation().map(str::to_string))
    }
}

/// A `<location>` element, resolved to an absolute line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Location {
    pub filename: Option<String>,
    /// 1-based line in `filename`.
    pub line: Option<u32>,
}

impl Location {
    #[must_use]
    pub fn new(filename: impl Into<String>, line: u32) -> Self {
        Self { filename: Some(filename.into()), line: Some(line) }
    }
}

/// The `type` attribute of `<translation>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationKind {
    /// No `type` attribute.
    Finished,
    #[default]
    Unfinished,
    /// Removed from the sources since the last update.
    Vanished,
    /// Pre-5.x spelling of `Vanished`.
    Obsolete,
}

impl TranslationKind {
    /// Vanished and obsolete messages are kept for reference only.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Finished | Self::Unfinished)
    }

    /// Attribute value, `None` for finished translations.
    #[must_use]
    pub const fn attribute(self) -> Option<&'static str> {
        match self {
            Self::Finished => None,
            Self::Unfinished => Some("unfinished"),
            Self::Vanished => Some("vanished"),
            Self::Obsolete => Some("obsolete"),
        }
    }
}

impl fmt::Display for TranslationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.attribute().unwrap_or("finished"))
    }
}

impl FromStr for TranslationKind {
    type Err = UnknownTranslationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "finished" => Ok(Self::Finished),
            "unfinished" => Ok(Self::Unfinished),
            "vanished" => Ok(Self::Vanished),
            "obsolete" => Ok(Self::Obsolete),
            other => Err(UnknownTranslationKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown translation type '{0}'")]
pub struct UnknownTranslationKind(pub String);

/// Content of a `<translation>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationBody {
    Text(String),
    /// One string per `<numerusform>`.
    NumerusForms(Vec<String>),
}

impl Default for TranslationBody {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

/// A `<translation>` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Translation {
    pub kind: TranslationKind,
    pub body: TranslationBody,
}

impl Translation {
    #[must_use]
    pub fn finished(text: impl Into<String>) -> Self {
        Self { kind: TranslationKind::Finished, body: TranslationBody::Text(text.into()) }
    }

    #[must_use]
    pub fn unfinished(text: impl Into<String>) -> Self {
        Self { kind: TranslationKind::Unfinished, body: TranslationBody::Text(text.into()) }
    }

    #[must_use]
    pub const fn numerus(kind: TranslationKind, forms: Vec<String>) -> Self {
        Self { kind, body: TranslationBody::NumerusForms(forms) }
    }

    /// All translated strings: one for plain text, one per plural form.
    #[must_use]
    pub fn forms(&self) -> Vec<&str> {
        match &self.body {
            TranslationBody::Text(text) => vec![text.as_str()],
            TranslationBody::NumerusForms(forms) => forms.iter().map(String::as_str).collect(),
        }
    }

    /// True when no form carries any text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forms().iter().all(|form| form.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn sample_catalog() -> TranslationCatalog {
        let mut catalog = TranslationCatalog::new(Some("de".to_string()));
        let context = catalog.context_mut_or_insert("AddTask");
        context.messages.push(Message {
            translation: Translation::finished("Abbrechen"),
            ..Message::new("Cancel")
        });
        context.messages.push(Message {
            comment: Some("verb".to_string()),
            translation: Translation::unfinished("Öffnen"),
            ..Message::new("Open")
        });
        catalog
    }

    #[googletest::test]
    fn find_respects_disambiguation() {
        let catalog = sample_catalog();

        expect_that!(catalog.find("AddTask", "Cancel", None), some(anything()));
        expect_that!(catalog.find("AddTask", "Open", Some("verb")), some(anything()));
        expect_that!(catalog.find("AddTask", "Open", None), none());
        expect_that!(catalog.find("Other", "Cancel", None), none());
    }

    #[googletest::test]
    fn context_mut_or_insert_reuses_existing() {
        let mut catalog = sample_catalog();

        catalog.context_mut_or_insert("AddTask");
        catalog.context_mut_or_insert("Browser");

        expect_that!(catalog.contexts.len(), eq(2));
        expect_that!(catalog.message_count(), eq(2));
    }

    #[googletest::test]
    fn empty_comment_is_no_disambiguation() {
        let message = Message { comment: Some(String::new()), ..Message::new("Open") };

        expect_that!(message.disambiguation(), none());
        expect_that!(message.key("Ctx").disambiguation, none());
    }

    #[rstest]
    #[case::text(Translation::finished(""), true)]
    #[case::filled(Translation::unfinished("x"), false)]
    #[case::empty_forms(Translation::numerus(TranslationKind::Finished, vec![String::new(); 3]), true)]
    #[case::one_form(
        Translation::numerus(TranslationKind::Finished, vec![String::new(), "a".to_string()]),
        false
    )]
    fn translation_is_empty(#[case] translation: Translation, #[case] expected: bool) {
        assert_eq!(translation.is_empty(), expected);
    }

    #[rstest]
    #[case("unfinished", TranslationKind::Unfinished)]
    #[case("vanished", TranslationKind::Vanished)]
    #[case("obsolete", TranslationKind::Obsolete)]
    #[case("", TranslationKind::Finished)]
    fn translation_kind_from_str(#[case] value: &str, #[case] expected: TranslationKind) {
        assert_eq!(value.parse::<TranslationKind>().unwrap(), expected);
    }

    #[rstest]
    fn translation_kind_rejects_unknown() {
        assert!("done".parse::<TranslationKind>().is_err());
    }
}
