//! Runtime lookup over a compiled catalog.
//!
//! Compiling keeps only the translations a release build would ship and
//! indexes them by message key; [`CompiledCatalog::translate`] then resolves
//! messages the way `QTranslator::translate` does.

use std::collections::HashMap;

use super::model::{
    MessageKey,
    TranslationBody,
    TranslationCatalog,
    TranslationKind,
};
use super::plural::{
    PluralRule,
    plural_rule,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Ship translations still marked unfinished.
    pub include_unfinished: bool,
    /// Skip translations identical to their source text.
    pub remove_identical: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { include_unfinished: true, remove_identical: false }
    }
}

/// Translations indexed by message key.
#[derive(Debug, Clone, Default)]
pub struct CompiledCatalog {
    language: Option<String>,
    plural_rule: Option<PluralRule>,
    entries: HashMap<MessageKey, TranslationBody>,
}

impl CompiledCatalog {
    /// Builds the lookup table of `catalog`.
    ///
    /// Vanished, obsolete and empty translations are never included. When a
    /// key appears twice the first translation wins.
    #[must_use]
    pub fn compile(catalog: &TranslationCatalog, options: &CompileOptions) -> Self {
        let mut entries = HashMap::new();
        for (context, message) in catalog.messages() {
            let translation = &message.translation;
            let included = match translation.kind {
                TranslationKind::Finished => true,
                TranslationKind::Unfinished => options.include_unfinished,
                TranslationKind::Vanished | TranslationKind::Obsolete => false,
            };
            if !included || translation.is_empty() {
                continue;
            }
            if options.remove_identical
                && translation.forms().iter().all(|form| *form == message.source)
            {
                continue;
            }
            entries.entry(message.key(&context.name)).or_insert_with(|| translation.body.clone());
        }

        let language = catalog.language.clone();
        Self { plural_rule: language.as_deref().and_then(plural_rule), language, entries }
    }

    /// Looks up a translation.
    ///
    /// Tries the exact key first, then the same message without
    /// disambiguation. For numerus messages `n` selects the plural form; a
    /// missing `n` counts as 1.
    #[must_use]
    pub fn translate(
        &self,
        context: &str,
        source: &str,
        disambiguation: Option<&str>,
        n: Option<u64>,
    ) -> Option<&str> {
        let exact = MessageKey::new(context, source, disambiguation.map(str::to_string));
        let body = match self.entries.get(&exact) {
            Some(body) => body,
            None if exact.disambiguation.is_some() => {
                self.entries.get(&MessageKey::new(context, source, None))?
            }
            None => return None,
        };

        match body {
            TranslationBody::Text(text) => Some(text.as_str()),
            TranslationBody::NumerusForms(forms) => {
                let index = self.plural_rule.map_or(0, |rule| rule.form_index(n.unwrap_or(1)));
                forms
                    .get(index)
                    .or_else(|| forms.last())
                    .map(String::as_str)
                    .filter(|form| !form.is_empty())
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}
