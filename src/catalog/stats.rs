//! Translation progress counters.

use serde::Serialize;

use super::model::{
    TranslationCatalog,
    TranslationKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub contexts: usize,
    pub messages: usize,
    pub finished: usize,
    /// Unfinished messages that already carry some text.
    pub unfinished: usize,
    /// Unfinished messages without any text.
    pub untranslated: usize,
    /// Vanished and obsolete messages.
    pub obsolete: usize,
    pub numerus: usize,
}

impl CatalogStats {
    #[must_use]
    pub fn from_catalog(catalog: &TranslationCatalog) -> Self {
        let mut stats = Self { contexts: catalog.contexts.len(), ..Self::default() };

        for (_, message) in catalog.messages() {
            stats.messages += 1;
            if message.numerus {
                stats.numerus += 1;
            }
            match message.translation.kind {
                TranslationKind::Finished => stats.finished += 1,
                TranslationKind::Unfinished if message.translation.is_empty() => {
                    stats.untranslated += 1;
                }
                TranslationKind::Unfinished => stats.unfinished += 1,
                TranslationKind::Vanished | TranslationKind::Obsolete => stats.obsolete += 1,
            }
        }

        stats
    }

    /// Messages that still ship: everything except vanished and obsolete.
    #[must_use]
    pub const fn active(&self) -> usize {
        self.finished + self.unfinished + self.untranslated
    }

    /// Finished share of the active messages, rounded down; 100 when there
    /// is nothing to translate.
    #[must_use]
    pub const fn completion_percent(&self) -> usize {
        match self.active() {
            0 => 100,
            active => self.finished * 100 / active,
        }
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::catalog::model::{
        Message,
        Translation,
    };

    #[googletest::test]
    fn counts_messages_by_state() {
        let mut catalog = TranslationCatalog::new(Some("de".to_string()));
        let context = catalog.context_mut_or_insert("A");
        context.messages.push(Message { translation: Translation::finished("Ja"), ..Message::new("Yes") });
        context.messages.push(Message { translation: Translation::finished("Nein"), ..Message::new("No") });
        context.messages.push(Message { translation: Translation::unfinished("Vielleicht"), ..Message::new("Maybe") });
        let other = catalog.context_mut_or_insert("B");
        other.messages.push(Message { numerus: true, ..Message::new("%n item(s)") });
        other.messages.push(Message {
            translation: Translation { kind: TranslationKind::Vanished, ..Translation::finished("Alt") },
            ..Message::new("Old")
        });

        let stats = CatalogStats::from_catalog(&catalog);

        assert_eq!(
            stats,
            CatalogStats {
                contexts: 2,
                messages: 5,
                finished: 2,
                unfinished: 1,
                untranslated: 1,
                obsolete: 1,
                numerus: 1,
            }
        );
        expect_that!(stats.active(), eq(4));
        expect_that!(stats.completion_percent(), eq(50));
    }

    #[googletest::test]
    fn empty_catalog_is_complete() {
        let stats = CatalogStats::from_catalog(&TranslationCatalog::default());

        expect_that!(stats.completion_percent(), eq(100));
    }

    #[googletest::test]
    fn completion_rounds_down() {
        let stats = CatalogStats { finished: 2, untranslated: 1, ..CatalogStats::default() };

        expect_that!(stats.completion_percent(), eq(66));
    }
}
