//! Catalog merging.
//!
//! [`update_catalog`] brings an existing translation up to date with a fresh
//! template extracted from the sources; [`combine_catalogs`] concatenates
//! catalogs of the same language.

use std::collections::{
    HashMap,
    HashSet,
};

use serde::Serialize;

use super::model::{
    Message,
    MessageKey,
    Translation,
    TranslationBody,
    TranslationCatalog,
    TranslationKind,
};
use super::plural::plural_rule;

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Drop messages that disappeared from the template instead of keeping
    /// them as `vanished`.
    pub drop_obsolete: bool,
}

/// What [`update_catalog`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReport {
    /// Template messages that found their old translation.
    pub kept: usize,
    /// Template messages that start untranslated.
    pub added: usize,
    /// Old messages kept as `vanished`.
    pub vanished: usize,
    /// Old messages removed.
    pub dropped: usize,
    /// New messages that reused the translation of an identical source text.
    pub same_text: usize,
}

/// Position of a message: `(context index, message index)`.
type Slot = (usize, usize);

/// Updates `existing` to the message set of `template`.
///
/// Translations of matching messages are carried over; matching is by message
/// id first, then by `(context, source, disambiguation)`. Locations and
/// comments always come from the template.
#[must_use]
pub fn update_catalog(
    existing: &TranslationCatalog,
    template: &TranslationCatalog,
    options: &UpdateOptions,
) -> (TranslationCatalog, UpdateReport) {
    let mut report = UpdateReport::default();
    let mut result = TranslationCatalog {
        version: existing.version.clone().or_else(|| template.version.clone()),
        language: existing.language.clone().or_else(|| template.language.clone()),
        source_language: existing.source_language.clone().or_else(|| template.source_language.clone()),
        default_codec: existing.default_codec.clone(),
        dependencies: existing.dependencies.clone(),
        contexts: Vec::new(),
    };
    let form_count = result
        .language
        .as_deref()
        .and_then(plural_rule)
        .map_or(1, |rule| rule.form_count());

    let mut by_key: HashMap<MessageKey, Slot> = HashMap::new();
    let mut by_id: HashMap<&str, Slot> = HashMap::new();
    for (ci, context) in existing.contexts.iter().enumerate() {
        for (mi, message) in context.messages.iter().enumerate() {
            by_key.entry(message.key(&context.name)).or_insert((ci, mi));
            if let Some(id) = message.id.as_deref() {
                by_id.entry(id).or_insert((ci, mi));
            }
        }
    }

    // Exact matches first, so that the same-text heuristic only borrows from
    // messages no template entry claims.
    let mut matches: Vec<Vec<Option<Slot>>> = Vec::with_capacity(template.contexts.len());
    let mut used: HashSet<Slot> = HashSet::new();
    for context in &template.contexts {
        let row = context
            .messages
            .iter()
            .map(|message| {
                let free = |slot: Option<&Slot>| slot.copied().filter(|slot| !used.contains(slot));
                let slot = free(message.id.as_deref().and_then(|id| by_id.get(id)))
                    .or_else(|| free(by_key.get(&message.key(&context.name))))?;
                used.insert(slot);
                Some(slot)
            })
            .collect();
        matches.push(row);
    }

    let mut same_text: HashMap<&str, Vec<Slot>> = HashMap::new();
    for (ci, context) in existing.contexts.iter().enumerate() {
        for (mi, message) in context.messages.iter().enumerate() {
            if !used.contains(&(ci, mi)) && !message.translation.is_empty() {
                same_text.entry(message.source.as_str()).or_default().push((ci, mi));
            }
        }
    }

    for (context, row) in template.contexts.iter().zip(&matches) {
        let target = result.context_mut_or_insert(&context.name);
        if target.comment.is_none() {
            target.comment.clone_from(&context.comment);
        }

        for (message, slot) in context.messages.iter().zip(row) {
            let mut updated = Message {
                translation: Translation::default(),
                translator_comment: None,
                ..message.clone()
            };

            if let Some(old) = slot.and_then(|slot| lookup(existing, slot)) {
                updated.translation = old.translation.clone();
                updated.translator_comment.clone_from(&old.translator_comment);
                if !updated.translation.kind.is_active() {
                    updated.translation.kind = TranslationKind::Unfinished;
                }
                if old.source != message.source {
                    updated.old_source = Some(old.source.clone());
                }
                report.kept += 1;
            } else if let Some(old) = same_text
                .get(message.source.as_str())
                .and_then(|slots| {
                    slots.iter().find(|(ci, _)| {
                        existing.contexts.get(*ci).is_some_and(|old| old.name != context.name)
                    })
                })
                .and_then(|slot| lookup(existing, *slot))
            {
                updated.translation =
                    Translation { kind: TranslationKind::Unfinished, ..old.translation.clone() };
                report.same_text += 1;
            } else {
                updated.translation = untranslated(message.numerus, form_count);
                report.added += 1;
            }

            target.messages.push(updated);
        }
    }

    for (ci, context) in existing.contexts.iter().enumerate() {
        for (mi, message) in context.messages.iter().enumerate() {
            if used.contains(&(ci, mi)) {
                continue;
            }
            if options.drop_obsolete || message.translation.is_empty() {
                report.dropped += 1;
                continue;
            }

            let mut vanished = message.clone();
            if vanished.translation.kind != TranslationKind::Obsolete {
                vanished.translation.kind = TranslationKind::Vanished;
            }
            result.context_mut_or_insert(&context.name).messages.push(vanished);
            report.vanished += 1;
        }
    }

    tracing::debug!(
        kept = report.kept,
        added = report.added,
        vanished = report.vanished,
        dropped = report.dropped,
        same_text = report.same_text,
        "Catalog updated"
    );

    (result, report)
}

fn lookup(catalog: &TranslationCatalog, (ci, mi): Slot) -> Option<&Message> {
    catalog.contexts.get(ci)?.messages.get(mi)
}

fn untranslated(numerus: bool, form_count: usize) -> Translation {
    let body = if numerus {
        TranslationBody::NumerusForms(vec![String::new(); form_count])
    } else {
        TranslationBody::Text(String::new())
    };
    Translation { kind: TranslationKind::Unfinished, body }
}

/// Two catalogs disagree on the translation of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeConflict {
    pub key: MessageKey,
    /// Forms kept from the earlier catalog.
    pub kept: Vec<String>,
    /// Forms of the later catalog that were discarded.
    pub discarded: Vec<String>,
}

/// Concatenates catalogs; the first catalog to translate a message wins.
///
/// A message that is empty in an earlier catalog takes the translation of a
/// later one without a conflict.
#[must_use]
pub fn combine_catalogs(catalogs: &[TranslationCatalog]) -> (TranslationCatalog, Vec<MergeConflict>) {
    let mut result = catalogs
        .first()
        .map(|first| TranslationCatalog { contexts: Vec::new(), ..first.clone() })
        .unwrap_or_default();
    let mut conflicts = Vec::new();
    let mut slots: HashMap<MessageKey, Slot> = HashMap::new();

    for catalog in catalogs {
        for context in &catalog.contexts {
            for message in &context.messages {
                let key = message.key(&context.name);
                let existing = slots
                    .get(&key)
                    .and_then(|&(ci, mi)| result.contexts.get_mut(ci)?.messages.get_mut(mi));

                if let Some(existing) = existing {
                    if message.translation.is_empty() || existing.translation == message.translation {
                        continue;
                    }
                    if existing.translation.is_empty() {
                        existing.translation = message.translation.clone();
                    } else if existing.translation.forms() != message.translation.forms() {
                        conflicts.push(MergeConflict {
                            key,
                            kept: owned_forms(&existing.translation),
                            discarded: owned_forms(&message.translation),
                        });
                    }
                    continue;
                }

                let target = result.context_mut_or_insert(&context.name);
                target.messages.push(message.clone());
                let mi = target.messages.len() - 1;
                let ci = result
                    .contexts
                    .iter()
                    .position(|candidate| candidate.name == context.name)
                    .unwrap_or_default();
                slots.insert(key, (ci, mi));
            }
        }
    }

    (result, conflicts)
}

fn owned_forms(translation: &Translation) -> Vec<String> {
    translation.forms().into_iter().map(str::to_string).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::catalog::model::Location;

    fn message(source: &str, translation: Translation) -> Message {
        Message { translation, ..Message::new(source) }
    }

    fn existing_catalog() -> TranslationCatalog {
        let mut catalog = TranslationCatalog::new(Some("uk_UA".to_string()));
        let main = catalog.context_mut_or_insert("MainWindow");
        main.messages.push(Message {
            translator_comment: Some("checked".to_string()),
            ..message("Open", Translation::finished("Відкрити"))
        });
        main.messages.push(message("Close", Translation::finished("Закрити")));
        main.messages.push(message("Unused", Translation::unfinished("")));
        let old = catalog.context_mut_or_insert("OldDialog");
        old.messages.push(message("Cancel", Translation::finished("Скасувати")));
        catalog
    }

    fn template_catalog() -> TranslationCatalog {
        let mut template = TranslationCatalog::new(None);
        let main = template.context_mut_or_insert("MainWindow");
        main.messages.push(Message {
            locations: vec![Location::new("mainwindow.cpp", 12)],
            ..Message::new("Open")
        });
        main.messages.push(Message { numerus: true, ..Message::new("%n tab(s)") });
        let dialog = template.context_mut_or_insert("NewDialog");
        dialog.messages.push(Message::new("Cancel"));
        template
    }

    #[googletest::test]
    fn update_keeps_translations_and_takes_template_locations() {
        let (updated, _) =
            update_catalog(&existing_catalog(), &template_catalog(), &UpdateOptions::default());

        let open = updated.find("MainWindow", "Open", None).unwrap();
        expect_that!(open.translation, eq(&Translation::finished("Відкрити")));
        expect_that!(open.translator_comment, some(eq("checked")));
        expect_that!(open.locations, elements_are![eq(&Location::new("mainwindow.cpp", 12))]);
        expect_that!(updated.language, some(eq("uk_UA")));
    }

    #[googletest::test]
    fn update_marks_new_messages_unfinished() {
        let (updated, _) =
            update_catalog(&existing_catalog(), &template_catalog(), &UpdateOptions::default());

        let tabs = updated.find("MainWindow", "%n tab(s)", None).unwrap();
        assert_eq!(
            tabs.translation,
            Translation::numerus(TranslationKind::Unfinished, vec![String::new(); 3])
        );
    }

    #[googletest::test]
    fn update_reuses_same_text_from_other_context() {
        let (updated, report) =
            update_catalog(&existing_catalog(), &template_catalog(), &UpdateOptions::default());

        let cancel = updated.find("NewDialog", "Cancel", None).unwrap();
        expect_that!(cancel.translation, eq(&Translation::unfinished("Скасувати")));
        expect_that!(report.same_text, eq(1));
    }

    #[googletest::test]
    fn update_vanishes_removed_messages() {
        let (updated, report) =
            update_catalog(&existing_catalog(), &template_catalog(), &UpdateOptions::default());

        let close = updated.find("MainWindow", "Close", None).unwrap();
        expect_that!(close.translation.kind, eq(TranslationKind::Vanished));
        expect_that!(updated.find("MainWindow", "Unused", None), none());
        let cancel = updated.find("OldDialog", "Cancel", None).unwrap();
        expect_that!(cancel.translation.kind, eq(TranslationKind::Vanished));

        assert_eq!(
            report,
            UpdateReport { kept: 1, added: 1, vanished: 2, dropped: 1, same_text: 1 }
        );
    }

    #[googletest::test]
    fn update_drops_obsolete_when_requested() {
        let (updated, report) = update_catalog(
            &existing_catalog(),
            &template_catalog(),
            &UpdateOptions { drop_obsolete: true },
        );

        expect_that!(updated.find("MainWindow", "Close", None), none());
        expect_that!(updated.context("OldDialog"), none());
        expect_that!(report.dropped, eq(3));
        expect_that!(report.vanished, eq(0));
    }

    #[googletest::test]
    fn update_revives_vanished_message_as_unfinished() {
        let mut existing = TranslationCatalog::new(Some("de".to_string()));
        existing.context_mut_or_insert("C").messages.push(message(
            "Back",
            Translation { kind: TranslationKind::Vanished, ..Translation::finished("Zurück") },
        ));
        let mut template = TranslationCatalog::new(None);
        template.context_mut_or_insert("C").messages.push(Message::new("Back"));

        let (updated, report) = update_catalog(&existing, &template, &UpdateOptions::default());

        expect_that!(
            updated.find("C", "Back", None).unwrap().translation,
            eq(&Translation::unfinished("Zurück"))
        );
        expect_that!(report.kept, eq(1));
    }

    #[googletest::test]
    fn update_matches_by_id_and_records_old_source() {
        let mut existing = TranslationCatalog::new(Some("de".to_string()));
        existing.context_mut_or_insert("C").messages.push(Message {
            id: Some("greeting".to_string()),
            ..message("Hello", Translation::finished("Hallo"))
        });
        let mut template = TranslationCatalog::new(None);
        template.context_mut_or_insert("C").messages.push(Message {
            id: Some("greeting".to_string()),
            ..Message::new("Hello!")
        });

        let (updated, _) = update_catalog(&existing, &template, &UpdateOptions::default());

        let greeting = &updated.contexts[0].messages[0];
        expect_that!(greeting.translation, eq(&Translation::finished("Hallo")));
        expect_that!(greeting.old_source, some(eq("Hello")));
        expect_that!(updated.message_count(), eq(1));
    }

    #[googletest::test]
    fn update_falls_back_to_key_when_id_is_taken() {
        let mut existing = TranslationCatalog::new(Some("de".to_string()));
        let context = existing.context_mut_or_insert("C");
        context.messages.push(Message {
            id: Some("greeting".to_string()),
            ..message("Hello", Translation::finished("Hallo"))
        });
        context.messages.push(message("Hi", Translation::finished("Servus")));
        let mut template = TranslationCatalog::new(None);
        let context = template.context_mut_or_insert("C");
        context.messages.push(Message { id: Some("greeting".to_string()), ..Message::new("Hello") });
        context.messages.push(Message { id: Some("greeting".to_string()), ..Message::new("Hi") });

        let (updated, report) = update_catalog(&existing, &template, &UpdateOptions::default());

        expect_that!(
            updated.find("C", "Hi", None).unwrap().translation,
            eq(&Translation::finished("Servus"))
        );
        expect_that!(report.kept, eq(2));
        expect_that!(report.vanished, eq(0));
    }

    #[googletest::test]
    fn combine_first_catalog_wins() {
        let mut first = TranslationCatalog::new(Some("de".to_string()));
        let context = first.context_mut_or_insert("C");
        context.messages.push(message("Open", Translation::finished("Öffnen")));
        context.messages.push(message("Save", Translation::unfinished("")));

        let mut second = TranslationCatalog::new(Some("de".to_string()));
        let context = second.context_mut_or_insert("C");
        context.messages.push(message("Open", Translation::finished("Aufmachen")));
        context.messages.push(message("Save", Translation::finished("Speichern")));
        second
            .context_mut_or_insert("D")
            .messages
            .push(message("Quit", Translation::finished("Beenden")));

        let (combined, conflicts) = combine_catalogs(&[first, second]);

        expect_that!(combined.message_count(), eq(3));
        expect_that!(
            combined.find("C", "Open", None).unwrap().translation,
            eq(&Translation::finished("Öffnen"))
        );
        expect_that!(
            combined.find("C", "Save", None).unwrap().translation,
            eq(&Translation::finished("Speichern"))
        );
        expect_that!(
            conflicts,
            elements_are![all![
                field!(MergeConflict.kept, elements_are![eq("Öffnen")]),
                field!(MergeConflict.discarded, elements_are![eq("Aufmachen")]),
            ]]
        );
    }

    #[googletest::test]
    fn combine_nothing_is_empty() {
        let (combined, conflicts) = combine_catalogs(&[]);

        expect_that!(combined.contexts, is_empty());
        expect_that!(conflicts, is_empty());
    }
}
