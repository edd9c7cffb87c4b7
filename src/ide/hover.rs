//! Hover implementation

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::catalog::model::{
    Message,
    TranslationBody,
    TranslationKind,
};
use crate::catalog::stats::CatalogStats;
use crate::db::LinguistDatabase;
use crate::input::catalog::CatalogFile;
use crate::types::SourcePosition;

/// 翻訳の表示で値を切り詰める最大長
const MAX_VALUE_LENGTH: usize = 80;

/// Generate hover content for the element at `position`.
///
/// On the `<TS>` start tag this is the catalog's progress; inside a
/// `<message>` it is the message and its translation in every catalog of the
/// same module.
///
/// # ソート順
/// 言語は以下の順序でソートされます：
/// 1. 編集中のカタログ
/// 2. `primary_languages`（設定順）
/// 3. その他（アルファベット順）
pub fn generate_hover_content<S: std::hash::BuildHasher>(
    db: &dyn LinguistDatabase,
    catalog_file: CatalogFile,
    position: SourcePosition,
    catalogs: &HashMap<PathBuf, CatalogFile, S>,
    primary_languages: Option<&[String]>,
) -> Option<String> {
    if catalog_file.spans(db).root.is_some_and(|root| root.contains(position)) {
        return catalog_summary(db, catalog_file);
    }

    let found = catalog_file.message_at(db, position)?;
    let message = found.message;
    let context = &found.context.name;

    let mut content = format!("**Context:** `{context}`\n\n**Source:** {}\n", message.source);
    if let Some(disambiguation) = message.disambiguation() {
        let _ = writeln!(content, "\n**Disambiguation:** {disambiguation}");
    }
    if let Some(comment) = message.extra_comment.as_deref().filter(|c| !c.is_empty()) {
        let _ = writeln!(content, "\n**Developer comment:** {comment}");
    }
    if let Some(comment) = message.translator_comment.as_deref().filter(|c| !c.is_empty()) {
        let _ = writeln!(content, "\n**Translator comment:** {comment}");
    }

    let current_path = catalog_file.file_path(db);
    let module = catalog_file.module(db);
    let mut translations: Vec<(String, bool, String)> = vec![(
        language_label(catalog_file.language(db).as_deref()),
        true,
        format_translation(message),
    )];
    for sibling in catalogs.values() {
        if sibling.file_path(db) == current_path || sibling.module(db) != module {
            continue;
        }
        let Some(index) =
            sibling.find_message(db, context, &message.source, message.disambiguation())
        else {
            continue;
        };
        let Some(other) = sibling.message_by_index(db, index) else {
            continue;
        };
        translations.push((
            language_label(sibling.language(db).as_deref()),
            false,
            format_translation(other.message),
        ));
    }

    sort_translations_by_priority(&mut translations, primary_languages);

    content.push_str("\n**Translations:**\n\n");
    for (language, current, value) in translations {
        let marker = if current { " (this file)" } else { "" };
        let _ = writeln!(content, "- **{language}**{marker}: {value}");
    }

    Some(content)
}

fn catalog_summary(db: &dyn LinguistDatabase, catalog_file: CatalogFile) -> Option<String> {
    let parsed = catalog_file.document(db).as_ref().ok()?;
    let stats = CatalogStats::from_catalog(&parsed.catalog);

    let mut content =
        format!("**{} catalog**\n\n", language_label(catalog_file.language(db).as_deref()));
    if let Some(source_language) = &parsed.catalog.source_language {
        let _ = writeln!(content, "- Source language: {source_language}");
    }
    let _ = writeln!(content, "- Contexts: {}", stats.contexts);
    let _ = writeln!(
        content,
        "- Messages: {} ({} finished, {} unfinished, {} untranslated)",
        stats.active(),
        stats.finished,
        stats.unfinished,
        stats.untranslated
    );
    if stats.numerus > 0 {
        let _ = writeln!(content, "- Plural messages: {}", stats.numerus);
    }
    if stats.obsolete > 0 {
        let _ = writeln!(content, "- Obsolete: {}", stats.obsolete);
    }
    let _ = writeln!(content, "- Completion: {}%", stats.completion_percent());
    Some(content)
}

fn language_label(language: Option<&str>) -> String {
    language.unwrap_or("unknown").to_string()
}

/// 翻訳を表示用文字列にする
fn format_translation(message: &Message) -> String {
    let translation = &message.translation;
    if translation.is_empty() {
        return "_untranslated_".to_string();
    }

    let mut value = match &translation.body {
        TranslationBody::Text(text) => truncate_string(text, MAX_VALUE_LENGTH),
        TranslationBody::NumerusForms(forms) => forms
            .iter()
            .map(|form| truncate_string(form, MAX_VALUE_LENGTH))
            .collect::<Vec<_>>()
            .join(" | "),
    };
    if translation.kind != TranslationKind::Finished {
        let _ = write!(value, " _({})_", translation.kind);
    }
    value
}

/// 文字列を指定した長さに切り詰める
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}

/// Language priority for sorting
#[derive(Debug, Clone, PartialEq, Eq)]
enum LanguagePriority<'a> {
    /// The catalog being edited
    Current,
    /// Primary language with its position index
    Primary(usize),
    /// Other language (sorted alphabetically)
    Other(&'a str),
}

fn get_language_priority<'a>(
    language: &'a str,
    current: bool,
    primary_languages: Option<&[String]>,
) -> LanguagePriority<'a> {
    if current {
        return LanguagePriority::Current;
    }

    if let Some(primaries) = primary_languages
        && let Some(pos) = primaries.iter().position(|p| {
            crate::config::normalize_locale(p) == crate::config::normalize_locale(language)
        })
    {
        return LanguagePriority::Primary(pos);
    }

    LanguagePriority::Other(language)
}

fn sort_translations_by_priority(
    translations: &mut [(String, bool, String)],
    primary_languages: Option<&[String]>,
) {
    translations.sort_by(|a, b| {
        let priority_a = get_language_priority(&a.0, a.1, primary_languages);
        let priority_b = get_language_priority(&b.0, b.1, primary_languages);

        match (priority_a, priority_b) {
            (LanguagePriority::Current, LanguagePriority::Current) => Ordering::Equal,
            (LanguagePriority::Current, _) => Ordering::Less,
            (_, LanguagePriority::Current) => Ordering::Greater,
            (LanguagePriority::Primary(a_idx), LanguagePriority::Primary(b_idx)) => {
                a_idx.cmp(&b_idx)
            }
            (LanguagePriority::Primary(_), _) => Ordering::Less,
            (_, LanguagePriority::Primary(_)) => Ordering::Greater,
            (LanguagePriority::Other(a_lang), LanguagePriority::Other(b_lang)) => {
                a_lang.cmp(b_lang)
            }
        }
    });
}
