//! Code actions on catalog files.

use std::collections::HashMap;

use tower_lsp::lsp_types::{
    CodeAction,
    CodeActionKind,
    CodeActionOrCommand,
    Diagnostic,
    NumberOrString,
    Range,
    TextEdit,
    Url,
    WorkspaceEdit,
};

use crate::catalog::model::TranslationKind;
use crate::db::LinguistDatabase;
use crate::input::catalog::CatalogFile;
use crate::types::SourceRange;

pub const MARK_FINISHED_TITLE: &str = "Mark translation as finished";

/// Edit that removes ` type="unfinished"` from the message's `<translation>`.
///
/// Returns `None` unless the message is unfinished and has some text: an
/// empty translation cannot be finished.
pub fn mark_finished_edit(
    db: &dyn LinguistDatabase,
    catalog_file: CatalogFile,
    document_index: usize,
) -> Option<TextEdit> {
    let found = catalog_file.message_by_index(db, document_index)?;
    let translation = &found.message.translation;
    if translation.kind != TranslationKind::Unfinished || translation.is_empty() {
        return None;
    }
    let range = found.span.translation_type?;
    Some(TextEdit { range: range.into(), new_text: String::new() })
}

/// Code actions for every message touched by `range`.
pub fn generate_code_actions(
    db: &dyn LinguistDatabase,
    catalog_file: CatalogFile,
    uri: &Url,
    range: Range,
    diagnostics: &[Diagnostic],
) -> Vec<CodeActionOrCommand> {
    let requested = SourceRange::from(range);
    let spans = catalog_file.spans(db);

    spans
        .messages
        .iter()
        .enumerate()
        .filter(|(_, span)| overlaps(span.element, requested))
        .filter_map(|(index, span)| {
            let edit = mark_finished_edit(db, catalog_file, index)?;
            let anchor: Range = span.anchor().into();
            let fixed: Vec<Diagnostic> = diagnostics
                .iter()
                .filter(|diagnostic| {
                    diagnostic.range == anchor
                        && diagnostic.code == Some(NumberOrString::String("unfinished".to_string()))
                })
                .cloned()
                .collect();

            Some(CodeActionOrCommand::CodeAction(CodeAction {
                title: MARK_FINISHED_TITLE.to_string(),
                kind: Some(CodeActionKind::QUICKFIX),
                is_preferred: Some(!fixed.is_empty()),
                diagnostics: (!fixed.is_empty()).then_some(fixed),
                edit: Some(WorkspaceEdit {
                    changes: Some(HashMap::from([(uri.clone(), vec![edit])])),
                    ..WorkspaceEdit::default()
                }),
                ..CodeAction::default()
            }))
        })
        .collect()
}

const fn overlaps(a: SourceRange, b: SourceRange) -> bool {
    a.contains(b.start) || a.contains(b.end) || b.contains(a.start)
}
