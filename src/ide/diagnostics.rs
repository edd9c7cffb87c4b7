//! 診断メッセージ生成モジュール

use tower_lsp::lsp_types::{
    Diagnostic,
    DiagnosticSeverity,
    NumberOrString,
    Range,
};

use crate::catalog::validate::{
    CatalogIssue,
    ValidationOptions,
    validate,
};
use crate::config::LinguistSettings;
use crate::db::LinguistDatabase;
use crate::input::catalog::CatalogFile;
use crate::types::SourceRange;

/// Value of `Diagnostic::source` for everything this server reports.
pub const DIAGNOSTIC_SOURCE: &str = "linguist";

/// カタログファイルの診断メッセージを生成
///
/// XML として読めないファイルはファイル先頭に 1 件のエラーを返します。
/// それ以外は検証結果を設定の重要度で報告し、`off` のカテゴリは除外します。
pub fn generate_diagnostics(
    db: &dyn LinguistDatabase,
    catalog_file: CatalogFile,
    settings: &LinguistSettings,
) -> Vec<Diagnostic> {
    tracing::debug!("Generating diagnostics for catalog '{}'", catalog_file.file_path(db));

    let parsed = match catalog_file.document(db) {
        Ok(parsed) => parsed,
        Err(error) => {
            return vec![Diagnostic {
                range: Range::default(),
                severity: Some(DiagnosticSeverity::ERROR),
                code: Some(NumberOrString::String("parse-error".to_string())),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: format!("Failed to parse catalog: {error}"),
                ..Diagnostic::default()
            }];
        }
    };

    let language = catalog_file.language(db).clone();
    let report_unfinished =
        language.as_deref().is_none_or(|language| settings.is_language_required(language));
    let options = ValidationOptions { language, report_unfinished };

    validate(parsed, &options)
        .into_iter()
        .filter_map(|issue| {
            let severity = settings.diagnostics.severity(issue.kind.category()).to_lsp()?;
            let range = issue_range(db, catalog_file, &issue);
            Some(Diagnostic {
                range: range.into(),
                severity: Some(severity),
                code: Some(NumberOrString::String(issue.kind.code().to_string())),
                source: Some(DIAGNOSTIC_SOURCE.to_string()),
                message: format_issue(&issue),
                ..Diagnostic::default()
            })
        })
        .collect()
}

/// Message issues point at the `<source>` text, catalog-wide issues at `<TS>`.
fn issue_range(db: &dyn LinguistDatabase, catalog_file: CatalogFile, issue: &CatalogIssue) -> SourceRange {
    let spans = catalog_file.spans(db);
    match issue.message {
        Some(index) => spans.messages.get(index).map(|span| span.anchor()).unwrap_or_default(),
        None => spans.root.unwrap_or_default(),
    }
}

fn format_issue(issue: &CatalogIssue) -> String {
    match &issue.source {
        Some(source) if !issue.context.is_empty() => {
            format!("{} ({}: \"{}\")", issue.kind, issue.context, source)
        }
        _ => issue.kind.to_string(),
    }
}
