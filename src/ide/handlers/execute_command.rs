//! Execute Command ハンドラー
//!
//! `workspace/executeCommand` リクエストを処理し、
//! カスタムコマンドを実行します。

use std::collections::HashMap;
use std::path::{
    Path,
    PathBuf,
};

use serde::Serialize;
use serde_json::Value;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    ExecuteCommandParams,
    MessageType,
    Position,
    Range,
    TextEdit,
    Url,
    WorkspaceEdit,
};

use super::super::backend::Backend;
use crate::catalog::lookup::{
    CompileOptions,
    CompiledCatalog,
};
use crate::catalog::merge::{
    UpdateOptions,
    update_catalog,
};
use crate::catalog::stats::CatalogStats;
use crate::catalog::{
    TranslationCatalog,
    parse_catalog,
    write_catalog,
};
use crate::config::normalize_locale;
use crate::input::catalog::detect_language_from_path;

pub const CATALOG_STATS: &str = "linguist.catalogStats";
pub const MARK_FINISHED: &str = "linguist.markFinished";
pub const UPDATE_CATALOG: &str = "linguist.updateCatalog";
pub const TRANSLATE: &str = "linguist.translate";
pub const REINDEX: &str = "linguist.reindex";

/// Commands advertised in `initialize`.
pub const COMMANDS: [&str; 5] = [CATALOG_STATS, MARK_FINISHED, UPDATE_CATALOG, TRANSLATE, REINDEX];

/// `workspace/executeCommand` リクエストを処理
pub async fn handle_execute_command(
    backend: &Backend,
    params: ExecuteCommandParams,
) -> Result<Option<Value>> {
    tracing::debug!(command = %params.command, "Execute Command request");

    let args = params.arguments;
    match params.command.as_str() {
        CATALOG_STATS => handle_catalog_stats(backend, &args).await,
        MARK_FINISHED => handle_mark_finished(backend, &args).await,
        UPDATE_CATALOG => handle_update_catalog(backend, &args).await,
        TRANSLATE => handle_translate(backend, &args).await,
        REINDEX => {
            backend.reindex_workspace().await;
            Ok(None)
        }
        _ => {
            tracing::warn!("Unknown command: {}", params.command);
            Ok(None)
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogStatsResult {
    file_path: String,
    language: Option<String>,
    #[serde(flatten)]
    stats: CatalogStats,
    completion_percent: usize,
}

/// `linguist.catalogStats` コマンドを実行
///
/// # Arguments
/// * `arguments[0]` - カタログの URI
async fn handle_catalog_stats(backend: &Backend, args: &[Value]) -> Result<Option<Value>> {
    let Some(uri) = args.first().and_then(Value::as_str).and_then(|s| Url::parse(s).ok()) else {
        tracing::warn!("Invalid arguments for {CATALOG_STATS}");
        return Ok(None);
    };

    let Some(catalog_file) = backend.catalog_for_uri(&uri).await else {
        tracing::debug!("Not a catalog: {uri}");
        return Ok(None);
    };

    let result = {
        let db = backend.state.db.lock().await;
        let Ok(parsed) = catalog_file.document(&*db) else {
            return Ok(None);
        };
        let stats = CatalogStats::from_catalog(&parsed.catalog);
        CatalogStatsResult {
            file_path: catalog_file.file_path(&*db).clone(),
            language: catalog_file.language(&*db).clone(),
            stats,
            completion_percent: stats.completion_percent(),
        }
    };

    Ok(serde_json::to_value(result).ok())
}

/// `linguist.markFinished` コマンドを実行
///
/// # Arguments
/// * `arguments[0]` - カタログの URI
/// * `arguments[1]` - メッセージの文書内インデックス（省略時はファイル内の全メッセージ）
async fn handle_mark_finished(backend: &Backend, args: &[Value]) -> Result<Option<Value>> {
    let Some(uri) = args.first().and_then(Value::as_str).and_then(|s| Url::parse(s).ok()) else {
        tracing::warn!("Invalid arguments for {MARK_FINISHED}");
        return Ok(None);
    };
    let document_index = args.get(1).and_then(Value::as_u64).and_then(|i| usize::try_from(i).ok());

    let Some(catalog_file) = backend.catalog_for_uri(&uri).await else {
        return Ok(None);
    };

    let edits: Vec<TextEdit> = {
        let db = backend.state.db.lock().await;
        let indices = match document_index {
            Some(index) => vec![index],
            None => (0..catalog_file.spans(&*db).messages.len()).collect(),
        };
        indices
            .into_iter()
            .filter_map(|index| {
                crate::ide::code_actions::mark_finished_edit(&*db, catalog_file, index)
            })
            .collect()
    };

    let count = edits.len();
    if count == 0 {
        return Ok(Some(serde_json::json!({ "applied": false, "edits": 0 })));
    }

    let edit = WorkspaceEdit {
        changes: Some(HashMap::from([(uri, edits)])),
        ..WorkspaceEdit::default()
    };
    let applied = match backend.client.apply_edit(edit).await {
        Ok(response) => response.applied,
        Err(error) => {
            tracing::error!("Failed to apply edit: {:?}", error);
            false
        }
    };

    Ok(Some(serde_json::json!({ "applied": applied, "edits": count })))
}

/// `linguist.updateCatalog` コマンドを実行
///
/// # Arguments
/// * `arguments[0]` - テンプレートカタログ（`lupdate` の出力）のパスまたは URI
/// * `arguments[1]` - 更新するカタログのパスまたは URI
/// * `arguments[2]` - `true` なら消えたメッセージを削除する（省略可）
///
/// 対象がエディタで開かれていればワークスペース編集として、
/// それ以外はファイルに直接書き込みます。
/// `sourcelanguage` がどちらのカタログにもなければ `sourceLanguage` 設定を使います。
async fn handle_update_catalog(backend: &Backend, args: &[Value]) -> Result<Option<Value>> {
    let workspace_root = backend.config_manager.lock().await.workspace_root().cloned();
    let resolve = |index: usize| {
        args.get(index)
            .and_then(Value::as_str)
            .and_then(|arg| resolve_path(arg, workspace_root.as_deref()))
    };
    let (Some(template_path), Some(target_path)) = (resolve(0), resolve(1)) else {
        tracing::warn!("Invalid arguments for {UPDATE_CATALOG}");
        return Ok(None);
    };
    let options = UpdateOptions { drop_obsolete: args.get(2).and_then(Value::as_bool).unwrap_or(false) };

    let template = match read_catalog(backend, &template_path).await {
        Ok(Some(catalog)) => catalog,
        Ok(None) => {
            report_error(backend, format!("Template not found: {}", template_path.display())).await;
            return Ok(None);
        }
        Err(error) => {
            report_error(backend, format!("Cannot read template: {error}")).await;
            return Ok(None);
        }
    };
    let existing = match read_catalog(backend, &target_path).await {
        Ok(Some(catalog)) => catalog,
        Ok(None) => TranslationCatalog::new(detect_language_from_path(&target_path)),
        Err(error) => {
            report_error(backend, format!("Cannot read catalog: {error}")).await;
            return Ok(None);
        }
    };

    let (mut updated, report) = update_catalog(&existing, &template, &options);
    if updated.source_language.is_none() {
        let settings = backend.config_manager.lock().await;
        updated.source_language = Some(settings.get_settings().source_language.clone());
    }
    let text = match write_catalog(&updated) {
        Ok(text) => text,
        Err(error) => {
            report_error(backend, format!("Cannot write catalog: {error}")).await;
            return Ok(None);
        }
    };

    tracing::info!(path = %target_path.display(), ?report, "Catalog updated");

    let target_uri = Url::from_file_path(&target_path).ok();
    let opened_text = match &target_uri {
        Some(uri) if backend.state.opened_files.lock().await.contains(uri) => {
            match backend.catalog_for_uri(uri).await {
                Some(file) => Some(file.text(&*backend.state.db.lock().await).clone()),
                None => None,
            }
        }
        _ => None,
    };

    if let (Some(uri), Some(current)) = (target_uri, opened_text) {
        let edit = TextEdit { range: full_range(&current), new_text: text };
        let workspace_edit = WorkspaceEdit {
            changes: Some(HashMap::from([(uri, vec![edit])])),
            ..WorkspaceEdit::default()
        };
        if let Err(error) = backend.client.apply_edit(workspace_edit).await {
            tracing::error!("Failed to apply edit: {:?}", error);
            return Ok(None);
        }
    } else {
        if let Err(error) = tokio::fs::write(&target_path, text).await {
            report_error(backend, format!("Cannot write {}: {error}", target_path.display())).await;
            return Ok(None);
        }
        backend.reload_catalog_file(&target_path).await;
        backend.send_diagnostics_to_opened_files().await;
    }

    Ok(serde_json::to_value(report).ok())
}

/// `linguist.translate` コマンドを実行
///
/// # Arguments
/// * `arguments[0]` - 言語（`de`, `uk_UA` など）
/// * `arguments[1]` - コンテキスト名
/// * `arguments[2]` - ソーステキスト
/// * `arguments[3]` - 曖昧さ回避コメント（省略可）
/// * `arguments[4]` - 複数形の数（省略可）
///
/// 指定言語のカタログをパス順に検索し、最初に見つかった翻訳を返します。
async fn handle_translate(backend: &Backend, args: &[Value]) -> Result<Option<Value>> {
    let arg = |index: usize| args.get(index).and_then(Value::as_str);
    let (Some(language), Some(context), Some(source)) = (arg(0), arg(1), arg(2)) else {
        tracing::warn!("Invalid arguments for {TRANSLATE}");
        return Ok(None);
    };
    let disambiguation = arg(3);
    let n = args.get(4).and_then(Value::as_u64);

    if !backend.wait_for_translations().await {
        tracing::debug!("Translate request - catalogs not indexed yet");
        return Ok(None);
    }

    let compile = backend.config_manager.lock().await.get_settings().compile;
    let options = CompileOptions {
        include_unfinished: compile.include_unfinished,
        remove_identical: compile.remove_identical,
    };
    let language = normalize_locale(language);

    let (db, catalogs) = backend.state.lock_db_and_catalogs().await;
    let mut candidates: Vec<_> = catalogs
        .values()
        .filter(|file| {
            file.language(&*db).as_deref().is_some_and(|lang| normalize_locale(lang) == language)
        })
        .collect();
    candidates.sort_by(|a, b| a.file_path(&*db).cmp(b.file_path(&*db)));

    let translation = candidates.into_iter().find_map(|file| {
        let parsed = file.document(&*db).as_ref().ok()?;
        let compiled = CompiledCatalog::compile(&parsed.catalog, &options);
        compiled.translate(context, source, disambiguation, n).map(str::to_string)
    });

    Ok(Some(translation.map_or(Value::Null, Value::String)))
}

async fn report_error(backend: &Backend, message: String) {
    tracing::error!("{message}");
    backend.client.show_message(MessageType::ERROR, message).await;
}

/// Reads a catalog, preferring the in-memory version of indexed files.
///
/// Returns `Ok(None)` if the file does not exist.
async fn read_catalog(
    backend: &Backend,
    path: &Path,
) -> std::result::Result<Option<TranslationCatalog>, String> {
    let indexed = {
        let db = backend.state.db.lock().await;
        let catalogs = backend.state.catalogs.lock().await;
        catalogs.get(path).map(|file| file.document(&*db).clone())
    };
    if let Some(document) = indexed {
        return document.map(|parsed| Some(parsed.catalog));
    }

    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error.to_string()),
    };
    parse_catalog(&text).map(|parsed| Some(parsed.catalog)).map_err(|e| e.to_string())
}

/// Accepts `file://` URIs, absolute paths and paths relative to the
/// workspace root.
fn resolve_path(arg: &str, workspace_root: Option<&Path>) -> Option<PathBuf> {
    if arg.starts_with("file:") {
        return Url::parse(arg).ok()?.to_file_path().ok();
    }
    let path = PathBuf::from(arg);
    match workspace_root {
        Some(root) if path.is_relative() => Some(root.join(path)),
        _ => Some(path),
    }
}

/// Range covering all of `text`, in UTF-16 code units.
fn full_range(text: &str) -> Range {
    let line_count = text.split('\n').count();
    let last_line = text.rsplit('\n').next().unwrap_or_default();
    Range {
        start: Position { line: 0, character: 0 },
        end: Position {
            line: u32::try_from(line_count.saturating_sub(1)).unwrap_or(u32::MAX),
            character: u32::try_from(last_line.encode_utf16().count()).unwrap_or(u32::MAX),
        },
    }
}
