//! LSP 機能ハンドラー
//!
//! `hover`, `goto_definition`, `references` の処理を担当します。

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    GotoDefinitionParams,
    GotoDefinitionResponse,
    Hover,
    HoverContents,
    HoverParams,
    Location,
    MarkupContent,
    MarkupKind,
    ReferenceParams,
};

use super::super::backend::Backend;
use crate::types::SourcePosition;

/// `textDocument/hover` リクエストを処理
pub async fn handle_hover(backend: &Backend, params: HoverParams) -> Result<Option<Hover>> {
    let uri = params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    tracing::debug!(uri = %uri, line = position.line, character = position.character, "Hover request");

    // 他言語の翻訳を表示するため、インデックス完了を待つ
    if !backend.wait_for_translations().await {
        tracing::debug!("Hover request - catalogs not indexed yet");
        return Ok(None);
    }

    let Some(file_path) = Backend::uri_to_path(&uri) else {
        return Ok(None);
    };

    let primary_languages =
        backend.config_manager.lock().await.get_settings().primary_languages.clone();

    let (db, catalogs) = backend.state.lock_db_and_catalogs().await;
    let Some(catalog_file) = catalogs.get(&file_path).copied() else {
        tracing::debug!("Catalog not found: {}", file_path.display());
        return Ok(None);
    };

    let content = crate::ide::hover::generate_hover_content(
        &*db,
        catalog_file,
        SourcePosition::from(position),
        &catalogs,
        primary_languages.as_deref(),
    );

    Ok(content.map(|value| Hover {
        contents: HoverContents::Markup(MarkupContent { kind: MarkupKind::Markdown, value }),
        range: None,
    }))
}

/// `textDocument/definition` リクエストを処理
///
/// メッセージの `<location>` が指すソースコードの行を返します。
pub async fn handle_goto_definition(
    backend: &Backend,
    params: GotoDefinitionParams,
) -> Result<Option<GotoDefinitionResponse>> {
    let uri = params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    tracing::debug!(uri = %uri, line = position.line, character = position.character, "Goto definition request");

    let Some(catalog_file) = backend.catalog_for_uri(&uri).await else {
        return Ok(None);
    };

    let locations = {
        let db = backend.state.db.lock().await;
        crate::ide::goto_definition::find_definitions(
            &*db,
            catalog_file,
            SourcePosition::from(position),
        )
    };

    tracing::debug!("Found {} definitions", locations.len());

    if locations.is_empty() {
        return Ok(None);
    }
    Ok(Some(GotoDefinitionResponse::Array(locations)))
}

/// `textDocument/references` リクエストを処理
///
/// 同じモジュールの他言語カタログにある同じメッセージを返します。
pub async fn handle_references(
    backend: &Backend,
    params: ReferenceParams,
) -> Result<Option<Vec<Location>>> {
    let uri = params.text_document_position.text_document.uri;
    let position = params.text_document_position.position;
    let include_declaration = params.context.include_declaration;

    tracing::debug!(uri = %uri, line = position.line, character = position.character, "References request");

    if !backend.wait_for_translations().await {
        tracing::debug!("References request - catalogs not indexed yet");
        return Ok(None);
    }

    let Some(file_path) = Backend::uri_to_path(&uri) else {
        return Ok(None);
    };

    let (db, catalogs) = backend.state.lock_db_and_catalogs().await;
    let Some(catalog_file) = catalogs.get(&file_path).copied() else {
        return Ok(None);
    };

    let locations = crate::ide::references::find_references(
        &*db,
        catalog_file,
        SourcePosition::from(position),
        &catalogs,
        include_declaration,
    );

    tracing::debug!("Found {} references", locations.len());

    Ok(Some(locations))
}
