//! Code Action ハンドラー
//!
//! `textDocument/codeAction` リクエストを処理し、
//! 未完了の翻訳を完了にするクイックフィックスを提供します。

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CodeActionParams,
    CodeActionResponse,
};

use super::super::backend::Backend;

/// `textDocument/codeAction` リクエストを処理
pub async fn handle_code_action(
    backend: &Backend,
    params: CodeActionParams,
) -> Result<Option<CodeActionResponse>> {
    let uri = &params.text_document.uri;

    tracing::debug!(uri = %uri, line = params.range.start.line, "Code Action request");

    let Some(catalog_file) = backend.catalog_for_uri(uri).await else {
        return Ok(Some(vec![]));
    };

    let db = backend.state.db.lock().await;
    let actions = crate::ide::code_actions::generate_code_actions(
        &*db,
        catalog_file,
        uri,
        params.range,
        &params.context.diagnostics,
    );

    tracing::debug!("Generated {} code actions", actions.len());

    Ok(Some(actions))
}
