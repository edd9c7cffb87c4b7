//! Document synchronization handlers.

use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
    DidSaveTextDocumentParams,
};

use super::super::backend::Backend;

pub async fn handle_did_open(backend: &Backend, params: DidOpenTextDocumentParams) {
    let uri = params.text_document.uri;
    tracing::debug!(uri = %uri, "File opened");

    {
        let mut opened_files = backend.state.opened_files.lock().await;
        opened_files.insert(uri.clone());
    }

    backend.update_and_diagnose(uri, params.text_document.text).await;
}

pub async fn handle_did_change(backend: &Backend, params: DidChangeTextDocumentParams) {
    let uri = params.text_document.uri;

    // full sync なので最後の変更が文書全体
    let Some(change) = params.content_changes.into_iter().next_back() else {
        return;
    };

    backend.update_and_diagnose(uri, change.text).await;
}

pub async fn handle_did_save(_backend: &Backend, params: DidSaveTextDocumentParams) {
    tracing::debug!(uri = %params.text_document.uri, "File saved");
}

pub async fn handle_did_close(backend: &Backend, params: DidCloseTextDocumentParams) {
    let uri = params.text_document.uri;
    tracing::debug!(uri = %uri, "File closed");

    {
        let mut opened_files = backend.state.opened_files.lock().await;
        opened_files.remove(&uri);
    }

    backend.client.publish_diagnostics(uri.clone(), Vec::new(), None).await;

    // 保存されなかった編集を破棄する
    if let Some(path) = Backend::uri_to_path(&uri) {
        backend.reload_catalog_file(&path).await;
    }
}
