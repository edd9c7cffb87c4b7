//! Workspace-related handlers.

use tower_lsp::lsp_types::{
    DidChangeConfigurationParams,
    DidChangeWatchedFilesParams,
    FileChangeType,
};

use super::super::backend::Backend;
use crate::config::settings_from_value;

pub async fn handle_did_change_configuration(
    backend: &Backend,
    params: DidChangeConfigurationParams,
) {
    tracing::info!(settings = %params.settings, "didChangeConfiguration received");

    let new_settings = match settings_from_value(params.settings) {
        Ok(settings) => settings,
        Err(error) => {
            tracing::warn!(%error, "Ignoring malformed configuration");
            return;
        }
    };

    let mut config_manager = backend.config_manager.lock().await;
    match config_manager.update_settings(new_settings) {
        Ok(()) => {
            drop(config_manager);
            tracing::info!("configuration updated successfully");

            backend.reindex_workspace().await;
        }
        Err(error) => {
            tracing::error!(%error, "configuration validation error");
        }
    }
}

pub async fn handle_did_change_watched_files(
    backend: &Backend,
    params: DidChangeWatchedFilesParams,
) {
    let mut catalogs_changed = false;

    for change in params.changes {
        let Some(file_path) = Backend::uri_to_path(&change.uri) else {
            continue;
        };

        if Backend::is_config_file(&file_path) {
            backend.handle_config_file_change(&file_path, change.typ).await;
            continue;
        }

        if backend.is_catalog_path(&file_path).await {
            tracing::debug!("Catalog file changed: {:?}, type: {:?}", file_path, change.typ);

            match change.typ {
                FileChangeType::CREATED | FileChangeType::CHANGED => {
                    backend.reload_catalog_file(&file_path).await;
                    catalogs_changed = true;
                }
                FileChangeType::DELETED => {
                    backend.remove_catalog_file(&file_path).await;
                    catalogs_changed = true;
                }
                _ => {}
            }
        }
    }

    if catalogs_changed {
        backend.send_diagnostics_to_opened_files().await;
    }
}
