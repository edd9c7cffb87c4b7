//! LSP lifecycle handlers: `initialize`, `initialized`, `shutdown`.

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CodeActionKind,
    CodeActionOptions,
    CodeActionProviderCapability,
    ExecuteCommandOptions,
    HoverProviderCapability,
    InitializeParams,
    InitializeResult,
    InitializedParams,
    MessageType,
    OneOf,
    ServerCapabilities,
    ServerInfo,
    TextDocumentSyncCapability,
    TextDocumentSyncKind,
    WorkDoneProgressOptions,
    WorkspaceFoldersServerCapabilities,
    WorkspaceServerCapabilities,
};

use super::super::backend::Backend;
use super::execute_command::COMMANDS;

pub async fn handle_initialize(
    backend: &Backend,
    params: InitializeParams,
) -> Result<InitializeResult> {
    let workspace_root = params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri)
        .or(params.root_uri.as_ref())
        .and_then(Backend::uri_to_path);

    let mut config_manager = backend.config_manager.lock().await;
    if let Err(error) = config_manager.load_settings(workspace_root) {
        backend
            .client
            .log_message(MessageType::ERROR, format!("Configuration error: {error}"))
            .await;
        tracing::error!("Configuration error during initialize: {}", error);
    }
    drop(config_manager);

    Ok(InitializeResult {
        server_info: Some(ServerInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
        capabilities: ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            definition_provider: Some(OneOf::Left(true)),
            references_provider: Some(OneOf::Left(true)),
            code_action_provider: Some(CodeActionProviderCapability::Options(
                CodeActionOptions {
                    code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                    resolve_provider: Some(false),
                },
            )),
            execute_command_provider: Some(ExecuteCommandOptions {
                commands: COMMANDS.iter().map(ToString::to_string).collect(),
                work_done_progress_options: WorkDoneProgressOptions::default(),
            }),
            workspace: Some(WorkspaceServerCapabilities {
                workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                    supported: Some(true),
                    change_notifications: Some(OneOf::Left(true)),
                }),
                file_operations: None,
            }),
            ..ServerCapabilities::default()
        },
    })
}

pub async fn handle_initialized(backend: &Backend, _: InitializedParams) {
    tracing::info!("Server initialized");

    backend.index_workspace_folders().await;
    backend.send_diagnostics_to_opened_files().await;

    let count = backend.state.catalogs.lock().await.len();
    backend.client.log_message(MessageType::INFO, format!("Indexed {count} catalogs")).await;

    backend.register_file_watchers().await;
}

#[allow(clippy::unused_async)]
pub async fn handle_shutdown() -> Result<()> {
    Ok(())
}
