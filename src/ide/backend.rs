//! LSP Backend 実装

use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CodeActionParams,
    CodeActionResponse,
    DidChangeConfigurationParams,
    DidChangeTextDocumentParams,
    DidChangeWatchedFilesParams,
    DidChangeWatchedFilesRegistrationOptions,
    DidCloseTextDocumentParams,
    DidOpenTextDocumentParams,
    DidSaveTextDocumentParams,
    ExecuteCommandParams,
    FileChangeType,
    FileSystemWatcher,
    GlobPattern,
    GotoDefinitionParams,
    GotoDefinitionResponse,
    Hover,
    HoverParams,
    InitializeParams,
    InitializeResult,
    InitializedParams,
    Location,
    MessageType,
    NumberOrString,
    ProgressParams,
    ProgressParamsValue,
    ReferenceParams,
    Registration,
    Url,
    WorkDoneProgress,
    WorkDoneProgressBegin,
    WorkDoneProgressEnd,
    WorkDoneProgressReport,
    notification::Progress,
};
use tower_lsp::{
    Client,
    LanguageServer,
};

use super::handlers;
use super::state::ServerState;
use crate::catalog::is_catalog_text;
use crate::config::{
    CONFIG_FILE_NAME,
    ConfigManager,
    FileMatcher,
};
use crate::db::LinguistDatabaseImpl;
use crate::indexer::workspace::WorkspaceIndexer;
use crate::input::catalog::{
    CatalogFile,
    LoadedCatalog,
    catalog_from_text,
};

/// How long requests wait for the initial indexing before giving up.
const INDEXING_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// LSP Backend
#[derive(Clone)]
pub struct Backend {
    /// LSP クライアント
    pub client: Client,
    /// 設定管理
    pub config_manager: Arc<Mutex<ConfigManager>>,
    /// ワークスペースインデクサー
    pub workspace_indexer: Arc<WorkspaceIndexer>,
    /// 共有状態
    pub state: ServerState,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("config_manager", &"<ConfigManager>")
            .field("workspace_indexer", &"<WorkspaceIndexer>")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Backend {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            config_manager: Arc::new(Mutex::new(ConfigManager::new())),
            workspace_indexer: Arc::new(WorkspaceIndexer::new()),
            state: ServerState::new(LinguistDatabaseImpl::default()),
        }
    }

    pub(crate) fn uri_to_path(uri: &Url) -> Option<PathBuf> {
        uri.to_file_path().ok()
    }

    /// インデックス完了を待つ
    ///
    /// Returns false if indexing is still running after the timeout.
    pub(crate) async fn wait_for_translations(&self) -> bool {
        self.workspace_indexer.wait_for_completion(INDEXING_WAIT_TIMEOUT).await
    }

    /// ワークスペースフォルダを取得
    ///
    /// クライアントに問い合わせ、応答がなければ `initialize` で受け取った
    /// ルートを使います。
    pub(crate) async fn workspace_paths(&self) -> Vec<PathBuf> {
        match self.client.workspace_folders().await {
            Ok(Some(folders)) if !folders.is_empty() => {
                folders.iter().filter_map(|folder| Self::uri_to_path(&folder.uri)).collect()
            }
            _ => self.config_manager.lock().await.workspace_root().cloned().into_iter().collect(),
        }
    }

    /// The catalog registered for `uri`, if any.
    pub(crate) async fn catalog_for_uri(&self, uri: &Url) -> Option<CatalogFile> {
        let path = Self::uri_to_path(uri)?;
        self.state.catalogs.lock().await.get(&path).copied()
    }

    /// 全ワークスペースフォルダをインデックスする
    ///
    /// 完了フラグはすべてのフォルダが終わってから立てます。
    pub(crate) async fn index_workspace_folders(&self) {
        self.workspace_indexer.reset_indexing_state();

        for workspace_path in self.workspace_paths().await {
            self.index_folder(&workspace_path).await;
        }

        self.workspace_indexer.mark_indexing_completed();
    }

    /// 1 フォルダをインデックスし、進捗を `$/progress` で通知する
    async fn index_folder(&self, workspace_path: &Path) {
        let token = NumberOrString::String("linguist-indexing".to_string());
        self.send_progress(
            &token,
            WorkDoneProgress::Begin(WorkDoneProgressBegin {
                title: "Indexing Qt Linguist catalogs".to_string(),
                cancellable: Some(false),
                message: Some(workspace_path.display().to_string()),
                percentage: Some(0),
            }),
        )
        .await;

        let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<(u32, u32)>(100);
        let progress_task = {
            let backend = self.clone();
            let token = token.clone();
            tokio::spawn(async move {
                while let Some((current, total)) = progress_rx.recv().await {
                    let percentage = current.saturating_mul(100).checked_div(total).unwrap_or(0);
                    backend
                        .send_progress(
                            &token,
                            WorkDoneProgress::Report(WorkDoneProgressReport {
                                cancellable: Some(false),
                                message: Some(format!("Loading catalogs: {current}/{total}")),
                                percentage: Some(percentage),
                            }),
                        )
                        .await;
                }
            })
        };
        let progress_callback = move |current: u32, total: u32| {
            let _ = progress_tx.try_send((current, total));
        };

        let config_manager = self.config_manager.lock().await;
        let db = self.state.db.lock().await.clone();
        let index_result = self
            .workspace_indexer
            .index_workspace(
                db,
                workspace_path,
                &config_manager,
                self.state.catalogs.clone(),
                Some(progress_callback),
            )
            .await;
        drop(config_manager);
        let _ = progress_task.await;

        let message = match index_result {
            Ok(count) => format!("Loaded {count} catalogs"),
            Err(error) => {
                tracing::error!(%error, "Indexing failed");
                self.client
                    .log_message(MessageType::ERROR, format!("error indexing workspace: {error}"))
                    .await;
                format!("Indexing failed: {error}")
            }
        };
        self.send_progress(&token, WorkDoneProgress::End(WorkDoneProgressEnd { message: Some(message) }))
            .await;
    }

    async fn send_progress(&self, token: &NumberOrString, progress: WorkDoneProgress) {
        self.client
            .send_notification::<Progress>(ProgressParams {
                token: token.clone(),
                value: ProgressParamsValue::WorkDone(progress),
            })
            .await;
    }

    /// ワークスペースを再インデックス
    ///
    /// 新しい Salsa データベースを作成して、全ファイルを再インデックスします。
    /// 開いているファイルはエディタの内容を保ったままです。
    pub(crate) async fn reindex_workspace(&self) {
        self.client.log_message(MessageType::INFO, "Reindexing workspace...").await;

        self.state.reset().await;
        self.index_workspace_folders().await;
        self.send_diagnostics_to_opened_files().await;

        self.client.log_message(MessageType::INFO, "Reindexing complete").await;
    }

    /// エディタの内容でカタログを更新し、診断を送る
    ///
    /// `.ts` は TypeScript と共有なので、カタログでない内容は無視します。
    pub(crate) async fn update_and_diagnose(&self, uri: Url, text: String) {
        let Some(file_path) = Self::uri_to_path(&uri) else {
            return;
        };

        if !is_catalog_text(&text) {
            let removed = self.state.catalogs.lock().await.remove(&file_path).is_some();
            if removed {
                tracing::debug!("{} is no longer a catalog", file_path.display());
                self.client.publish_diagnostics(uri, Vec::new(), None).await;
            }
            return;
        }

        let catalog_file = {
            let (db, mut catalogs) = self.state.lock_db_and_catalogs().await;
            let catalog_file = catalog_from_text(&*db, &file_path, text);
            catalogs.insert(file_path, catalog_file);
            catalog_file
        };

        self.send_diagnostics(uri, catalog_file).await;
    }

    /// 1 ファイルの診断を送る
    pub(crate) async fn send_diagnostics(&self, uri: Url, catalog_file: CatalogFile) {
        let settings = self.config_manager.lock().await.get_settings().clone();
        let diagnostics = {
            let db = self.state.db.lock().await;
            super::diagnostics::generate_diagnostics(&*db, catalog_file, &settings)
        };
        tracing::debug!(uri = %uri, count = diagnostics.len(), "Publishing diagnostics");
        self.client.publish_diagnostics(uri, diagnostics, None).await;
    }

    /// 開いている全ファイルの診断を送る
    pub(crate) async fn send_diagnostics_to_opened_files(&self) {
        let opened: Vec<Url> = self.state.opened_files.lock().await.iter().cloned().collect();
        for uri in opened {
            match self.catalog_for_uri(&uri).await {
                Some(catalog_file) => self.send_diagnostics(uri, catalog_file).await,
                None => self.client.publish_diagnostics(uri, Vec::new(), None).await,
            }
        }
    }

    /// Whether `path` matches the configured catalog patterns.
    ///
    /// Without a workspace root every `.ts` file qualifies.
    pub(crate) async fn is_catalog_path(&self, path: &Path) -> bool {
        let config_manager = self.config_manager.lock().await;
        let Some(root) = config_manager.workspace_root() else {
            return path.extension().is_some_and(|ext| ext == "ts");
        };
        FileMatcher::new(root.clone(), config_manager.get_settings())
            .is_ok_and(|matcher| matcher.is_catalog_file(path))
    }

    pub(crate) fn is_config_file(path: &Path) -> bool {
        path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME)
    }

    /// ディスクからカタログを読み直す
    ///
    /// 開いているファイルはエディタの内容が正なので読み直しません。
    pub(crate) async fn reload_catalog_file(&self, file_path: &Path) {
        if let Ok(uri) = Url::from_file_path(file_path)
            && self.state.opened_files.lock().await.contains(&uri)
        {
            tracing::debug!("Skipping reload of opened file {}", file_path.display());
            return;
        }

        let loaded = {
            let file_path = file_path.to_path_buf();
            tokio::task::spawn_blocking(move || LoadedCatalog::read(&file_path)).await
        };
        match loaded {
            Ok(Ok(Some(catalog))) => {
                let (db, mut catalogs) = self.state.lock_db_and_catalogs().await;
                catalogs.insert(file_path.to_path_buf(), catalog.into_input(&*db));
            }
            Ok(Ok(None)) => {
                self.state.catalogs.lock().await.remove(file_path);
            }
            Ok(Err(error)) => {
                tracing::warn!("Failed to read file {}: {}", file_path.display(), error);
            }
            Err(error) => {
                tracing::warn!("Catalog loading task failed: {}", error);
            }
        }
    }

    pub(crate) async fn remove_catalog_file(&self, file_path: &Path) {
        self.state.catalogs.lock().await.remove(file_path);
    }

    /// `.linguist-ls.json` の変更を反映する
    pub(crate) async fn handle_config_file_change(&self, file_path: &Path, change: FileChangeType) {
        tracing::info!(path = %file_path.display(), ?change, "Configuration file changed");

        let result = self.config_manager.lock().await.reload();

        match result {
            Ok(()) => self.reindex_workspace().await,
            Err(error) => {
                tracing::error!(%error, "Configuration error");
                self.client
                    .show_message(MessageType::ERROR, format!("Configuration error: {error}"))
                    .await;
            }
        }
    }

    /// カタログと設定ファイルの監視を登録する
    pub(crate) async fn register_file_watchers(&self) {
        let include_patterns =
            self.config_manager.lock().await.get_settings().catalog_files.include_patterns.clone();
        let mut watchers: Vec<FileSystemWatcher> = include_patterns
            .into_iter()
            .map(|pattern| FileSystemWatcher { glob_pattern: GlobPattern::String(pattern), kind: None })
            .collect();
        watchers.push(FileSystemWatcher {
            glob_pattern: GlobPattern::String(format!("**/{CONFIG_FILE_NAME}")),
            kind: None,
        });

        let register_options =
            match serde_json::to_value(DidChangeWatchedFilesRegistrationOptions { watchers }) {
                Ok(options) => options,
                Err(error) => {
                    tracing::error!(%error, "Failed to serialize watcher options");
                    return;
                }
            };

        let registration = Registration {
            id: "linguist-file-watcher".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(register_options),
        };
        if let Err(error) = self.client.register_capability(vec![registration]).await {
            tracing::debug!(%error, "Client did not accept file watchers");
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        handlers::lifecycle::handle_initialize(self, params).await
    }

    async fn initialized(&self, params: InitializedParams) {
        handlers::lifecycle::handle_initialized(self, params).await;
    }

    async fn shutdown(&self) -> Result<()> {
        handlers::lifecycle::handle_shutdown().await
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        handlers::workspace::handle_did_change_configuration(self, params).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        handlers::workspace::handle_did_change_watched_files(self, params).await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        handlers::document_sync::handle_did_open(self, params).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        handlers::document_sync::handle_did_change(self, params).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        handlers::document_sync::handle_did_save(self, params).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        handlers::document_sync::handle_did_close(self, params).await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        handlers::features::handle_hover(self, params).await
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        handlers::features::handle_goto_definition(self, params).await
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        handlers::features::handle_references(self, params).await
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        handlers::code_action::handle_code_action(self, params).await
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        handlers::execute_command::handle_execute_command(self, params).await
    }
}
