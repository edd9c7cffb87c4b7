//! Workspace walker and concurrent catalog loader.

use std::collections::HashMap;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::time::Duration;

use futures::StreamExt;
use ignore::WalkBuilder;
use tokio::sync::{
    Mutex,
    Notify,
};

use crate::config::{
    ConfigManager,
    FileMatcher,
};
use crate::db::LinguistDatabaseImpl;
use crate::indexer::types::IndexerError;
use crate::input::catalog::{
    CatalogFile,
    LoadedCatalog,
};

/// Loads every catalog of a workspace and tracks whether that finished.
#[derive(Clone, Debug, Default)]
pub struct WorkspaceIndexer {
    indexing_completed: Arc<AtomicBool>,
    completion_notify: Arc<Notify>,
}

impl WorkspaceIndexer {
    /// 新しいインデクサーを作成
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_indexing_completed(&self) -> bool {
        self.indexing_completed.load(Ordering::Acquire)
    }

    /// 再インデックス前に完了フラグを下ろす
    pub fn reset_indexing_state(&self) {
        self.indexing_completed.store(false, Ordering::Release);
    }

    /// 完了フラグを立てて待機中のリクエストを起こす
    pub fn mark_indexing_completed(&self) {
        self.indexing_completed.store(true, Ordering::Release);
        self.completion_notify.notify_waiters();
    }

    /// インデックス完了を待つ
    ///
    /// Returns false if indexing did not finish within `timeout`.
    pub async fn wait_for_completion(&self, timeout: Duration) -> bool {
        let notified = self.completion_notify.notified();
        if self.is_indexing_completed() {
            return true;
        }
        tokio::time::timeout(timeout, notified).await.is_ok() || self.is_indexing_completed()
    }

    /// ワークスペースをインデックス
    ///
    /// Catalogs are read and parsed on blocking threads, at most
    /// `indexing.numThreads` at a time, then registered in `catalogs`.
    /// Paths already present in `catalogs` are left untouched, so buffers
    /// opened while indexing keep their editor text.
    /// `progress` receives `(processed, total)` after every file.
    ///
    /// Returns the number of catalogs loaded.
    ///
    /// # Errors
    /// Returns error if the configured patterns are invalid.
    pub async fn index_workspace<F>(
        &self,
        db: LinguistDatabaseImpl,
        workspace_path: &Path,
        config_manager: &ConfigManager,
        catalogs: Arc<Mutex<HashMap<PathBuf, CatalogFile>>>,
        progress: Option<F>,
    ) -> Result<usize, IndexerError>
    where
        F: Fn(u32, u32) + Send + Sync,
    {
        tracing::debug!(workspace_path = %workspace_path.display(), "Indexing workspace");
        let settings = config_manager.get_settings();
        let matcher = FileMatcher::new(workspace_path.to_path_buf(), settings)?;
        let num_threads = settings.num_threads();

        let files = Self::find_catalog_files(workspace_path, &matcher)?;
        let total = u32::try_from(files.len()).unwrap_or(u32::MAX);
        tracing::debug!(total, num_threads, "Found catalog candidates");

        let mut results = futures::stream::iter(files)
            .map(|path| {
                tokio::task::spawn_blocking(move || {
                    let result = LoadedCatalog::read(&path);
                    (path, result)
                })
            })
            .buffer_unordered(num_threads);

        let mut loaded = Vec::new();
        let mut processed: u32 = 0;
        while let Some(result) = results.next().await {
            processed = processed.saturating_add(1);
            if let Some(report) = &progress {
                report(processed, total);
            }

            match result {
                Ok((_, Ok(Some(catalog)))) => loaded.push(catalog),
                Ok((path, Ok(None))) => {
                    tracing::debug!("Skipping {:?}: not a Qt Linguist catalog", path);
                }
                Ok((path, Err(e))) => {
                    tracing::warn!("Failed to read file {:?}: {}", path, e);
                }
                Err(e) => {
                    tracing::warn!("Catalog loading task failed: {}", e);
                }
            }
        }

        let count = loaded.len();
        let mut catalogs = catalogs.lock().await;
        for catalog in loaded {
            let path = PathBuf::from(&catalog.file_path);
            // 既に登録済みのカタログはエディタのバッファなのでディスクの内容で上書きしない
            if catalogs.contains_key(&path) {
                tracing::debug!("Keeping registered catalog {}", path.display());
                continue;
            }
            catalogs.insert(path, catalog.into_input(&db));
        }
        drop(catalogs);

        tracing::info!(count, workspace_path = %workspace_path.display(), "Indexed catalogs");
        Ok(count)
    }

    /// カタログ候補のファイルを検索
    ///
    /// Only paths are checked here; content sniffing happens while loading.
    ///
    /// # Errors
    /// Returns error if `workspace_path` is not a directory.
    pub fn find_catalog_files(
        workspace_path: &Path,
        matcher: &FileMatcher,
    ) -> Result<Vec<PathBuf>, IndexerError> {
        if !workspace_path.is_dir() {
            return Err(IndexerError::InvalidPath(workspace_path.display().to_string()));
        }

        let mut found_files = Vec::new();
        for result in WalkBuilder::new(workspace_path)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            let Ok(relative_path) = path.strip_prefix(workspace_path) else {
                continue;
            };
            if matcher.is_catalog_file_relative(relative_path) {
                found_files.push(path.to_path_buf());
            }
        }

        found_files.sort();
        Ok(found_files)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::sync::atomic::AtomicU32;

    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::config::LinguistSettings;
    use crate::input::catalog::catalog_from_text;

    const CATALOG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1" language="de">
<context>
    <name>Main</name>
    <message>
        <source>Quit</source>
        <translation>Beenden</translation>
    </message>
</context>
</TS>
"#;

    fn create_workspace() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("translations")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("translations/app_de.ts"), CATALOG).unwrap();
        fs::write(root.join("translations/app_fr.ts"), CATALOG.replace("\"de\"", "\"fr\""))
            .unwrap();
        fs::write(root.join("src/main.ts"), "console.log('hi');\n").unwrap();
        fs::write(root.join("node_modules/pkg/app_ru.ts"), CATALOG).unwrap();
        temp_dir
    }

    #[rstest]
    fn find_catalog_files_applies_patterns() {
        let workspace = create_workspace();
        let matcher =
            FileMatcher::new(workspace.path().to_path_buf(), &LinguistSettings::default()).unwrap();

        let files = WorkspaceIndexer::find_catalog_files(workspace.path(), &matcher).unwrap();

        let relative: Vec<_> =
            files.iter().map(|path| path.strip_prefix(workspace.path()).unwrap()).collect();
        assert_eq!(
            relative,
            vec![
                Path::new("src/main.ts"),
                Path::new("translations/app_de.ts"),
                Path::new("translations/app_fr.ts"),
            ]
        );
    }

    #[rstest]
    fn find_catalog_files_rejects_missing_directory() {
        let workspace = TempDir::new().unwrap();
        let missing = workspace.path().join("missing");
        let matcher = FileMatcher::new(missing.clone(), &LinguistSettings::default()).unwrap();

        let result = WorkspaceIndexer::find_catalog_files(&missing, &matcher);

        assert!(matches!(result, Err(IndexerError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn index_workspace_loads_only_catalogs() {
        let workspace = create_workspace();
        let mut config_manager = ConfigManager::new();
        config_manager.load_settings(Some(workspace.path().to_path_buf())).unwrap();
        let catalogs = Arc::new(Mutex::new(HashMap::new()));
        let db = LinguistDatabaseImpl::default();
        let calls = AtomicU32::new(0);
        let last_total = AtomicU32::new(0);

        let indexer = WorkspaceIndexer::new();
        let count = indexer
            .index_workspace(
                db.clone(),
                workspace.path(),
                &config_manager,
                catalogs.clone(),
                Some(|_current: u32, total: u32| {
                    calls.fetch_add(1, Ordering::Relaxed);
                    last_total.store(total, Ordering::Relaxed);
                }),
            )
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert_eq!(last_total.load(Ordering::Relaxed), 3);

        let catalogs = catalogs.lock().await;
        let de = catalogs.get(&workspace.path().join("translations/app_de.ts")).unwrap();
        assert_that!(de.language(&db), some(eq("de")));
        assert_that!(de.module(&db), some(eq("app")));
        assert!(!catalogs.contains_key(&workspace.path().join("src/main.ts")));
    }

    #[tokio::test]
    async fn index_workspace_keeps_registered_catalogs() {
        let workspace = create_workspace();
        let mut config_manager = ConfigManager::new();
        config_manager.load_settings(Some(workspace.path().to_path_buf())).unwrap();
        let db = LinguistDatabaseImpl::default();
        let de_path = workspace.path().join("translations/app_de.ts");
        let edited = CATALOG.replace("</context>", "<message><source>Edited</source></message></context>");
        let opened = catalog_from_text(&db, &de_path, edited.clone());
        let catalogs = Arc::new(Mutex::new(HashMap::from([(de_path.clone(), opened)])));

        let count = WorkspaceIndexer::new()
            .index_workspace(
                db.clone(),
                workspace.path(),
                &config_manager,
                catalogs.clone(),
                None::<fn(u32, u32)>,
            )
            .await
            .unwrap();

        assert_eq!(count, 2);
        let catalogs = catalogs.lock().await;
        assert_eq!(catalogs.len(), 2);
        assert_eq!(catalogs.get(&de_path).unwrap().text(&db), &edited);
    }

    #[tokio::test]
    async fn wait_for_completion_wakes_on_mark() {
        let indexer = WorkspaceIndexer::new();
        assert!(!indexer.is_indexing_completed());
        assert!(!indexer.wait_for_completion(Duration::from_millis(10)).await);

        let waiter = {
            let indexer = indexer.clone();
            tokio::spawn(async move { indexer.wait_for_completion(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        indexer.mark_indexing_completed();

        assert!(waiter.await.unwrap());
        assert!(indexer.is_indexing_completed());

        indexer.reset_indexing_state();
        assert!(!indexer.is_indexing_completed());
    }

    #[tokio::test]
    async fn wait_for_completion_is_pending_until_marked() {
        let indexer = WorkspaceIndexer::new();
        let mut waiter =
            tokio_test::task::spawn(indexer.wait_for_completion(Duration::from_secs(5)));

        tokio_test::assert_pending!(waiter.poll());
        indexer.mark_indexing_completed();

        assert!(waiter.is_woken());
        tokio_test::assert_ready_eq!(waiter.poll(), true);
    }
}
