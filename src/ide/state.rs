//! LSP サーバーの共有状態

use std::collections::{
    HashMap,
    HashSet,
};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{
    Mutex,
    MutexGuard,
};
use tower_lsp::lsp_types::Url;

use crate::db::LinguistDatabaseImpl;
use crate::input::catalog::{
    CatalogFile,
    catalog_from_text,
};

/// LSP サーバーの共有状態
///
/// `Backend` から状態管理の責務を分離し、ハンドラー間で共有可能にします。
///
/// # ロック順序
///
/// 複数のロックを同時に取得する場合は、以下の順序を厳守してください：
/// 1. `db`
/// 2. `catalogs`
/// 3. `opened_files`
#[derive(Clone)]
pub struct ServerState {
    /// Salsa データベース
    pub db: Arc<Mutex<LinguistDatabaseImpl>>,
    /// カタログ管理（ファイルパス → `CatalogFile`）
    pub catalogs: Arc<Mutex<HashMap<PathBuf, CatalogFile>>>,
    /// 現在開いているファイルの URI
    pub opened_files: Arc<Mutex<HashSet<Url>>>,
}

impl ServerState {
    #[must_use]
    pub fn new(db: LinguistDatabaseImpl) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            catalogs: Arc::new(Mutex::new(HashMap::new())),
            opened_files: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// `db` と `catalogs` のロックを一括取得
    ///
    /// ロック順序（`db` → `catalogs`）を保証します。
    pub async fn lock_db_and_catalogs(
        &self,
    ) -> (MutexGuard<'_, LinguistDatabaseImpl>, MutexGuard<'_, HashMap<PathBuf, CatalogFile>>) {
        let db = self.db.lock().await;
        let catalogs = self.catalogs.lock().await;
        (db, catalogs)
    }

    /// 全カタログを破棄して新しいデータベースに切り替える
    ///
    /// 開いているファイルのカタログはエディタの内容のまま新しいデータベースに
    /// 登録し直します。続くインデックスはそれらを上書きしません。
    pub async fn reset(&self) {
        let mut db = self.db.lock().await;
        let mut catalogs = self.catalogs.lock().await;
        let opened_files = self.opened_files.lock().await;

        let buffers: Vec<(PathBuf, String)> = opened_files
            .iter()
            .filter_map(|uri| uri.to_file_path().ok())
            .filter_map(|path| {
                let text = catalogs.get(&path)?.text(&*db).clone();
                Some((path, text))
            })
            .collect();
        drop(opened_files);

        *db = LinguistDatabaseImpl::default();
        catalogs.clear();
        for (path, text) in buffers {
            let catalog_file = catalog_from_text(&*db, &path, text);
            catalogs.insert(path, catalog_file);
        }
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("db", &"<LinguistDatabaseImpl>")
            .field("catalogs", &"<HashMap<PathBuf, CatalogFile>>")
            .field("opened_files", &"<HashSet<Url>>")
            .finish()
    }
}
