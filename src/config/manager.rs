//! 設定管理を行うモジュール

use std::path::PathBuf;

use super::{
    ConfigError,
    LinguistSettings,
    loader,
};

/// 有効な設定とワークスペースルートを保持する
///
/// 不正な設定は適用されず、直前の有効な設定が残ります。
#[derive(Default, Debug, Clone)]
pub struct ConfigManager {
    settings: LinguistSettings,
    workspace_root: Option<PathBuf>,
}

impl ConfigManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ワークスペースルートを記録し、その `.linguist-ls.json` を適用する
    ///
    /// 設定ファイルがなければデフォルト値を使います。
    /// ルートは設定が不正でも記録するので、ファイルを直した後の
    /// [`Self::reload`] で読み直せます。
    ///
    /// # Errors
    /// - ファイル読み込みエラー、JSON パースエラー
    /// - バリデーションエラー
    pub fn load_settings(&mut self, workspace_root: Option<PathBuf>) -> Result<(), ConfigError> {
        tracing::debug!(?workspace_root, "Loading settings");
        self.workspace_root = workspace_root;
        self.reload()
    }

    /// 記録済みのルートから `.linguist-ls.json` を読み直す
    ///
    /// # Errors
    /// [`Self::load_settings`] と同じ
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        let settings = match &self.workspace_root {
            Some(root) => loader::read_workspace_settings(root)?.unwrap_or_default(),
            None => LinguistSettings::default(),
        };
        self.apply(settings)
    }

    /// クライアントから届いた設定を適用する（`did_change_configuration` 用）
    ///
    /// # Errors
    /// - バリデーションエラー（現在の設定は変更されない）
    pub fn update_settings(&mut self, new_settings: LinguistSettings) -> Result<(), ConfigError> {
        self.apply(new_settings)
    }

    fn apply(&mut self, settings: LinguistSettings) -> Result<(), ConfigError> {
        settings.validate().map_err(ConfigError::ValidationErrors)?;
        tracing::debug!(?settings, "Settings applied");
        self.settings = settings;
        Ok(())
    }

    #[must_use]
    pub const fn get_settings(&self) -> &LinguistSettings {
        &self.settings
    }

    #[must_use]
    pub const fn workspace_root(&self) -> Option<&PathBuf> {
        self.workspace_root.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;
    use crate::config::loader::CONFIG_FILE_NAME;

    #[rstest]
    fn defaults_without_workspace() {
        let mut manager = ConfigManager::new();

        assert!(manager.load_settings(None).is_ok());
        assert_that!(manager.get_settings().source_language, eq("en"));
        assert_that!(manager.workspace_root(), none());
    }

    #[rstest]
    fn applies_config_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), r#"{"sourceLanguage": "ja"}"#).unwrap();

        let mut manager = ConfigManager::new();
        let result = manager.load_settings(Some(temp_dir.path().to_path_buf()));

        assert!(result.is_ok());
        assert_that!(manager.get_settings().source_language, eq("ja"));
        assert_that!(manager.workspace_root(), some(eq(&temp_dir.path().to_path_buf())));
    }

    /// 不正な設定ファイルでもルートは記録され、直した後に読み直せる
    #[rstest]
    fn reload_after_fixing_invalid_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, r#"{"sourceLanguage": ""}"#).unwrap();

        let mut manager = ConfigManager::new();
        let result = manager.load_settings(Some(temp_dir.path().to_path_buf()));

        assert!(matches!(result, Err(ConfigError::ValidationErrors(_))));
        assert_that!(manager.get_settings().source_language, eq("en"));
        assert_that!(manager.workspace_root(), some(anything()));

        fs::write(&config_path, r#"{"sourceLanguage": "uk"}"#).unwrap();
        assert!(manager.reload().is_ok());
        assert_that!(manager.get_settings().source_language, eq("uk"));
    }

    #[rstest]
    fn reload_after_deleting_config_file_restores_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, r#"{"sourceLanguage": "fr"}"#).unwrap();
        let mut manager = ConfigManager::new();
        manager.load_settings(Some(temp_dir.path().to_path_buf())).unwrap();

        fs::remove_file(&config_path).unwrap();
        manager.reload().unwrap();

        assert_that!(manager.get_settings().source_language, eq("en"));
    }

    #[rstest]
    fn update_settings_validates() {
        let mut manager = ConfigManager::new();

        let valid =
            LinguistSettings { source_language: "de".to_string(), ..LinguistSettings::default() };
        assert!(manager.update_settings(valid).is_ok());

        let invalid =
            LinguistSettings { source_language: String::new(), ..LinguistSettings::default() };
        assert!(manager.update_settings(invalid).is_err());
        assert_that!(manager.get_settings().source_language, eq("de"));
    }
}
