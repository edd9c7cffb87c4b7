//! 設定の読み込み: `.linguist-ls.json` とクライアントから届く JSON

use std::io::ErrorKind;
use std::path::Path;

use serde_json::Value;

use super::{
    ConfigError,
    LinguistSettings,
    ServerSettings,
};

/// ワークスペースの設定ファイル名
pub const CONFIG_FILE_NAME: &str = ".linguist-ls.json";

/// `workspace_root` 直下の `.linguist-ls.json` を読み込む
///
/// ファイルがなければ `Ok(None)`。
///
/// # Errors
/// - ファイル読み込みエラー
/// - JSON パースエラー
pub(super) fn read_workspace_settings(
    workspace_root: &Path,
) -> Result<Option<LinguistSettings>, ConfigError> {
    let config_path = workspace_root.join(CONFIG_FILE_NAME);
    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %config_path.display(), "No configuration file");
            return Ok(None);
        }
        Err(error) => return Err(error.into()),
    };

    tracing::debug!(path = %config_path.display(), "Reading configuration");
    settings_from_value(serde_json::from_str(&content)?).map(Some)
}

/// Decodes settings given either bare or as `{"linguist": {...}}`.
///
/// # Errors
/// [`ConfigError::ParseError`] when a field has the wrong type.
pub fn settings_from_value(value: Value) -> Result<LinguistSettings, ConfigError> {
    if value.get("linguist").is_some() {
        let wrapped: ServerSettings = serde_json::from_value(value)?;
        return Ok(wrapped.linguist);
    }
    Ok(serde_json::from_value(value)?)
}
