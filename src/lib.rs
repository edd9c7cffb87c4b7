//! linguist-language-server
//!
//! Qt Linguist の翻訳カタログ（`.ts`）向けの Language Server Protocol (LSP) 実装。
//! カタログの読み書き、検証、`lupdate` 相当の更新、翻訳の検索も提供します。

pub mod catalog;
pub mod config;
pub mod db;
pub mod ide;
pub mod indexer;
pub mod input;
pub mod types;

#[cfg(test)]
mod test_utils;

// Backend を再エクスポート
pub use ide::backend::Backend;
