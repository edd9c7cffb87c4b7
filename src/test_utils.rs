//! テスト用ユーティリティ関数
//!
//! 複数のテストモジュールで使用される共通のカタログとヘルパーを提供します。
#![cfg(test)]

use std::collections::HashMap;
use std::path::{
    Path,
    PathBuf,
};

use crate::db::LinguistDatabaseImpl;
use crate::input::catalog::{
    CatalogFile,
    catalog_from_text,
};

/// Ukrainian catalog: one finished, one unfinished and one numerus message
/// with too few plural forms.
///
/// Line numbers: `Open` source on 7, `Save` source on 13, numerus source on 17.
pub(crate) const UK_CATALOG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1" language="uk_UA">
<context>
    <name>MainWindow</name>
    <message>
        <location filename="../mainwindow.cpp" line="42"/>
        <source>Open</source>
        <extracomment>Toolbar action</extracomment>
        <translation>Відкрити</translation>
    </message>
    <message>
        <location line="+3"/>
        <source>Save</source>
        <translation type="unfinished">Зберегти</translation>
    </message>
    <message numerus="yes">
        <source>%n file(s)</source>
        <translation>
            <numerusform>%n файл</numerusform>
            <numerusform>%n файли</numerusform>
        </translation>
    </message>
</context>
</TS>
"#;

/// German catalog of the same module, fully translated.
pub(crate) const DE_CATALOG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1" language="de">
<context>
    <name>MainWindow</name>
    <message>
        <source>Open</source>
        <translation>Öffnen</translation>
    </message>
    <message>
        <source>Save</source>
        <translation>Speichern</translation>
    </message>
</context>
</TS>
"#;

/// Tatar catalog of the same module with `Open` still untranslated.
pub(crate) const TT_CATALOG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1" language="tt">
<context>
    <name>MainWindow</name>
    <message>
        <source>Open</source>
        <translation type="unfinished"></translation>
    </message>
</context>
</TS>
"#;

/// テスト用の `CatalogFile` を作成する
pub(crate) fn create_catalog(db: &LinguistDatabaseImpl, file_path: &str, text: &str) -> CatalogFile {
    catalog_from_text(db, Path::new(file_path), text.to_string())
}

/// `/workspace/translations` 配下に `app` モジュールの 3 カタログを登録する
pub(crate) fn create_module_catalogs(db: &LinguistDatabaseImpl) -> HashMap<PathBuf, CatalogFile> {
    [
        ("/workspace/translations/app_uk_UA.ts", UK_CATALOG),
        ("/workspace/translations/app_de.ts", DE_CATALOG),
        ("/workspace/translations/app_tt.ts", TT_CATALOG),
    ]
    .into_iter()
    .map(|(path, text)| (PathBuf::from(path), create_catalog(db, path, text)))
    .collect()
}
