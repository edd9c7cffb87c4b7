//! Catalog file input definitions

use std::path::Path;

use crate::catalog::model::{
    Context,
    Message,
};
use crate::catalog::positions::{
    CatalogSpans,
    MessageSpan,
    scan_spans,
};
use crate::catalog::{
    ParsedCatalog,
    is_catalog_text,
    parse_catalog,
};
use crate::db::LinguistDatabase;
use crate::types::SourcePosition;

/// Salsa input representing one `.ts` catalog file.
#[salsa::input]
pub struct CatalogFile {
    #[returns(ref)]
    pub file_path: String,

    /// Locale of the catalog (e.g. "uk_UA"). The `<TS language>` attribute
    /// wins over the file name.
    #[returns(ref)]
    pub language: Option<String>,

    /// File name without the locale suffix (e.g. "leechcraft_bittorrent").
    /// Catalogs sharing a module translate the same messages.
    #[returns(ref)]
    pub module: Option<String>,

    #[returns(ref)]
    pub text: String,

    /// Parsed document, or the reader's error message.
    #[returns(ref)]
    pub document: Result<ParsedCatalog, String>,

    #[returns(ref)]
    pub spans: CatalogSpans,
}

/// A message resolved from a position in a catalog file.
#[derive(Debug, Clone, Copy)]
pub struct MessageRef<'a> {
    pub context: &'a Context,
    pub message: &'a Message,
    pub span: &'a MessageSpan,
    /// Document-order index of the message.
    pub document_index: usize,
}

impl CatalogFile {
    /// The message whose `<message>` element contains `position`.
    #[must_use]
    pub fn message_at<'db>(
        self,
        db: &'db dyn LinguistDatabase,
        position: SourcePosition,
    ) -> Option<MessageRef<'db>> {
        let document_index = self.spans(db).message_at(position)?;
        self.message_by_index(db, document_index)
    }

    /// The message with the given document-order index.
    #[must_use]
    pub fn message_by_index<'db>(
        self,
        db: &'db dyn LinguistDatabase,
        document_index: usize,
    ) -> Option<MessageRef<'db>> {
        let parsed = self.document(db).as_ref().ok()?;
        let (context_index, message_index) = parsed.message_position(document_index)?;
        let context = parsed.catalog.contexts.get(context_index)?;
        Some(MessageRef {
            context,
            message: context.messages.get(message_index)?,
            span: self.spans(db).messages.get(document_index)?,
            document_index,
        })
    }

    /// Document-order index of the message with the given key, if present.
    #[must_use]
    pub fn find_message(
        self,
        db: &dyn LinguistDatabase,
        context: &str,
        source: &str,
        disambiguation: Option<&str>,
    ) -> Option<usize> {
        let parsed = self.document(db).as_ref().ok()?;
        parsed.catalog.contexts.iter().enumerate().find_map(|(context_index, candidate)| {
            if candidate.name != context {
                return None;
            }
            let message_index = candidate.messages.iter().position(|message| {
                message.source == source && message.disambiguation() == disambiguation
            })?;
            parsed.document_index(context_index, message_index)
        })
    }
}

/// Splits a catalog file name into module and locale.
///
/// Qt names catalogs `<module>_<language>[_<COUNTRY>].ts`.
///
/// # Examples
/// - `leechcraft_bittorrent_uk_UA.ts` -> (`leechcraft_bittorrent`, `uk_UA`)
/// - `leechcraft_azoth_tt.ts` -> (`leechcraft_azoth`, `tt`)
/// - `de.ts` -> (None, `de`)
fn split_file_stem(file_path: &Path) -> (Option<String>, Option<String>) {
    let Some(stem) = file_path.file_stem().map(|stem| stem.to_string_lossy().to_string()) else {
        return (None, None);
    };
    let parts: Vec<&str> = stem.split('_').collect();

    let is_language = |part: &str| {
        (2..=3).contains(&part.len()) && part.chars().all(|ch| ch.is_ascii_lowercase())
    };
    let is_country = |part: &str| {
        part.len() == 2 && part.chars().all(|ch| ch.is_ascii_uppercase())
    };

    let locale_parts = match parts.as_slice() {
        [.., language, country] if is_language(language) && is_country(country) => 2,
        [.., language] if is_language(language) => 1,
        _ => return (Some(stem), None),
    };

    let split = parts.len() - locale_parts;
    let module = parts.get(..split).map(|module| module.join("_")).filter(|m| !m.is_empty());
    let language = parts.get(split..).map(|locale| locale.join("_"));
    (module, language)
}

/// Detect the locale from a catalog file name.
#[must_use]
pub fn detect_language_from_path(file_path: &Path) -> Option<String> {
    split_file_stem(file_path).1
}

/// Detect the module from a catalog file name.
#[must_use]
pub fn detect_module_from_path(file_path: &Path) -> Option<String> {
    split_file_stem(file_path).0
}

/// A catalog file read and parsed, not yet registered in the database.
///
/// Parsing needs no database, so the indexer builds these on blocking
/// threads and only registers the results.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub file_path: String,
    pub language: Option<String>,
    pub module: Option<String>,
    pub text: String,
    pub document: Result<ParsedCatalog, String>,
    pub spans: CatalogSpans,
}

impl LoadedCatalog {
    /// Parses already loaded text.
    ///
    /// A parse failure does not fail the load: the error is kept in
    /// `document` and reported as a diagnostic.
    #[must_use]
    pub fn from_text(file_path: &Path, text: String) -> Self {
        let document = parse_catalog(&text).map_err(|e| e.to_string());
        let spans = scan_spans(&text);

        let language = document
            .as_ref()
            .ok()
            .and_then(|parsed| parsed.catalog.language.clone())
            .or_else(|| detect_language_from_path(file_path));

        if let Err(error) = &document {
            tracing::warn!("Failed to parse catalog {}: {}", file_path.display(), error);
        }

        Self {
            file_path: file_path.to_string_lossy().to_string(),
            language,
            module: detect_module_from_path(file_path),
            text,
            document,
            spans,
        }
    }

    /// Reads and parses a file, or returns `None` if its content is not a
    /// Qt Linguist catalog.
    ///
    /// # Errors
    /// Returns error if the file cannot be read.
    pub fn read(file_path: &Path) -> Result<Option<Self>, std::io::Error> {
        let text = std::fs::read_to_string(file_path)?;
        if !is_catalog_text(&text) {
            return Ok(None);
        }
        Ok(Some(Self::from_text(file_path, text)))
    }

    /// Registers the catalog as a salsa input.
    pub fn into_input(self, db: &dyn LinguistDatabase) -> CatalogFile {
        CatalogFile::new(
            db,
            self.file_path,
            self.language,
            self.module,
            self.text,
            self.document,
            self.spans,
        )
    }
}

/// Create a `CatalogFile` input from already loaded text.
pub fn catalog_from_text(db: &dyn LinguistDatabase, file_path: &Path, text: String) -> CatalogFile {
    LoadedCatalog::from_text(file_path, text).into_input(db)
}

/// Load a catalog file from disk and create a `CatalogFile` input.
///
/// No content sniffing happens here: the caller already decided the file is
/// a catalog.
///
/// # Errors
/// Returns error if the file cannot be read.
pub fn load_catalog_file(
    db: &dyn LinguistDatabase,
    file_path: &Path,
) -> Result<CatalogFile, std::io::Error> {
    let text = std::fs::read_to_string(file_path)?;
    Ok(catalog_from_text(db, file_path, text))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::db::LinguistDatabaseImpl;

    const CATALOG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1" language="uk_UA">
<context>
    <name>Downloader</name>
    <message>
        <source>Open</source>
        <translation>Відкрити</translation>
    </message>
    <message>
        <source>Save</source>
        <comment>verb</comment>
        <translation type="unfinished"></translation>
    </message>
</context>
</TS>
"#;

    #[rstest]
    #[case("/w/translations/leechcraft_bittorrent_uk_UA.ts", Some("leechcraft_bittorrent"), Some("uk_UA"))]
    #[case("/w/translations/leechcraft_azoth_tt.ts", Some("leechcraft_azoth"), Some("tt"))]
    #[case("/w/translations/app_de.ts", Some("app"), Some("de"))]
    #[case("/w/translations/de.ts", None, Some("de"))]
    #[case("/w/translations/pt_BR.ts", None, Some("pt_BR"))]
    #[case("/w/translations/messages.ts", Some("messages"), None)]
    #[case("/w/translations/app_template.ts", Some("app_template"), None)]
    fn test_detect_from_path(
        #[case] path: &str,
        #[case] module: Option<&str>,
        #[case] language: Option<&str>,
    ) {
        assert_eq!(detect_module_from_path(Path::new(path)).as_deref(), module);
        assert_eq!(detect_language_from_path(Path::new(path)).as_deref(), language);
    }

    #[googletest::test]
    fn catalog_from_text_prefers_document_language() {
        let db = LinguistDatabaseImpl::default();

        let file = catalog_from_text(&db, Path::new("/w/app_ru.ts"), CATALOG.to_string());

        expect_that!(file.language(&db), some(eq("uk_UA")));
        expect_that!(file.module(&db), some(eq("app")));
        expect_that!(file.document(&db), ok(anything()));
        expect_that!(file.spans(&db).messages, len(eq(2)));
    }

    #[googletest::test]
    fn catalog_from_text_keeps_parse_error() {
        let db = LinguistDatabaseImpl::default();

        let file = catalog_from_text(&db, Path::new("/w/app_de.ts"), "<TS><context>".to_string());

        expect_that!(file.document(&db), err(anything()));
        expect_that!(file.language(&db), some(eq("de")));
    }

    #[googletest::test]
    fn message_lookup_by_position_and_key() {
        let db = LinguistDatabaseImpl::default();
        let file = catalog_from_text(&db, Path::new("/w/app_uk_UA.ts"), CATALOG.to_string());

        let open = file.message_at(&db, SourcePosition { line: 6, character: 20 }).unwrap();
        expect_that!(open.message.source, eq("Open"));
        expect_that!(open.context.name, eq("Downloader"));
        expect_that!(open.document_index, eq(0));

        expect_that!(file.message_at(&db, SourcePosition { line: 4, character: 8 }), none());
        expect_that!(file.find_message(&db, "Downloader", "Save", Some("verb")), some(eq(1)));
        expect_that!(file.find_message(&db, "Downloader", "Save", None), none());
    }

    #[googletest::test]
    fn load_catalog_file_reads_from_disk() {
        let db = LinguistDatabaseImpl::default();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("app_uk_UA.ts");
        std::fs::write(&path, CATALOG).unwrap();

        let file = load_catalog_file(&db, &path).unwrap();

        expect_that!(file.text(&db), eq(CATALOG));
        assert!(load_catalog_file(&db, &temp_dir.path().join("missing.ts")).is_err());
    }

    #[googletest::test]
    fn read_skips_typescript_sources() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let typescript = temp_dir.path().join("main.ts");
        std::fs::write(&typescript, "export const answer = 42;\n").unwrap();
        let catalog = temp_dir.path().join("app_uk_UA.ts");
        std::fs::write(&catalog, CATALOG).unwrap();

        expect_that!(LoadedCatalog::read(&typescript).unwrap(), none());
        let loaded = LoadedCatalog::read(&catalog).unwrap().unwrap();
        expect_that!(loaded.language, some(eq("uk_UA")));
        expect_that!(loaded.module, some(eq("app")));
    }
}
