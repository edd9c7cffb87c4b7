//! References implementation

use std::collections::HashMap;
use std::path::PathBuf;

use tower_lsp::lsp_types::{
    Location,
    Url,
};

use crate::db::LinguistDatabase;
use crate::input::catalog::CatalogFile;
use crate::types::SourcePosition;

/// Find the message at `position` in every catalog of the same module
///
/// Catalogs are matched by `(context, source, disambiguation)`. The results
/// are sorted by file path so clients show languages in a stable order.
pub fn find_references<S: std::hash::BuildHasher>(
    db: &dyn LinguistDatabase,
    catalog_file: CatalogFile,
    position: SourcePosition,
    catalogs: &HashMap<PathBuf, CatalogFile, S>,
    include_declaration: bool,
) -> Vec<Location> {
    let Some(found) = catalog_file.message_at(db, position) else {
        return Vec::new();
    };
    let context = &found.context.name;
    let message = found.message;
    let module = catalog_file.module(db);

    let mut siblings: Vec<&CatalogFile> = catalogs
        .values()
        .filter(|sibling| sibling.module(db) == module)
        .filter(|sibling| include_declaration || **sibling != catalog_file)
        .collect();
    siblings.sort_by(|a, b| a.file_path(db).cmp(b.file_path(db)));

    siblings
        .into_iter()
        .filter_map(|sibling| {
            let index =
                sibling.find_message(db, context, &message.source, message.disambiguation())?;
            let span = sibling.spans(db).messages.get(index)?;
            let file_path = sibling.file_path(db);
            let Ok(uri) = Url::from_file_path(file_path) else {
                tracing::warn!("Failed to create URI from file path: {}", file_path);
                return None;
            };
            Some(Location { uri, range: span.anchor().into() })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::path::Path;

    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::db::LinguistDatabaseImpl;
    use crate::test_utils::create_module_catalogs;

    #[rstest]
    #[case::with_declaration(true, vec!["/workspace/translations/app_de.ts", "/workspace/translations/app_tt.ts", "/workspace/translations/app_uk_UA.ts"])]
    #[case::without_declaration(false, vec!["/workspace/translations/app_de.ts", "/workspace/translations/app_tt.ts"])]
    fn finds_message_in_sibling_catalogs(
        #[case] include_declaration: bool,
        #[case] expected: Vec<&str>,
    ) {
        let db = LinguistDatabaseImpl::default();
        let catalogs = create_module_catalogs(&db);
        let uk = catalogs[Path::new("/workspace/translations/app_uk_UA.ts")];

        let locations = find_references(
            &db,
            uk,
            SourcePosition { line: 7, character: 18 },
            &catalogs,
            include_declaration,
        );

        let paths: Vec<&str> = locations.iter().map(|location| location.uri.path()).collect();
        assert_that!(paths, eq(&expected));
    }

    #[rstest]
    fn reference_points_at_source_text() {
        let db = LinguistDatabaseImpl::default();
        let catalogs = create_module_catalogs(&db);
        let uk = catalogs[Path::new("/workspace/translations/app_uk_UA.ts")];

        let locations =
            find_references(&db, uk, SourcePosition { line: 13, character: 18 }, &catalogs, false);

        assert_that!(locations, len(eq(1)));
        assert_that!(locations[0].uri.path(), eq("/workspace/translations/app_de.ts"));
        assert_that!(locations[0].range.start.line, eq(10));
    }

    #[rstest]
    fn other_modules_are_ignored() {
        let db = LinguistDatabaseImpl::default();
        let mut catalogs = create_module_catalogs(&db);
        let other = crate::test_utils::create_catalog(
            &db,
            "/workspace/translations/plugin_de.ts",
            crate::test_utils::DE_CATALOG,
        );
        catalogs.insert(PathBuf::from("/workspace/translations/plugin_de.ts"), other);
        let uk = catalogs[Path::new("/workspace/translations/app_uk_UA.ts")];

        let locations =
            find_references(&db, uk, SourcePosition { line: 7, character: 18 }, &catalogs, false);

        assert_that!(locations, len(eq(2)));
    }
}
