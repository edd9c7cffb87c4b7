//! Go to Definition implementation
//!
//! `<location>` entries point into the application sources. Their file names
//! are relative to the directory of the catalog.

use std::path::{
    Component,
    Path,
    PathBuf,
};

use tower_lsp::lsp_types::{
    Location,
    Position,
    Range,
    Url,
};

use crate::db::LinguistDatabase;
use crate::input::catalog::CatalogFile;
use crate::types::SourcePosition;

/// Find the source locations of the message at `position`
///
/// On a `<location>` element only that location is returned; anywhere else
/// in the message all of its locations are.
pub fn find_definitions(
    db: &dyn LinguistDatabase,
    catalog_file: CatalogFile,
    position: SourcePosition,
) -> Vec<Location> {
    let Some(found) = catalog_file.message_at(db, position) else {
        return Vec::new();
    };
    let Some(catalog_dir) = Path::new(catalog_file.file_path(db)).parent() else {
        return Vec::new();
    };

    let selected = found.span.locations.iter().position(|range| range.contains(position));
    found
        .message
        .locations
        .iter()
        .enumerate()
        .filter(|(index, _)| selected.is_none_or(|selected| selected == *index))
        .filter_map(|(_, location)| {
            let filename = location.filename.as_deref()?;
            let path = normalize_path(&catalog_dir.join(filename));
            let Ok(uri) = Url::from_file_path(&path) else {
                tracing::warn!("Failed to create URI from file path: {}", path.display());
                return None;
            };
            // <location line> is 1-based
            let line = location.line.unwrap_or(1).saturating_sub(1);
            let position = Position { line, character: 0 };
            Some(Location { uri, range: Range { start: position, end: position } })
        })
        .collect()
}

/// Resolves `.` and `..` without touching the file system; the sources a
/// catalog points at are often not checked out.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
