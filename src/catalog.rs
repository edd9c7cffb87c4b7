//! Qt Linguist `.ts` catalogs: model, reading, writing and analysis.

pub mod error;
pub mod lookup;
pub mod merge;
pub mod model;
pub mod parser;
pub mod plural;
pub mod positions;
pub mod stats;
pub mod validate;
pub mod writer;

pub use error::CatalogError;
pub use model::{
    Context,
    Location,
    Message,
    MessageKey,
    Translation,
    TranslationBody,
    TranslationCatalog,
    TranslationKind,
};
pub use parser::{
    ParsedCatalog,
    is_catalog_text,
    parse_catalog,
};
pub use writer::write_catalog;
