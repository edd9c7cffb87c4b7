use thiserror::Error;

/// Errors raised while reading or writing a catalog.
///
/// Content problems (unfinished entries, duplicate keys, wrong plural form
/// counts) are not errors; they are reported by [`crate::catalog::validate`].
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The text is not well-formed XML
    #[error("Failed to parse catalog XML: {0}")]
    Xml(#[from] xmltree::ParseError),

    /// Well-formed XML whose root is not `<TS>`
    #[error("Root element is <{0}>, expected <TS>")]
    NotACatalog(String),

    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write catalog: {0}")]
    Write(#[from] xmltree::Error),

    #[error("Catalog output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
