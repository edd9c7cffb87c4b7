//! Indexer type definitions.

use thiserror::Error;

use crate::config::MatcherError;

#[derive(Error, Debug)]
pub enum IndexerError {
    /// The workspace path cannot be walked
    #[error("Invalid workspace path: {0}")]
    InvalidPath(String),
    /// The configured patterns do not build a matcher
    #[error(transparent)]
    Matcher(#[from] MatcherError),
    /// Other generic error
    #[error("An error occurred: {0}")]
    Error(String),
}
