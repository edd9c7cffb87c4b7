//! Workspace indexing: finds catalog files and loads them into the database.

pub mod types;
pub mod workspace;
