use ratebook_protocol::SourceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("Catalog source error: {0}")]
    SourceError(#[from] SourceError),

    #[error("No database selected")]
    MissingDatabase,
}
