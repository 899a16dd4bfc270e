use ratebook_protocol::SourceError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NavigatorError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigatorError {
    #[error("No database selected")]
    NoDatabase,

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Work details not found: {0}")]
    WorkNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}
