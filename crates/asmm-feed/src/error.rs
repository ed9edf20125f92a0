//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Fetch error: {0}")]
    Registry(#[from] asmm_registry::RegistryError),

    #[error("Cache IO error: {0}")]
    CacheIo(#[from] asmm_persistence::PersistenceError),

    #[error("No cached data and source unreachable: {0}")]
    Unavailable(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
