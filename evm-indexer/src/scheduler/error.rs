use derive_more::Display;

use crate::chain_reader::ChainReaderError;
use crate::RepoError;

#[derive(Debug, Display, PartialEq, Eq)]
pub enum IndexingError {
    #[display("Chain Reader Error: {_0}")]
    ChainReader(ChainReaderError),
    #[display("Repo Error: {_0}")]
    Repo(RepoError),
    /// The stop signal was raised while waiting to retry
    #[display("Indexing cancelled")]
    Cancelled,
}

impl std::error::Error for IndexingError {}

impl From<ChainReaderError> for IndexingError {
    fn from(value: ChainReaderError) -> Self {
        IndexingError::ChainReader(value)
    }
}

impl From<RepoError> for IndexingError {
    fn from(value: RepoError) -> Self {
        IndexingError::Repo(value)
    }
}
