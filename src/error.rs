use std::path::PathBuf;

/// Errors raised by the library.
///
/// Markup problems are never errors: extractors degrade to smaller or empty
/// results. Only caller mistakes and policy file failures end up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("page {page_id} has an empty title")]
    EmptyTitle { page_id: u64 },
    #[error("failed to read link policy {path:?}: {source}")]
    PolicyIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse link policy {path:?}: {source}")]
    PolicyYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
