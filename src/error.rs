use thiserror::Error;

use crate::model::Collection;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} must be a non-negative number")]
    InvalidQuantity(&'static str),

    #[error("an entry needs hours or kilometers")]
    EmptyEntry,

    #[error("no project with id {0}")]
    UnknownProject(String),

    #[error("no team member with id {0}")]
    UnknownTeamMember(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite store error")]
    Sqlite(#[from] sqlx::Error),

    #[error("http request to store failed")]
    Http(#[from] reqwest::Error),

    #[error("store rejected the command: {0}")]
    Rejected(String),

    #[error("value under {key} is not valid JSON")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode collection")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Failed to fetch {collection}")]
    Fetch {
        collection: Collection,
        #[source]
        source: StoreError,
    },

    #[error("Failed to save {collection}")]
    Persist {
        collection: Collection,
        #[source]
        source: StoreError,
    },
}
