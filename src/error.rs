//! Error types for adapter operations

use thiserror::Error;

/// Errors that can occur while registering datastores or running queries
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Datastore configuration is missing an identity")]
    MissingIdentity,

    #[error("Datastore is already registered: {0}")]
    DuplicateIdentity(String),

    #[error("Unknown datastore: {0}")]
    UnknownDatastore(String),

    #[error("Unknown collection '{collection}' on datastore '{datastore}'")]
    UnknownCollection {
        datastore: String,
        collection: String,
    },

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Malformed criteria: {0}")]
    MalformedCriteria(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdapterError {
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::Connect(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn malformed_criteria(msg: impl Into<String>) -> Self {
        Self::MalformedCriteria(msg.into())
    }

    pub fn unknown_collection(datastore: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::UnknownCollection {
            datastore: datastore.into(),
            collection: collection.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
