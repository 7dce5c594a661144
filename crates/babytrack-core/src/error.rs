use thiserror::Error;

use crate::model::IdError;
use crate::schema::ValidationError;

/// Core errors for the tracker system.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("DynamoDB error: {0}")]
    Dynamo(#[from] aws_sdk_dynamodb::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_dynamo::Error),

    #[error("Checklist data error: {0}")]
    ChecklistData(String),

    #[error("Identifier error: {0}")]
    Id(#[from] IdError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}
