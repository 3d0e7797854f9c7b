use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("executing token '{name}' ({value}): {source}")]
    Token {
        name: String,
        value: String,
        #[source]
        source: Box<Error>,
    },

    #[error("sql execution failed: {0}")]
    Sql(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("unknown column: {entity}.{column}")]
    UnknownColumn { entity: String, column: String },

    #[error("invalid name pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Schema(#[from] dbmerge_schema::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
