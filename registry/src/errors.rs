use crate::validate::FieldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("gateway not found")]
    GatewayNotFound(i64),

    #[error("device not found")]
    DeviceNotFound(String),

    #[error("gateway cannot have more than {0} devices")]
    CapacityExceeded(usize),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.param, e.msg))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
