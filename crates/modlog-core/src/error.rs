use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModlogError {
    #[error("Config error in {path}: {message}")]
    Config { path: String, message: String },

    #[error("Lock error on {path}: {message}")]
    Lock { path: String, message: String },

    #[error("Invalid cron expression '{expr}': {message}")]
    Cron { expr: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ModlogError>;
