use std::io;

#[derive(thiserror::Error, Debug)]
pub enum GuardError {
    #[error("config error: {0}")]
    Config(String),
    #[error("html error: {0}")]
    Html(String),
    #[error("alert delivery failed: {0}")]
    Delivery(String),
    #[error("unknown error")]
    Unknown,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<toml::de::Error> for GuardError {
    fn from(err: toml::de::Error) -> Self {
        GuardError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::Delivery(err.to_string())
    }
}
