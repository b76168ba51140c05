use thiserror::Error;

/// Why a single role could not be logged in. Never fatal to a run.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("login rejected with HTTP {0}")]
    Rejected(u16),

    #[error("login request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed login response: {0}")]
    MalformedBody(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("endpoint name must not be empty ({0})")]
    EmptyName(String),

    #[error("duplicate endpoint name: {0}")]
    DuplicateName(String),

    #[error("endpoint path must start with '/': {0}")]
    InvalidPath(String),

    #[error("duplicate role in roster: {0}")]
    DuplicateRole(String),

    #[error("invalid stress plan for {0}: {1}")]
    InvalidStressPlan(&'static str, String),

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
}
