use reqwest::StatusCode;
use thiserror::Error;

/// Errors a dashboard fetch can end in. Every variant renders to a single
/// user-facing line; the dashboard shows it inline next to an empty result.
///
/// "Not logged in" is deliberately not here: an absent session resolves to an
/// empty successful result, not an error.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("response was not valid JSON")]
    NotJson,

    #[error("JSON shape unexpected")]
    UnexpectedShape,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_message_carries_status_and_body() {
        let err = FetchError::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "server error".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("server error"));
    }
}
