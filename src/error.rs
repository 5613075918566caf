//! Failure taxonomy for the fetch pipeline.
//!
//! Only transport-level and content-type problems become errors; row-level
//! problems (blank keys, short rows, unparseable dates or durations) are
//! absorbed where they occur and merely shrink the output. Every public
//! entry point returns a success payload or one of these values; nothing
//! panics on bad sheet data.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure before any HTTP status was obtained.
    #[error("network error: {0}")]
    Network(String),

    /// The source answered with a non-success HTTP status.
    #[error("sheet request failed with HTTP status {0}")]
    Transport(u16),

    /// The body is an HTML document, not CSV. Usually means the sheet was
    /// unpublished or its sharing settings changed.
    #[error("response is an HTML page, not CSV; check that the sheet is still published")]
    WrongContentType,
}

impl FetchError {
    /// Short hint the dashboard shows next to the "Try Again" action.
    pub fn hint(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "Check the connection and try again.",
            FetchError::Transport(_) => "The source returned an error; try again shortly.",
            FetchError::WrongContentType => {
                "Ask the sheet owner to re-publish it as CSV to the web."
            }
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}
