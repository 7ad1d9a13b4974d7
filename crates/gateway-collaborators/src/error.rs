use thiserror::Error;

/// Collaborator-local error taxonomy; adapters in `sources` fold this down
/// to the `String` cause `gateway_core::enrichment::sources::SourceFetcher`
/// carries, so callers outside this crate never see it directly.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("downstream service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("downstream service request failed: {0}")]
    Transport(String),

    #[error("downstream service timed out")]
    Timeout,

    #[error("downstream service returned malformed JSON: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CollaboratorError::Timeout
        } else {
            CollaboratorError::Transport(err.to_string())
        }
    }
}
