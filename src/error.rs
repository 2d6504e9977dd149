use thiserror::Error;

/// Errors surfaced by the store's actions and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// The identity provider has no signed-in user.
    #[error("no authenticated user")]
    Unauthenticated,

    #[error("remote api unavailable: {0}")]
    RemoteUnavailable(#[source] anyhow::Error),

    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(#[source] anyhow::Error),
}

impl Error {
    pub fn remote(err: impl Into<anyhow::Error>) -> Self {
        Self::RemoteUnavailable(err.into())
    }

    pub fn persistence(err: impl Into<anyhow::Error>) -> Self {
        Self::PersistenceUnavailable(err.into())
    }

    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
