use lingocore::error::BackendError;
use std::fmt;
use thiserror::Error;

pub const LOGIN_PROMPT: &str = "Please log in to add to favorites!";
pub const NO_MATCHES: &str = "No teachers match your criteria. Please try \
    adjusting your filters or load more profiles.";

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// A page could not be read; the cursor was left where it was.
    #[error("failed to fetch teachers: {0}")]
    FetchFailed(#[source] BackendError),
    /// A favorite could not be persisted; local state was reconciled.
    #[error("failed to save favorite: {0}")]
    ToggleWriteFailed(#[source] BackendError),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("page size must be at least 1, got {0}")]
    InvalidPageSize(usize),
    #[error("missing required argument: {0}")]
    Misconfiguration(&'static str),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// What the user should be shown for an error, if anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// A message the user may dismiss; nothing needs to be done.
    Dismissable(String),
    /// The user has to act before trying again.
    Prompt(String),
}

impl Error {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Error::FetchFailed(_) => Some(Notice::Dismissable(
                "Error loading teachers, please try again.".to_string()
            )),
            Error::NotAuthenticated => Some(Notice::Prompt(LOGIN_PROMPT.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Dismissable(message) | Notice::Prompt(message) => f.write_str(message),
        }
    }
}
