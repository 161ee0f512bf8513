use thiserror::Error;

use super::registry::ContentId;

/// Recoverable failures of dock operations.
///
/// Every variant turns the failed operation into a no-op; none of these
/// should ever unwind through the host's event loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DockError {
    #[error("content {0} is a singleton and already has a live instance")]
    DuplicateSingleton(ContentId),
    #[error("tab title {0:?} already exists in the target group")]
    DuplicateTitle(String),
    #[error("dock target is no longer part of the layout")]
    StaleTarget,
    #[error("content id {0} has no registry entry")]
    UnknownContentId(ContentId),
    #[error("layout tree shape invariant violated: {0}")]
    InvalidTreeShape(&'static str),
}
