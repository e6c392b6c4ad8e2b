use crate::config::Labels;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by, or while talking to, the lazy-load service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("subscription is no longer active")]
    StaleSubscription,
    #[error("permission denied by the remote source")]
    PermissionDenied,
    #[error("remote error {code}: {detail}")]
    Api { code: String, detail: String },
}

impl RemoteError {
    pub fn is_stale_subscription(&self) -> bool {
        matches!(self, RemoteError::StaleSubscription)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("item {index} is missing required tree field `{field}`")]
    MalformedItem { index: usize, field: String },
    #[error("node {0} is already expanded")]
    AlreadyExpanded(String),
    #[error("node {0} is not expanded")]
    NotExpanded(String),
    #[error("missing node id")]
    MissingId,
    #[error("node {0} has no children to expand")]
    NotExpandable(String),
    #[error("item {0} is not displayed")]
    UnknownItem(String),
    #[error("lazy loading is not configured")]
    NotLazy,
}

impl GridError {
    /// Rejected before any remote call was issued.
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            GridError::AlreadyExpanded(_)
                | GridError::NotExpanded(_)
                | GridError::MissingId
                | GridError::NotExpandable(_)
                | GridError::UnknownItem(_)
                | GridError::NotLazy
        )
    }

    pub fn is_stale_subscription(&self) -> bool {
        matches!(self, GridError::Remote(err) if err.is_stale_subscription())
    }

    pub fn user_message(&self, labels: &Labels) -> String {
        match self {
            GridError::Remote(RemoteError::PermissionDenied) => labels.permission_denied.clone(),
            GridError::Remote(RemoteError::Api { detail, .. }) if !detail.trim().is_empty() => {
                detail.clone()
            }
            _ => labels.generic_error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub operation: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_has_dedicated_message() {
        let labels = Labels::default();
        let err = GridError::from(RemoteError::PermissionDenied);
        assert_eq!(err.user_message(&labels), labels.permission_denied);
    }

    #[test]
    fn api_detail_is_shown_and_blank_detail_falls_back() {
        let labels = Labels::default();
        let detailed = GridError::from(RemoteError::Api {
            code: "E42".to_string(),
            detail: "registo bloqueado".to_string(),
        });
        assert_eq!(detailed.user_message(&labels), "registo bloqueado");

        let blank = GridError::from(RemoteError::Api {
            code: "E42".to_string(),
            detail: " ".to_string(),
        });
        assert_eq!(blank.user_message(&labels), labels.generic_error);
    }

    #[test]
    fn malformed_and_timeout_use_generic_message() {
        let labels = Labels::default();
        let malformed = GridError::MalformedItem {
            index: 0,
            field: "level".to_string(),
        };
        assert_eq!(malformed.user_message(&labels), labels.generic_error);
        assert!(!malformed.is_invalid_operation());

        let timeout = GridError::from(RemoteError::Timeout(Duration::from_millis(3000)));
        assert_eq!(timeout.user_message(&labels), labels.generic_error);
    }

    #[test]
    fn invalid_operations_are_classified() {
        assert!(GridError::AlreadyExpanded("1".to_string()).is_invalid_operation());
        assert!(GridError::NotExpanded("1".to_string()).is_invalid_operation());
        assert!(GridError::MissingId.is_invalid_operation());
        assert!(!GridError::from(RemoteError::StaleSubscription).is_invalid_operation());
        assert!(GridError::from(RemoteError::StaleSubscription).is_stale_subscription());
    }
}
