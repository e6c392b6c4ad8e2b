use crate::error::RemoteError;
use crate::item::{Record, coerce_id};
use crate::window::ScrollDirection;
use serde_json::{Value, json};
use std::future::Future;
use std::time::Duration;

pub const STALE_SUBSCRIPTION_REASON: &str = "urn not subscribed!";
pub const PERMISSION_DENIED_CODE: &str = "FORBIDDEN_BY_GATEKEEPER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeResponse {
    pub all_ids_size: usize,
    pub user_ids_size: usize,
    pub user_first_id: Option<String>,
    pub user_last_id: Option<String>,
}

/// Answer to expand and collapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeResponse {
    pub user_ids_size: usize,
    pub user_first_id: Option<String>,
    pub user_last_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub active_id: String,
    pub direction: Option<ScrollDirection>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub data: Vec<Record>,
}

/// Remote service that keeps the full collection and serves windows of it.
pub trait LazyLoadSource: Send + Sync {
    fn subscribe(
        &self,
        resource: &str,
        parent_field: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<SubscribeResponse, RemoteError>> + Send;

    fn expand(
        &self,
        resource: &str,
        node_id: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<TreeResponse, RemoteError>> + Send;

    fn collapse(
        &self,
        resource: &str,
        node_id: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<TreeResponse, RemoteError>> + Send;

    fn fetch_page(
        &self,
        resource: &str,
        request: &PageRequest,
        timeout: Duration,
    ) -> impl Future<Output = Result<Page, RemoteError>> + Send;
}

/// Source for grids fed only through `set_items`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

fn detached() -> RemoteError {
    RemoteError::Transport("no lazy-load source attached".to_string())
}

impl LazyLoadSource for Detached {
    async fn subscribe(&self, _: &str, _: &str, _: Duration) -> Result<SubscribeResponse, RemoteError> {
        Err(detached())
    }

    async fn expand(&self, _: &str, _: &str, _: Duration) -> Result<TreeResponse, RemoteError> {
        Err(detached())
    }

    async fn collapse(&self, _: &str, _: &str, _: Duration) -> Result<TreeResponse, RemoteError> {
        Err(detached())
    }

    async fn fetch_page(&self, _: &str, _: &PageRequest, _: Duration) -> Result<Page, RemoteError> {
        Err(detached())
    }
}

/// Bounds a remote call by `timeout`, whatever the source does with the hint.
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(timeout)),
    }
}

/// Maps a wire error payload onto the error taxonomy.
pub fn classify_payload_error(payload: &Value) -> RemoteError {
    let stale = payload
        .get("payload_errors")
        .and_then(|errors| errors.get(0))
        .and_then(|first| first.pointer("/internal/why"))
        .and_then(Value::as_str)
        == Some(STALE_SUBSCRIPTION_REASON);
    if stale {
        return RemoteError::StaleSubscription;
    }

    let first = payload
        .as_array()
        .or_else(|| payload.get("errors").and_then(Value::as_array))
        .and_then(|errors| errors.first());

    match first {
        Some(error) => {
            let code = error
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if code == PERMISSION_DENIED_CODE {
                return RemoteError::PermissionDenied;
            }
            let detail = error
                .get("detail")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            RemoteError::Api { code, detail }
        }
        None => RemoteError::Transport(payload.to_string()),
    }
}

/// Wire form of an error the service itself reports. Timeouts and transport failures never
/// reach the payload, so they have none.
pub fn error_payload(error: &RemoteError) -> Option<Value> {
    match error {
        RemoteError::StaleSubscription => Some(json!({
            "payload_errors": [{"internal": {"why": STALE_SUBSCRIPTION_REASON}}]
        })),
        RemoteError::PermissionDenied => Some(json!({
            "errors": [{"code": PERMISSION_DENIED_CODE, "detail": ""}]
        })),
        RemoteError::Api { code, detail } => Some(json!({
            "errors": [{"code": code, "detail": detail}]
        })),
        RemoteError::Timeout(_) | RemoteError::Transport(_) => None,
    }
}

fn reject_errors(payload: &Value) -> Result<(), RemoteError> {
    if payload.get("errors").is_some() || payload.get("payload_errors").is_some() {
        return Err(classify_payload_error(payload));
    }
    Ok(())
}

fn size_field(payload: &Value, key: &str) -> Result<usize, RemoteError> {
    payload
        .get(key)
        .and_then(Value::as_u64)
        .map(|size| size as usize)
        .ok_or_else(|| RemoteError::Transport(format!("response is missing `{key}`")))
}

fn id_field(payload: &Value, key: &str) -> Option<String> {
    payload.get(key).and_then(coerce_id)
}

pub fn parse_subscribe_response(payload: &Value) -> Result<SubscribeResponse, RemoteError> {
    reject_errors(payload)?;
    Ok(SubscribeResponse {
        all_ids_size: size_field(payload, "all_ids_size")?,
        user_ids_size: size_field(payload, "user_ids_size")?,
        user_first_id: id_field(payload, "user_first_id"),
        user_last_id: id_field(payload, "user_last_id"),
    })
}

pub fn parse_tree_response(payload: &Value) -> Result<TreeResponse, RemoteError> {
    reject_errors(payload)?;
    Ok(TreeResponse {
        user_ids_size: size_field(payload, "user_ids_size")?,
        user_first_id: id_field(payload, "user_first_id"),
        user_last_id: id_field(payload, "user_last_id"),
    })
}

pub fn parse_page(payload: &Value) -> Result<Page, RemoteError> {
    reject_errors(payload)?;
    let rows = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| RemoteError::Transport("response is missing `data`".to_string()))?;

    let data = rows
        .iter()
        .map(|row| {
            row.as_object()
                .cloned()
                .ok_or_else(|| RemoteError::Transport(format!("row is not an object: {row}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Page { data })
}

/// Wire shape of a page request.
pub fn page_request_payload(request: &PageRequest) -> Value {
    let active_id = request
        .active_id
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(request.active_id.clone()));
    json!({
        "active_id": active_id,
        "direction": request.direction.map(ScrollDirection::as_str),
    })
}
