//! Shared test data and sources.

use crate::config::{GridConfig, LazyLoadConfig};
use crate::controller::GridEvent;
use crate::error::RemoteError;
use crate::item::{Item, Record, record};
use crate::source::{LazyLoadSource, Page, PageRequest, SubscribeResponse, TreeResponse};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub fn local_config() -> GridConfig {
    let mut config = GridConfig::default();
    config.fields.children = Some("children".to_string());
    config
}

pub fn lazy_config() -> GridConfig {
    GridConfig {
        lazy_load: Some(LazyLoadConfig::for_resource("people")),
        ..GridConfig::default()
    }
}

pub fn people() -> Vec<Record> {
    vec![
        record(json!({"id": 1, "name": "Ana"})),
        record(json!({"id": 2, "name": "Bruno"})),
    ]
}

/// Rows carrying their children inline, three levels below `1`.
pub fn tree_records() -> Vec<Record> {
    vec![
        record(json!({
            "id": 1,
            "name": "a",
            "children": [
                {
                    "id": 11,
                    "name": "a.1",
                    "children": [
                        {"id": 111, "name": "a.1.1", "children": [{"id": 1111, "name": "a.1.1.1"}]}
                    ]
                },
                {"id": 12, "name": "a.2"}
            ]
        })),
        record(json!({"id": 2, "name": "b"})),
    ]
}

/// The same hierarchy linked through the parent field, as a remote source holds it.
pub fn linked_records() -> Vec<Record> {
    vec![
        record(json!({"id": 1, "name": "a"})),
        record(json!({"id": 11, "name": "a.1", "parent_id": 1})),
        record(json!({"id": 111, "name": "a.1.1", "parent_id": 11})),
        record(json!({"id": 12, "name": "a.2", "parent_id": 1})),
        record(json!({"id": 2, "name": "b"})),
    ]
}

pub fn external_ids(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.external_id.clone())
        .collect()
}

pub fn drain(events: &mut UnboundedReceiver<GridEvent>) -> Vec<GridEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Answers every call with the same prepared result.
pub struct CannedSource {
    subscribe: Result<SubscribeResponse, RemoteError>,
    tree: Result<TreeResponse, RemoteError>,
    page: Result<Page, RemoteError>,
}

impl CannedSource {
    pub fn with_page(data: Vec<Record>) -> Self {
        let size = data.len();
        Self {
            subscribe: Ok(SubscribeResponse {
                all_ids_size: size,
                user_ids_size: size,
                user_first_id: None,
                user_last_id: None,
            }),
            tree: Ok(TreeResponse {
                user_ids_size: size,
                user_first_id: None,
                user_last_id: None,
            }),
            page: Ok(Page { data }),
        }
    }

    pub fn always_stale() -> Self {
        Self {
            subscribe: Err(RemoteError::StaleSubscription),
            tree: Err(RemoteError::StaleSubscription),
            page: Err(RemoteError::StaleSubscription),
        }
    }
}

impl LazyLoadSource for CannedSource {
    async fn subscribe(&self, _: &str, _: &str, _: Duration) -> Result<SubscribeResponse, RemoteError> {
        self.subscribe.clone()
    }

    async fn expand(&self, _: &str, _: &str, _: Duration) -> Result<TreeResponse, RemoteError> {
        self.tree.clone()
    }

    async fn collapse(&self, _: &str, _: &str, _: Duration) -> Result<TreeResponse, RemoteError> {
        self.tree.clone()
    }

    async fn fetch_page(&self, _: &str, _: &PageRequest, _: Duration) -> Result<Page, RemoteError> {
        self.page.clone()
    }
}
