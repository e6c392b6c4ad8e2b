//! In-memory lazy-load service.
//!
//! Holds a forest of records and serves windows over the user-visible set (roots plus the
//! descendants of expanded nodes, depth-first). Records are decorated with `level` and
//! `child_count` on the way out, the way a tree-aware remote source reports them.

use crate::config::FieldMap;
use crate::error::RemoteError;
use crate::item::{Record, coerce_id, parent_links};
use crate::source::{
    LazyLoadSource, Page, PageRequest, SubscribeResponse, TreeResponse, error_payload,
    page_request_payload, parse_page, parse_subscribe_response, parse_tree_response,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Subscribe { resource: String },
    Expand { node_id: String },
    Collapse { node_id: String },
    FetchPage { request: PageRequest },
}

#[derive(Debug)]
struct Node {
    id: String,
    parent: Option<String>,
    record: Record,
}

#[derive(Debug, Default)]
struct MemoryState {
    subscribed: bool,
    expanded: HashSet<String>,
    calls: Vec<SourceCall>,
    fail_next: Option<RemoteError>,
    latency: Option<Duration>,
}

#[derive(Debug)]
pub struct MemorySource {
    fields: FieldMap,
    page_size: usize,
    nodes: Vec<Node>,
    children: HashMap<Option<String>, Vec<usize>>,
    state: Mutex<MemoryState>,
}

impl MemorySource {
    pub fn new(records: Vec<Record>, fields: FieldMap, page_size: usize) -> Self {
        let nodes: Vec<Node> = records
            .into_iter()
            .filter_map(|record| {
                let id = record.get(&fields.id).and_then(coerce_id)?;
                let parent = parent_links(&record, &fields).into_iter().next();
                Some(Node { id, parent, record })
            })
            .collect();

        let known: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
        let mut children: HashMap<Option<String>, Vec<usize>> = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            let parent = node
                .parent
                .clone()
                .filter(|parent| known.contains(parent.as_str()));
            children.entry(parent).or_default().push(index);
        }

        Self {
            fields,
            page_size: page_size.max(1),
            nodes,
            children,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// The next call fails with `error` instead of being served.
    pub fn fail_next(&self, error: RemoteError) {
        self.state.lock().fail_next = Some(error);
    }

    /// Drops the subscription, as a server restart would.
    pub fn expire_subscription(&self) {
        self.state.lock().subscribed = false;
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().latency = latency;
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn expanded_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().expanded.iter().cloned().collect();
        ids.sort();
        ids
    }

    fn child_indices(&self, parent: Option<&str>) -> &[usize] {
        self.children
            .get(&parent.map(str::to_string))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    /// Depth-first ids of roots and of every node below an expanded node, with depth.
    fn user_ids(&self, expanded: &HashSet<String>) -> Vec<(usize, u64)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, u64)> = self
            .child_indices(None)
            .iter()
            .rev()
            .map(|&index| (index, 1))
            .collect();

        while let Some((index, level)) = stack.pop() {
            out.push((index, level));
            let node = &self.nodes[index];
            if expanded.contains(&node.id) {
                stack.extend(
                    self.child_indices(Some(&node.id))
                        .iter()
                        .rev()
                        .map(|&child| (child, level + 1)),
                );
            }
        }
        out
    }

    fn bounds(&self, expanded: &HashSet<String>) -> TreeResponse {
        let user = self.user_ids(expanded);
        TreeResponse {
            user_ids_size: user.len(),
            user_first_id: user.first().map(|(index, _)| self.nodes[*index].id.clone()),
            user_last_id: user.last().map(|(index, _)| self.nodes[*index].id.clone()),
        }
    }

    fn decorate(&self, index: usize, level: u64) -> Record {
        let node = &self.nodes[index];
        let mut record = node.record.clone();
        record.insert(self.fields.level.clone(), Value::from(level));
        record.insert(
            self.fields.child_count.clone(),
            Value::from(self.child_indices(Some(&node.id)).len()),
        );
        record
    }

    /// Serves one call the way the wire would: logs it, simulates latency, then answers with
    /// a JSON payload. Injected service errors and a missing subscription become error
    /// payloads; transport-level failures skip the payload.
    async fn serve<F>(
        &self,
        call: SourceCall,
        needs_subscription: bool,
        respond: F,
    ) -> Result<Value, RemoteError>
    where
        F: FnOnce(&mut MemoryState) -> Value,
    {
        let latency = {
            let mut state = self.state.lock();
            state.calls.push(call);
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        if let Some(error) = state.fail_next.take() {
            return error_payload(&error).ok_or(error);
        }
        if needs_subscription && !state.subscribed {
            return error_payload(&RemoteError::StaleSubscription)
                .ok_or(RemoteError::StaleSubscription);
        }
        Ok(respond(&mut state))
    }

    fn tree_payload(&self, expanded: &HashSet<String>) -> Value {
        let bounds = self.bounds(expanded);
        json!({
            "user_ids_size": bounds.user_ids_size,
            "user_first_id": bounds.user_first_id,
            "user_last_id": bounds.user_last_id,
        })
    }
}

impl LazyLoadSource for MemorySource {
    async fn subscribe(
        &self,
        resource: &str,
        _parent_field: &str,
        _timeout: Duration,
    ) -> Result<SubscribeResponse, RemoteError> {
        let call = SourceCall::Subscribe {
            resource: resource.to_string(),
        };
        let payload = self
            .serve(call, false, |state| {
                state.subscribed = true;
                state.expanded.clear();
                let mut payload = self.tree_payload(&state.expanded);
                payload["all_ids_size"] = Value::from(self.nodes.len());
                payload
            })
            .await?;
        parse_subscribe_response(&payload)
    }

    async fn expand(
        &self,
        _resource: &str,
        node_id: &str,
        _timeout: Duration,
    ) -> Result<TreeResponse, RemoteError> {
        let call = SourceCall::Expand {
            node_id: node_id.to_string(),
        };
        let payload = self
            .serve(call, true, |state| {
                if self.index_of(node_id).is_none() {
                    let detail = format!("node {node_id} does not exist");
                    return json!({"errors": [{"code": "NOT_FOUND", "detail": detail}]});
                }
                state.expanded.insert(node_id.to_string());
                self.tree_payload(&state.expanded)
            })
            .await?;
        parse_tree_response(&payload)
    }

    async fn collapse(
        &self,
        _resource: &str,
        node_id: &str,
        _timeout: Duration,
    ) -> Result<TreeResponse, RemoteError> {
        let call = SourceCall::Collapse {
            node_id: node_id.to_string(),
        };
        let payload = self
            .serve(call, true, |state| {
                let mut pending = vec![node_id.to_string()];
                while let Some(current) = pending.pop() {
                    state.expanded.remove(&current);
                    pending.extend(
                        self.child_indices(Some(&current))
                            .iter()
                            .map(|&child| self.nodes[child].id.clone())
                            .filter(|id| state.expanded.contains(id)),
                    );
                }
                self.tree_payload(&state.expanded)
            })
            .await?;
        parse_tree_response(&payload)
    }

    async fn fetch_page(
        &self,
        _resource: &str,
        request: &PageRequest,
        _timeout: Duration,
    ) -> Result<Page, RemoteError> {
        let call = SourceCall::FetchPage {
            request: request.clone(),
        };
        let wire = page_request_payload(request);
        let payload = self
            .serve(call, true, |state| {
                let active_id = wire.get("active_id").and_then(coerce_id);
                let direction = wire.get("direction").and_then(Value::as_str);

                let user = self.user_ids(&state.expanded);
                let anchor = user
                    .iter()
                    .position(|(index, _)| Some(&self.nodes[*index].id) == active_id.as_ref())
                    .unwrap_or(0);

                let size = self.page_size;
                let start = match direction {
                    Some("up") => (anchor + 1).saturating_sub(size),
                    _ => anchor,
                }
                .min(user.len().saturating_sub(size));

                let data: Vec<Value> = user
                    .iter()
                    .skip(start)
                    .take(size)
                    .map(|&(index, level)| Value::Object(self.decorate(index, level)))
                    .collect();
                json!({ "data": data })
            })
            .await?;
        parse_page(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::record;
    use crate::window::ScrollDirection;
    use pretty_assertions::assert_eq;

    const TIMEOUT: Duration = Duration::from_millis(3000);

    fn source(page_size: usize) -> MemorySource {
        let records = vec![
            record(json!({"id": 1, "name": "a"})),
            record(json!({"id": 2, "name": "a.1", "parent_id": 1})),
            record(json!({"id": 3, "name": "a.1.x", "parent_id": 2})),
            record(json!({"id": 4, "name": "b"})),
            record(json!({"id": 5, "name": "c"})),
        ];
        MemorySource::new(records, FieldMap::default(), page_size)
    }

    fn page_ids(page: &Page) -> Vec<String> {
        page.data
            .iter()
            .filter_map(|row| row.get("id").and_then(coerce_id))
            .collect()
    }

    fn request(active: &str, direction: Option<ScrollDirection>) -> PageRequest {
        PageRequest {
            active_id: active.to_string(),
            direction,
        }
    }

    #[tokio::test]
    async fn calls_before_subscribe_are_stale() {
        let source = source(10);
        let result = source.fetch_page("r", &request("0", None), TIMEOUT).await;
        assert_eq!(result, Err(RemoteError::StaleSubscription));
    }

    #[tokio::test]
    async fn expand_and_collapse_change_the_user_set() {
        let source = source(10);
        let subscribed = source.subscribe("r", "parent_id", TIMEOUT).await.expect("subscribe");
        assert_eq!(subscribed.all_ids_size, 5);
        assert_eq!(subscribed.user_ids_size, 3);

        source.expand("r", "1", TIMEOUT).await.expect("expand 1");
        let bounds = source.expand("r", "2", TIMEOUT).await.expect("expand 2");
        assert_eq!(bounds.user_ids_size, 5);

        let page = source
            .fetch_page("r", &request("0", None), TIMEOUT)
            .await
            .expect("page");
        assert_eq!(page_ids(&page), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(page.data[2].get("level"), Some(&json!(3)));
        assert_eq!(page.data[0].get("child_count"), Some(&json!(1)));

        let bounds = source.collapse("r", "1", TIMEOUT).await.expect("collapse");
        assert_eq!(bounds.user_ids_size, 3);
        assert!(source.expanded_ids().is_empty());
    }

    #[tokio::test]
    async fn pages_slide_around_the_active_id() {
        let source = source(2);
        source.subscribe("r", "parent_id", TIMEOUT).await.expect("subscribe");
        source.expand("r", "1", TIMEOUT).await.expect("expand");

        let down = source
            .fetch_page("r", &request("2", Some(ScrollDirection::Down)), TIMEOUT)
            .await
            .expect("down");
        assert_eq!(page_ids(&down), vec!["2", "4"]);

        let up = source
            .fetch_page("r", &request("4", Some(ScrollDirection::Up)), TIMEOUT)
            .await
            .expect("up");
        assert_eq!(page_ids(&up), vec!["2", "4"]);

        let tail = source
            .fetch_page("r", &request("5", Some(ScrollDirection::Down)), TIMEOUT)
            .await
            .expect("tail");
        assert_eq!(page_ids(&tail), vec!["4", "5"]);
    }

    #[tokio::test]
    async fn injected_failure_is_returned_once() {
        let source = source(10);
        source.fail_next(RemoteError::PermissionDenied);
        assert_eq!(
            source.subscribe("r", "parent_id", TIMEOUT).await,
            Err(RemoteError::PermissionDenied)
        );
        assert!(source.subscribe("r", "parent_id", TIMEOUT).await.is_ok());
        assert_eq!(source.calls().len(), 2);

        source.fail_next(RemoteError::Transport("connection reset".to_string()));
        assert_eq!(
            source.expand("r", "1", TIMEOUT).await,
            Err(RemoteError::Transport("connection reset".to_string()))
        );
    }

    #[tokio::test]
    async fn unknown_node_is_reported_through_the_error_payload() {
        let source = source(10);
        source.subscribe("r", "parent_id", TIMEOUT).await.expect("subscribe");

        assert_eq!(
            source.expand("r", "42", TIMEOUT).await,
            Err(RemoteError::Api {
                code: "NOT_FOUND".to_string(),
                detail: "node 42 does not exist".to_string(),
            })
        );
        assert!(source.expanded_ids().is_empty());
    }
}
