use crate::config::FieldMap;
use crate::error::GridError;
use crate::item::Record;
use serde_json::Value;
use std::collections::VecDeque;

/// Transient per-node state; a registered node with no transition in flight is `Expanded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Collapsed,
    Expanding,
    Expanded,
    Collapsing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedNode {
    pub id: String,
    pub parent_id: Option<String>,
}

/// Nodes whose children are materialized, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionRegistry {
    nodes: Vec<ExpandedNode>,
}

impl ExpansionRegistry {
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    pub fn nodes(&self) -> &[ExpandedNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn register(&mut self, id: &str, parent_id: Option<&str>) -> Result<(), GridError> {
        if self.contains(id) {
            return Err(GridError::AlreadyExpanded(id.to_string()));
        }
        self.nodes.push(ExpandedNode {
            id: id.to_string(),
            parent_id: parent_id.map(str::to_string),
        });
        Ok(())
    }

    /// Unregisters `id` and every node registered beneath it.
    pub fn remove_subtree(&mut self, id: &str) -> Result<Vec<ExpandedNode>, GridError> {
        if !self.contains(id) {
            return Err(GridError::NotExpanded(id.to_string()));
        }

        let mut pending = VecDeque::from([id.to_string()]);
        let mut doomed = Vec::new();
        while let Some(current) = pending.pop_front() {
            for node in &self.nodes {
                if node.parent_id.as_deref() == Some(current.as_str())
                    && !doomed.contains(&node.id)
                    && node.id != id
                {
                    pending.push_back(node.id.clone());
                }
            }
            doomed.push(current);
        }

        let (removed, kept) = std::mem::take(&mut self.nodes)
            .into_iter()
            .partition(|node| doomed.contains(&node.id));
        self.nodes = kept;
        Ok(removed)
    }

    /// Puts back nodes taken out by a transition that failed remotely.
    pub fn restore(&mut self, nodes: Vec<ExpandedNode>) {
        for node in nodes {
            if !self.contains(&node.id) {
                self.nodes.push(node);
            }
        }
    }
}

/// Tree-mode pages must carry depth and child count on every record.
pub fn validate_tree_records(records: &[Record], fields: &FieldMap) -> Result<(), GridError> {
    for (index, record) in records.iter().enumerate() {
        for field in [&fields.child_count, &fields.level] {
            if record.get(field).is_none_or(Value::is_null) {
                return Err(GridError::MalformedItem {
                    index,
                    field: field.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Indent column width in pixels for the deepest level on screen. Levels come from the
/// remote source, so the arithmetic saturates.
pub fn tree_column_width(max_level: u64) -> u64 {
    max_level.max(1).saturating_mul(20).saturating_add(80)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::record;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ids(registry: &ExpansionRegistry) -> Vec<&str> {
        registry.nodes().iter().map(|node| node.id.as_str()).collect()
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut registry = ExpansionRegistry::default();
        registry.register("1", None).expect("first expand");
        assert_eq!(
            registry.register("1", None),
            Err(GridError::AlreadyExpanded("1".to_string()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_subtree_takes_every_descendant() {
        let mut registry = ExpansionRegistry::default();
        registry.register("a", None).expect("a");
        registry.register("b", Some("a")).expect("b");
        registry.register("c", Some("b")).expect("c");
        registry.register("x", None).expect("x");
        registry.register("y", Some("x")).expect("y");

        let removed = registry.remove_subtree("a").expect("collapse a");

        assert_eq!(removed.len(), 3);
        assert_eq!(ids(&registry), vec!["x", "y"]);
    }

    #[test]
    fn remove_subtree_rejects_unexpanded_node() {
        let mut registry = ExpansionRegistry::default();
        assert_eq!(
            registry.remove_subtree("7"),
            Err(GridError::NotExpanded("7".to_string()))
        );
    }

    #[test]
    fn restore_returns_nodes_without_duplicates() {
        let mut registry = ExpansionRegistry::default();
        registry.register("a", None).expect("a");
        registry.register("b", Some("a")).expect("b");
        let removed = registry.remove_subtree("a").expect("collapse");
        assert!(registry.is_empty());

        registry.restore(removed.clone());
        registry.restore(removed);
        assert_eq!(ids(&registry), vec!["a", "b"]);
    }

    #[test]
    fn validate_reports_first_missing_field() {
        let fields = FieldMap::default();
        let records = vec![
            record(json!({"id": 1, "level": 1, "child_count": 0})),
            record(json!({"id": 2, "child_count": 2})),
        ];
        assert_eq!(
            validate_tree_records(&records, &fields),
            Err(GridError::MalformedItem {
                index: 1,
                field: "level".to_string(),
            })
        );

        let null_count = vec![record(json!({"id": 1, "level": 1, "child_count": null}))];
        assert!(validate_tree_records(&null_count, &fields).is_err());
        assert!(validate_tree_records(&[], &fields).is_ok());
    }

    #[test]
    fn column_width_grows_with_depth() {
        assert_eq!(tree_column_width(0), 100);
        assert_eq!(tree_column_width(1), 100);
        assert_eq!(tree_column_width(4), 160);
    }

    #[test]
    fn column_width_saturates_on_absurd_depth() {
        assert_eq!(tree_column_width(u64::MAX / 2), u64::MAX);
        assert_eq!(tree_column_width(u64::MAX), u64::MAX);
    }
}
