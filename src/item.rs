use crate::config::FieldMap;
use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

/// Presentational tag set by expand/collapse on parent and child rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowBackground {
    Parent,
    Child,
}

/// One grid row: the application record plus the fields the controller manages.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub fields: Record,
    pub local_id: usize,
    pub external_id: Option<String>,
    pub parent_id: Option<String>,
    pub level: Option<u64>,
    pub child_count: Option<u64>,
    pub expanded: bool,
    pub selection_disabled: bool,
    pub background: Option<RowBackground>,
}

impl Item {
    pub fn from_record(fields: Record, map: &FieldMap) -> Self {
        let mut item = Self {
            fields,
            local_id: 0,
            external_id: None,
            parent_id: None,
            level: None,
            child_count: None,
            expanded: false,
            selection_disabled: false,
            background: None,
        };
        item.parent_id = parent_links(&item.fields, map).into_iter().next();
        item.refresh_roles(map);
        item
    }

    /// Re-reads the role fields after `fields` changed.
    pub fn refresh_roles(&mut self, map: &FieldMap) {
        self.external_id = self.fields.get(&map.id).and_then(coerce_id);
        self.level = self.fields.get(&map.level).and_then(Value::as_u64);
        self.child_count = self.fields.get(&map.child_count).and_then(Value::as_u64);
        self.selection_disabled = map
            .selection_disabled
            .as_ref()
            .and_then(|field| self.fields.get(field))
            .is_some_and(value_is_not_empty);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn has_children(&self) -> bool {
        self.child_count.is_some_and(|count| count > 0)
    }

    /// Overwrites only the provided fields, keeping controller-managed state.
    ///
    /// A patched parent field re-links the row; a row placed under one of several parents
    /// stays there while that parent is still named.
    pub fn patch(&mut self, patch: &Record, map: &FieldMap) {
        for (key, value) in patch {
            self.fields.insert(key.clone(), value.clone());
        }
        if patch.contains_key(&map.parent) {
            let links = parent_links(&self.fields, map);
            let keep = self
                .parent_id
                .as_ref()
                .is_some_and(|current| links.contains(current));
            if !keep {
                self.parent_id = links.into_iter().next();
            }
        }
        self.refresh_roles(map);
    }
}

/// String form used for every id comparison; remote ids may be numbers.
pub fn coerce_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parent ids named by a record; the parent field may hold one id or a list.
pub fn parent_links(record: &Record, map: &FieldMap) -> Vec<String> {
    match record.get(&map.parent) {
        Some(Value::Array(values)) => values.iter().filter_map(coerce_id).collect(),
        Some(value) if value_is_not_empty(value) => coerce_id(value).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Zero is a real value here; null, false, "" and empty containers are not.
pub fn value_is_not_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(values) => !values.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(_) => true,
    }
}

#[cfg(test)]
pub(crate) fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_string_ids_coerce_to_the_same_key() {
        assert_eq!(coerce_id(&json!(7)), Some("7".to_string()));
        assert_eq!(coerce_id(&json!("7")), Some("7".to_string()));
        assert_eq!(coerce_id(&json!(null)), None);
    }

    #[test]
    fn from_record_resolves_roles() {
        let map = FieldMap::default();
        let item = Item::from_record(
            record(json!({"id": 4, "parent_id": "1", "level": 2, "child_count": 3, "name": "x"})),
            &map,
        );
        assert_eq!(item.external_id.as_deref(), Some("4"));
        assert_eq!(item.parent_id.as_deref(), Some("1"));
        assert_eq!(item.level, Some(2));
        assert!(item.has_children());
        assert!(!item.expanded);
    }

    #[test]
    fn zero_parent_is_a_real_link_but_empty_string_is_root() {
        let map = FieldMap::default();
        let zero = record(json!({"id": 1, "parent_id": 0}));
        assert_eq!(parent_links(&zero, &map), vec!["0".to_string()]);

        let blank = record(json!({"id": 1, "parent_id": ""}));
        assert!(parent_links(&blank, &map).is_empty());

        let many = record(json!({"id": 1, "parent_id": [2, "3"]}));
        assert_eq!(
            parent_links(&many, &map),
            vec!["2".to_string(), "3".to_string()]
        );
    }

    #[test]
    fn patch_keeps_controller_fields() {
        let map = FieldMap::default();
        let mut item = Item::from_record(record(json!({"id": 1, "name": "Ana"})), &map);
        item.local_id = 5;
        item.expanded = true;
        item.background = Some(RowBackground::Parent);

        item.patch(&record(json!({"name": "Ana Maria", "child_count": 1})), &map);

        assert_eq!(item.get("name"), Some(&json!("Ana Maria")));
        assert_eq!(item.local_id, 5);
        assert!(item.expanded);
        assert_eq!(item.background, Some(RowBackground::Parent));
        assert_eq!(item.child_count, Some(1));
    }

    #[test]
    fn patched_parent_field_relinks_the_row() {
        let map = FieldMap::default();
        let mut item = Item::from_record(record(json!({"id": 11, "parent_id": 1})), &map);

        item.patch(&record(json!({"parent_id": 2})), &map);
        assert_eq!(item.parent_id.as_deref(), Some("2"));

        item.patch(&record(json!({"name": "moved"})), &map);
        assert_eq!(item.parent_id.as_deref(), Some("2"));

        item.patch(&record(json!({"parent_id": null})), &map);
        assert_eq!(item.parent_id, None);
    }

    #[test]
    fn row_under_one_of_several_parents_stays_put() {
        let map = FieldMap::default();
        let mut item = Item::from_record(record(json!({"id": 11, "parent_id": [1, 3]})), &map);
        item.parent_id = Some("3".to_string());

        item.patch(&record(json!({"parent_id": [3, 4]})), &map);
        assert_eq!(item.parent_id.as_deref(), Some("3"));

        item.patch(&record(json!({"parent_id": [4, 5]})), &map);
        assert_eq!(item.parent_id.as_deref(), Some("4"));
    }

    #[test]
    fn selection_opt_out_reads_configured_field() {
        let map = FieldMap {
            selection_disabled: Some("locked".to_string()),
            ..FieldMap::default()
        };
        let locked = Item::from_record(record(json!({"id": 1, "locked": true})), &map);
        let open = Item::from_record(record(json!({"id": 2, "locked": false})), &map);
        assert!(locked.selection_disabled);
        assert!(!open.selection_disabled);
    }
}
