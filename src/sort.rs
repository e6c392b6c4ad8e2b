use crate::filter::normalize_str;
use crate::item::{Item, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
    #[default]
    Unset,
}

impl SortDirection {
    pub fn next(self) -> Self {
        match self {
            Self::Unset => Self::Ascending,
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Unset,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Ascending => "▲",
            Self::Descending => "▼",
            Self::Unset => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorter {
    pub path: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Sorter {
    pub fn new(path: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            path: path.into(),
            direction,
        }
    }

    pub fn is_active(&self) -> bool {
        self.direction != SortDirection::Unset
    }

    fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let ordering = compare_values(lookup(&a.fields, &self.path), lookup(&b.fields, &self.path));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
            SortDirection::Unset => Ordering::Equal,
        }
    }
}

/// Sorters in priority order; unset sorters keep their slot but take no part in ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSet {
    sorters: Vec<Sorter>,
}

impl SortSet {
    pub fn new(sorters: Vec<Sorter>) -> Self {
        Self { sorters }
    }

    pub fn all(&self) -> &[Sorter] {
        &self.sorters
    }

    pub fn active(&self) -> Vec<&Sorter> {
        self.sorters.iter().filter(|sorter| sorter.is_active()).collect()
    }

    pub fn direction(&self, path: &str) -> SortDirection {
        self.sorters
            .iter()
            .find(|sorter| sorter.path == path)
            .map(|sorter| sorter.direction)
            .unwrap_or_default()
    }

    pub fn set(&mut self, path: &str, direction: SortDirection) {
        match self.sorters.iter_mut().find(|sorter| sorter.path == path) {
            Some(sorter) => sorter.direction = direction,
            None => self.sorters.push(Sorter::new(path, direction)),
        }
    }

    pub fn cycle(&mut self, path: &str) -> SortDirection {
        let next = self.direction(path).next();
        self.set(path, next);
        next
    }

    /// Returns false when the path had no active sorter.
    pub fn clear(&mut self, path: &str) -> bool {
        match self
            .sorters
            .iter_mut()
            .find(|sorter| sorter.path == path && sorter.is_active())
        {
            Some(sorter) => {
                sorter.direction = SortDirection::Unset;
                true
            }
            None => false,
        }
    }

    /// Stable multi-key sort; ties fall through to the next active sorter.
    pub fn sort(&self, items: &mut [Item]) {
        let active = self.active();
        if active.is_empty() {
            return;
        }
        items.sort_by(|a, b| {
            active
                .iter()
                .map(|sorter| sorter.compare(a, b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }
}

/// Resolves a dotted path such as `owner.name` inside a record.
pub fn lookup<'a>(fields: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = fields.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Number(_)) => 2,
        Some(Value::String(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Object(_)) => 5,
    }
}

/// Missing values first, then booleans, numbers and text; text ignores case and accents first.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => normalize_str(x)
            .cmp(&normalize_str(y))
            .then_with(|| x.cmp(y)),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldMap;
    use crate::item::record;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rows() -> Vec<Item> {
        let map = FieldMap::default();
        [
            json!({"id": 1, "city": "Porto", "age": 30, "owner": {"name": "Zé"}}),
            json!({"id": 2, "city": "Évora", "age": 25, "owner": {"name": "Ana"}}),
            json!({"id": 3, "city": "Porto", "age": 25, "owner": {"name": "Rui"}}),
            json!({"id": 4, "city": "braga", "owner": {"name": "Ana"}}),
        ]
        .into_iter()
        .map(|value| Item::from_record(record(value), &map))
        .collect()
    }

    fn ids(items: &[Item]) -> Vec<String> {
        items
            .iter()
            .filter_map(|item| item.external_id.clone())
            .collect()
    }

    #[test]
    fn unset_sorter_leaves_order_untouched() {
        let mut items = rows();
        let set = SortSet::new(vec![Sorter::new("city", SortDirection::Unset)]);
        set.sort(&mut items);
        assert_eq!(ids(&items), vec!["1", "2", "3", "4"]);
        assert!(set.active().is_empty());
    }

    #[test]
    fn text_sort_ignores_accents_and_case() {
        let mut items = rows();
        SortSet::new(vec![Sorter::new("city", SortDirection::Ascending)]).sort(&mut items);
        assert_eq!(ids(&items), vec!["4", "2", "1", "3"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut items = rows();
        SortSet::new(vec![Sorter::new("owner.name", SortDirection::Ascending)]).sort(&mut items);
        assert_eq!(ids(&items), vec!["2", "4", "3", "1"]);
    }

    #[test]
    fn ties_fall_through_to_the_next_sorter() {
        let mut items = rows();
        SortSet::new(vec![
            Sorter::new("city", SortDirection::Descending),
            Sorter::new("age", SortDirection::Ascending),
        ])
        .sort(&mut items);
        assert_eq!(ids(&items), vec!["3", "1", "2", "4"]);
    }

    #[test]
    fn missing_values_sort_first_ascending() {
        let mut items = rows();
        SortSet::new(vec![Sorter::new("age", SortDirection::Ascending)]).sort(&mut items);
        assert_eq!(ids(&items), vec!["4", "2", "3", "1"]);
    }

    #[test]
    fn cycle_and_clear_manage_active_list() {
        let mut set = SortSet::default();
        assert_eq!(set.cycle("city"), SortDirection::Ascending);
        assert_eq!(set.cycle("city"), SortDirection::Descending);
        set.set("age", SortDirection::Ascending);
        let active: Vec<&str> = set.active().iter().map(|s| s.path.as_str()).collect();
        assert_eq!(active, vec!["city", "age"]);

        assert!(set.clear("city"));
        assert!(!set.clear("city"));
        let active: Vec<&str> = set.active().iter().map(|s| s.path.as_str()).collect();
        assert_eq!(active, vec!["age"]);
        assert_eq!(set.cycle("age"), SortDirection::Descending);
        assert_eq!(set.cycle("age"), SortDirection::Unset);
    }
}
