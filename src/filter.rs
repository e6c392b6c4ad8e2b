use crate::config::Labels;
use crate::item::Item;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOperator {
    Exact,
    Contains,
    StartsWith,
    EndsWith,
}

impl MatchOperator {
    fn matches(self, candidate: &str, term: &str) -> bool {
        match self {
            MatchOperator::Exact => candidate == term,
            MatchOperator::Contains => candidate.contains(term),
            MatchOperator::StartsWith => candidate.starts_with(term),
            MatchOperator::EndsWith => candidate.ends_with(term),
        }
    }
}

/// A plain field is matched by containment; a descriptor picks its own operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterAttribute {
    Field(String),
    Descriptor {
        field: String,
        operator: MatchOperator,
    },
}

impl FilterAttribute {
    pub fn field(&self) -> &str {
        match self {
            FilterAttribute::Field(field) => field,
            FilterAttribute::Descriptor { field, .. } => field,
        }
    }

    fn operator(&self) -> MatchOperator {
        match self {
            FilterAttribute::Field(_) => MatchOperator::Contains,
            FilterAttribute::Descriptor { operator, .. } => *operator,
        }
    }

    fn matches(&self, item: &Item, term: &str) -> bool {
        let candidate = normalize(item.get(self.field()));
        self.operator().matches(&candidate, term)
    }
}

/// Trimmed, accent-stripped, lower-cased text form of a field value.
pub fn normalize(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Object(_)) => String::new(),
        Some(Value::String(s)) => normalize_str(s),
        Some(Value::Number(n)) => normalize_str(&n.to_string()),
        Some(Value::Bool(b)) => normalize_str(&b.to_string()),
        Some(Value::Array(values)) => {
            let joined = values
                .iter()
                .map(|value| normalize(Some(value)))
                .collect::<Vec<_>>()
                .join(",");
            normalize_str(&joined)
        }
    }
}

pub fn normalize_str(raw: &str) -> String {
    raw.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

pub fn filter_items(source: &[Item], query: &str, attributes: Option<&[FilterAttribute]>) -> Vec<Item> {
    if query.trim().is_empty() || source.is_empty() {
        return source.to_vec();
    }

    let derived;
    let attributes = match attributes {
        Some(attributes) => attributes,
        None => {
            derived = source[0]
                .fields
                .keys()
                .map(|key| FilterAttribute::Field(key.clone()))
                .collect::<Vec<_>>();
            &derived
        }
    };

    let term = normalize_str(query);
    source
        .iter()
        .filter(|item| attributes.iter().any(|attribute| attribute.matches(item, &term)))
        .cloned()
        .collect()
}

/// "N resultado(s)" when nothing was filtered out, "N de M resultado(s)" otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultsCount {
    pub shown: usize,
    pub total: usize,
}

impl ResultsCount {
    pub fn label(&self, labels: &Labels) -> String {
        if self.shown == self.total {
            format!("{} {}", self.shown, labels.results)
        } else {
            format!("{} {} {} {}", self.shown, labels.of, self.total, labels.results)
        }
    }
}
