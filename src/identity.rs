//! Local row identity.
//!
//! Every displayed sequence is stamped with dense local ids `0..n`. Lookups compare
//! string forms so numeric remote ids and string ids never miss each other.

use crate::item::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Local,
    External,
}

pub fn stamp(items: &mut [Item]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.local_id = index;
    }
}

pub fn stamped(mut items: Vec<Item>) -> Vec<Item> {
    stamp(&mut items);
    items
}

pub fn matches_id(item: &Item, id: &str, kind: IdKind) -> bool {
    match kind {
        IdKind::Local => item.local_id.to_string() == id,
        IdKind::External => item.external_id.as_deref() == Some(id),
    }
}

pub fn resolve_index(items: &[Item], id: &str, kind: IdKind) -> Option<usize> {
    items.iter().position(|item| matches_id(item, id, kind))
}

pub fn ids_equal(a: &Item, b: &Item, kind: IdKind) -> bool {
    match kind {
        IdKind::Local => a.local_id == b.local_id,
        IdKind::External => a.external_id.is_some() && a.external_id == b.external_id,
    }
}
