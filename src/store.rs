use crate::identity::{self, IdKind};
use crate::item::Item;
use std::collections::VecDeque;

/// Ordered sequence of displayed rows, tree-linked through `parent_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatStore {
    rows: Vec<Item>,
}

impl FlatStore {
    pub fn new(rows: Vec<Item>) -> Self {
        Self {
            rows: identity::stamped(rows),
        }
    }

    pub fn rows(&self) -> &[Item] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Item] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.rows.get(index)
    }

    pub fn position_of(&self, id: &str, kind: IdKind) -> Option<usize> {
        identity::resolve_index(&self.rows, id, kind)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.rows
            .iter_mut()
            .find(|item| identity::matches_id(item, id, IdKind::External))
    }

    pub fn replace_all(&mut self, rows: Vec<Item>) {
        self.rows = rows;
        self.restamp();
    }

    /// Splices `items` after `anchor`, or at the front when there is no anchor.
    pub fn insert_after(&mut self, anchor: Option<usize>, items: Vec<Item>) {
        let at = anchor.map_or(0, |index| (index + 1).min(self.rows.len()));
        self.rows.splice(at..at, items);
        self.restamp();
    }

    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<Item>
    where
        F: FnMut(&Item) -> bool,
    {
        let (removed, kept): (Vec<Item>, Vec<Item>) =
            std::mem::take(&mut self.rows).into_iter().partition(|item| predicate(item));
        self.rows = kept;
        self.restamp();
        removed
    }

    /// Removes every transitive descendant of `parent_id`.
    ///
    /// Breadth-first with an explicit worklist: hierarchy depth comes from remote data and is
    /// unbounded.
    pub fn remove_descendants(&mut self, parent_id: &str) -> Vec<Item> {
        let mut pending = VecDeque::from([parent_id.to_string()]);
        let mut removed = Vec::new();

        while let Some(current) = pending.pop_front() {
            let (children, kept): (Vec<Item>, Vec<Item>) = std::mem::take(&mut self.rows)
                .into_iter()
                .partition(|item| item.parent_id.as_deref() == Some(current.as_str()));
            self.rows = kept;

            pending.extend(children.iter().filter_map(|child| child.external_id.clone()));
            removed.extend(children);
        }

        self.restamp();
        removed
    }

    pub fn restamp(&mut self) {
        identity::stamp(&mut self.rows);
    }
}
