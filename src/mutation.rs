//! Optimistic local edits applied straight to the displayed rows.
//!
//! These bypass filtering and sorting and are lost on the next filter pass or page fetch;
//! `is_stale` tells the host a refresh is due.

use crate::controller::{GridController, GridEvent};
use crate::identity::{IdKind, matches_id};
use crate::item::{Item, Record, RowBackground, coerce_id, parent_links};
use crate::source::LazyLoadSource;
use tracing::{debug, warn};

impl<S: LazyLoadSource> GridController<S> {
    /// Inserts root records after `after_id` (or at the front) and child records directly
    /// below each expanded parent they name. Children of collapsed parents are skipped.
    pub fn add_item(&mut self, records: Vec<Record>, after_id: Option<&str>, mark_stale: bool) {
        let fields = self.config.fields.clone();
        let (roots, children): (Vec<Record>, Vec<Record>) = records
            .into_iter()
            .partition(|record| parent_links(record, &fields).is_empty());

        let roots: Vec<Item> = roots
            .into_iter()
            .map(|record| Item::from_record(record, &fields))
            .collect();
        let first_root = roots.first().and_then(|item| item.external_id.clone());
        if !roots.is_empty() {
            let anchor = after_id.and_then(|id| self.displayed.position_of(id, IdKind::External));
            self.displayed.insert_after(anchor, roots);
        }

        for record in children {
            for parent in parent_links(&record, &fields) {
                if !self.registry.contains(&parent) {
                    debug!(parent = %parent, "parent is collapsed, child stays hidden");
                    continue;
                }
                let Some(index) = self.displayed.position_of(&parent, IdKind::External) else {
                    continue;
                };
                let mut child = Item::from_record(record.clone(), &fields);
                child.parent_id = Some(parent);
                child.background = Some(RowBackground::Child);
                self.displayed.insert_after(Some(index), vec![child]);
            }
        }

        if mark_stale {
            self.stale = true;
        }
        self.emit(GridEvent::DisplayedItemsChanged);

        if let Some(id) = first_root
            && let Some(index) = self.displayed.position_of(&id, IdKind::External)
        {
            let item = self.displayed.get(index).cloned();
            self.set_active(item);
            self.emit(GridEvent::ScrollToItem(index));
        }
    }

    /// Patches the matching selected, displayed and active rows with the provided fields.
    pub fn update_item(&mut self, records: Vec<Record>, mark_stale: bool) {
        let fields = self.config.fields.clone();
        for patch in &records {
            let Some(id) = patch.get(&fields.id).and_then(coerce_id) else {
                warn!("update without an id ignored");
                continue;
            };

            for item in self
                .selected
                .iter_mut()
                .chain(self.displayed.rows_mut().iter_mut())
                .filter(|item| matches_id(item, &id, IdKind::External))
            {
                item.patch(patch, &fields);
            }

            if let Some(active) = self.active.as_mut()
                && matches_id(active, &id, IdKind::External)
            {
                active.patch(patch, &fields);
                self.emit(GridEvent::ActiveItemUpdated);
            }
        }

        if mark_stale {
            self.stale = true;
        }
        self.emit(GridEvent::DisplayedItemsChanged);
    }

    /// Removes rows by external id and activates the row just before the first removed one.
    /// Returns false when none of the ids is displayed.
    pub fn remove_item(&mut self, ids: &[&str], mark_stale: bool) -> bool {
        let Some(index) = ids
            .iter()
            .filter_map(|id| self.displayed.position_of(id, IdKind::External))
            .min()
        else {
            debug!(?ids, "nothing to remove");
            return false;
        };

        let doomed = |item: &Item| {
            item.external_id
                .as_deref()
                .is_some_and(|id| ids.contains(&id))
        };
        let removed = self.displayed.remove_where(doomed);
        let before = self.selected.len();
        self.selected.retain(|item| !doomed(item));
        let selection_changed = self.selected.len() != before;
        self.pending_removal.retain(|id| !ids.contains(&id.as_str()));

        if mark_stale {
            self.stale = true;
        }
        debug!(removed = removed.len(), index, "removed rows");
        self.emit(GridEvent::DisplayedItemsChanged);
        if selection_changed {
            self.emit(GridEvent::SelectionChanged);
        }

        let next = self.displayed.get(index.saturating_sub(1)).cloned();
        self.set_active(next);
        true
    }

    /// Flags the rows for removal, waits the configured grace period, then removes them.
    pub async fn remove_item_deferred(&mut self, ids: &[&str], mark_stale: bool) -> bool {
        let flagged: Vec<String> = ids
            .iter()
            .filter(|id| self.displayed.position_of(id, IdKind::External).is_some())
            .map(|id| id.to_string())
            .collect();
        if flagged.is_empty() {
            return false;
        }

        if let Some(index) = self.displayed.position_of(&flagged[0], IdKind::External) {
            self.emit(GridEvent::ScrollToItem(index));
        }
        self.pending_removal.extend(flagged.iter().cloned());
        self.emit(GridEvent::RemovalPending(flagged));

        tokio::time::sleep(self.config.removal_grace()).await;
        self.remove_item(ids, mark_stale)
    }
}
