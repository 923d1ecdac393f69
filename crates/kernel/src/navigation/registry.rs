//! Navigation registry - collects navigation items from modules, grouped by
//! menu.
//!
//! Items are kept in registration order with a monotonic sequence number and
//! sorted on read: descending priority, ties ordered by the registering
//! module's bootstrap position, then by registration order within that
//! module. Menus are therefore the same whatever order modules finish in. An
//! item may ask to be nested under a section registered by another module; it
//! is attached on read once that section exists.

use std::collections::{BTreeMap, HashMap, HashSet};

use mosaic_sdk::types::{ModuleId, NavigationItem, NavigationOptions};
use tracing::debug;

use super::NavigationError;
use crate::registration::{RegistrationOrigin, RegistrationPhase};

#[derive(Debug, Clone)]
struct Entry {
    item: NavigationItem,
    section_id: Option<String>,
    origin: RegistrationOrigin,
    seq: u64,
}

impl Entry {
    fn sort_key(&self) -> (&ModuleId, RegistrationPhase, u64) {
        (&self.origin.module, self.origin.phase, self.seq)
    }
}

/// Registry of navigation items for every menu.
#[derive(Debug, Default)]
pub struct NavigationRegistry {
    menus: HashMap<String, Vec<Entry>>,
    next_seq: u64,
}

impl NavigationRegistry {
    /// Create an empty navigation registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item. Returns its sequence number.
    pub fn add_item(
        &mut self,
        item: NavigationItem,
        options: NavigationOptions,
        origin: RegistrationOrigin,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        let menu_id = options.menu_id().to_string();
        debug!(
            module = %origin.module,
            menu = %menu_id,
            label = %item.label(),
            priority = item.priority(),
            section = ?options.section_id,
            "registering navigation item"
        );

        self.menus.entry(menu_id).or_default().push(Entry {
            item,
            section_id: options.section_id,
            origin,
            seq,
        });
        seq
    }

    /// Items of a menu, sorted, with cross-module sections merged in.
    ///
    /// Unknown menus yield an empty list.
    pub fn items(&self, menu_id: &str) -> Vec<NavigationItem> {
        match self.menus.get(menu_id) {
            Some(entries) => materialize(entries).0,
            None => Vec::new(),
        }
    }

    /// Ids of every menu that received at least one item, sorted.
    pub fn menu_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.menus.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Check that every section reference resolved and that item ids are
    /// unique per menu.
    pub fn validate(&self) -> Vec<NavigationError> {
        let mut errors = Vec::new();
        let menus: BTreeMap<&String, &Vec<Entry>> = self.menus.iter().collect();

        for (menu_id, entries) in menus {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for entry in entries.iter() {
                count_ids(&entry.item, &mut counts);
            }
            for (id, count) in counts {
                if count > 1 {
                    errors.push(NavigationError::DuplicateItemId {
                        menu: menu_id.clone(),
                        id: id.to_string(),
                    });
                }
            }

            let (_, placed) = materialize(entries);
            for (entry, placed) in entries.iter().zip(placed) {
                if placed {
                    continue;
                }
                errors.push(NavigationError::UnresolvedSection {
                    menu: menu_id.clone(),
                    label: entry.item.label().to_string(),
                    section: entry.section_id.clone().unwrap_or_default(),
                    module: entry.origin.module.to_string(),
                });
            }
        }

        errors
    }

    /// Drop every item whose origin matches. Returns how many were dropped.
    pub fn remove_where(&mut self, matches: impl Fn(&RegistrationOrigin) -> bool) -> usize {
        let mut removed = 0;
        for entries in self.menus.values_mut() {
            let before = entries.len();
            entries.retain(|entry| !matches(&entry.origin));
            removed += before - entries.len();
        }
        self.menus.retain(|_, entries| !entries.is_empty());
        if removed > 0 {
            debug!(removed, "navigation items removed");
        }
        removed
    }

    /// Total number of registered items, across menus.
    pub fn len(&self) -> usize {
        self.menus.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest sequence number handed out so far, if any.
    pub fn last_seq(&self) -> Option<u64> {
        self.next_seq.checked_sub(1)
    }
}

/// Build a menu's tree. Also returns which entries ended up in it.
fn materialize(entries: &[Entry]) -> (Vec<NavigationItem>, Vec<bool>) {
    let mut placed = vec![false; entries.len()];
    let mut anchored = HashSet::new();
    let mut items = Vec::new();

    // Canonical order; the stable priority sort keeps it for ties.
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|a, b| entries[*a].sort_key().cmp(&entries[*b].sort_key()));

    for &index in &order {
        let entry = &entries[index];
        if entry.section_id.is_none() {
            placed[index] = true;
            items.push(build(&entry.item, entries, &order, &mut placed, &mut anchored));
        }
    }

    sort_by_priority(&mut items);
    (items, placed)
}

fn build(
    item: &NavigationItem,
    entries: &[Entry],
    order: &[usize],
    placed: &mut [bool],
    anchored: &mut HashSet<String>,
) -> NavigationItem {
    let mut item = item.clone();

    if let NavigationItem::Section(section) = &mut item {
        let inline = std::mem::take(&mut section.children);
        section.children = inline
            .iter()
            .map(|child| build(child, entries, order, placed, anchored))
            .collect();
    }

    // First section carrying an id collects the items pointing at it.
    if let Some(id) = item.item_id().map(str::to_string)
        && anchored.insert(id.clone())
    {
        for &index in order {
            let entry = &entries[index];
            if !placed[index] && entry.section_id.as_deref() == Some(id.as_str()) {
                placed[index] = true;
                let child = build(&entry.item, entries, order, placed, anchored);
                item = item.with_child(child);
            }
        }
    }

    if let NavigationItem::Section(section) = &mut item {
        sort_by_priority(&mut section.children);
    }
    item
}

/// Descending priority. `sort_by` is stable, so equal priorities keep their
/// current (canonical) order.
fn sort_by_priority(items: &mut [NavigationItem]) {
    items.sort_by(|a, b| b.priority().cmp(&a.priority()));
}

fn count_ids<'a>(item: &'a NavigationItem, counts: &mut BTreeMap<&'a str, usize>) {
    if let Some(id) = item.item_id() {
        *counts.entry(id).or_default() += 1;
    }
    if let NavigationItem::Section(section) = item {
        for child in &section.children {
            count_ids(child, counts);
        }
    }
}
