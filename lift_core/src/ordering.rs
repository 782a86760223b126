//! Dense sibling ordering for entries and sets.
//!
//! Siblings always carry `order` values `0..n-1`. Moving, inserting or
//! removing one item renumbers the whole sibling list.

use crate::types::{Entry, EntryId, Set, SetId};

/// An item with an identity and a position among its siblings
pub trait Ordered {
    type Id: PartialEq + Copy;

    fn id(&self) -> Self::Id;
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
}

impl Ordered for Entry {
    type Id = EntryId;

    fn id(&self) -> EntryId {
        self.id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

impl Ordered for Set {
    type Id = SetId;

    fn id(&self) -> SetId {
        self.id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// Place `moving` at its requested order among `items` and renumber everything
///
/// 1. Any item sharing the moving item's id is dropped
/// 2. The rest are sorted by their current order (stable)
/// 3. The moving item is inserted at `min(moving.order, remaining)`
/// 4. Every item gets `order = index`
pub fn reorder<T: Ordered>(items: Vec<T>, moving: T) -> Vec<T> {
    let moving_id = moving.id();
    let mut remaining: Vec<T> = items.into_iter().filter(|i| i.id() != moving_id).collect();
    remaining.sort_by_key(|i| i.order());

    let index = usize::try_from(moving.order())
        .unwrap_or(usize::MAX)
        .min(remaining.len());
    remaining.insert(index, moving);

    renumber(&mut remaining);
    remaining
}

/// Assign `order = index` in the current list position
pub fn renumber<T: Ordered>(items: &mut [T]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_order(index as u32);
    }
}

/// Sort by current order (stable) and close any gaps
pub fn compact<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(|i| i.order());
    renumber(items);
}

/// Next order value after the current maximum, or 0 for an empty list
///
/// `None` when the maximum is already `u32::MAX`.
pub fn next_order<T: Ordered>(items: &[T]) -> Option<u32> {
    match items.iter().map(Ordered::order).max() {
        Some(max) => max.checked_add(1),
        None => Some(0),
    }
}
