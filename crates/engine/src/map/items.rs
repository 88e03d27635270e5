use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Flower,
    Paper,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flower => "flower",
            Self::Paper => "paper",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Item {
    pub kind: ItemKind,
    pub x: i32,
    pub y: i32,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemPlacement {
    pub x: i32,
    pub y: i32,
    pub quantity: u32,
}

impl ItemPlacement {
    pub const fn new(x: i32, y: i32, quantity: u32) -> Self {
        Self { x, y, quantity }
    }
}

/// Where resources start. Loaded from XML (see `layout`) or the built-in default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLayout {
    pub flowers: Vec<ItemPlacement>,
    pub papers: Vec<ItemPlacement>,
}

impl Default for ItemLayout {
    fn default() -> Self {
        Self {
            flowers: vec![
                ItemPlacement::new(1, 1, 9),
                ItemPlacement::new(3, 1, 3),
                ItemPlacement::new(10, 10, 1),
                ItemPlacement::new(1, 4, 18),
            ],
            papers: vec![
                ItemPlacement::new(1, 1, 3),
                ItemPlacement::new(4, 4, 3),
                ItemPlacement::new(3, 15, 5),
                ItemPlacement::new(10, 30, 10),
            ],
        }
    }
}

impl ItemLayout {
    pub fn empty() -> Self {
        Self {
            flowers: Vec::new(),
            papers: Vec::new(),
        }
    }
}

/// Items on the grid, keyed by kind and tile. Depleted piles stay in place with quantity 0 so
/// draw order is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemStore {
    items: Vec<Item>,
    index: HashMap<(ItemKind, i32, i32), usize>,
}

impl ItemStore {
    pub fn from_layout(layout: &ItemLayout) -> Self {
        let mut store = Self::default();
        for placement in &layout.flowers {
            store.add(ItemKind::Flower, placement.x, placement.y, placement.quantity);
        }
        for placement in &layout.papers {
            store.add(ItemKind::Paper, placement.x, placement.y, placement.quantity);
        }
        store
    }

    pub fn add(&mut self, kind: ItemKind, x: i32, y: i32, quantity: u32) {
        match self.index.get(&(kind, x, y)) {
            Some(&slot) => {
                let item = &mut self.items[slot];
                item.quantity = item.quantity.saturating_add(quantity);
            }
            None => {
                self.index.insert((kind, x, y), self.items.len());
                self.items.push(Item {
                    kind,
                    x,
                    y,
                    quantity,
                });
            }
        }
    }

    pub fn quantity_at(&self, kind: ItemKind, x: i32, y: i32) -> u32 {
        self.index
            .get(&(kind, x, y))
            .map(|&slot| self.items[slot].quantity)
            .unwrap_or(0)
    }

    /// Removes one unit. Returns false when the tile has none of `kind`.
    pub fn take_one(&mut self, kind: ItemKind, x: i32, y: i32) -> bool {
        let Some(&slot) = self.index.get(&(kind, x, y)) else {
            return false;
        };
        let item = &mut self.items[slot];
        if item.quantity == 0 {
            return false;
        }
        item.quantity -= 1;
        true
    }

    pub fn put_one(&mut self, kind: ItemKind, x: i32, y: i32) {
        self.add(kind, x, y, 1);
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn total(&self, kind: ItemKind) -> u32 {
        self.items
            .iter()
            .filter(|item| item.kind == kind)
            .map(|item| item.quantity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_totals() {
        let store = ItemStore::from_layout(&ItemLayout::default());
        assert_eq!(store.total(ItemKind::Flower), 31);
        assert_eq!(store.total(ItemKind::Paper), 21);
        assert_eq!(store.quantity_at(ItemKind::Flower, 1, 1), 9);
        assert_eq!(store.quantity_at(ItemKind::Paper, 1, 1), 3);
    }

    #[test]
    fn take_until_depleted_then_refuse() {
        let mut store = ItemStore::default();
        store.add(ItemKind::Paper, 2, 2, 2);

        assert!(store.take_one(ItemKind::Paper, 2, 2));
        assert!(store.take_one(ItemKind::Paper, 2, 2));
        assert!(!store.take_one(ItemKind::Paper, 2, 2));
        assert!(!store.take_one(ItemKind::Flower, 2, 2));
        assert_eq!(store.items().len(), 1);
    }

    #[test]
    fn put_merges_into_existing_pile() {
        let mut store = ItemStore::default();
        store.put_one(ItemKind::Flower, 5, 6);
        store.put_one(ItemKind::Flower, 5, 6);
        store.put_one(ItemKind::Paper, 5, 6);

        assert_eq!(store.items().len(), 2);
        assert_eq!(store.quantity_at(ItemKind::Flower, 5, 6), 2);
        assert_eq!(store.quantity_at(ItemKind::Paper, 5, 6), 1);
    }
}
