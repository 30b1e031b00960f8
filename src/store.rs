//! Store contract and the in-memory reference implementation.
//!
//! The store is the ground truth for all entities; spatial indexes are
//! transient views derived from it. The trait keeps business logic out of
//! the persistence layer: filters are plain predicates, updates are
//! field-level deltas, and the usage log is append-only.
//!
//! The core assumes single-call transactionality and a consistent read
//! snapshot per planning call; concurrent writers to the same container
//! must be linearized by the store implementation.

use std::collections::BTreeMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::model::{Container, Item, LogAction, LogEntry, Placement, Usage, Zone};

/// Errors raised by store implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} with id '{id}' already exists")]
    Duplicate { entity: &'static str, id: String },

    #[error("{entity} with id '{id}' does not exist")]
    Missing { entity: &'static str, id: String },

    #[error("store lock poisoned: {0}")]
    Lock(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Predicate for item listings.
#[derive(Clone, Debug, Default)]
pub struct ItemFilter {
    /// Only items placed in this container.
    pub container_id: Option<String>,
    /// Only items with this waste flag.
    pub is_waste: Option<bool>,
    /// Case-insensitive substring match on the item name.
    pub name_contains: Option<String>,
    /// Only items that currently have a placement.
    pub placed_only: bool,
    /// Only items with this returned flag.
    pub returned: Option<bool>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(container_id) = &self.container_id {
            match &item.placement {
                Some(p) if p.container_id == *container_id => {}
                _ => return false,
            }
        }
        if self.placed_only && item.placement.is_none() {
            return false;
        }
        if let Some(is_waste) = self.is_waste {
            if item.is_waste != is_waste {
                return false;
            }
        }
        if let Some(returned) = self.returned {
            if item.returned != returned {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !item
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Field-level update for an item.
///
/// Each field is `None` to leave the stored value untouched; `placement`
/// and `usage` are double-wrapped so clearing them is expressible.
#[derive(Clone, Debug, Default)]
pub struct ItemDelta {
    pub placement: Option<Option<Placement>>,
    pub usage: Option<Option<Usage>>,
    pub is_waste: Option<bool>,
    pub returned: Option<bool>,
}

impl ItemDelta {
    pub fn place(placement: Placement) -> Self {
        Self {
            placement: Some(Some(placement)),
            ..Self::default()
        }
    }

    pub fn unplace() -> Self {
        Self {
            placement: Some(None),
            ..Self::default()
        }
    }

    pub fn apply(&self, item: &mut Item) {
        if let Some(placement) = &self.placement {
            item.placement = placement.clone();
        }
        if let Some(usage) = self.usage {
            item.usage = usage;
        }
        if let Some(is_waste) = self.is_waste {
            item.is_waste = is_waste;
        }
        if let Some(returned) = self.returned {
            item.returned = returned;
        }
    }
}

/// Predicate for usage-log listings.
#[derive(Clone, Debug, Default)]
pub struct LogFilter {
    pub item_id: Option<String>,
    pub action: Option<LogAction>,
    /// Newest entries first; `None` returns everything.
    pub limit: Option<usize>,
}

/// Abstract persistence consumed by the core.
///
/// Implementations must be transactional at single-call granularity.
pub trait Store {
    fn insert_zone(&self, zone: Zone) -> StoreResult<()>;
    fn get_zone(&self, id: &str) -> StoreResult<Option<Zone>>;
    fn list_zones(&self) -> StoreResult<Vec<Zone>>;

    fn insert_container(&self, container: Container) -> StoreResult<()>;
    fn get_container(&self, id: &str) -> StoreResult<Option<Container>>;
    /// Containers in a stable order (ascending id).
    fn list_containers(&self) -> StoreResult<Vec<Container>>;

    fn insert_item(&self, item: Item) -> StoreResult<()>;
    fn get_item(&self, id: &str) -> StoreResult<Option<Item>>;
    /// Matching items in a stable order (ascending id).
    fn list_items(&self, filter: &ItemFilter) -> StoreResult<Vec<Item>>;
    /// Applies a field-level delta atomically and returns the updated item.
    fn update_item(&self, id: &str, delta: ItemDelta) -> StoreResult<Item>;

    fn append_log(&self, entry: LogEntry) -> StoreResult<()>;
    fn list_logs(&self, filter: &LogFilter) -> StoreResult<Vec<LogEntry>>;
}

#[derive(Debug, Default)]
struct StoreInner {
    zones: BTreeMap<String, Zone>,
    containers: BTreeMap<String, Container>,
    items: BTreeMap<String, Item>,
    logs: Vec<LogEntry>,
}

/// In-memory store backed by ordered maps.
///
/// Listing order is ascending id, which keeps every planner scan
/// deterministic. Interior mutability makes the store shareable behind
/// `&self` like any other backend handle.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, StoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, StoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

impl Store for InMemoryStore {
    fn insert_zone(&self, zone: Zone) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner.zones.contains_key(&zone.id) {
            return Err(StoreError::Duplicate {
                entity: "zone",
                id: zone.id,
            });
        }
        inner.zones.insert(zone.id.clone(), zone);
        Ok(())
    }

    fn get_zone(&self, id: &str) -> StoreResult<Option<Zone>> {
        Ok(self.read()?.zones.get(id).cloned())
    }

    fn list_zones(&self) -> StoreResult<Vec<Zone>> {
        Ok(self.read()?.zones.values().cloned().collect())
    }

    fn insert_container(&self, container: Container) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner.containers.contains_key(&container.id) {
            return Err(StoreError::Duplicate {
                entity: "container",
                id: container.id,
            });
        }
        inner.containers.insert(container.id.clone(), container);
        Ok(())
    }

    fn get_container(&self, id: &str) -> StoreResult<Option<Container>> {
        Ok(self.read()?.containers.get(id).cloned())
    }

    fn list_containers(&self) -> StoreResult<Vec<Container>> {
        Ok(self.read()?.containers.values().cloned().collect())
    }

    fn insert_item(&self, item: Item) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner.items.contains_key(&item.id) {
            return Err(StoreError::Duplicate {
                entity: "item",
                id: item.id,
            });
        }
        inner.items.insert(item.id.clone(), item);
        Ok(())
    }

    fn get_item(&self, id: &str) -> StoreResult<Option<Item>> {
        Ok(self.read()?.items.get(id).cloned())
    }

    fn list_items(&self, filter: &ItemFilter) -> StoreResult<Vec<Item>> {
        Ok(self
            .read()?
            .items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    fn update_item(&self, id: &str, delta: ItemDelta) -> StoreResult<Item> {
        let mut inner = self.write()?;
        let item = inner.items.get_mut(id).ok_or_else(|| StoreError::Missing {
            entity: "item",
            id: id.to_string(),
        })?;
        delta.apply(item);
        Ok(item.clone())
    }

    fn append_log(&self, entry: LogEntry) -> StoreResult<()> {
        self.write()?.logs.push(entry);
        Ok(())
    }

    fn list_logs(&self, filter: &LogFilter) -> StoreResult<Vec<LogEntry>> {
        let inner = self.read()?;
        let mut logs: Vec<LogEntry> = inner
            .logs
            .iter()
            .rev()
            .filter(|entry| {
                filter
                    .item_id
                    .as_ref()
                    .map_or(true, |id| entry.item_id == *id)
                    && filter.action.map_or(true, |action| entry.action == action)
            })
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            logs.truncate(limit);
        }
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemSpec;

    fn item(id: &str, name: &str) -> Item {
        Item::from_spec(ItemSpec {
            id: id.to_string(),
            name: name.to_string(),
            width: 10.0,
            depth: 10.0,
            height: 10.0,
            mass: 1.0,
            priority: 50,
            expiry_date: None,
            usage_limit: None,
            preferred_zone_id: None,
        })
        .unwrap()
    }

    #[test]
    fn insert_and_filter_items() {
        let store = InMemoryStore::new();
        store.insert_item(item("001", "Food Packet")).unwrap();
        store.insert_item(item("002", "Oxygen Cylinder")).unwrap();

        let all = store.list_items(&ItemFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let filter = ItemFilter {
            name_contains: Some("OXYGEN".to_string()),
            ..ItemFilter::default()
        };
        let hits = store.list_items(&filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "002");
    }

    #[test]
    fn duplicate_item_id_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_item(item("001", "Food Packet")).unwrap();
        let err = store.insert_item(item("001", "Other")).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { entity: "item", .. }));
    }

    #[test]
    fn delta_updates_only_named_fields() {
        let store = InMemoryStore::new();
        store.insert_item(item("001", "Food Packet")).unwrap();

        let placement = Placement {
            container_id: "contA".to_string(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            rotated: false,
        };
        let updated = store
            .update_item("001", ItemDelta::place(placement.clone()))
            .unwrap();
        assert_eq!(updated.placement, Some(placement));
        assert!(!updated.is_waste);

        let updated = store
            .update_item(
                "001",
                ItemDelta {
                    is_waste: Some(true),
                    ..ItemDelta::default()
                },
            )
            .unwrap();
        assert!(updated.is_waste);
        assert!(updated.placement.is_some());
    }

    #[test]
    fn listings_are_ordered_by_id() {
        let store = InMemoryStore::new();
        store.insert_item(item("b", "B")).unwrap();
        store.insert_item(item("a", "A")).unwrap();
        store.insert_item(item("c", "C")).unwrap();

        let ids: Vec<String> = store
            .list_items(&ItemFilter::default())
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn container_filter_matches_placement() {
        let store = InMemoryStore::new();
        let mut placed = item("001", "Food Packet");
        placed.placement = Some(Placement {
            container_id: "contA".to_string(),
            x: 0.0,
            y: 0.0,
            z: 0.0,
            rotated: false,
        });
        store.insert_item(placed).unwrap();
        store.insert_item(item("002", "Loose Item")).unwrap();

        let filter = ItemFilter {
            container_id: Some("contA".to_string()),
            ..ItemFilter::default()
        };
        assert_eq!(store.list_items(&filter).unwrap().len(), 1);

        let placed_only = ItemFilter {
            placed_only: true,
            ..ItemFilter::default()
        };
        assert_eq!(store.list_items(&placed_only).unwrap().len(), 1);
    }
}
