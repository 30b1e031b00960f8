//! Octree-backed occupancy index over one container.
//!
//! The tree is a transient view derived from the store: it is built on
//! demand from a snapshot of a container's placed items, queried during a
//! planning call, and discarded afterwards. Entries carry only the item id
//! and its placed AABB, so the index never borrows from the store.
//!
//! The root cube is centered in the container and sized to the largest
//! container dimension, which means it can extend past the container
//! walls; queries are clipped to the interior so phantom space is never
//! reported. An entry is stored in every leaf its box touches, and queries
//! deduplicate by item id.

use std::collections::HashSet;

use crate::model::{Container, Item};
use crate::types::{Aabb, Vec3};

/// Entries a leaf holds before it subdivides.
pub const MAX_ENTRIES: usize = 4;
/// Maximum tree depth; beyond it leaves grow instead of splitting.
pub const MAX_DEPTH: u32 = 8;

#[derive(Clone, Debug)]
struct Entry {
    id: String,
    aabb: Aabb,
}

#[derive(Debug)]
struct Node {
    bounds: Aabb,
    center: Vec3,
    half_size: f64,
    depth: u32,
    entries: Vec<Entry>,
    children: Option<Vec<Node>>,
}

impl Node {
    fn new(center: Vec3, half_size: f64, depth: u32) -> Self {
        let extent = Vec3::new(half_size, half_size, half_size);
        Self {
            bounds: Aabb::new(center - extent, center + extent),
            center,
            half_size,
            depth,
            entries: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, entry: &Entry) {
        if !self.bounds.touches(&entry.aabb) {
            return;
        }
        if self.children.is_none() && self.entries.len() >= MAX_ENTRIES && self.depth < MAX_DEPTH {
            self.subdivide();
        }
        match self.children.as_mut() {
            Some(children) => {
                for child in children.iter_mut() {
                    child.insert(entry);
                }
            }
            None => self.entries.push(entry.clone()),
        }
    }

    /// Splits into 8 octants and pushes the held entries down.
    fn subdivide(&mut self) {
        let quarter = self.half_size / 2.0;
        let mut children = Vec::with_capacity(8);
        for dx in [-1.0, 1.0] {
            for dy in [-1.0, 1.0] {
                for dz in [-1.0, 1.0] {
                    let center = Vec3::new(
                        self.center.x + dx * quarter,
                        self.center.y + dy * quarter,
                        self.center.z + dz * quarter,
                    );
                    children.push(Node::new(center, quarter, self.depth + 1));
                }
            }
        }
        self.children = Some(children);

        let held = std::mem::take(&mut self.entries);
        if let Some(children) = self.children.as_mut() {
            for entry in &held {
                for child in children.iter_mut() {
                    child.insert(entry);
                }
            }
        }
    }

    fn query_into(&self, query: &Aabb, seen: &mut HashSet<String>, out: &mut Vec<String>) {
        if !self.bounds.touches(query) {
            return;
        }
        for entry in &self.entries {
            if entry.aabb.overlaps(query) && seen.insert(entry.id.clone()) {
                out.push(entry.id.clone());
            }
        }
        if let Some(children) = &self.children {
            for child in children {
                child.query_into(query, seen, out);
            }
        }
    }
}

/// Spatial index of the items placed in one container.
#[derive(Debug)]
pub struct Octree {
    container_id: String,
    interior: Aabb,
    root: Node,
}

impl Octree {
    /// Builds the index for a container from an item snapshot.
    ///
    /// Items placed in other containers (or not placed at all) are
    /// ignored, so the full store snapshot can be passed as-is.
    pub fn build(container: &Container, items: &[Item]) -> Self {
        let mut tree = Self::empty(container);
        for item in items {
            tree.insert_item(item);
        }
        tree
    }

    fn empty(container: &Container) -> Self {
        let dims = container.dims();
        let center = dims * 0.5;
        let half_size = dims.max_component() / 2.0;
        Self {
            container_id: container.id.clone(),
            interior: container.interior(),
            root: Node::new(center, half_size, 0),
        }
    }

    /// Id of the container this index covers.
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Container dimensions (width, depth, height).
    pub fn container_dims(&self) -> Vec3 {
        self.interior.dimensions()
    }

    /// Inserts an item if it is placed in this container.
    pub fn insert_item(&mut self, item: &Item) {
        let placed_here = item
            .placement
            .as_ref()
            .map(|p| p.container_id == self.container_id)
            .unwrap_or(false);
        if !placed_here {
            return;
        }
        if let Some(aabb) = item.aabb() {
            self.insert(&item.id, aabb);
        }
    }

    /// Inserts a raw entry, e.g. a placement that is suggested but not yet
    /// committed to the store.
    pub fn insert(&mut self, id: &str, aabb: Aabb) {
        self.root.insert(&Entry {
            id: id.to_string(),
            aabb,
        });
    }

    /// Discards the tree and reinserts the given snapshot.
    pub fn rebuild(&mut self, items: &[Item]) {
        let dims = self.interior.dimensions();
        self.root = Node::new(dims * 0.5, dims.max_component() / 2.0, 0);
        for item in items {
            self.insert_item(item);
        }
    }

    /// Returns the ids of all items whose AABB overlaps the query box.
    ///
    /// The query is clipped to the container interior first; overlap is
    /// strict, so boxes that only share a face do not match. Result order
    /// follows the tree walk and is deterministic for a fixed build
    /// sequence.
    pub fn query_box(&self, min: Vec3, max: Vec3) -> Vec<String> {
        let query = Aabb::new(min, max);
        let clipped = match query.clip_to(&self.interior) {
            Some(clipped) => clipped,
            None => return Vec::new(),
        };
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.root.query_into(&clipped, &mut seen, &mut out);
        out
    }

    /// Convenience wrapper for querying with an [`Aabb`].
    pub fn query_aabb(&self, aabb: &Aabb) -> Vec<String> {
        self.query_box(aabb.min, aabb.max)
    }

    /// Whether the given box overlaps no indexed item.
    pub fn is_free(&self, aabb: &Aabb) -> bool {
        self.query_aabb(aabb).is_empty()
    }
}
