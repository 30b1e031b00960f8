//! Placement planning: empty-space search, scoring, batch placement and
//! rearrangement.
//!
//! The search sweeps a bounded candidate grid per container and asks the
//! occupancy index whether each candidate box is free. Ranking across
//! containers blends three terms: a preferred-zone bonus, proximity to the
//! open face, and the item priority. The rearrangement planner frees
//! volume from a saturated container by evicting the lowest-priority
//! incumbents and proposing alternate homes for them.
//!
//! All planners here are pure over their inputs; they mutate only the
//! transient indexes handed to them. Commits happen through the service.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::config::PlannerConfig;
use crate::model::{Container, Item};
use crate::octree::Octree;

/// A feasible position inside one container.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotated: bool,
}

/// A scored placement proposal for one item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacementSuggestion {
    pub item_id: String,
    pub container_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotated: bool,
    pub score: f64,
}

/// Finds a free position for a box of the given dimensions.
///
/// Sweeps integer grid positions in steps of `config.grid_step`, loop
/// order `x → y → z`, for the original orientation first and then (when
/// `consider_rotation` holds and the footprint is not square) the rotated
/// one. A candidate replaces the incumbent only on a strictly smaller `y`,
/// so the selection is: minimum `y`, then lower `x`, then lower `z`, then
/// non-rotated over rotated. Square footprints always report
/// `rotated = false`.
///
/// # Returns
/// The best free position, or `None` when the sweep finds none.
pub fn find_empty_space(
    index: &Octree,
    width: f64,
    depth: f64,
    height: f64,
    consider_rotation: bool,
    config: &PlannerConfig,
) -> Option<Position> {
    let dims = index.container_dims();
    let eps = config.general_epsilon;
    let step = config.grid_step;

    let mut orientations = vec![(width, depth, false)];
    if consider_rotation && (width - depth).abs() > eps {
        orientations.push((depth, width, true));
    }

    let mut best: Option<Position> = None;

    for (w, d, rotated) in orientations {
        // A hit at the door cannot be improved by the other orientation.
        if matches!(best, Some(b) if b.y <= 0.0) {
            break;
        }
        if w > dims.x + eps || d > dims.y + eps || height > dims.z + eps {
            continue;
        }

        let max_x = dims.x - w;
        let max_y = dims.y - d;
        let max_z = dims.z - height;

        let mut x = 0.0;
        while x <= max_x + eps {
            let mut y = 0.0;
            while y <= max_y + eps {
                // Rows at or behind the incumbent's depth cannot win.
                if matches!(best, Some(b) if b.y <= y) {
                    break;
                }
                let mut z = 0.0;
                while z <= max_z + eps {
                    let candidate = crate::geometry::placed_aabb(x, y, z, w, d, height);
                    if index.is_free(&candidate) {
                        best = Some(Position { x, y, z, rotated });
                        break;
                    }
                    z += step;
                }
                y += step;
            }
            x += step;
        }
    }

    best
}

/// Ranks candidate containers for an item and returns the best placement.
///
/// Containers whose footprint or height cannot accommodate the item in any
/// orientation are rejected outright. For the rest the score is
/// `zone_bonus + door_weight * (1 - y / depth) + priority / divisor`;
/// the first maximum in container listing order wins.
pub fn find_optimal_placement(
    item: &Item,
    containers: &[Container],
    indexes: &HashMap<String, Octree>,
    config: &PlannerConfig,
) -> Option<PlacementSuggestion> {
    let mut best: Option<PlacementSuggestion> = None;

    for container in containers {
        if (item.width > container.width && item.depth > container.width)
            || (item.width > container.depth && item.depth > container.depth)
            || item.height > container.height
        {
            continue;
        }

        let index = match indexes.get(&container.id) {
            Some(index) => index,
            None => continue,
        };

        let zone_score = match &item.preferred_zone_id {
            Some(preferred) if *preferred == container.zone_id => config.scoring.zone_bonus,
            _ => 0.0,
        };

        let position = match find_empty_space(
            index,
            item.width,
            item.depth,
            item.height,
            true,
            config,
        ) {
            Some(position) => position,
            None => continue,
        };

        let placement_score =
            config.scoring.door_weight * (1.0 - position.y / container.depth);
        let total = zone_score
            + placement_score
            + f64::from(item.priority) / config.scoring.priority_divisor;

        if best.as_ref().map_or(true, |b| total > b.score) {
            best = Some(PlacementSuggestion {
                item_id: item.id.clone(),
                container_id: container.id.clone(),
                x: position.x,
                y: position.y,
                z: position.z,
                rotated: position.rotated,
                score: total,
            });
        }
    }

    best
}

/// Plans placements for a batch of items, highest priority first.
///
/// The caller provides one pre-built index per container; every successful
/// suggestion is inserted into its container's index in place, so later
/// items see the space as occupied. Equal priorities are ordered by item
/// id, which makes the result independent of the input order. Greedy, no
/// backtracking; items with no feasible home are skipped.
pub fn plan_batch(
    items: &[Item],
    containers: &[Container],
    indexes: &mut HashMap<String, Octree>,
    config: &PlannerConfig,
) -> Vec<PlacementSuggestion> {
    let mut order: Vec<&Item> = items.iter().collect();
    order.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));

    let mut placements = Vec::new();
    for item in order {
        match find_optimal_placement(item, containers, indexes, config) {
            Some(suggestion) => {
                let aabb =
                    item.aabb_at(suggestion.x, suggestion.y, suggestion.z, suggestion.rotated);
                if let Some(index) = indexes.get_mut(&suggestion.container_id) {
                    index.insert(&item.id, aabb);
                }
                placements.push(suggestion);
            }
            None => {
                debug!(item = %item.id, "no feasible placement in any container");
            }
        }
    }
    placements
}

/// Proposed relocation of an evicted incumbent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RelocationSuggestion {
    pub item_id: String,
    pub from_container: String,
    pub to_container: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotated: bool,
}

/// Result of the rearrangement planner.
#[derive(Clone, Debug, Serialize)]
pub struct RearrangementPlan {
    /// True when the new items fit without evicting anything.
    pub space_available: bool,
    /// Incumbents to evict, lowest priority first.
    pub items_to_move: Vec<String>,
    /// Alternate homes found for the evicted items.
    pub alternative_placements: Vec<RelocationSuggestion>,
    /// Evicted items for which no other container has room.
    pub unmatched: Vec<String>,
    /// Placements for the new items when space is available.
    pub new_item_placements: Vec<PlacementSuggestion>,
    /// Volume that had to be freed, in cm³.
    pub volume_needed: f64,
    /// Volume the eviction actually frees, in cm³.
    pub volume_freed: f64,
}

/// Plans how to make room for `new_items` in `container`.
///
/// Pure volume heuristic: the container is considered full beyond
/// `fill_limit_ratio` of its volume, incumbents are evicted in ascending
/// priority order until the deficit is covered, and each evicted item gets
/// a scored placement proposal in the remaining containers. Whether the
/// eviction plus the new items actually packs is not verified.
pub fn plan_rearrangement(
    container: &Container,
    incumbents: &[Item],
    new_items: &[Item],
    all_containers: &[Container],
    indexes: &mut HashMap<String, Octree>,
    config: &PlannerConfig,
) -> RearrangementPlan {
    let current: f64 = incumbents.iter().map(Item::volume).sum();
    let incoming: f64 = new_items.iter().map(Item::volume).sum();
    let budget = config.fill_limit_ratio * container.volume();

    if current + incoming <= budget + config.general_epsilon {
        let new_item_placements = plan_batch(new_items, all_containers, indexes, config);
        return RearrangementPlan {
            space_available: true,
            items_to_move: Vec::new(),
            alternative_placements: Vec::new(),
            unmatched: Vec::new(),
            new_item_placements,
            volume_needed: 0.0,
            volume_freed: 0.0,
        };
    }

    let volume_needed = current + incoming - budget;
    debug!(
        container = %container.id,
        volume_needed, "container over fill limit, planning evictions"
    );

    let mut by_priority: Vec<&Item> = incumbents.iter().collect();
    by_priority.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

    let mut evicted: Vec<&Item> = Vec::new();
    let mut volume_freed = 0.0;
    for item in by_priority {
        evicted.push(item);
        volume_freed += item.volume();
        if volume_freed >= volume_needed {
            break;
        }
    }

    let others: Vec<Container> = all_containers
        .iter()
        .filter(|c| c.id != container.id)
        .cloned()
        .collect();

    let mut alternative_placements = Vec::new();
    let mut unmatched = Vec::new();
    for item in &evicted {
        match find_optimal_placement(item, &others, indexes, config) {
            Some(suggestion) => {
                let aabb =
                    item.aabb_at(suggestion.x, suggestion.y, suggestion.z, suggestion.rotated);
                if let Some(index) = indexes.get_mut(&suggestion.container_id) {
                    index.insert(&item.id, aabb);
                }
                alternative_placements.push(RelocationSuggestion {
                    item_id: item.id.clone(),
                    from_container: container.id.clone(),
                    to_container: suggestion.container_id,
                    x: suggestion.x,
                    y: suggestion.y,
                    z: suggestion.z,
                    rotated: suggestion.rotated,
                });
            }
            None => unmatched.push(item.id.clone()),
        }
    }

    RearrangementPlan {
        space_available: false,
        items_to_move: evicted.iter().map(|i| i.id.clone()).collect(),
        alternative_placements,
        unmatched,
        new_item_placements: Vec::new(),
        volume_needed,
        volume_freed,
    }
}
