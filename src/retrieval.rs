//! Retrieval planning: blocking sets and the best-match selector.
//!
//! Extraction is modeled as a straight pull towards the open face: the
//! path of a placed item is the box between its front face and the door
//! plane, and every other item overlapping that box must be moved aside
//! first. The selector ranks all placed, non-waste items matching a name
//! query by priority, expiry proximity, remaining uses and accessibility.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::PlannerConfig;
use crate::model::Item;
use crate::octree::Octree;
use crate::types::{Aabb, Vec3};

/// The straight path from a placed item to the open face.
///
/// Spans `[x, x + w'] × [0, y] × [z, z + h]` with the placed footprint;
/// degenerate (zero depth) when the item already sits at the door.
pub fn path_to_door(item: &Item) -> Option<Aabb> {
    let placement = item.placement.as_ref()?;
    let (w, _) = item.footprint(placement.rotated);
    Some(Aabb::new(
        Vec3::new(placement.x, 0.0, placement.z),
        Vec3::new(placement.x + w, placement.y, placement.z + item.height),
    ))
}

/// Blocker count plus the blocking item ids, ascending.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetrievalInfo {
    pub steps: usize,
    pub blockers: Vec<String>,
}

/// Computes the blocking set of a placed item.
///
/// An item at `y = 0` has a zero-thickness path and therefore zero steps.
pub fn retrieval_steps(index: &Octree, item: &Item) -> RetrievalInfo {
    let path = match path_to_door(item) {
        Some(path) => path,
        None => {
            return RetrievalInfo {
                steps: 0,
                blockers: Vec::new(),
            }
        }
    };
    let mut blockers: Vec<String> = index
        .query_aabb(&path)
        .into_iter()
        .filter(|id| *id != item.id)
        .collect();
    blockers.sort();
    RetrievalInfo {
        steps: blockers.len(),
        blockers,
    }
}

/// The selector's pick, with its score and the extraction cost.
#[derive(Clone, Debug, Serialize)]
pub struct RetrievalChoice {
    pub item_id: String,
    pub score: f64,
    pub info: RetrievalInfo,
}

/// Picks the best item to hand out from a set of candidates.
///
/// Candidates are expected to be placed, non-waste, and already filtered
/// by name. Scores blend four terms via the configured weights:
/// - priority (raw 1..=100)
/// - expiry proximity: 100 when expired, else `max(0, 100 - days_left)`
/// - usage depletion: `100 * (1 - remaining / limit)` for consumables
/// - accessibility: `100 / (steps + 1)`
///
/// The first candidate in input order wins ties.
pub fn find_item_to_retrieve(
    candidates: &[Item],
    indexes: &HashMap<String, Octree>,
    today: NaiveDate,
    config: &PlannerConfig,
) -> Option<RetrievalChoice> {
    let weights = config.scoring.retrieval;
    let mut best: Option<RetrievalChoice> = None;

    for item in candidates {
        let placement = match &item.placement {
            Some(placement) => placement,
            None => continue,
        };
        let index = match indexes.get(&placement.container_id) {
            Some(index) => index,
            None => continue,
        };
        let info = retrieval_steps(index, item);

        let expiry_score = match item.expiry_date {
            Some(expiry) => {
                let days_left = (expiry - today).num_days();
                if days_left <= 0 {
                    100.0
                } else {
                    (100 - days_left).max(0) as f64
                }
            }
            None => 0.0,
        };
        let usage_score = match item.usage {
            Some(usage) => 100.0 * (1.0 - f64::from(usage.remaining) / f64::from(usage.limit)),
            None => 0.0,
        };
        let access_score = 100.0 / (info.steps as f64 + 1.0);

        let total = weights.priority * f64::from(item.priority)
            + weights.expiry * expiry_score
            + weights.usage * usage_score
            + weights.access * access_score;

        if best.as_ref().map_or(true, |b| total > b.score) {
            best = Some(RetrievalChoice {
                item_id: item.id.clone(),
                score: total,
                info,
            });
        }
    }

    best
}
