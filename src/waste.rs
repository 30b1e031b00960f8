//! Waste policy and the return packer.
//!
//! Classification is a pure decision over an item snapshot and the current
//! date; flipping the flags and writing log entries is the service's job.
//! The return packer selects a mass-bounded subset of the waste, densest
//! first, so a fixed return budget carries away as much matter as possible.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{Item, WasteReason};

/// Returns the items that should flip to waste as of `today`.
///
/// Already-wasted items are skipped; each hit carries its reason
/// (expiry wins over depletion when both apply).
pub fn sweep(items: &[Item], today: NaiveDate) -> Vec<(String, WasteReason)> {
    items
        .iter()
        .filter(|item| !item.is_waste)
        .filter_map(|item| item.waste_reason(today).map(|reason| (item.id.clone(), reason)))
        .collect()
}

/// A mass-bounded waste return selection.
#[derive(Clone, Debug, Serialize)]
pub struct ReturnPlan {
    pub item_ids: Vec<String>,
    pub total_mass: f64,
    pub total_items: usize,
    /// Advisory set when the packer had to degrade below the mass cap.
    pub note: Option<String>,
}

/// Selects waste for the next return shipment.
///
/// Without a cap every waste item goes. With a cap, items are taken
/// greedily in descending density (mass per volume) while the cumulative
/// mass stays within budget. When not even the densest pass admits a
/// single item, the plan degrades to the one lightest item and says so in
/// its note.
pub fn plan_return(waste: &[Item], max_mass: Option<f64>) -> ReturnPlan {
    let cap = match max_mass {
        Some(cap) => cap,
        None => {
            return ReturnPlan {
                item_ids: waste.iter().map(|item| item.id.clone()).collect(),
                total_mass: waste.iter().map(|item| item.mass).sum(),
                total_items: waste.len(),
                note: None,
            }
        }
    };

    let mut by_density: Vec<&Item> = waste.iter().collect();
    by_density.sort_by(|a, b| {
        b.density()
            .partial_cmp(&a.density())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut item_ids = Vec::new();
    let mut total_mass = 0.0;
    for item in by_density {
        if total_mass + item.mass <= cap {
            item_ids.push(item.id.clone());
            total_mass += item.mass;
        }
    }

    if item_ids.is_empty() {
        let lightest = waste.iter().min_by(|a, b| {
            a.mass
                .partial_cmp(&b.mass)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        if let Some(item) = lightest {
            return ReturnPlan {
                item_ids: vec![item.id.clone()],
                total_mass: item.mass,
                total_items: 1,
                note: Some(format!(
                    "only returning the lightest item; the {} kg mass cap admits nothing else",
                    cap
                )),
            };
        }
    }

    ReturnPlan {
        total_items: item_ids.len(),
        item_ids,
        total_mass,
        note: None,
    }
}

/// Record of a container undocking with its waste aboard.
#[derive(Clone, Debug, Serialize)]
pub struct UndockManifest {
    pub container_id: String,
    pub undock_time: DateTime<Utc>,
    pub item_ids: Vec<String>,
    pub total_items: usize,
    pub total_mass: f64,
}
