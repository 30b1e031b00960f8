//! Command surface of the stowage core.
//!
//! `CargoService` is what an outer dispatcher talks to: it resolves ids
//! through the store, runs the planners on a consistent snapshot, commits
//! accepted mutations field-by-field, and appends a usage-log entry for
//! every change. Planning calls are synchronous and CPU-only.
//!
//! The service owns the simulated current date. Planners receive it as an
//! argument and stay pure; `advance_time` is the only way it moves.
//!
//! Batch suggestions do not commit. Callers execute them one by one via
//! `place_item`, so a failing step rolls back only itself and prior
//! successes in the same batch stand.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PlannerConfig;
use crate::error::{CoreError, CoreResult};
use crate::geometry;
use crate::model::{Container, Item, ItemSpec, LogAction, LogEntry, Placement, WasteReason};
use crate::octree::Octree;
use crate::placement::{self, PlacementSuggestion, RearrangementPlan};
use crate::retrieval::{self, RetrievalInfo};
use crate::simulation::{
    self, DepletionForecast, ExpiryForecast, ItemUsage, TimeAdvanceSummary,
};
use crate::store::{ItemDelta, ItemFilter, Store};
use crate::types::Vec3;
use crate::waste::{self, ReturnPlan, UndockManifest};

/// The selector's answer to "I need one of these".
#[derive(Clone, Debug, Serialize)]
pub struct RetrievalSuggestion {
    pub item: Item,
    pub info: RetrievalInfo,
}

/// Synchronous command surface over an abstract store.
pub struct CargoService<S: Store> {
    store: S,
    config: PlannerConfig,
    current_date: NaiveDate,
}

impl<S: Store> CargoService<S> {
    /// Creates a service with the default planner configuration. The
    /// simulated date starts at the wall-clock UTC date.
    pub fn new(store: S) -> Self {
        Self::with_config(store, PlannerConfig::default())
    }

    pub fn with_config(store: S, config: PlannerConfig) -> Self {
        Self {
            store,
            config,
            current_date: Utc::now().date_naive(),
        }
    }

    /// Pins the simulated current date; useful for tests and replays.
    pub fn with_current_date(mut self, date: NaiveDate) -> Self {
        self.current_date = date;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    fn require_item(&self, id: &str) -> CoreResult<Item> {
        self.store
            .get_item(id)?
            .ok_or_else(|| CoreError::not_found("item", id))
    }

    fn require_container(&self, id: &str) -> CoreResult<Container> {
        self.store
            .get_container(id)?
            .ok_or_else(|| CoreError::not_found("container", id))
    }

    /// Snapshot of everything that currently occupies space.
    fn placed_snapshot(&self) -> CoreResult<Vec<Item>> {
        Ok(self.store.list_items(&ItemFilter {
            placed_only: true,
            ..ItemFilter::default()
        })?)
    }

    fn build_indexes(
        &self,
        containers: &[Container],
        snapshot: &[Item],
    ) -> HashMap<String, Octree> {
        containers
            .iter()
            .map(|container| (container.id.clone(), Octree::build(container, snapshot)))
            .collect()
    }

    /// Registers a new, unplaced item.
    ///
    /// # Errors
    /// `Conflict` when the id is taken, `NotFound` when the preferred zone
    /// does not exist, `InvalidInput` on a malformed spec.
    pub fn add_item(&self, spec: ItemSpec) -> CoreResult<Item> {
        spec.validate()?;
        if self.store.get_item(&spec.id)?.is_some() {
            return Err(CoreError::Conflict(format!(
                "item with id '{}' already exists",
                spec.id
            )));
        }
        if let Some(zone_id) = &spec.preferred_zone_id {
            if self.store.get_zone(zone_id)?.is_none() {
                return Err(CoreError::not_found("zone", zone_id.clone()));
            }
        }

        let item = Item::from_spec(spec)?;
        self.store.insert_item(item.clone())?;
        self.store.append_log(
            LogEntry::now(item.id.as_str(), LogAction::Added).notes("item added to inventory"),
        )?;
        info!(item = %item.id, "item added");
        Ok(item)
    }

    /// Commits a placement after validating bounds and overlap.
    ///
    /// Records `placed` for a first placement and `moved` afterwards.
    pub fn place_item(
        &self,
        item_id: &str,
        container_id: &str,
        x: f64,
        y: f64,
        z: f64,
        rotated: bool,
        actor: Option<&str>,
    ) -> CoreResult<Item> {
        let item = self.require_item(item_id)?;
        if item.returned {
            return Err(CoreError::DomainViolation(format!(
                "item '{}' has already been returned",
                item_id
            )));
        }
        let container = self.require_container(container_id)?;

        let (w, d) = item.footprint(rotated);
        let position = Vec3::new(x, y, z);
        if !geometry::contains(
            container.dims(),
            position,
            Vec3::new(w, d, item.height),
            self.config.general_epsilon,
        ) {
            return Err(CoreError::InvalidPosition(format!(
                "item '{}' leaves the bounds of container '{}' at ({}, {}, {})",
                item_id, container_id, x, y, z
            )));
        }

        let candidate = item.aabb_at(x, y, z, rotated);
        let occupants = self.store.list_items(&ItemFilter {
            container_id: Some(container_id.to_string()),
            ..ItemFilter::default()
        })?;
        for other in &occupants {
            if other.id == item.id {
                continue;
            }
            if let Some(aabb) = other.aabb() {
                if geometry::collides(&candidate, &aabb) {
                    return Err(CoreError::InvalidPosition(format!(
                        "position overlaps item '{}'",
                        other.id
                    )));
                }
            }
        }

        let previous = item.placement.as_ref().map(|p| p.container_id.clone());
        let updated = self.store.update_item(
            item_id,
            ItemDelta::place(Placement {
                container_id: container_id.to_string(),
                x,
                y,
                z,
                rotated,
            }),
        )?;

        let action = if previous.is_none() {
            LogAction::Placed
        } else {
            LogAction::Moved
        };
        self.store.append_log(
            LogEntry::now(item_id, action)
                .from_container(previous)
                .to_container(Some(container_id.to_string()))
                .actor(actor.map(str::to_string)),
        )?;
        info!(item = item_id, container = container_id, "item placed");
        Ok(updated)
    }

    /// Takes an item out of its container, optionally consuming one use.
    ///
    /// Consuming the last use flips the item to waste on the spot.
    pub fn retrieve_item(
        &self,
        item_id: &str,
        actor: Option<&str>,
        use_item: bool,
    ) -> CoreResult<Item> {
        let mut item = self.require_item(item_id)?;
        let placement = item.placement.clone().ok_or_else(|| {
            CoreError::DomainViolation(format!("item '{}' is not in any container", item_id))
        })?;

        let mut delta = ItemDelta::unplace();
        if use_item {
            item.use_once();
            delta.usage = Some(item.usage);
            delta.is_waste = Some(item.is_waste);
        }
        let updated = self.store.update_item(item_id, delta)?;

        let action = if use_item {
            LogAction::Used
        } else {
            LogAction::Retrieved
        };
        self.store.append_log(
            LogEntry::now(item_id, action)
                .from_container(Some(placement.container_id))
                .actor(actor.map(str::to_string)),
        )?;
        Ok(updated)
    }

    /// Proposes the best container and position for one item.
    ///
    /// Returns `None` when nothing fits anywhere; that is a planner
    /// outcome, not an error.
    pub fn suggest_placement(&self, item_id: &str) -> CoreResult<Option<PlacementSuggestion>> {
        let item = self.require_item(item_id)?;
        let containers = self.store.list_containers()?;
        let snapshot = self.placed_snapshot()?;
        let indexes = self.build_indexes(&containers, &snapshot);

        let suggestion =
            placement::find_optimal_placement(&item, &containers, &indexes, &self.config);
        if suggestion.is_none() {
            debug!(item = item_id, "no container accommodates the item");
        }
        Ok(suggestion)
    }

    /// Proposes placements for a batch, highest priority first.
    pub fn suggest_batch_placement(
        &self,
        item_ids: &[String],
    ) -> CoreResult<Vec<PlacementSuggestion>> {
        let mut items = Vec::with_capacity(item_ids.len());
        for id in item_ids {
            items.push(self.require_item(id)?);
        }
        let containers = self.store.list_containers()?;
        let snapshot = self.placed_snapshot()?;
        let mut indexes = self.build_indexes(&containers, &snapshot);

        Ok(placement::plan_batch(
            &items,
            &containers,
            &mut indexes,
            &self.config,
        ))
    }

    /// Picks the best-matching placed item for a name query.
    pub fn suggest_retrieval(&self, name: &str) -> CoreResult<Option<RetrievalSuggestion>> {
        let candidates = self.store.list_items(&ItemFilter {
            name_contains: Some(name.to_string()),
            is_waste: Some(false),
            placed_only: true,
            ..ItemFilter::default()
        })?;
        if candidates.is_empty() {
            return Ok(None);
        }

        let containers = self.store.list_containers()?;
        let snapshot = self.placed_snapshot()?;
        let indexes = self.build_indexes(&containers, &snapshot);

        match retrieval::find_item_to_retrieve(
            &candidates,
            &indexes,
            self.current_date,
            &self.config,
        ) {
            Some(choice) => {
                let item = self.require_item(&choice.item_id)?;
                Ok(Some(RetrievalSuggestion {
                    item,
                    info: choice.info,
                }))
            }
            None => Ok(None),
        }
    }

    /// Counts the items that must move aside to extract a placed item.
    pub fn get_retrieval_steps(&self, item_id: &str) -> CoreResult<RetrievalInfo> {
        let item = self.require_item(item_id)?;
        let placement = item.placement.as_ref().ok_or_else(|| {
            CoreError::DomainViolation(format!("item '{}' is not in any container", item_id))
        })?;
        let container = self.require_container(&placement.container_id)?;
        let snapshot = self.placed_snapshot()?;
        let index = Octree::build(&container, &snapshot);
        Ok(retrieval::retrieval_steps(&index, &item))
    }

    /// Plans how to make room for new items in a saturated container.
    pub fn suggest_rearrangement(
        &self,
        container_id: &str,
        new_item_ids: &[String],
    ) -> CoreResult<RearrangementPlan> {
        let container = self.require_container(container_id)?;
        let mut new_items = Vec::with_capacity(new_item_ids.len());
        for id in new_item_ids {
            new_items.push(self.require_item(id)?);
        }

        let incumbents = self.store.list_items(&ItemFilter {
            container_id: Some(container_id.to_string()),
            is_waste: Some(false),
            ..ItemFilter::default()
        })?;
        let containers = self.store.list_containers()?;
        let snapshot = self.placed_snapshot()?;
        let mut indexes = self.build_indexes(&containers, &snapshot);

        Ok(placement::plan_rearrangement(
            &container,
            &incumbents,
            &new_items,
            &containers,
            &mut indexes,
            &self.config,
        ))
    }

    /// Sweeps the inventory and flips expired or depleted items to waste.
    ///
    /// # Returns
    /// The newly classified items. After this call no non-waste item is
    /// expired or depleted as of the simulated current date.
    pub fn check_for_waste(&self) -> CoreResult<Vec<Item>> {
        let items = self.store.list_items(&ItemFilter {
            is_waste: Some(false),
            ..ItemFilter::default()
        })?;
        let hits = waste::sweep(&items, self.current_date);

        let mut newly_wasted = Vec::with_capacity(hits.len());
        for (id, reason) in hits {
            let updated = self.store.update_item(
                &id,
                ItemDelta {
                    is_waste: Some(true),
                    ..ItemDelta::default()
                },
            )?;
            self.store.append_log(
                LogEntry::now(id.as_str(), LogAction::Waste)
                    .notes(format!("automatically classified as waste: {}", reason)),
            )?;
            newly_wasted.push(updated);
        }
        if !newly_wasted.is_empty() {
            info!(count = newly_wasted.len(), "waste sweep classified items");
        }
        Ok(newly_wasted)
    }

    /// Condemns an item regardless of expiry or usage state.
    pub fn mark_waste(&self, item_id: &str, reason: Option<&str>) -> CoreResult<Item> {
        self.require_item(item_id)?;
        let updated = self.store.update_item(
            item_id,
            ItemDelta {
                is_waste: Some(true),
                ..ItemDelta::default()
            },
        )?;
        self.store.append_log(
            LogEntry::now(item_id, LogAction::Waste)
                .notes(reason.unwrap_or("manually condemned").to_string()),
        )?;
        Ok(updated)
    }

    /// Selects waste for the next return shipment under an optional mass cap.
    pub fn prepare_waste_return(&self, max_mass: Option<f64>) -> CoreResult<ReturnPlan> {
        let waste_items = self.store.list_items(&ItemFilter {
            is_waste: Some(true),
            returned: Some(false),
            ..ItemFilter::default()
        })?;
        Ok(waste::plan_return(&waste_items, max_mass))
    }

    /// Stows a waste item into a (return) container.
    ///
    /// # Errors
    /// `DomainViolation` when the item is not waste; `NoFit` when the
    /// container has no free space for it.
    pub fn move_waste_to_container(&self, item_id: &str, container_id: &str) -> CoreResult<Item> {
        let item = self.require_item(item_id)?;
        if !item.is_waste {
            return Err(CoreError::DomainViolation(format!(
                "item '{}' is not marked as waste",
                item_id
            )));
        }
        if item.returned {
            return Err(CoreError::DomainViolation(format!(
                "item '{}' has already been returned",
                item_id
            )));
        }
        let container = self.require_container(container_id)?;

        let snapshot = self.placed_snapshot()?;
        let index = Octree::build(&container, &snapshot);
        let position = placement::find_empty_space(
            &index,
            item.width,
            item.depth,
            item.height,
            true,
            &self.config,
        )
        .ok_or_else(|| {
            CoreError::NoFit(format!(
                "no free space in container '{}' for item '{}'",
                container_id, item_id
            ))
        })?;

        let previous = item.placement.as_ref().map(|p| p.container_id.clone());
        let updated = self.store.update_item(
            item_id,
            ItemDelta::place(Placement {
                container_id: container_id.to_string(),
                x: position.x,
                y: position.y,
                z: position.z,
                rotated: position.rotated,
            }),
        )?;
        self.store.append_log(
            LogEntry::now(item_id, LogAction::Moved)
                .from_container(previous)
                .to_container(Some(container_id.to_string()))
                .notes("waste relocated for return"),
        )?;
        Ok(updated)
    }

    /// Processes an undocking: every waste item aboard is logged as
    /// returned and loses its placement; the records stay for audit.
    pub fn process_undock(&self, container_id: &str) -> CoreResult<UndockManifest> {
        self.require_container(container_id)?;
        let waste_items = self.store.list_items(&ItemFilter {
            container_id: Some(container_id.to_string()),
            is_waste: Some(true),
            ..ItemFilter::default()
        })?;

        let mut item_ids = Vec::with_capacity(waste_items.len());
        let mut total_mass = 0.0;
        for item in &waste_items {
            self.store.update_item(
                &item.id,
                ItemDelta {
                    placement: Some(None),
                    returned: Some(true),
                    ..ItemDelta::default()
                },
            )?;
            self.store.append_log(
                LogEntry::now(item.id.as_str(), LogAction::Returned)
                    .from_container(Some(container_id.to_string()))
                    .notes("returned via container undocking"),
            )?;
            item_ids.push(item.id.clone());
            total_mass += item.mass;
        }

        info!(
            container = container_id,
            count = item_ids.len(),
            "undock processed"
        );
        Ok(UndockManifest {
            container_id: container_id.to_string(),
            undock_time: Utc::now(),
            total_items: item_ids.len(),
            item_ids,
            total_mass,
        })
    }

    /// Advances the simulated date, applying usage records first and then
    /// sweeping for newly expired or depleted items.
    ///
    /// Usage records referencing unknown items are skipped; uses beyond an
    /// item's remaining budget are dropped.
    pub fn advance_time(
        &mut self,
        days: i64,
        usages: &[ItemUsage],
    ) -> CoreResult<TimeAdvanceSummary> {
        if days < 1 {
            return Err(CoreError::InvalidInput(format!(
                "days must be at least 1, got: {}",
                days
            )));
        }
        let previous_date = self.current_date;

        let mut items_used = 0;
        for usage in usages {
            let mut item = match self.store.get_item(&usage.id)? {
                Some(item) => item,
                None => {
                    debug!(item = %usage.id, "usage record for unknown item ignored");
                    continue;
                }
            };
            let mut applied = false;
            for _ in 0..usage.uses {
                if !item.use_once() {
                    break;
                }
                applied = true;
                self.store.append_log(
                    LogEntry::now(usage.id.as_str(), LogAction::Used)
                        .notes("used during time simulation"),
                )?;
            }
            if applied {
                self.store.update_item(
                    &usage.id,
                    ItemDelta {
                        usage: Some(item.usage),
                        is_waste: Some(item.is_waste),
                        ..ItemDelta::default()
                    },
                )?;
                items_used += 1;
            }
        }

        self.current_date = previous_date + Duration::days(days);

        let snapshot = self.store.list_items(&ItemFilter {
            is_waste: Some(false),
            ..ItemFilter::default()
        })?;
        let mut items_expired = 0;
        let mut items_depleted = 0;
        for (id, reason) in waste::sweep(&snapshot, self.current_date) {
            self.store.update_item(
                &id,
                ItemDelta {
                    is_waste: Some(true),
                    ..ItemDelta::default()
                },
            )?;
            self.store.append_log(
                LogEntry::now(id.as_str(), LogAction::Waste)
                    .notes(format!("automatically classified as waste: {}", reason)),
            )?;
            match reason {
                WasteReason::Expired => items_expired += 1,
                WasteReason::Depleted => items_depleted += 1,
                WasteReason::Manual => {}
            }
        }

        info!(
            days,
            items_used, items_expired, items_depleted, "time advanced"
        );
        Ok(TimeAdvanceSummary {
            days_advanced: days,
            previous_date,
            current_date: self.current_date,
            items_used,
            items_expired,
            items_depleted,
        })
    }

    /// Expiry outlook over the next `days` days.
    pub fn forecast_expirations(&self, days: i64) -> CoreResult<ExpiryForecast> {
        if days < 1 {
            return Err(CoreError::InvalidInput(format!(
                "days must be at least 1, got: {}",
                days
            )));
        }
        let items = self.store.list_items(&ItemFilter::default())?;
        Ok(simulation::forecast_expirations(
            &items,
            self.current_date,
            days,
        ))
    }

    /// Depletion outlook over the next `days` days, at the assumed flat
    /// consumption rate.
    pub fn forecast_usage_depletion(&self, days: i64) -> CoreResult<DepletionForecast> {
        if days < 1 {
            return Err(CoreError::InvalidInput(format!(
                "days must be at least 1, got: {}",
                days
            )));
        }
        let items = self.store.list_items(&ItemFilter::default())?;
        Ok(simulation::forecast_usage_depletion(
            &items,
            self.current_date,
            days,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Zone;
    use crate::store::{InMemoryStore, LogFilter};

    fn service() -> CargoService<InMemoryStore> {
        crate::logging::init_test();
        let store = InMemoryStore::new();
        store.insert_zone(Zone::new("z-storage", "Storage")).unwrap();
        store
            .insert_zone(Zone::new("z-lab", "Laboratory"))
            .unwrap();
        CargoService::new(store)
            .with_current_date(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap())
    }

    fn add_container(svc: &CargoService<InMemoryStore>, id: &str, w: f64, d: f64, h: f64) {
        svc.store()
            .insert_container(Container::new(id, w, d, h, "z-storage").unwrap())
            .unwrap();
    }

    fn spec(id: &str, name: &str, dims: (f64, f64, f64), mass: f64, priority: u8) -> ItemSpec {
        ItemSpec {
            id: id.to_string(),
            name: name.to_string(),
            width: dims.0,
            depth: dims.1,
            height: dims.2,
            mass,
            priority,
            expiry_date: None,
            usage_limit: None,
            preferred_zone_id: None,
        }
    }

    #[test]
    fn suggestion_for_empty_container_lands_at_the_door_corner() {
        // Scenario: single empty 100 cm cube; the suggestion is the origin
        // with the full door score plus priority / 10.
        let svc = service();
        add_container(&svc, "contA", 100.0, 100.0, 100.0);
        svc.add_item(spec("001", "Food Packet", (10.0, 10.0, 10.0), 5.0, 80))
            .unwrap();

        let suggestion = svc.suggest_placement("001").unwrap().unwrap();
        assert_eq!(suggestion.container_id, "contA");
        assert_eq!(
            (suggestion.x, suggestion.y, suggestion.z, suggestion.rotated),
            (0.0, 0.0, 0.0, false)
        );
        assert!((suggestion.score - 108.0).abs() < 1e-9);
    }

    #[test]
    fn preferred_zone_bonus_shows_up_in_the_score() {
        let svc = service();
        add_container(&svc, "contA", 100.0, 100.0, 100.0);
        let mut s = spec("001", "Lab Kit", (10.0, 10.0, 10.0), 5.0, 80);
        s.preferred_zone_id = Some("z-storage".to_string());
        svc.add_item(s).unwrap();

        let suggestion = svc.suggest_placement("001").unwrap().unwrap();
        assert!((suggestion.score - 158.0).abs() < 1e-9);
    }

    #[test]
    fn next_suggestion_stacks_into_the_door_row() {
        // Scenario: with A committed at the origin, the next 10 cm cube is
        // proposed at (0, 0, 10) - same door row, stacked up.
        let svc = service();
        add_container(&svc, "contA", 100.0, 100.0, 100.0);
        svc.add_item(spec("A", "Cube", (10.0, 10.0, 10.0), 1.0, 50))
            .unwrap();
        svc.add_item(spec("B", "Cube", (10.0, 10.0, 10.0), 1.0, 50))
            .unwrap();
        svc.place_item("A", "contA", 0.0, 0.0, 0.0, false, None)
            .unwrap();

        let suggestion = svc.suggest_placement("B").unwrap().unwrap();
        assert_eq!(
            (suggestion.x, suggestion.y, suggestion.z),
            (0.0, 0.0, 10.0)
        );
    }

    #[test]
    fn placement_validation_rejects_overlap_and_out_of_bounds() {
        // Scenario: a half-width slab occupies the left half; a second one
        // cannot share the origin but fits flush beside it.
        let svc = service();
        add_container(&svc, "contA", 100.0, 100.0, 100.0);
        svc.add_item(spec("A", "Slab", (50.0, 100.0, 100.0), 20.0, 50))
            .unwrap();
        svc.add_item(spec("B", "Slab", (50.0, 100.0, 100.0), 20.0, 50))
            .unwrap();
        svc.place_item("A", "contA", 0.0, 0.0, 0.0, false, None)
            .unwrap();

        assert_eq!(svc.get_retrieval_steps("A").unwrap().steps, 0);

        let overlap = svc.place_item("B", "contA", 0.0, 0.0, 0.0, false, None);
        assert!(matches!(overlap, Err(CoreError::InvalidPosition(_))));

        let beside = svc.place_item("B", "contA", 50.0, 0.0, 0.0, false, None);
        assert!(beside.is_ok());

        let out_of_bounds = svc.place_item("B", "contA", 60.0, 0.0, 0.0, false, None);
        assert!(matches!(out_of_bounds, Err(CoreError::InvalidPosition(_))));
    }

    #[test]
    fn retrieval_steps_name_the_blocker_in_front() {
        // Scenario: B sits between A and the door.
        let svc = service();
        add_container(&svc, "contA", 100.0, 100.0, 100.0);
        svc.add_item(spec("A", "Cube", (10.0, 10.0, 10.0), 1.0, 50))
            .unwrap();
        svc.add_item(spec("B", "Cube", (10.0, 10.0, 10.0), 1.0, 50))
            .unwrap();
        svc.place_item("A", "contA", 0.0, 10.0, 0.0, false, None)
            .unwrap();
        svc.place_item("B", "contA", 0.0, 0.0, 0.0, false, None)
            .unwrap();

        let info = svc.get_retrieval_steps("A").unwrap();
        assert_eq!(info.steps, 1);
        assert_eq!(info.blockers, vec!["B".to_string()]);

        assert_eq!(svc.get_retrieval_steps("B").unwrap().steps, 0);
    }

    #[test]
    fn retrieval_steps_require_a_placed_item() {
        let svc = service();
        add_container(&svc, "contA", 100.0, 100.0, 100.0);
        svc.add_item(spec("A", "Cube", (10.0, 10.0, 10.0), 1.0, 50))
            .unwrap();

        assert!(matches!(
            svc.get_retrieval_steps("A"),
            Err(CoreError::DomainViolation(_))
        ));
        assert!(matches!(
            svc.get_retrieval_steps("missing"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn add_item_rejects_duplicates_and_unknown_zones() {
        let svc = service();
        svc.add_item(spec("001", "Food Packet", (10.0, 10.0, 10.0), 5.0, 80))
            .unwrap();

        let duplicate = svc.add_item(spec("001", "Other", (5.0, 5.0, 5.0), 1.0, 10));
        assert!(matches!(duplicate, Err(CoreError::Conflict(_))));

        let mut s = spec("002", "Lab Kit", (10.0, 10.0, 10.0), 5.0, 80);
        s.preferred_zone_id = Some("z-nowhere".to_string());
        assert!(matches!(
            svc.add_item(s),
            Err(CoreError::NotFound { entity: "zone", .. })
        ));
    }

    #[test]
    fn retrieve_with_use_decrements_and_flips_waste_eagerly() {
        let svc = service();
        add_container(&svc, "contA", 100.0, 100.0, 100.0);
        let mut s = spec("001", "Water Filter", (10.0, 10.0, 10.0), 3.0, 70);
        s.usage_limit = Some(1);
        svc.add_item(s).unwrap();
        svc.place_item("001", "contA", 0.0, 0.0, 0.0, false, Some("mission-cdr"))
            .unwrap();

        let item = svc.retrieve_item("001", Some("mission-cdr"), true).unwrap();
        assert!(item.placement.is_none());
        assert_eq!(item.usage.unwrap().remaining, 0);
        assert!(item.is_waste, "last use must flip waste without a sweep");

        let used_logs = svc
            .store()
            .list_logs(&LogFilter {
                item_id: Some("001".to_string()),
                action: Some(LogAction::Used),
                limit: None,
            })
            .unwrap();
        assert_eq!(used_logs.len(), 1);
        assert_eq!(used_logs[0].actor.as_deref(), Some("mission-cdr"));
    }

    #[test]
    fn suggest_retrieval_matches_names_case_insensitively() {
        let svc = service();
        add_container(&svc, "contA", 100.0, 100.0, 100.0);
        svc.add_item(spec("001", "Food Packet", (10.0, 10.0, 10.0), 5.0, 80))
            .unwrap();
        svc.add_item(spec("002", "First Aid Kit", (10.0, 10.0, 10.0), 2.0, 90))
            .unwrap();
        svc.place_item("001", "contA", 0.0, 0.0, 0.0, false, None)
            .unwrap();
        svc.place_item("002", "contA", 20.0, 0.0, 0.0, false, None)
            .unwrap();

        let suggestion = svc.suggest_retrieval("fOoD").unwrap().unwrap();
        assert_eq!(suggestion.item.id, "001");
        assert_eq!(suggestion.info.steps, 0);

        assert!(svc.suggest_retrieval("oxygen").unwrap().is_none());
    }

    #[test]
    fn waste_sweep_leaves_no_expired_or_depleted_item_behind() {
        // Property: after check_for_waste, every non-waste item is neither
        // expired nor depleted.
        let svc = service();
        let mut expired = spec("001", "Old Rations", (10.0, 10.0, 10.0), 5.0, 20);
        expired.expiry_date = NaiveDate::from_ymd_opt(2026, 7, 15);
        svc.add_item(expired).unwrap();
        let mut fresh = spec("002", "New Rations", (10.0, 10.0, 10.0), 5.0, 20);
        fresh.expiry_date = NaiveDate::from_ymd_opt(2027, 1, 1);
        svc.add_item(fresh).unwrap();

        let newly = svc.check_for_waste().unwrap();
        assert_eq!(newly.len(), 1);
        assert_eq!(newly[0].id, "001");

        let remaining = svc
            .store()
            .list_items(&ItemFilter {
                is_waste: Some(false),
                ..ItemFilter::default()
            })
            .unwrap();
        for item in remaining {
            assert!(!item.is_expired(svc.current_date()));
            assert!(!item.is_depleted());
        }

        // Idempotent: a second sweep finds nothing new.
        assert!(svc.check_for_waste().unwrap().is_empty());
    }

    #[test]
    fn waste_return_respects_the_mass_cap() {
        // Scenario: densities 0.5, 1.0 and 0.02 against a 6 kg cap select
        // the 3 kg and 2 kg items for a 5 kg shipment.
        let svc = service();
        svc.add_item(spec("w1", "Scrap A", (10.0, 1.0, 1.0), 5.0, 10))
            .unwrap();
        svc.add_item(spec("w2", "Scrap B", (3.0, 1.0, 1.0), 3.0, 10))
            .unwrap();
        svc.add_item(spec("w3", "Scrap C", (10.0, 10.0, 1.0), 2.0, 10))
            .unwrap();
        for id in ["w1", "w2", "w3"] {
            svc.mark_waste(id, None).unwrap();
        }

        let plan = svc.prepare_waste_return(Some(6.0)).unwrap();
        assert_eq!(plan.item_ids, vec!["w2".to_string(), "w3".to_string()]);
        assert!((plan.total_mass - 5.0).abs() < 1e-9);

        let everything = svc.prepare_waste_return(None).unwrap();
        assert_eq!(everything.total_items, 3);
    }

    #[test]
    fn move_waste_requires_the_waste_flag() {
        let svc = service();
        add_container(&svc, "contR", 100.0, 100.0, 100.0);
        svc.add_item(spec("001", "Broken Pump", (10.0, 10.0, 10.0), 4.0, 30))
            .unwrap();

        assert!(matches!(
            svc.move_waste_to_container("001", "contR"),
            Err(CoreError::DomainViolation(_))
        ));

        svc.mark_waste("001", Some("pump failed diagnostics")).unwrap();
        let moved = svc.move_waste_to_container("001", "contR").unwrap();
        let placement = moved.placement.unwrap();
        assert_eq!(placement.container_id, "contR");
        assert_eq!((placement.x, placement.y, placement.z), (0.0, 0.0, 0.0));
    }

    #[test]
    fn undock_returns_waste_and_keeps_the_audit_trail() {
        let svc = service();
        add_container(&svc, "contR", 100.0, 100.0, 100.0);
        svc.add_item(spec("001", "Used Canister", (10.0, 10.0, 10.0), 4.0, 30))
            .unwrap();
        svc.add_item(spec("002", "Good Canister", (10.0, 10.0, 10.0), 4.0, 30))
            .unwrap();
        svc.mark_waste("001", None).unwrap();
        svc.move_waste_to_container("001", "contR").unwrap();
        svc.place_item("002", "contR", 20.0, 0.0, 0.0, false, None)
            .unwrap();

        let manifest = svc.process_undock("contR").unwrap();
        assert_eq!(manifest.item_ids, vec!["001".to_string()]);
        assert_eq!(manifest.total_items, 1);
        assert!((manifest.total_mass - 4.0).abs() < 1e-9);

        // The record survives for audit, unplaced and terminal.
        let returned = svc.store().get_item("001").unwrap().unwrap();
        assert!(returned.returned);
        assert!(returned.placement.is_none());
        assert!(matches!(
            svc.place_item("001", "contR", 0.0, 0.0, 0.0, false, None),
            Err(CoreError::DomainViolation(_))
        ));

        // Non-waste cargo stays aboard.
        let kept = svc.store().get_item("002").unwrap().unwrap();
        assert!(kept.placement.is_some());

        // Returned waste no longer shows up in return planning.
        assert_eq!(svc.prepare_waste_return(None).unwrap().total_items, 0);
    }

    #[test]
    fn advance_time_applies_usage_and_expiry() {
        let mut svc = service();
        let mut perishable = spec("exp1", "Milk Pouch", (10.0, 10.0, 10.0), 1.0, 40);
        perishable.expiry_date = NaiveDate::from_ymd_opt(2026, 8, 5);
        svc.add_item(perishable).unwrap();
        let mut consumable = spec("use1", "Wet Wipes", (10.0, 10.0, 10.0), 0.5, 40);
        consumable.usage_limit = Some(2);
        svc.add_item(consumable).unwrap();

        let summary = svc
            .advance_time(
                10,
                &[ItemUsage {
                    id: "use1".to_string(),
                    uses: 2,
                }],
            )
            .unwrap();

        assert_eq!(summary.days_advanced, 10);
        assert_eq!(
            summary.current_date,
            NaiveDate::from_ymd_opt(2026, 8, 11).unwrap()
        );
        assert_eq!(summary.items_used, 1);
        assert_eq!(summary.items_expired, 1);
        // Depletion flipped eagerly during usage, not by the sweep.
        assert_eq!(summary.items_depleted, 0);

        assert!(svc.store().get_item("exp1").unwrap().unwrap().is_waste);
        assert!(svc.store().get_item("use1").unwrap().unwrap().is_waste);
    }

    #[test]
    fn advance_time_rejects_non_positive_days() {
        let mut svc = service();
        assert!(matches!(
            svc.advance_time(0, &[]),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.advance_time(-3, &[]),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.forecast_expirations(0),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.forecast_usage_depletion(-1),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn forecasts_reflect_the_simulated_date() {
        let mut svc = service();
        let mut perishable = spec("001", "Milk Pouch", (10.0, 10.0, 10.0), 1.0, 40);
        perishable.expiry_date = NaiveDate::from_ymd_opt(2026, 8, 20);
        svc.add_item(perishable).unwrap();

        let forecast = svc.forecast_expirations(30).unwrap();
        assert_eq!(forecast.expiring_count, 1);
        assert_eq!(forecast.groups[0].days_from_now, 19);

        // After advancing past the expiry, the item is waste and drops out
        // of the outlook.
        svc.advance_time(25, &[]).unwrap();
        let forecast = svc.forecast_expirations(30).unwrap();
        assert_eq!(forecast.expiring_count, 0);
    }

    #[test]
    fn batch_suggestions_commit_one_by_one() {
        // The suggestions are pure; committing them through place_item
        // reproduces exactly the proposed coordinates.
        let svc = service();
        add_container(&svc, "contA", 100.0, 100.0, 100.0);
        svc.add_item(spec("low", "Crate", (10.0, 10.0, 10.0), 1.0, 20))
            .unwrap();
        svc.add_item(spec("high", "Crate", (10.0, 10.0, 10.0), 1.0, 90))
            .unwrap();

        let suggestions = svc
            .suggest_batch_placement(&["low".to_string(), "high".to_string()])
            .unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].item_id, "high");

        for s in &suggestions {
            svc.place_item(&s.item_id, &s.container_id, s.x, s.y, s.z, s.rotated, None)
                .unwrap();
        }

        // Both committed without overlap; the octree-backed invariants held.
        let placed = svc
            .store()
            .list_items(&ItemFilter {
                placed_only: true,
                ..ItemFilter::default()
            })
            .unwrap();
        assert_eq!(placed.len(), 2);
        for a in &placed {
            for b in &placed {
                if a.id != b.id {
                    assert!(!a.aabb().unwrap().overlaps(&b.aabb().unwrap()));
                }
            }
        }
    }

    #[test]
    fn rearrangement_stays_empty_below_the_fill_limit() {
        // Property: Vcur + Vnew within 90% of the volume evicts nothing.
        let svc = service();
        add_container(&svc, "contA", 100.0, 100.0, 100.0);
        svc.add_item(spec("old", "Crate", (50.0, 50.0, 50.0), 10.0, 50))
            .unwrap();
        svc.place_item("old", "contA", 0.0, 0.0, 0.0, false, None)
            .unwrap();
        svc.add_item(spec("new", "Crate", (20.0, 20.0, 20.0), 2.0, 60))
            .unwrap();

        let plan = svc
            .suggest_rearrangement("contA", &["new".to_string()])
            .unwrap();
        assert!(plan.space_available);
        assert!(plan.items_to_move.is_empty());
        assert_eq!(plan.new_item_placements.len(), 1);
    }
}
