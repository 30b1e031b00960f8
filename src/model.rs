//! Data model for the stowage core.
//!
//! This module defines the persistent entities the planners operate on:
//! - `Zone`: a logical area of the vessel that groups containers
//! - `Container`: an axis-aligned storage box with its open face at `y = 0`
//! - `Item`: a cargo box with priority, expiry, usage budget and placement
//! - `LogEntry`: an append-only usage-log record
//!
//! All constructors validate their inputs and return `CoreError::InvalidInput`
//! on malformed data, so an entity that exists is always well-formed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::geometry;
use crate::types::{validation, Aabb, Vec3};

/// A logical area of the vessel.
///
/// Containers belong to exactly one zone; items may prefer one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A storage container.
///
/// The face at `y = 0` is the single open face (the door) through which
/// items are inserted and removed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    /// Width in cm (x axis)
    pub width: f64,
    /// Depth in cm (y axis, door at y = 0)
    pub depth: f64,
    /// Height in cm (z axis)
    pub height: f64,
    pub zone_id: String,
}

impl Container {
    /// Creates a new container after validating its dimensions.
    pub fn new(
        id: impl Into<String>,
        width: f64,
        depth: f64,
        height: f64,
        zone_id: impl Into<String>,
    ) -> CoreResult<Self> {
        validation::validate_dimensions_3d(width, depth, height)
            .map_err(CoreError::InvalidInput)?;
        Ok(Self {
            id: id.into(),
            width,
            depth,
            height,
            zone_id: zone_id.into(),
        })
    }

    /// Container dimensions as a vector (width, depth, height).
    #[inline]
    pub fn dims(&self) -> Vec3 {
        Vec3::new(self.width, self.depth, self.height)
    }

    /// Total interior volume.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.width * self.depth * self.height
    }

    /// The container interior as an AABB anchored at the origin.
    #[inline]
    pub fn interior(&self) -> Aabb {
        Aabb::from_position_and_dims(Vec3::zero(), self.dims())
    }
}

/// A committed placement inside a container.
///
/// `rotated` means the item is turned 90° about the vertical axis, which
/// swaps its width and depth; the height never changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub container_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub rotated: bool,
}

/// Usage budget of a consumable item.
///
/// Modeled as one struct so limit and remaining are either both present
/// or both absent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub limit: u32,
    pub remaining: u32,
}

/// A cargo item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    /// Width in cm
    pub width: f64,
    /// Depth in cm
    pub depth: f64,
    /// Height in cm
    pub height: f64,
    /// Mass in kg
    pub mass: f64,
    /// Priority in 1..=100, higher is more important
    pub priority: u8,
    pub expiry_date: Option<NaiveDate>,
    pub usage: Option<Usage>,
    pub preferred_zone_id: Option<String>,
    pub placement: Option<Placement>,
    pub is_waste: bool,
    /// Set when the item left the vessel on an undock; terminal.
    pub returned: bool,
}

impl Item {
    /// Creates an item from a validated spec. The usage budget starts full.
    pub fn from_spec(spec: ItemSpec) -> CoreResult<Self> {
        spec.validate()?;
        let usage = spec.usage_limit.map(|limit| Usage {
            limit,
            remaining: limit,
        });
        Ok(Self {
            id: spec.id,
            name: spec.name,
            width: spec.width,
            depth: spec.depth,
            height: spec.height,
            mass: spec.mass,
            priority: spec.priority,
            expiry_date: spec.expiry_date,
            usage,
            preferred_zone_id: spec.preferred_zone_id,
            placement: None,
            is_waste: false,
            returned: false,
        })
    }

    /// Volume of the item box.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.width * self.depth * self.height
    }

    /// Mass per volume, used by the return packer.
    #[inline]
    pub fn density(&self) -> f64 {
        self.mass / self.volume()
    }

    /// Effective `(width, depth)` for a given rotation.
    #[inline]
    pub fn footprint(&self, rotated: bool) -> (f64, f64) {
        geometry::footprint(self.width, self.depth, rotated)
    }

    /// The AABB the item would occupy at the given position.
    pub fn aabb_at(&self, x: f64, y: f64, z: f64, rotated: bool) -> Aabb {
        let (w, d) = self.footprint(rotated);
        geometry::placed_aabb(x, y, z, w, d, self.height)
    }

    /// The AABB of the item's current placement, if placed.
    pub fn aabb(&self) -> Option<Aabb> {
        self.placement
            .as_ref()
            .map(|p| self.aabb_at(p.x, p.y, p.z, p.rotated))
    }

    /// Whether the item is expired as of `today`.
    ///
    /// An item expires on its expiry date, not the day after.
    #[inline]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        matches!(self.expiry_date, Some(expiry) if expiry <= today)
    }

    /// Whether the usage budget is exhausted.
    #[inline]
    pub fn is_depleted(&self) -> bool {
        matches!(self.usage, Some(u) if u.remaining == 0)
    }

    /// Returns the waste classification the item has earned, if any.
    pub fn waste_reason(&self, today: NaiveDate) -> Option<WasteReason> {
        if self.is_expired(today) {
            Some(WasteReason::Expired)
        } else if self.is_depleted() {
            Some(WasteReason::Depleted)
        } else {
            None
        }
    }

    /// Consumes one use. Returns `false` when the item has no usage budget
    /// or is already depleted.
    ///
    /// Reaching zero flips `is_waste` immediately; callers must not rely
    /// on a separate sweep to observe the transition.
    pub fn use_once(&mut self) -> bool {
        match self.usage.as_mut() {
            Some(u) if u.remaining > 0 => {
                u.remaining -= 1;
                if u.remaining == 0 {
                    self.is_waste = true;
                }
                true
            }
            _ => false,
        }
    }
}

/// Creation payload for an item, as delivered by the outer dispatcher.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemSpec {
    pub id: String,
    pub name: String,
    pub width: f64,
    pub depth: f64,
    pub height: f64,
    pub mass: f64,
    pub priority: u8,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub preferred_zone_id: Option<String>,
}

impl ItemSpec {
    /// Validates the spec.
    ///
    /// # Returns
    /// `Ok(())` for valid data, otherwise `CoreError::InvalidInput`.
    pub fn validate(&self) -> CoreResult<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::InvalidInput("item id must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "item name must not be empty".into(),
            ));
        }
        validation::validate_dimensions_3d(self.width, self.depth, self.height)
            .map_err(CoreError::InvalidInput)?;
        validation::validate_mass(self.mass).map_err(CoreError::InvalidInput)?;
        if !(1..=100).contains(&self.priority) {
            return Err(CoreError::InvalidInput(format!(
                "priority must be in 1..=100, got: {}",
                self.priority
            )));
        }
        if let Some(limit) = self.usage_limit {
            if limit == 0 {
                return Err(CoreError::InvalidInput(
                    "usage limit must be at least 1".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Why an item was classified as waste.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasteReason {
    Expired,
    Depleted,
    Manual,
}

impl WasteReason {
    pub fn code(&self) -> &'static str {
        match self {
            WasteReason::Expired => "expired",
            WasteReason::Depleted => "depleted",
            WasteReason::Manual => "manual",
        }
    }
}

impl std::fmt::Display for WasteReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WasteReason::Expired => write!(f, "item passed its expiry date"),
            WasteReason::Depleted => write!(f, "usage budget exhausted"),
            WasteReason::Manual => write!(f, "manually condemned"),
        }
    }
}

/// Actions recorded in the usage log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogAction {
    Added,
    Placed,
    Moved,
    Retrieved,
    Used,
    Waste,
    Returned,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Added => "added",
            LogAction::Placed => "placed",
            LogAction::Moved => "moved",
            LogAction::Retrieved => "retrieved",
            LogAction::Used => "used",
            LogAction::Waste => "waste",
            LogAction::Returned => "returned",
        }
    }
}

/// An append-only usage-log record. Timestamps are UTC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub item_id: String,
    pub action: LogAction,
    pub timestamp: DateTime<Utc>,
    pub from_container: Option<String>,
    pub to_container: Option<String>,
    pub actor: Option<String>,
    pub notes: Option<String>,
}

impl LogEntry {
    /// Creates an entry stamped with the current UTC time.
    pub fn now(item_id: impl Into<String>, action: LogAction) -> Self {
        Self {
            item_id: item_id.into(),
            action,
            timestamp: Utc::now(),
            from_container: None,
            to_container: None,
            actor: None,
            notes: None,
        }
    }

    pub fn from_container(mut self, container_id: Option<String>) -> Self {
        self.from_container = container_id;
        self
    }

    pub fn to_container(mut self, container_id: Option<String>) -> Self {
        self.to_container = container_id;
        self
    }

    pub fn actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
