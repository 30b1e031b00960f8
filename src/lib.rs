//! Stowage: the spatial placement and retrieval core of a vessel
//! cargo-management system.
//!
//! Cargo items are axis-aligned boxes with a priority, an optional expiry
//! date, an optional usage budget and a preferred zone; containers are
//! axis-aligned boxes with a single open face at `y = 0`. This crate
//! decides where to put an item, which instance of a named item to hand
//! out and what blocks its extraction, how to rearrange a saturated
//! container, and which waste to send home under a mass cap.
//!
//! The entry point is [`service::CargoService`], a synchronous command
//! surface over the abstract [`store::Store`]. Spatial queries run on a
//! per-container octree ([`octree::Octree`]) that is materialized on
//! demand from a store snapshot and discarded after the planning call.

pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod octree;
pub mod placement;
pub mod retrieval;
pub mod service;
pub mod simulation;
pub mod store;
pub mod types;
pub mod waste;

pub use config::{PlannerConfig, RetrievalWeights, ScoringConfig};
pub use error::{CoreError, CoreResult};
pub use model::{Container, Item, ItemSpec, Placement, Zone};
pub use service::CargoService;
pub use store::{InMemoryStore, ItemFilter, Store};
