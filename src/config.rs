//! Planner configuration, loaded from environment variables or defaults.
//!
//! The scoring weights are deliberately simple linear blends; they are
//! carried in a configuration record instead of being hard-coded so that
//! deployments can tune them without a rebuild.

use std::env;

use tracing::warn;

use crate::types::EPSILON_GENERAL;

/// Weights of the retrieval selector blend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetrievalWeights {
    pub priority: f64,
    pub expiry: f64,
    pub usage: f64,
    pub access: f64,
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            priority: 0.4,
            expiry: 0.3,
            usage: 0.1,
            access: 0.2,
        }
    }
}

/// Weights of the placement scorer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoringConfig {
    /// Bonus when the container sits in the item's preferred zone.
    pub zone_bonus: f64,
    /// Scale of the door-proximity term `door_weight * (1 - y / depth)`.
    pub door_weight: f64,
    /// The item priority enters the total as `priority / priority_divisor`.
    pub priority_divisor: f64,
    pub retrieval: RetrievalWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            zone_bonus: PlannerConfig::DEFAULT_ZONE_BONUS,
            door_weight: PlannerConfig::DEFAULT_DOOR_WEIGHT,
            priority_divisor: PlannerConfig::DEFAULT_PRIORITY_DIVISOR,
            retrieval: RetrievalWeights::default(),
        }
    }
}

/// Configuration of the placement and rearrangement planners.
///
/// `grid_step` bounds the sweep: roughly `(W * D * H) / step³` candidate
/// positions per container. Smaller steps pack tighter, larger steps plan
/// faster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannerConfig {
    /// Step of the candidate grid in cm.
    pub grid_step: f64,
    /// Fraction of the container volume the rearrangement planner is
    /// willing to fill.
    pub fill_limit_ratio: f64,
    /// General numerical tolerance.
    pub general_epsilon: f64,
    pub scoring: ScoringConfig,
}

impl PlannerConfig {
    pub const DEFAULT_GRID_STEP: f64 = 5.0;
    pub const DEFAULT_FILL_LIMIT_RATIO: f64 = 0.9;
    pub const DEFAULT_ZONE_BONUS: f64 = 50.0;
    pub const DEFAULT_DOOR_WEIGHT: f64 = 100.0;
    pub const DEFAULT_PRIORITY_DIVISOR: f64 = 10.0;

    /// Creates a builder for custom configuration.
    pub fn builder() -> PlannerConfigBuilder {
        PlannerConfigBuilder::default()
    }

    /// Loads the configuration from `STOWAGE_*` environment variables.
    ///
    /// Unset variables fall back to the defaults; invalid values emit a
    /// warning and fall back as well.
    pub fn from_env() -> Self {
        let grid_step = load_f64_with_warning(
            "STOWAGE_GRID_STEP",
            Self::DEFAULT_GRID_STEP,
            |value| value > 0.0,
            "must be greater than 0",
        );
        let fill_limit_ratio = load_f64_with_warning(
            "STOWAGE_FILL_LIMIT_RATIO",
            Self::DEFAULT_FILL_LIMIT_RATIO,
            |value| (0.0..=1.0).contains(&value),
            "must be between 0 and 1",
        );
        let zone_bonus = load_f64_with_warning(
            "STOWAGE_ZONE_BONUS",
            Self::DEFAULT_ZONE_BONUS,
            |value| value >= 0.0,
            "must not be negative",
        );
        let door_weight = load_f64_with_warning(
            "STOWAGE_DOOR_WEIGHT",
            Self::DEFAULT_DOOR_WEIGHT,
            |value| value >= 0.0,
            "must not be negative",
        );
        let priority_divisor = load_f64_with_warning(
            "STOWAGE_PRIORITY_DIVISOR",
            Self::DEFAULT_PRIORITY_DIVISOR,
            |value| value > 0.0,
            "must be greater than 0",
        );

        Self::builder()
            .grid_step(grid_step)
            .fill_limit_ratio(fill_limit_ratio)
            .zone_bonus(zone_bonus)
            .door_weight(door_weight)
            .priority_divisor(priority_divisor)
            .build()
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            grid_step: Self::DEFAULT_GRID_STEP,
            fill_limit_ratio: Self::DEFAULT_FILL_LIMIT_RATIO,
            general_epsilon: EPSILON_GENERAL,
            scoring: ScoringConfig::default(),
        }
    }
}

/// Builder for [`PlannerConfig`].
#[derive(Clone, Debug, Default)]
pub struct PlannerConfigBuilder {
    config: PlannerConfig,
}

impl PlannerConfigBuilder {
    /// Sets the grid step of the placement sweep.
    pub fn grid_step(mut self, step: f64) -> Self {
        self.config.grid_step = step;
        self
    }

    /// Sets the rearrangement fill limit.
    pub fn fill_limit_ratio(mut self, ratio: f64) -> Self {
        self.config.fill_limit_ratio = ratio;
        self
    }

    /// Sets the general numerical tolerance.
    pub fn general_epsilon(mut self, epsilon: f64) -> Self {
        self.config.general_epsilon = epsilon;
        self
    }

    /// Sets the preferred-zone bonus.
    pub fn zone_bonus(mut self, bonus: f64) -> Self {
        self.config.scoring.zone_bonus = bonus;
        self
    }

    /// Sets the door-proximity weight.
    pub fn door_weight(mut self, weight: f64) -> Self {
        self.config.scoring.door_weight = weight;
        self
    }

    /// Sets the priority divisor of the placement score.
    pub fn priority_divisor(mut self, divisor: f64) -> Self {
        self.config.scoring.priority_divisor = divisor;
        self
    }

    /// Sets the retrieval selector weights.
    pub fn retrieval_weights(mut self, weights: RetrievalWeights) -> Self {
        self.config.scoring.retrieval = weights;
        self
    }

    /// Creates the final configuration.
    pub fn build(self) -> PlannerConfig {
        self.config
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(variable = name, error = %err, "could not read variable, using default");
            None
        }
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if validator(value) => value,
            Ok(value) => {
                warn!(
                    variable = var_name,
                    value, invalid_hint, "invalid value, using default {}", default
                );
                default
            }
            Err(err) => {
                warn!(
                    variable = var_name,
                    raw, error = %err, "could not parse as number, using default {}", default
                );
                default
            }
        },
        None => default,
    }
}
