//! Time-driven forecasts over the inventory.
//!
//! Both forecasts are pure over an item snapshot and the simulated current
//! date. The depletion forecast assumes a flat consumption rate of one use
//! per item per week; that is a placeholder until real usage telemetry
//! exists, and every estimate derived from it should be read accordingly.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::Item;

/// Assumed consumption rate of usage-limited items.
const USES_PER_WEEK: f64 = 1.0;

/// Usage record fed into `advance_time`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ItemUsage {
    pub id: String,
    #[serde(default = "default_uses")]
    pub uses: u32,
}

fn default_uses() -> u32 {
    1
}

/// Items grouped under one forecast date.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastGroup {
    pub date: NaiveDate,
    pub days_from_now: i64,
    pub item_ids: Vec<String>,
}

/// Expiry outlook over a day window.
#[derive(Clone, Debug, Serialize)]
pub struct ExpiryForecast {
    pub forecast_days: i64,
    pub expiring_count: usize,
    pub groups: Vec<ForecastGroup>,
}

/// Lists non-waste items whose expiry falls within `(today, today + days]`,
/// grouped by expiry date in ascending order.
///
/// Items already expired are not part of the outlook; the waste sweep owns
/// those.
pub fn forecast_expirations(items: &[Item], today: NaiveDate, days: i64) -> ExpiryForecast {
    let horizon = today + Duration::days(days);
    let mut by_date: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    let mut expiring_count = 0;

    for item in items {
        if item.is_waste {
            continue;
        }
        if let Some(expiry) = item.expiry_date {
            if expiry > today && expiry <= horizon {
                by_date.entry(expiry).or_default().push(item.id.clone());
                expiring_count += 1;
            }
        }
    }

    ExpiryForecast {
        forecast_days: days,
        expiring_count,
        groups: by_date
            .into_iter()
            .map(|(date, item_ids)| ForecastGroup {
                date,
                days_from_now: (date - today).num_days(),
                item_ids,
            })
            .collect(),
    }
}

/// Depletion outlook over a day window.
#[derive(Clone, Debug, Serialize)]
pub struct DepletionForecast {
    pub forecast_days: i64,
    pub depleting_count: usize,
    pub groups: Vec<ForecastGroup>,
}

/// Estimates which consumables run out within `days`, grouped by their
/// projected depletion date.
pub fn forecast_usage_depletion(items: &[Item], today: NaiveDate, days: i64) -> DepletionForecast {
    let forecast_uses = days as f64 / 7.0 * USES_PER_WEEK;
    let mut by_date: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    let mut depleting_count = 0;

    for item in items {
        if item.is_waste {
            continue;
        }
        let usage = match item.usage {
            Some(usage) => usage,
            None => continue,
        };
        if usage.remaining == 0 || f64::from(usage.remaining) > forecast_uses {
            continue;
        }
        let days_until = (f64::from(usage.remaining) / USES_PER_WEEK * 7.0) as i64;
        let date = today + Duration::days(days_until);
        by_date.entry(date).or_default().push(item.id.clone());
        depleting_count += 1;
    }

    DepletionForecast {
        forecast_days: days,
        depleting_count,
        groups: by_date
            .into_iter()
            .map(|(date, item_ids)| ForecastGroup {
                date,
                days_from_now: (date - today).num_days(),
                item_ids,
            })
            .collect(),
    }
}

/// Outcome of an `advance_time` call.
#[derive(Clone, Debug, Serialize)]
pub struct TimeAdvanceSummary {
    pub days_advanced: i64,
    pub previous_date: NaiveDate,
    pub current_date: NaiveDate,
    /// Usage records that were applied.
    pub items_used: usize,
    /// Items newly classified as waste by expiry.
    pub items_expired: usize,
    /// Items newly classified as waste by depletion.
    pub items_depleted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemSpec, Usage};

    fn item(id: &str) -> Item {
        Item::from_spec(ItemSpec {
            id: id.to_string(),
            name: format!("Item {}", id),
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

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    #[test]
    fn expiry_forecast_windows_and_groups() {
        let mut soon_a = item("001");
        soon_a.expiry_date = NaiveDate::from_ymd_opt(2026, 8, 5);
        let mut soon_b = item("002");
        soon_b.expiry_date = NaiveDate::from_ymd_opt(2026, 8, 5);
        let mut later = item("003");
        later.expiry_date = NaiveDate::from_ymd_opt(2026, 8, 20);
        let mut beyond = item("004");
        beyond.expiry_date = NaiveDate::from_ymd_opt(2026, 12, 1);
        let mut already = item("005");
        already.expiry_date = NaiveDate::from_ymd_opt(2026, 8, 1);

        let forecast = forecast_expirations(
            &[soon_a, soon_b, later, beyond, already],
            today(),
            30,
        );
        assert_eq!(forecast.expiring_count, 3);
        assert_eq!(forecast.groups.len(), 2);
        assert_eq!(forecast.groups[0].days_from_now, 4);
        assert_eq!(
            forecast.groups[0].item_ids,
            vec!["001".to_string(), "002".to_string()]
        );
        assert_eq!(forecast.groups[1].days_from_now, 19);
    }

    #[test]
    fn depletion_forecast_projects_one_use_per_week() {
        let mut low = item("001");
        low.usage = Some(Usage {
            limit: 10,
            remaining: 2,
        });
        let mut plenty = item("002");
        plenty.usage = Some(Usage {
            limit: 10,
            remaining: 9,
        });
        let unlimited = item("003");

        let forecast = forecast_usage_depletion(&[low, plenty, unlimited], today(), 30);
        assert_eq!(forecast.depleting_count, 1);
        assert_eq!(forecast.groups.len(), 1);
        // 2 remaining uses at 1 use/week -> 14 days out.
        assert_eq!(forecast.groups[0].days_from_now, 14);
        assert_eq!(forecast.groups[0].item_ids, vec!["001".to_string()]);
    }

    #[test]
    fn forecasts_skip_waste() {
        let mut wasted = item("001");
        wasted.expiry_date = NaiveDate::from_ymd_opt(2026, 8, 5);
        wasted.usage = Some(Usage {
            limit: 4,
            remaining: 1,
        });
        wasted.is_waste = true;

        assert_eq!(
            forecast_expirations(&[wasted.clone()], today(), 30).expiring_count,
            0
        );
        assert_eq!(
            forecast_usage_depletion(&[wasted], today(), 30).depleting_count,
            0
        );
    }
}
