//! Monthly amount forecasts and part usage totals.
//!
//! The forecast model is a one-input linear regression `y = w·x + b` where
//! `x` is one month's total and `y` the next month's, fitted with full-batch
//! gradient descent on min-max scaled totals. Predictions are fed back in as
//! the next input.

use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{
        deployment::{self, Entity as Deployment},
        expense::{self, Entity as Expense},
        part::{self, Entity as Part},
        procurement::{self, Entity as Procurement},
        sale::{self, Entity as Sale},
    },
    errors::ServiceError,
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

pub const MAX_FORECAST_PERIODS: usize = 24;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ForecastResource {
    Sales,
    Expenses,
    Procurements,
}

/// A calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyTotal {
    /// `YYYY-MM`
    pub month: String,
    #[schema(value_type = String)]
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Forecast {
    pub resource: ForecastResource,
    pub history: Vec<MonthlyTotal>,
    pub forecast: Vec<MonthlyTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartUsage {
    pub part_id: Uuid,
    pub part_name: String,
    pub brand_name: String,
    pub total_used: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct RegressionSettings {
    pub learning_rate: f64,
    pub iterations: usize,
}

impl From<&AppConfig> for RegressionSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            learning_rate: cfg.forecast_learning_rate,
            iterations: cfg.forecast_iterations,
        }
    }
}

/// Sums amounts per calendar month. Months without rows are absent.
pub fn monthly_totals(rows: impl IntoIterator<Item = (NaiveDate, Decimal)>) -> BTreeMap<Month, Decimal> {
    let mut totals = BTreeMap::new();
    for (date, amount) in rows {
        *totals.entry(Month::of(date)).or_insert(Decimal::ZERO) += amount;
    }
    totals
}

/// Fits the regression to `history` and projects `periods` values past its
/// end. Returns nothing when fewer than two points are available.
pub fn fit_and_project(history: &[f64], periods: usize, settings: RegressionSettings) -> Vec<f64> {
    if history.len() < 2 || periods == 0 {
        return Vec::new();
    }

    let min = history.iter().copied().fold(f64::INFINITY, f64::min);
    let max = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= f64::EPSILON {
        return vec![min.max(0.0); periods];
    }

    let scaled: Vec<f64> = history.iter().map(|v| (v - min) / range).collect();
    let pairs: Vec<(f64, f64)> = scaled.windows(2).map(|w| (w[0], w[1])).collect();
    let m = pairs.len() as f64;

    let (mut w, mut b) = (0.0_f64, 0.0_f64);
    for _ in 0..settings.iterations {
        let (mut dw, mut db) = (0.0, 0.0);
        for (x, y) in &pairs {
            let err = w * x + b - y;
            dw += err * x;
            db += err;
        }
        w -= settings.learning_rate * 2.0 * dw / m;
        b -= settings.learning_rate * 2.0 * db / m;
    }
    debug!(w, b, points = pairs.len(), "fitted forecast model");

    let mut x = scaled[scaled.len() - 1];
    let mut projected = Vec::with_capacity(periods);
    for _ in 0..periods {
        let value = ((w * x + b) * range + min).max(0.0);
        projected.push(value);
        x = (value - min) / range;
    }
    projected
}

/// Sums used quantities per part, largest first.
pub fn aggregate_part_usage(rows: impl IntoIterator<Item = (Uuid, i32)>) -> Vec<(Uuid, i64)> {
    let mut totals: HashMap<Uuid, i64> = HashMap::new();
    for (part_id, quantity) in rows {
        *totals.entry(part_id).or_insert(0) += i64::from(quantity);
    }
    let mut totals: Vec<(Uuid, i64)> = totals.into_iter().collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    totals
}

fn to_money(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

pub struct ForecastingService {
    db: Arc<DbPool>,
    settings: RegressionSettings,
}

impl ForecastingService {
    pub fn new(db: Arc<DbPool>, settings: RegressionSettings) -> Self {
        Self { db, settings }
    }

    async fn dated_amounts(
        &self,
        resource: ForecastResource,
    ) -> Result<Vec<(NaiveDate, Decimal)>, ServiceError> {
        let db = self.db.as_ref();
        let rows: Result<Vec<(NaiveDate, Decimal)>, DbErr> = match resource {
            ForecastResource::Sales => {
                Sale::find()
                    .filter(sale::Column::Deleted.eq(false))
                    .select_only()
                    .column(sale::Column::Date)
                    .column(sale::Column::Amount)
                    .into_tuple()
                    .all(db)
                    .await
            }
            ForecastResource::Expenses => {
                Expense::find()
                    .filter(expense::Column::Deleted.eq(false))
                    .select_only()
                    .column(expense::Column::Date)
                    .column(expense::Column::Amount)
                    .into_tuple()
                    .all(db)
                    .await
            }
            ForecastResource::Procurements => {
                Procurement::find()
                    .filter(procurement::Column::Deleted.eq(false))
                    .select_only()
                    .column(procurement::Column::Date)
                    .column(procurement::Column::Amount)
                    .into_tuple()
                    .all(db)
                    .await
            }
        };
        rows.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn forecast(
        &self,
        resource: ForecastResource,
        periods: usize,
    ) -> Result<Forecast, ServiceError> {
        if !(1..=MAX_FORECAST_PERIODS).contains(&periods) {
            return Err(ServiceError::BadRequest(format!(
                "periods must be between 1 and {}",
                MAX_FORECAST_PERIODS
            )));
        }

        let totals = monthly_totals(self.dated_amounts(resource).await?);
        let series: Vec<f64> = totals
            .values()
            .map(|t| t.to_f64().unwrap_or(0.0))
            .collect();
        let projected = fit_and_project(&series, periods, self.settings);

        let mut month = totals.keys().next_back().copied();
        let forecast = projected
            .into_iter()
            .filter_map(|value| {
                month = month.map(Month::next);
                month.map(|m| MonthlyTotal {
                    month: m.label(),
                    total: to_money(value),
                })
            })
            .collect();

        Ok(Forecast {
            resource,
            history: totals
                .into_iter()
                .map(|(m, total)| MonthlyTotal {
                    month: m.label(),
                    total: total.round_dp(2),
                })
                .collect(),
            forecast,
        })
    }

    /// Total quantity used per part across live deployments
    #[instrument(skip(self))]
    pub async fn part_usage_totals(&self) -> Result<Vec<PartUsage>, ServiceError> {
        let db = self.db.as_ref();
        let rows: Vec<(Uuid, i32)> = Deployment::find()
            .filter(deployment::Column::Deleted.eq(false))
            .select_only()
            .column(deployment::Column::PartId)
            .column(deployment::Column::QuantityUsed)
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let totals = aggregate_part_usage(rows);
        let ids: Vec<Uuid> = totals.iter().map(|(id, _)| *id).collect();
        let parts: HashMap<Uuid, part::Model> = Part::find()
            .filter(part::Column::Id.is_in(ids))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(totals
            .into_iter()
            .filter_map(|(part_id, total_used)| {
                parts.get(&part_id).map(|p| PartUsage {
                    part_id,
                    part_name: p.part_name.clone(),
                    brand_name: p.brand_name.clone(),
                    total_used,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SETTINGS: RegressionSettings = RegressionSettings {
        learning_rate: 0.1,
        iterations: 2000,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn totals_group_by_month_in_order() {
        let totals = monthly_totals(vec![
            (date(2024, 2, 3), dec!(50)),
            (date(2023, 12, 31), dec!(10)),
            (date(2024, 2, 20), dec!(25.5)),
        ]);
        let labels: Vec<(String, Decimal)> =
            totals.into_iter().map(|(m, t)| (m.label(), t)).collect();
        assert_eq!(
            labels,
            vec![
                ("2023-12".to_string(), dec!(10)),
                ("2024-02".to_string(), dec!(75.5)),
            ]
        );
    }

    #[test]
    fn month_rolls_over_year() {
        let dec_2023 = Month::of(date(2023, 12, 1));
        assert_eq!(dec_2023.next().label(), "2024-01");
    }

    #[test]
    fn too_little_history_projects_nothing() {
        assert!(fit_and_project(&[100.0], 3, SETTINGS).is_empty());
        assert!(fit_and_project(&[], 3, SETTINGS).is_empty());
    }

    #[test]
    fn flat_history_stays_flat() {
        assert_eq!(fit_and_project(&[40.0, 40.0, 40.0], 2, SETTINGS), vec![40.0, 40.0]);
    }

    #[test]
    fn rising_history_keeps_rising() {
        let projected = fit_and_project(&[100.0, 200.0, 300.0, 400.0], 2, SETTINGS);
        assert_eq!(projected.len(), 2);
        assert!(projected[0] > 400.0, "got {:?}", projected);
        assert!(projected[1] > projected[0]);
        assert!((projected[0] - 500.0).abs() < 25.0, "got {:?}", projected);
    }

    #[test]
    fn projections_never_go_negative() {
        let projected = fit_and_project(&[900.0, 500.0, 100.0], 4, SETTINGS);
        assert!(projected.iter().all(|v| *v >= 0.0), "got {:?}", projected);
    }

    #[test]
    fn part_usage_sorted_descending() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let totals = aggregate_part_usage(vec![(a, 2), (b, 5), (a, 1)]);
        assert_eq!(totals, vec![(b, 5), (a, 3)]);
    }

    #[test]
    fn resource_parses_from_path() {
        assert_eq!(
            "procurements".parse::<ForecastResource>().unwrap(),
            ForecastResource::Procurements
        );
        assert!("parts".parse::<ForecastResource>().is_err());
    }
}
