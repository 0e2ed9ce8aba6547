//! Part stock bookkeeping shared by procurements and deployments.
//!
//! A procurement contributes `+quantity_bought` to its part and a deployment
//! contributes `-quantity_used`. Every write to either record is expressed as
//! the contribution before and after the write; the difference is applied to
//! `parts.qty_left` inside the caller's transaction.

use crate::{
    db::{constraint_conflict, not_found},
    entities::part::{self, Entity as Part},
    errors::ServiceError,
    events::Event,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    Set,
};
use tracing::debug;
use uuid::Uuid;

/// Signed effect of one live record on one part's stock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockContribution {
    pub part_id: Uuid,
    pub quantity: i32,
}

impl StockContribution {
    pub fn procured(part_id: Uuid, quantity_bought: i32) -> Self {
        Self {
            part_id,
            quantity: quantity_bought,
        }
    }

    pub fn consumed(part_id: Uuid, quantity_used: i32) -> Self {
        Self {
            part_id,
            quantity: -quantity_used,
        }
    }
}

/// Net change to apply to one part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub part_id: Uuid,
    pub delta: i32,
}

/// Turns a record's contribution before and after a write into per-part
/// deltas. The same part appears at most once; zero deltas are dropped.
pub fn plan_stock_changes(
    before: Option<StockContribution>,
    after: Option<StockContribution>,
) -> Vec<StockChange> {
    let mut changes: Vec<StockChange> = Vec::with_capacity(2);

    let mut push = |part_id: Uuid, delta: i32| {
        match changes.iter_mut().find(|c| c.part_id == part_id) {
            Some(existing) => existing.delta += delta,
            None => changes.push(StockChange { part_id, delta }),
        }
    };

    if let Some(old) = before {
        push(old.part_id, -old.quantity);
    }
    if let Some(new) = after {
        push(new.part_id, new.quantity);
    }

    changes.retain(|c| c.delta != 0);
    changes
}

/// Splits a `"partName|brandName"` key.
pub fn parse_part_key(key: &str) -> Result<(String, String), ServiceError> {
    let malformed = || {
        ServiceError::BadRequest(format!(
            "part key '{}' must look like 'partName|brandName'",
            key
        ))
    };

    let (name, brand) = key.split_once('|').ok_or_else(malformed)?;
    let (name, brand) = (name.trim(), brand.trim());
    if name.is_empty() || brand.is_empty() || brand.contains('|') {
        return Err(malformed());
    }
    Ok((name.to_string(), brand.to_string()))
}

pub async fn find_part_by_name_brand<C: ConnectionTrait>(
    conn: &C,
    part_name: &str,
    brand_name: &str,
) -> Result<Option<part::Model>, ServiceError> {
    Part::find()
        .filter(part::Column::PartName.eq(part_name.trim()))
        .filter(part::Column::BrandName.eq(brand_name.trim()))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Returns the part with this name and brand, creating it with no stock when
/// it does not exist yet. The boolean is true when the part was created.
pub async fn find_or_create_part<C: ConnectionTrait>(
    conn: &C,
    part_name: &str,
    brand_name: &str,
) -> Result<(part::Model, bool), ServiceError> {
    if let Some(existing) = find_part_by_name_brand(conn, part_name, brand_name).await? {
        return Ok((existing, false));
    }

    let now = Utc::now();
    let created = part::ActiveModel {
        id: Set(Uuid::new_v4()),
        part_name: Set(part_name.trim().to_string()),
        brand_name: Set(brand_name.trim().to_string()),
        qty_left: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| {
        constraint_conflict(e, || {
            format!(
                "part '{}' by '{}' was created by another request, retry",
                part_name.trim(),
                brand_name.trim()
            )
        })
    })?;

    debug!(part_id = %created.id, part = %created.key(), "created part");
    Ok((created, true))
}

/// Applies planned changes. Every part is checked before any row is written,
/// and each write is guarded so `qty_left` never goes below zero even under
/// concurrent writers. Returns the updated parts.
pub async fn apply_stock_changes<C: ConnectionTrait>(
    conn: &C,
    changes: &[StockChange],
) -> Result<Vec<part::Model>, ServiceError> {
    let mut parts = Vec::with_capacity(changes.len());
    for change in changes {
        let current = Part::find_by_id(change.part_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| not_found("part", change.part_id))?;
        stock_after(&current, change.delta)?;
        parts.push(current);
    }

    let mut updated = Vec::with_capacity(parts.len());
    for (change, current) in changes.iter().zip(parts) {
        let result = Part::update_many()
            .col_expr(
                part::Column::QtyLeft,
                Expr::col(part::Column::QtyLeft).add(change.delta),
            )
            .col_expr(part::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(part::Column::Id.eq(change.part_id))
            .filter(Expr::col(part::Column::QtyLeft).gte(-change.delta))
            .exec(conn)
            .await
            .map_err(ServiceError::db_error)?;

        if result.rows_affected == 0 {
            return Err(insufficient(&current, -change.delta));
        }

        let qty_left = stock_after(&current, change.delta)?;
        updated.push(part::Model { qty_left, ..current });
    }

    Ok(updated)
}

/// `StockChanged` events for parts touched by a committed write
pub fn stock_changed_events(parts: &[part::Model]) -> Vec<Event> {
    parts
        .iter()
        .map(|p| Event::StockChanged {
            part_id: p.id,
            part_key: p.key(),
            qty_left: p.qty_left,
        })
        .collect()
}

/// Stock left after applying `delta`. Going below zero is `InsufficientStock`;
/// running past `i32::MAX` is a bad request.
fn stock_after(part: &part::Model, delta: i32) -> Result<i32, ServiceError> {
    match part.qty_left.checked_add(delta) {
        Some(qty_left) if qty_left >= 0 => Ok(qty_left),
        Some(_) => Err(insufficient(part, -delta)),
        None if delta < 0 => Err(insufficient(part, delta.saturating_neg())),
        None => Err(ServiceError::BadRequest(format!(
            "{} ({}) cannot hold more than {} units",
            part.part_name,
            part.brand_name,
            i32::MAX
        ))),
    }
}

fn insufficient(part: &part::Model, requested: i32) -> ServiceError {
    ServiceError::InsufficientStock(format!(
        "{} ({}) has {} left, {} requested",
        part.part_name, part.brand_name, part.qty_left, requested
    ))
}
