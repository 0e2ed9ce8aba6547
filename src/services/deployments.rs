//! Service jobs on client vehicles. Each live deployment takes
//! `quantity_used` out of its part and moves through deploy then release.

use crate::{
    db::{next_seq, not_found, transaction, DbPool},
    entities::{
        deployment::{self, Entity as Deployment},
        part::{self, Entity as Part},
        user::Entity as User,
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    services::{
        listing::{paginate, ListFields, ListQuery},
        stock::{
            apply_stock_changes, find_part_by_name_brand, parse_part_key, plan_stock_changes,
            stock_changed_events, StockContribution,
        },
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const FIELDS: ListFields<deployment::Column> = ListFields {
    sortable: &[
        ("seq", deployment::Column::Seq),
        ("date", deployment::Column::Date),
        ("clientName", deployment::Column::ClientName),
        ("vehicleName", deployment::Column::VehicleName),
        ("carRegistration", deployment::Column::CarRegistration),
        ("quantityUsed", deployment::Column::QuantityUsed),
        ("deploymentStatus", deployment::Column::DeploymentStatus),
        ("releaseStatus", deployment::Column::ReleaseStatus),
        ("createdAt", deployment::Column::CreatedAt),
    ],
    searchable: &[
        ("clientName", deployment::Column::ClientName),
        ("vehicleName", deployment::Column::VehicleName),
        ("carRegistration", deployment::Column::CarRegistration),
    ],
    default_sort: deployment::Column::Seq,
    tiebreak: deployment::Column::Id,
};

/// Deploy/release state of one deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeploymentState {
    pub deployment_status: bool,
    pub deployment_date: Option<NaiveDate>,
    pub release_status: bool,
    pub release_date: Option<NaiveDate>,
}

impl From<&deployment::Model> for DeploymentState {
    fn from(m: &deployment::Model) -> Self {
        Self {
            deployment_status: m.deployment_status,
            deployment_date: m.deployment_date,
            release_status: m.release_status,
            release_date: m.release_date,
        }
    }
}

/// Requested status changes; `None` keeps the current value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusChange {
    pub deployment_status: Option<bool>,
    pub deployment_date: Option<NaiveDate>,
    pub release_status: Option<bool>,
    pub release_date: Option<NaiveDate>,
}

/// Applies a status change to the current state.
///
/// A vehicle can only be released while deployed. Taking it off deployment
/// clears the release and both dates; switching a flag on without a date
/// stamps `today`.
pub fn resolve_status(
    current: DeploymentState,
    change: StatusChange,
    today: NaiveDate,
) -> Result<DeploymentState, ServiceError> {
    let deployed = change
        .deployment_status
        .unwrap_or(current.deployment_status);

    if change.release_status == Some(true) && !deployed {
        return Err(ServiceError::BadRequest(
            "releaseStatus cannot be true while deploymentStatus is false".to_string(),
        ));
    }

    if !deployed {
        return Ok(DeploymentState::default());
    }

    let released = change.release_status.unwrap_or(current.release_status);
    Ok(DeploymentState {
        deployment_status: true,
        deployment_date: Some(
            change
                .deployment_date
                .or(current.deployment_date)
                .unwrap_or(today),
        ),
        release_status: released,
        release_date: released.then(|| {
            change
                .release_date
                .or(current.release_date)
                .unwrap_or(today)
        }),
    })
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeployment {
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 200))]
    pub client_name: String,
    #[validate(length(min = 1, max = 200))]
    pub vehicle_name: String,
    #[validate(length(min = 1, max = 50))]
    pub car_registration: String,
    /// `"partName|brandName"` of an existing part
    #[validate(length(min = 3))]
    pub part: String,
    #[validate(range(min = 1))]
    pub quantity_used: i32,
    #[serde(default)]
    pub deployment_status: bool,
    pub deployment_date: Option<NaiveDate>,
    #[serde(default)]
    pub release_status: bool,
    pub release_date: Option<NaiveDate>,
}

/// Partial update. A body carrying only the four status fields takes the
/// status-only path and leaves stock alone.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeployment {
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 200))]
    pub client_name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub vehicle_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub car_registration: Option<String>,
    #[validate(length(min = 3))]
    pub part: Option<String>,
    #[validate(range(min = 1))]
    pub quantity_used: Option<i32>,
    pub deployment_status: Option<bool>,
    pub deployment_date: Option<NaiveDate>,
    pub release_status: Option<bool>,
    pub release_date: Option<NaiveDate>,
}

impl UpdateDeployment {
    pub fn is_status_only(&self) -> bool {
        self.date.is_none()
            && self.client_name.is_none()
            && self.vehicle_name.is_none()
            && self.car_registration.is_none()
            && self.part.is_none()
            && self.quantity_used.is_none()
    }

    fn status_change(&self) -> StatusChange {
        StatusChange {
            deployment_status: self.deployment_status,
            deployment_date: self.deployment_date,
            release_status: self.release_status,
            release_date: self.release_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentView {
    pub id: Uuid,
    pub seq: i32,
    pub date: NaiveDate,
    pub client_name: String,
    pub vehicle_name: String,
    pub car_registration: String,
    pub part_id: Uuid,
    pub part_name: Option<String>,
    pub brand_name: Option<String>,
    pub quantity_used: i32,
    pub deployment_status: bool,
    pub deployment_date: Option<NaiveDate>,
    pub release_status: bool,
    pub release_date: Option<NaiveDate>,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeploymentView {
    pub fn new(m: deployment::Model, part: Option<&part::Model>) -> Self {
        Self {
            id: m.id,
            seq: m.seq,
            date: m.date,
            client_name: m.client_name,
            vehicle_name: m.vehicle_name,
            car_registration: m.car_registration,
            part_id: m.part_id,
            part_name: part.map(|p| p.part_name.clone()),
            brand_name: part.map(|p| p.brand_name.clone()),
            quantity_used: m.quantity_used,
            deployment_status: m.deployment_status,
            deployment_date: m.deployment_date,
            release_status: m.release_status,
            release_date: m.release_date,
            creator_id: m.creator_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct DeploymentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl DeploymentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Books a job against an existing part, taking the quantity out of stock.
    #[instrument(skip(self, input), fields(part = %input.part, qty = input.quantity_used))]
    pub async fn create(
        &self,
        creator_id: Uuid,
        input: CreateDeployment,
    ) -> Result<DeploymentView, ServiceError> {
        let (part_name, brand_name) = parse_part_key(&input.part)?;
        let state = resolve_status(
            DeploymentState::default(),
            StatusChange {
                deployment_status: Some(input.deployment_status),
                deployment_date: input.deployment_date,
                release_status: Some(input.release_status),
                release_date: input.release_date,
            },
            Utc::now().date_naive(),
        )?;

        let (created, parts) = transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                User::find_by_id(creator_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| not_found("user", creator_id))?;

                let part = find_part_by_name_brand(txn, &part_name, &brand_name)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("part {}|{} not found", part_name, brand_name))
                    })?;

                let changes = plan_stock_changes(
                    None,
                    Some(StockContribution::consumed(part.id, input.quantity_used)),
                );
                let parts = apply_stock_changes(txn, &changes).await?;

                let seq = next_seq::<Deployment, _>(txn, deployment::Column::Seq).await?;
                let now = Utc::now();
                let created = deployment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    seq: Set(seq),
                    date: Set(input.date),
                    client_name: Set(input.client_name.trim().to_string()),
                    vehicle_name: Set(input.vehicle_name.trim().to_string()),
                    car_registration: Set(input.car_registration.trim().to_string()),
                    part_id: Set(part.id),
                    quantity_used: Set(input.quantity_used),
                    deployment_status: Set(state.deployment_status),
                    deployment_date: Set(state.deployment_date),
                    release_status: Set(state.release_status),
                    release_date: Set(state.release_date),
                    creator_id: Set(creator_id),
                    deleted: Set(false),
                    deleted_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                Ok((created, parts))
            })
        })
        .await?;

        info!(deployment_id = %created.id, seq = created.seq, "recorded deployment");
        self.publish(
            Event::RecordCreated {
                kind: RecordKind::Deployment,
                id: created.id,
            },
            None,
            &parts,
        )
        .await;

        let part = parts.iter().find(|p| p.id == created.part_id).cloned();
        Ok(DeploymentView::new(created, part.as_ref()))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: &ListQuery,
    ) -> Result<(Vec<DeploymentView>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let live = Deployment::find().filter(deployment::Column::Deleted.eq(false));
        let (page, total) = paginate(db, live, query, &FIELDS).await?;
        let rows = page
            .find_also_related(Part)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((
            rows.into_iter()
                .map(|(d, part)| DeploymentView::new(d, part.as_ref()))
                .collect(),
            total,
        ))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<DeploymentView, ServiceError> {
        let (deployment, part) = Deployment::find_by_id(id)
            .filter(deployment::Column::Deleted.eq(false))
            .find_also_related(Part)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| not_found("deployment", id))?;
        Ok(DeploymentView::new(deployment, part.as_ref()))
    }

    /// Status-only bodies just move the deploy/release state. Any other field
    /// makes it a full update that also reconciles stock when the part or the
    /// quantity changes; every check runs before anything is written.
    #[instrument(skip(self, input), fields(status_only = input.is_status_only()))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateDeployment,
    ) -> Result<DeploymentView, ServiceError> {
        let today = Utc::now().date_naive();
        let requested_part = input.part.as_deref().map(parse_part_key).transpose()?;

        let (updated, part, parts, status_changed) =
            transaction(self.db_pool.as_ref(), move |txn| {
                Box::pin(async move {
                    let current = load_live(txn, id).await?;
                    let before = DeploymentState::from(&current);
                    let state = resolve_status(before, input.status_change(), today)?;

                    let old_part = Part::find_by_id(current.part_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| not_found("part", current.part_id))?;

                    let mut active: deployment::ActiveModel = current.clone().into();
                    let mut part = old_part.clone();
                    let mut parts = Vec::new();

                    if !input.is_status_only() {
                        if let Some((name, brand)) = requested_part {
                            part = find_part_by_name_brand(txn, &name, &brand)
                                .await?
                                .ok_or_else(|| {
                                    ServiceError::NotFound(format!(
                                        "part {}|{} not found",
                                        name, brand
                                    ))
                                })?;
                        }
                        let quantity_used = input.quantity_used.unwrap_or(current.quantity_used);

                        let changes = plan_stock_changes(
                            Some(StockContribution::consumed(
                                old_part.id,
                                current.quantity_used,
                            )),
                            Some(StockContribution::consumed(part.id, quantity_used)),
                        );
                        parts = apply_stock_changes(txn, &changes).await?;
                        if let Some(fresh) = parts.iter().find(|p| p.id == part.id) {
                            part = fresh.clone();
                        }

                        if let Some(date) = input.date {
                            active.date = Set(date);
                        }
                        if let Some(client_name) = input.client_name {
                            active.client_name = Set(client_name.trim().to_string());
                        }
                        if let Some(vehicle_name) = input.vehicle_name {
                            active.vehicle_name = Set(vehicle_name.trim().to_string());
                        }
                        if let Some(car_registration) = input.car_registration {
                            active.car_registration = Set(car_registration.trim().to_string());
                        }
                        active.part_id = Set(part.id);
                        active.quantity_used = Set(quantity_used);
                    }

                    active.deployment_status = Set(state.deployment_status);
                    active.deployment_date = Set(state.deployment_date);
                    active.release_status = Set(state.release_status);
                    active.release_date = Set(state.release_date);

                    let updated = active.update(txn).await?;
                    Ok((updated, part, parts, state != before))
                })
            })
            .await?;

        info!(deployment_id = %id, "updated deployment");
        let status_event = status_changed.then(|| Event::DeploymentStatusChanged {
            deployment_id: id,
            deployment_status: updated.deployment_status,
            release_status: updated.release_status,
        });
        self.publish(
            Event::RecordUpdated {
                kind: RecordKind::Deployment,
                id,
            },
            status_event,
            &parts,
        )
        .await;

        Ok(DeploymentView::new(updated, Some(&part)))
    }

    /// Soft-deletes and returns the used quantity to stock.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let parts = transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let current = load_live(txn, id).await?;
                let changes = plan_stock_changes(
                    Some(StockContribution::consumed(
                        current.part_id,
                        current.quantity_used,
                    )),
                    None,
                );
                let parts = apply_stock_changes(txn, &changes).await?;

                let mut active: deployment::ActiveModel = current.into();
                active.deleted = Set(true);
                active.deleted_at = Set(Some(Utc::now()));
                active.update(txn).await?;
                Ok(parts)
            })
        })
        .await?;

        info!(deployment_id = %id, "deleted deployment");
        self.publish(
            Event::RecordDeleted {
                kind: RecordKind::Deployment,
                id,
            },
            None,
            &parts,
        )
        .await;
        Ok(())
    }

    async fn publish(&self, record_event: Event, status_event: Option<Event>, parts: &[part::Model]) {
        self.event_sender
            .publish_all(
                std::iter::once(record_event)
                    .chain(status_event)
                    .chain(stock_changed_events(parts)),
            )
            .await;
    }
}

async fn load_live<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<deployment::Model, ServiceError> {
    Deployment::find_by_id(id)
        .filter(deployment::Column::Deleted.eq(false))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| not_found("deployment", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn deployed_and_released() -> DeploymentState {
        DeploymentState {
            deployment_status: true,
            deployment_date: Some(day(1)),
            release_status: true,
            release_date: Some(day(5)),
        }
    }

    #[test]
    fn turning_deployment_off_clears_release() {
        let state = resolve_status(
            deployed_and_released(),
            StatusChange {
                deployment_status: Some(false),
                ..Default::default()
            },
            day(10),
        )
        .unwrap();
        assert_eq!(state, DeploymentState::default());
    }

    #[test]
    fn release_requires_deployment() {
        let result = resolve_status(
            DeploymentState::default(),
            StatusChange {
                release_status: Some(true),
                ..Default::default()
            },
            day(10),
        );
        assert_matches!(result, Err(ServiceError::BadRequest(_)));

        let result = resolve_status(
            deployed_and_released(),
            StatusChange {
                deployment_status: Some(false),
                release_status: Some(true),
                ..Default::default()
            },
            day(10),
        );
        assert_matches!(result, Err(ServiceError::BadRequest(_)));
    }

    #[test]
    fn flags_without_dates_stamp_today() {
        let deployed = resolve_status(
            DeploymentState::default(),
            StatusChange {
                deployment_status: Some(true),
                ..Default::default()
            },
            day(10),
        )
        .unwrap();
        assert_eq!(deployed.deployment_date, Some(day(10)));
        assert!(!deployed.release_status);
        assert_eq!(deployed.release_date, None);

        let released = resolve_status(
            deployed,
            StatusChange {
                release_status: Some(true),
                ..Default::default()
            },
            day(12),
        )
        .unwrap();
        assert_eq!(released.deployment_date, Some(day(10)));
        assert_eq!(released.release_date, Some(day(12)));
    }

    #[test]
    fn explicit_dates_win() {
        let state = resolve_status(
            DeploymentState::default(),
            StatusChange {
                deployment_status: Some(true),
                deployment_date: Some(day(2)),
                release_status: Some(true),
                release_date: Some(day(3)),
            },
            day(10),
        )
        .unwrap();
        assert_eq!(state.deployment_date, Some(day(2)));
        assert_eq!(state.release_date, Some(day(3)));
    }

    #[test]
    fn status_only_detection() {
        let status_only = UpdateDeployment {
            release_status: Some(true),
            ..Default::default()
        };
        assert!(status_only.is_status_only());

        let full = UpdateDeployment {
            quantity_used: Some(2),
            release_status: Some(true),
            ..Default::default()
        };
        assert!(!full.is_status_only());
    }
}
