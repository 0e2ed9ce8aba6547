use crate::{
    db::{constraint_conflict, not_found, transaction, DbPool},
    entities::{
        deployment::{self, Entity as Deployment},
        part::{self, Entity as Part},
        procurement::{self, Entity as Procurement},
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    services::{
        deployments::DeploymentView,
        listing::{paginate, ListFields, ListQuery},
        procurements::ProcurementView,
        stock::find_part_by_name_brand,
    },
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const FIELDS: ListFields<part::Column> = ListFields {
    sortable: &[
        ("partName", part::Column::PartName),
        ("brandName", part::Column::BrandName),
        ("qtyLeft", part::Column::QtyLeft),
        ("createdAt", part::Column::CreatedAt),
        ("updatedAt", part::Column::UpdatedAt),
    ],
    searchable: &[
        ("partName", part::Column::PartName),
        ("brandName", part::Column::BrandName),
    ],
    default_sort: part::Column::CreatedAt,
    tiebreak: part::Column::Id,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePart {
    #[validate(length(min = 1, max = 200))]
    pub part_name: String,
    #[validate(length(min = 1, max = 200))]
    pub brand_name: String,
}

/// Rename only; stock is owned by procurements and deployments.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePart {
    #[validate(length(min = 1, max = 200))]
    pub part_name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub brand_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartView {
    pub id: Uuid,
    pub part_name: String,
    pub brand_name: String,
    pub qty_left: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<part::Model> for PartView {
    fn from(m: part::Model) -> Self {
        Self {
            id: m.id,
            part_name: m.part_name,
            brand_name: m.brand_name,
            qty_left: m.qty_left,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartDetail {
    #[serde(flatten)]
    pub part: PartView,
    pub procurements: Vec<ProcurementView>,
    pub deployments: Vec<DeploymentView>,
}

#[derive(Clone)]
pub struct PartService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PartService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn load(&self, id: Uuid) -> Result<part::Model, ServiceError> {
        Part::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| not_found("part", id))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<PartView>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let (page, total) = paginate(db, Part::find(), query, &FIELDS).await?;
        let rows = page.all(db).await.map_err(ServiceError::db_error)?;
        Ok((rows.into_iter().map(PartView::from).collect(), total))
    }

    /// The part with its live procurements and deployments, newest first
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<PartDetail, ServiceError> {
        let db = self.db_pool.as_ref();
        let part = self.load(id).await?;

        let procurements = part
            .find_related(Procurement)
            .filter(procurement::Column::Deleted.eq(false))
            .order_by_desc(procurement::Column::Seq)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let deployments = part
            .find_related(Deployment)
            .filter(deployment::Column::Deleted.eq(false))
            .order_by_desc(deployment::Column::Seq)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(PartDetail {
            procurements: procurements
                .into_iter()
                .map(|p| ProcurementView::new(p, Some(&part)))
                .collect(),
            deployments: deployments
                .into_iter()
                .map(|d| DeploymentView::new(d, Some(&part)))
                .collect(),
            part: part.into(),
        })
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreatePart) -> Result<PartView, ServiceError> {
        let db = self.db_pool.as_ref();
        if find_part_by_name_brand(db, &input.part_name, &input.brand_name)
            .await?
            .is_some()
        {
            return Err(duplicate(&input.part_name, &input.brand_name));
        }

        let now = Utc::now();
        let created = part::ActiveModel {
            id: Set(Uuid::new_v4()),
            part_name: Set(input.part_name.trim().to_string()),
            brand_name: Set(input.brand_name.trim().to_string()),
            qty_left: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| constraint_conflict(e, || duplicate_message(&input.part_name, &input.brand_name)))?;

        info!(part_id = %created.id, part = %created.key(), "created part");
        self.event_sender
            .publish_all([Event::RecordCreated {
                kind: RecordKind::Part,
                id: created.id,
            }])
            .await;

        Ok(created.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdatePart) -> Result<PartView, ServiceError> {
        let db = self.db_pool.as_ref();
        let current = self.load(id).await?;

        let part_name = input
            .part_name
            .map(|n| n.trim().to_string())
            .unwrap_or_else(|| current.part_name.clone());
        let brand_name = input
            .brand_name
            .map(|b| b.trim().to_string())
            .unwrap_or_else(|| current.brand_name.clone());

        if let Some(other) = find_part_by_name_brand(db, &part_name, &brand_name).await? {
            if other.id != id {
                return Err(duplicate(&part_name, &brand_name));
            }
        }

        let mut active: part::ActiveModel = current.into();
        active.part_name = Set(part_name.clone());
        active.brand_name = Set(brand_name.clone());
        let updated = active
            .update(db)
            .await
            .map_err(|e| constraint_conflict(e, || duplicate_message(&part_name, &brand_name)))?;

        self.event_sender
            .publish_all([Event::RecordUpdated {
                kind: RecordKind::Part,
                id,
            }])
            .await;

        Ok(updated.into())
    }

    /// Deletes a part nothing live points at. The reference check and the
    /// purge of soft-deleted history run in the same transaction, after the
    /// part row is locked against concurrent stock writes.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let locked = Part::update_many()
                    .col_expr(part::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(part::Column::Id.eq(id))
                    .exec(txn)
                    .await?;
                if locked.rows_affected == 0 {
                    return Err(not_found("part", id));
                }
                let current = Part::find_by_id(id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| not_found("part", id))?;

                let live_procurements = Procurement::find()
                    .filter(procurement::Column::PartId.eq(id))
                    .filter(procurement::Column::Deleted.eq(false))
                    .count(txn)
                    .await?;
                let live_deployments = Deployment::find()
                    .filter(deployment::Column::PartId.eq(id))
                    .filter(deployment::Column::Deleted.eq(false))
                    .count(txn)
                    .await?;
                if live_procurements + live_deployments > 0 {
                    return Err(still_referenced(
                        &current,
                        live_procurements,
                        live_deployments,
                    ));
                }

                Procurement::delete_many()
                    .filter(procurement::Column::PartId.eq(id))
                    .filter(procurement::Column::Deleted.eq(true))
                    .exec(txn)
                    .await?;
                Deployment::delete_many()
                    .filter(deployment::Column::PartId.eq(id))
                    .filter(deployment::Column::Deleted.eq(true))
                    .exec(txn)
                    .await?;
                // A live row that slipped in still holds the foreign key.
                Part::delete_by_id(id).exec(txn).await.map_err(|e| {
                    constraint_conflict(e, || format!("{} is still referenced", current.key()))
                })?;
                Ok(())
            })
        })
        .await?;

        info!(part_id = %id, "deleted part");
        self.event_sender
            .publish_all([Event::RecordDeleted {
                kind: RecordKind::Part,
                id,
            }])
            .await;
        Ok(())
    }
}

fn duplicate(part_name: &str, brand_name: &str) -> ServiceError {
    ServiceError::Conflict(duplicate_message(part_name, brand_name))
}

fn duplicate_message(part_name: &str, brand_name: &str) -> String {
    format!(
        "part '{}' by '{}' already exists",
        part_name.trim(),
        brand_name.trim()
    )
}

fn still_referenced(part: &part::Model, procurements: u64, deployments: u64) -> ServiceError {
    ServiceError::Conflict(format!(
        "{} is still referenced by {} procurement(s) and {} deployment(s)",
        part.key(),
        procurements,
        deployments
    ))
}
