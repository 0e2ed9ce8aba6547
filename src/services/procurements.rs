//! Parts purchases. Each live procurement adds `quantity_bought` to its part.

use crate::{
    db::{next_seq, not_found, transaction, DbPool},
    entities::{
        part::{self, Entity as Part},
        procurement::{self, Entity as Procurement},
        user::Entity as User,
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    services::{
        listing::{paginate, ListFields, ListQuery},
        stock::{
            apply_stock_changes, find_or_create_part, plan_stock_changes, stock_changed_events,
            StockContribution,
        },
        vat::{SupplierFields, VatPolicy, VatTreatment},
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const FIELDS: ListFields<procurement::Column> = ListFields {
    sortable: &[
        ("seq", procurement::Column::Seq),
        ("date", procurement::Column::Date),
        ("supplierName", procurement::Column::SupplierName),
        ("reference", procurement::Column::Reference),
        ("quantityBought", procurement::Column::QuantityBought),
        ("amount", procurement::Column::Amount),
        ("createdAt", procurement::Column::CreatedAt),
    ],
    searchable: &[
        ("supplierName", procurement::Column::SupplierName),
        ("reference", procurement::Column::Reference),
        ("tin", procurement::Column::Tin),
        ("address", procurement::Column::Address),
        ("description", procurement::Column::Description),
    ],
    default_sort: procurement::Column::Seq,
    tiebreak: procurement::Column::Id,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProcurement {
    pub date: NaiveDate,
    #[serde(default)]
    pub supplier_name: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub tin: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 200))]
    pub part_name: String,
    #[validate(length(min = 1, max = 200))]
    pub brand_name: String,
    #[validate(range(min = 1))]
    pub quantity_bought: i32,
    #[schema(value_type = f64)]
    pub amount: Decimal,
    #[serde(default)]
    pub is_non_vat: bool,
    #[serde(default)]
    pub no_valid_receipt: bool,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProcurement {
    pub date: Option<NaiveDate>,
    pub supplier_name: Option<String>,
    pub reference: Option<String>,
    pub tin: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub part_name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub brand_name: Option<String>,
    #[validate(range(min = 1))]
    pub quantity_bought: Option<i32>,
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    pub is_non_vat: Option<bool>,
    pub no_valid_receipt: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementView {
    pub id: Uuid,
    pub seq: i32,
    pub date: NaiveDate,
    pub supplier_name: String,
    pub reference: String,
    pub tin: String,
    pub address: String,
    pub description: String,
    pub part_id: Uuid,
    pub part_name: Option<String>,
    pub brand_name: Option<String>,
    pub quantity_bought: i32,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[serde(rename = "netOfVAT")]
    #[schema(value_type = String)]
    pub net_of_vat: Decimal,
    #[serde(rename = "inputVAT")]
    #[schema(value_type = String)]
    pub input_vat: Decimal,
    pub is_non_vat: bool,
    pub no_valid_receipt: bool,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcurementView {
    pub fn new(m: procurement::Model, part: Option<&part::Model>) -> Self {
        Self {
            id: m.id,
            seq: m.seq,
            date: m.date,
            supplier_name: m.supplier_name,
            reference: m.reference,
            tin: m.tin,
            address: m.address,
            description: m.description,
            part_id: m.part_id,
            part_name: part.map(|p| p.part_name.clone()),
            brand_name: part.map(|p| p.brand_name.clone()),
            quantity_bought: m.quantity_bought,
            amount: m.amount.round_dp(2),
            net_of_vat: m.net_of_vat.round_dp(2),
            input_vat: m.input_vat.round_dp(2),
            is_non_vat: m.is_non_vat,
            no_valid_receipt: m.no_valid_receipt,
            creator_id: m.creator_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct ProcurementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    vat: VatPolicy,
}

impl ProcurementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, vat: VatPolicy) -> Self {
        Self {
            db_pool,
            event_sender,
            vat,
        }
    }

    /// Records a purchase, creating the part on first purchase and adding the
    /// quantity to its stock.
    #[instrument(skip(self, input), fields(part = %input.part_name, qty = input.quantity_bought))]
    pub async fn create(
        &self,
        creator_id: Uuid,
        input: CreateProcurement,
    ) -> Result<ProcurementView, ServiceError> {
        let supplier = SupplierFields {
            supplier_name: input.supplier_name,
            reference: input.reference,
            tin: input.tin,
            address: input.address,
        }
        .normalize(input.no_valid_receipt)?;
        let split = self.vat.split(
            input.amount,
            VatTreatment::from_flags(input.is_non_vat, input.no_valid_receipt),
        )?;

        let (created, parts) = transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                User::find_by_id(creator_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| not_found("user", creator_id))?;

                let (part, _) = find_or_create_part(txn, &input.part_name, &input.brand_name).await?;
                let seq = next_seq::<Procurement, _>(txn, procurement::Column::Seq).await?;
                let now = Utc::now();

                let created = procurement::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    seq: Set(seq),
                    date: Set(input.date),
                    supplier_name: Set(supplier.supplier_name),
                    reference: Set(supplier.reference),
                    tin: Set(supplier.tin),
                    address: Set(supplier.address),
                    description: Set(input.description),
                    part_id: Set(part.id),
                    quantity_bought: Set(input.quantity_bought),
                    amount: Set(input.amount),
                    net_of_vat: Set(split.net_of_vat),
                    input_vat: Set(split.vat),
                    is_non_vat: Set(input.is_non_vat),
                    no_valid_receipt: Set(input.no_valid_receipt),
                    creator_id: Set(creator_id),
                    deleted: Set(false),
                    deleted_at: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await?;

                let changes = plan_stock_changes(
                    None,
                    Some(StockContribution::procured(part.id, created.quantity_bought)),
                );
                let parts = apply_stock_changes(txn, &changes).await?;
                Ok((created, parts))
            })
        })
        .await?;

        info!(procurement_id = %created.id, seq = created.seq, "recorded procurement");
        self.publish(
            Event::RecordCreated {
                kind: RecordKind::Procurement,
                id: created.id,
            },
            &parts,
        )
        .await;

        let part = parts.iter().find(|p| p.id == created.part_id).cloned();
        Ok(ProcurementView::new(created, part.as_ref()))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: &ListQuery,
    ) -> Result<(Vec<ProcurementView>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let live = Procurement::find().filter(procurement::Column::Deleted.eq(false));
        let (page, total) = paginate(db, live, query, &FIELDS).await?;
        let rows = page
            .find_also_related(Part)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((
            rows.into_iter()
                .map(|(p, part)| ProcurementView::new(p, part.as_ref()))
                .collect(),
            total,
        ))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ProcurementView, ServiceError> {
        let db = self.db_pool.as_ref();
        let (procurement, part) = Procurement::find_by_id(id)
            .filter(procurement::Column::Deleted.eq(false))
            .find_also_related(Part)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| not_found("procurement", id))?;
        Ok(ProcurementView::new(procurement, part.as_ref()))
    }

    /// Applies a partial update. A changed part or quantity moves stock from
    /// the old part to the new one; the old part may not go negative.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateProcurement,
    ) -> Result<ProcurementView, ServiceError> {
        let vat = self.vat;

        let (updated, part, changed_parts) = transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let current = load_live(txn, id).await?;
                let old_part = Part::find_by_id(current.part_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| not_found("part", current.part_id))?;

                let new_part = if input.part_name.is_some() || input.brand_name.is_some() {
                    let name = input
                        .part_name
                        .clone()
                        .unwrap_or_else(|| old_part.part_name.clone());
                    let brand = input
                        .brand_name
                        .clone()
                        .unwrap_or_else(|| old_part.brand_name.clone());
                    find_or_create_part(txn, &name, &brand).await?.0
                } else {
                    old_part.clone()
                };
                let quantity_bought = input.quantity_bought.unwrap_or(current.quantity_bought);

                let is_non_vat = input.is_non_vat.unwrap_or(current.is_non_vat);
                let no_valid_receipt = input.no_valid_receipt.unwrap_or(current.no_valid_receipt);
                let amount = input.amount.unwrap_or(current.amount);
                let supplier = SupplierFields {
                    supplier_name: input
                        .supplier_name
                        .unwrap_or_else(|| current.supplier_name.clone()),
                    reference: input.reference.unwrap_or_else(|| current.reference.clone()),
                    tin: input.tin.unwrap_or_else(|| current.tin.clone()),
                    address: input.address.unwrap_or_else(|| current.address.clone()),
                }
                .normalize(no_valid_receipt)?;
                let split = vat.split(amount, VatTreatment::from_flags(is_non_vat, no_valid_receipt))?;

                let changes = plan_stock_changes(
                    Some(StockContribution::procured(old_part.id, current.quantity_bought)),
                    Some(StockContribution::procured(new_part.id, quantity_bought)),
                );
                let parts = apply_stock_changes(txn, &changes).await?;

                let mut active: procurement::ActiveModel = current.clone().into();
                if let Some(date) = input.date {
                    active.date = Set(date);
                }
                if let Some(description) = input.description {
                    active.description = Set(description);
                }
                active.supplier_name = Set(supplier.supplier_name);
                active.reference = Set(supplier.reference);
                active.tin = Set(supplier.tin);
                active.address = Set(supplier.address);
                active.part_id = Set(new_part.id);
                active.quantity_bought = Set(quantity_bought);
                active.amount = Set(amount);
                active.net_of_vat = Set(split.net_of_vat);
                active.input_vat = Set(split.vat);
                active.is_non_vat = Set(is_non_vat);
                active.no_valid_receipt = Set(no_valid_receipt);

                let updated = active.update(txn).await?;
                let part = parts
                    .iter()
                    .find(|p| p.id == new_part.id)
                    .cloned()
                    .unwrap_or(new_part);
                Ok((updated, part, parts))
            })
        })
        .await?;

        info!(procurement_id = %id, "updated procurement");
        self.publish(
            Event::RecordUpdated {
                kind: RecordKind::Procurement,
                id,
            },
            &changed_parts,
        )
        .await;

        Ok(ProcurementView::new(updated, Some(&part)))
    }

    /// Soft-deletes and takes the purchased quantity back out of stock.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let parts = transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                let current = load_live(txn, id).await?;
                let changes = plan_stock_changes(
                    Some(StockContribution::procured(
                        current.part_id,
                        current.quantity_bought,
                    )),
                    None,
                );
                let parts = apply_stock_changes(txn, &changes).await?;

                let mut active: procurement::ActiveModel = current.into();
                active.deleted = Set(true);
                active.deleted_at = Set(Some(Utc::now()));
                active.update(txn).await?;
                Ok(parts)
            })
        })
        .await?;

        info!(procurement_id = %id, "deleted procurement");
        self.publish(
            Event::RecordDeleted {
                kind: RecordKind::Procurement,
                id,
            },
            &parts,
        )
        .await;
        Ok(())
    }

    async fn publish(&self, record_event: Event, parts: &[part::Model]) {
        self.event_sender
            .publish_all(std::iter::once(record_event).chain(stock_changed_events(parts)))
            .await;
    }
}

async fn load_live<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<procurement::Model, ServiceError> {
    Procurement::find_by_id(id)
        .filter(procurement::Column::Deleted.eq(false))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| not_found("procurement", id))
}
