use crate::{
    db::{next_seq, not_found, transaction, DbPool},
    entities::{
        expense::{self, Entity as Expense},
        user::Entity as User,
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    services::{
        listing::{paginate, ListFields, ListQuery},
        vat::{SupplierFields, VatPolicy, VatTreatment},
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const FIELDS: ListFields<expense::Column> = ListFields {
    sortable: &[
        ("seq", expense::Column::Seq),
        ("date", expense::Column::Date),
        ("supplierName", expense::Column::SupplierName),
        ("reference", expense::Column::Reference),
        ("amount", expense::Column::Amount),
        ("createdAt", expense::Column::CreatedAt),
    ],
    searchable: &[
        ("supplierName", expense::Column::SupplierName),
        ("reference", expense::Column::Reference),
        ("tin", expense::Column::Tin),
        ("address", expense::Column::Address),
        ("description", expense::Column::Description),
    ],
    default_sort: expense::Column::Seq,
    tiebreak: expense::Column::Id,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpense {
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
    #[schema(value_type = f64)]
    pub amount: Decimal,
    #[serde(default)]
    pub is_non_vat: bool,
    #[serde(default)]
    pub no_valid_receipt: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpense {
    pub date: Option<NaiveDate>,
    pub supplier_name: Option<String>,
    pub reference: Option<String>,
    pub tin: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    pub is_non_vat: Option<bool>,
    pub no_valid_receipt: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseView {
    pub id: Uuid,
    pub seq: i32,
    pub date: NaiveDate,
    pub supplier_name: String,
    pub reference: String,
    pub tin: String,
    pub address: String,
    pub description: String,
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

impl From<expense::Model> for ExpenseView {
    fn from(m: expense::Model) -> Self {
        Self {
            id: m.id,
            seq: m.seq,
            date: m.date,
            supplier_name: m.supplier_name,
            reference: m.reference,
            tin: m.tin,
            address: m.address,
            description: m.description,
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
pub struct ExpenseService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    vat: VatPolicy,
}

impl ExpenseService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, vat: VatPolicy) -> Self {
        Self {
            db_pool,
            event_sender,
            vat,
        }
    }

    async fn load_live(&self, id: Uuid) -> Result<expense::Model, ServiceError> {
        Expense::find_by_id(id)
            .filter(expense::Column::Deleted.eq(false))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| not_found("expense", id))
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        creator_id: Uuid,
        input: CreateExpense,
    ) -> Result<ExpenseView, ServiceError> {
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

        let created = transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                User::find_by_id(creator_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| not_found("user", creator_id))?;
                let seq = next_seq::<Expense, _>(txn, expense::Column::Seq).await?;
                let now = Utc::now();

                let created = expense::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    seq: Set(seq),
                    date: Set(input.date),
                    supplier_name: Set(supplier.supplier_name),
                    reference: Set(supplier.reference),
                    tin: Set(supplier.tin),
                    address: Set(supplier.address),
                    description: Set(input.description),
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
                Ok(created)
            })
        })
        .await?;

        info!(expense_id = %created.id, seq = created.seq, "recorded expense");
        self.event_sender
            .publish_all([Event::RecordCreated {
                kind: RecordKind::Expense,
                id: created.id,
            }])
            .await;

        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<ExpenseView>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let live = Expense::find().filter(expense::Column::Deleted.eq(false));
        let (page, total) = paginate(db, live, query, &FIELDS).await?;
        let rows = page.all(db).await.map_err(ServiceError::db_error)?;
        Ok((rows.into_iter().map(ExpenseView::from).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ExpenseView, ServiceError> {
        Ok(self.load_live(id).await?.into())
    }

    /// Merges the given fields into the stored expense, then reapplies the
    /// receipt and VAT rules to the merged record.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateExpense) -> Result<ExpenseView, ServiceError> {
        let current = self.load_live(id).await?;

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
        let split = self
            .vat
            .split(amount, VatTreatment::from_flags(is_non_vat, no_valid_receipt))?;

        let mut active: expense::ActiveModel = current.into();
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
        active.amount = Set(amount);
        active.net_of_vat = Set(split.net_of_vat);
        active.input_vat = Set(split.vat);
        active.is_non_vat = Set(is_non_vat);
        active.no_valid_receipt = Set(no_valid_receipt);

        let updated = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .publish_all([Event::RecordUpdated {
                kind: RecordKind::Expense,
                id,
            }])
            .await;
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let current = self.load_live(id).await?;
        let mut active: expense::ActiveModel = current.into();
        active.deleted = Set(true);
        active.deleted_at = Set(Some(Utc::now()));
        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(expense_id = %id, "deleted expense");
        self.event_sender
            .publish_all([Event::RecordDeleted {
                kind: RecordKind::Expense,
                id,
            }])
            .await;
        Ok(())
    }
}
