use crate::{
    db::{next_seq, not_found, transaction, DbPool},
    entities::{
        sale::{self, Entity as Sale},
        user::Entity as User,
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    services::{
        listing::{paginate, ListFields, ListQuery},
        vat::{VatPolicy, VatTreatment},
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

const FIELDS: ListFields<sale::Column> = ListFields {
    sortable: &[
        ("seq", sale::Column::Seq),
        ("date", sale::Column::Date),
        ("clientName", sale::Column::ClientName),
        ("amount", sale::Column::Amount),
        ("createdAt", sale::Column::CreatedAt),
    ],
    searchable: &[
        ("clientName", sale::Column::ClientName),
        ("tin", sale::Column::Tin),
        ("address", sale::Column::Address),
        ("description", sale::Column::Description),
    ],
    default_sort: sale::Column::Seq,
    tiebreak: sale::Column::Id,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSale {
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 200))]
    pub client_name: String,
    #[serde(default)]
    pub tin: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
    #[schema(value_type = f64)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSale {
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 200))]
    pub client_name: Option<String>,
    pub tin: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleView {
    pub id: Uuid,
    pub seq: i32,
    pub date: NaiveDate,
    pub client_name: String,
    pub tin: String,
    pub address: String,
    pub description: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[serde(rename = "netOfVAT")]
    #[schema(value_type = String)]
    pub net_of_vat: Decimal,
    #[serde(rename = "outputVAT")]
    #[schema(value_type = String)]
    pub output_vat: Decimal,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<sale::Model> for SaleView {
    fn from(m: sale::Model) -> Self {
        Self {
            id: m.id,
            seq: m.seq,
            date: m.date,
            client_name: m.client_name,
            tin: m.tin,
            address: m.address,
            description: m.description,
            amount: m.amount.round_dp(2),
            net_of_vat: m.net_of_vat.round_dp(2),
            output_vat: m.output_vat.round_dp(2),
            creator_id: m.creator_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct SaleService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    vat: VatPolicy,
}

impl SaleService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, vat: VatPolicy) -> Self {
        Self {
            db_pool,
            event_sender,
            vat,
        }
    }

    async fn load_live(&self, id: Uuid) -> Result<sale::Model, ServiceError> {
        Sale::find_by_id(id)
            .filter(sale::Column::Deleted.eq(false))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| not_found("sale", id))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, creator_id: Uuid, input: CreateSale) -> Result<SaleView, ServiceError> {
        // Sales carry no exemption flags.
        let split = self.vat.split(input.amount, VatTreatment::Standard)?;

        let created = transaction(self.db_pool.as_ref(), move |txn| {
            Box::pin(async move {
                User::find_by_id(creator_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| not_found("user", creator_id))?;
                let seq = next_seq::<Sale, _>(txn, sale::Column::Seq).await?;
                let now = Utc::now();

                let created = sale::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    seq: Set(seq),
                    date: Set(input.date),
                    client_name: Set(input.client_name.trim().to_string()),
                    tin: Set(input.tin.trim().to_string()),
                    address: Set(input.address.trim().to_string()),
                    description: Set(input.description),
                    amount: Set(input.amount),
                    net_of_vat: Set(split.net_of_vat),
                    output_vat: Set(split.vat),
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

        info!(sale_id = %created.id, seq = created.seq, "recorded sale");
        self.event_sender
            .publish_all([Event::RecordCreated {
                kind: RecordKind::Sale,
                id: created.id,
            }])
            .await;

        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<SaleView>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let live = Sale::find().filter(sale::Column::Deleted.eq(false));
        let (page, total) = paginate(db, live, query, &FIELDS).await?;
        let rows = page.all(db).await.map_err(ServiceError::db_error)?;
        Ok((rows.into_iter().map(SaleView::from).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<SaleView, ServiceError> {
        Ok(self.load_live(id).await?.into())
    }

    /// Updates the given fields and recomputes VAT from the resulting amount.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateSale) -> Result<SaleView, ServiceError> {
        let current = self.load_live(id).await?;
        let amount = input.amount.unwrap_or(current.amount);
        let split = self.vat.split(amount, VatTreatment::Standard)?;

        let mut active: sale::ActiveModel = current.into();
        if let Some(date) = input.date {
            active.date = Set(date);
        }
        if let Some(client_name) = input.client_name {
            active.client_name = Set(client_name.trim().to_string());
        }
        if let Some(tin) = input.tin {
            active.tin = Set(tin.trim().to_string());
        }
        if let Some(address) = input.address {
            active.address = Set(address.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        active.amount = Set(amount);
        active.net_of_vat = Set(split.net_of_vat);
        active.output_vat = Set(split.vat);

        let updated = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .publish_all([Event::RecordUpdated {
                kind: RecordKind::Sale,
                id,
            }])
            .await;
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let current = self.load_live(id).await?;
        let mut active: sale::ActiveModel = current.into();
        active.deleted = Set(true);
        active.deleted_at = Set(Some(Utc::now()));
        active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(sale_id = %id, "deleted sale");
        self.event_sender
            .publish_all([Event::RecordDeleted {
                kind: RecordKind::Sale,
                id,
            }])
            .await;
        Ok(())
    }
}
