use crate::{
    db::{not_found, DbPool},
    entities::{
        property::{self, Entity as Property},
        user::Entity as User,
    },
    errors::ServiceError,
    events::{Event, EventSender, RecordKind},
    services::{
        listing::{paginate, ListFields, ListQuery},
        users::UserView,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const FIELDS: ListFields<property::Column> = ListFields {
    sortable: &[
        ("title", property::Column::Title),
        ("propertyType", property::Column::PropertyType),
        ("location", property::Column::Location),
        ("price", property::Column::Price),
        ("createdAt", property::Column::CreatedAt),
    ],
    searchable: &[
        ("title", property::Column::Title),
        ("propertyType", property::Column::PropertyType),
        ("location", property::Column::Location),
    ],
    default_sort: property::Column::CreatedAt,
    tiebreak: property::Column::Id,
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProperty {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub property_type: String,
    #[validate(length(min = 1, max = 300))]
    pub location: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[serde(default)]
    pub photo: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProperty {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub property_type: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub location: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub property_type: String,
    pub location: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub photo: String,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<property::Model> for PropertyView {
    fn from(m: property::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            property_type: m.property_type,
            location: m.location,
            price: m.price.round_dp(2),
            photo: m.photo,
            creator_id: m.creator_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetail {
    #[serde(flatten)]
    pub property: PropertyView,
    pub creator: Option<UserView>,
}

#[derive(Clone)]
pub struct PropertyService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PropertyService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn load(&self, id: Uuid) -> Result<property::Model, ServiceError> {
        Property::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| not_found("property", id))
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        creator_id: Uuid,
        input: CreateProperty,
    ) -> Result<PropertyView, ServiceError> {
        let db = self.db_pool.as_ref();
        User::find_by_id(creator_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| not_found("user", creator_id))?;
        check_price(input.price)?;

        let created = property::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            property_type: Set(input.property_type.trim().to_string()),
            location: Set(input.location.trim().to_string()),
            price: Set(input.price),
            photo: Set(input.photo),
            creator_id: Set(creator_id),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(property_id = %created.id, "created property");
        self.event_sender
            .publish_all([Event::RecordCreated {
                kind: RecordKind::Property,
                id: created.id,
            }])
            .await;

        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<PropertyView>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let (page, total) = paginate(db, Property::find(), query, &FIELDS).await?;
        let rows = page.all(db).await.map_err(ServiceError::db_error)?;
        Ok((rows.into_iter().map(PropertyView::from).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<PropertyDetail, ServiceError> {
        let property = self.load(id).await?;
        let creator = property
            .find_related(User)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(PropertyDetail {
            property: property.into(),
            creator: creator.map(UserView::from),
        })
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateProperty,
    ) -> Result<PropertyView, ServiceError> {
        let current = self.load(id).await?;
        let mut active: property::ActiveModel = current.into();

        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(property_type) = input.property_type {
            active.property_type = Set(property_type.trim().to_string());
        }
        if let Some(location) = input.location {
            active.location = Set(location.trim().to_string());
        }
        if let Some(price) = input.price {
            check_price(price)?;
            active.price = Set(price);
        }
        if let Some(photo) = input.photo {
            active.photo = Set(photo);
        }

        let updated = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        self.event_sender
            .publish_all([Event::RecordUpdated {
                kind: RecordKind::Property,
                id,
            }])
            .await;

        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let current = self.load(id).await?;
        current
            .delete(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(property_id = %id, "deleted property");
        self.event_sender
            .publish_all([Event::RecordDeleted {
                kind: RecordKind::Property,
                id,
            }])
            .await;
        Ok(())
    }
}

fn check_price(price: Decimal) -> Result<(), ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "price must not be negative".to_string(),
        ));
    }
    Ok(())
}
