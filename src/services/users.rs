use crate::{
    config::AppConfig,
    db::{not_found, DbPool},
    entities::{
        property::{self, Entity as Property},
        user::{self, Entity as User},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        listing::{paginate, ListFields, ListQuery},
        properties::PropertyView,
    },
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const FIELDS: ListFields<user::Column> = ListFields {
    sortable: &[
        ("name", user::Column::Name),
        ("email", user::Column::Email),
        ("isAllowed", user::Column::IsAllowed),
        ("createdAt", user::Column::CreatedAt),
    ],
    searchable: &[("name", user::Column::Name), ("email", user::Column::Email)],
    default_sort: user::Column::CreatedAt,
    tiebreak: user::Column::Id,
};

/// Sign-in payload. The account is created on first sign-in.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginOrRegister {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetAllowed {
    pub is_allowed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub is_allowed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserView {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            avatar: m.avatar,
            is_allowed: m.is_allowed,
            created_at: m.created_at,
        }
    }
}

/// A user together with the properties they created
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: UserView,
    pub all_properties: Vec<PropertyView>,
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl UserService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            config,
        }
    }

    /// Returns the account for this email, creating it when missing. The
    /// boolean is true when the account was just created.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login_or_register(
        &self,
        input: LoginOrRegister,
    ) -> Result<(user::Model, bool), ServiceError> {
        let db = self.db_pool.as_ref();
        let email = input.email.trim().to_lowercase();

        if let Some(existing) = User::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
        {
            return Ok((existing, false));
        }

        let is_allowed = self.config.is_email_allowed(&email);
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            avatar: Set(input.avatar),
            is_allowed: Set(is_allowed),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(user_id = %created.id, is_allowed, "registered user");
        self.event_sender
            .publish_all([Event::UserRegistered {
                user_id: created.id,
                email: created.email.clone(),
                is_allowed,
            }])
            .await;

        Ok((created, true))
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<user::Model>, ServiceError> {
        User::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<UserView>, u64), ServiceError> {
        let db = self.db_pool.as_ref();
        let (page, total) = paginate(db, User::find(), query, &FIELDS).await?;
        let users = page.all(db).await.map_err(ServiceError::db_error)?;
        Ok((users.into_iter().map(UserView::from).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<UserDetail, ServiceError> {
        let db = self.db_pool.as_ref();
        let user = self.find(id).await?.ok_or_else(|| not_found("user", id))?;
        let properties = Property::find()
            .filter(property::Column::CreatorId.eq(id))
            .order_by_desc(property::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(UserDetail {
            user: user.into(),
            all_properties: properties.into_iter().map(PropertyView::from).collect(),
        })
    }

    #[instrument(skip(self))]
    pub async fn set_allowed(&self, id: Uuid, is_allowed: bool) -> Result<UserView, ServiceError> {
        let db = self.db_pool.as_ref();
        let user = self.find(id).await?.ok_or_else(|| not_found("user", id))?;

        let mut active: user::ActiveModel = user.into();
        active.is_allowed = Set(is_allowed);
        let updated = active.update(db).await.map_err(ServiceError::db_error)?;

        info!(user_id = %id, is_allowed, "changed user access");
        self.event_sender
            .publish_all([Event::UserAccessChanged {
                user_id: id,
                is_allowed,
            }])
            .await;

        Ok(updated.into())
    }
}
