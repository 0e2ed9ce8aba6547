//! Public lookup of service jobs by client name or plate number.

use crate::{
    db::DbPool,
    entities::deployment::{self, Entity as Deployment},
    errors::ServiceError,
    services::listing::escape_like,
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

pub const MAX_PORTAL_RESULTS: u64 = 50;

/// What a client may see about a job on their vehicle
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortalDeployment {
    pub seq: i32,
    pub date: NaiveDate,
    pub client_name: String,
    pub vehicle_name: String,
    pub car_registration: String,
    pub deployment_status: bool,
    pub deployment_date: Option<NaiveDate>,
    pub release_status: bool,
    pub release_date: Option<NaiveDate>,
}

impl From<deployment::Model> for PortalDeployment {
    fn from(m: deployment::Model) -> Self {
        Self {
            seq: m.seq,
            date: m.date,
            client_name: m.client_name,
            vehicle_name: m.vehicle_name,
            car_registration: m.car_registration,
            deployment_status: m.deployment_status,
            deployment_date: m.deployment_date,
            release_status: m.release_status,
            release_date: m.release_date,
        }
    }
}

pub struct ClientPortalService {
    db_pool: Arc<DbPool>,
}

impl ClientPortalService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<PortalDeployment>, ServiceError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(ServiceError::BadRequest("query must not be blank".to_string()));
        }
        let pattern = format!("%{}%", escape_like(&needle));

        let matches = |column: deployment::Column| {
            Expr::expr(Func::lower(Expr::col((Deployment, column))))
                .like(LikeExpr::new(pattern.clone()).escape('\\'))
        };

        let rows = Deployment::find()
            .filter(deployment::Column::Deleted.eq(false))
            .filter(
                Condition::any()
                    .add(matches(deployment::Column::ClientName))
                    .add(matches(deployment::Column::CarRegistration)),
            )
            .order_by_desc(deployment::Column::Date)
            .order_by_desc(deployment::Column::Seq)
            .limit(MAX_PORTAL_RESULTS)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows.into_iter().map(PortalDeployment::from).collect())
    }
}
