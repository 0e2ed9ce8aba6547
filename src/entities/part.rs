use async_trait::async_trait;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

/// A stocked part. `(part_name, brand_name)` is unique and `qty_left` is the
/// on-hand count maintained by procurement and deployment writes.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub part_name: String,
    pub brand_name: String,
    pub qty_left: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// `"partName|brandName"`, the key deployments use to pick a part
    pub fn key(&self) -> String {
        format!("{}|{}", self.part_name, self.brand_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::procurement::Entity")]
    Procurement,
    #[sea_orm(has_many = "super::deployment::Entity")]
    Deployment,
}

impl Related<super::procurement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Procurement.def()
    }
}

impl Related<super::deployment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deployment.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            self.updated_at = Set(Utc::now());
        }
        Ok(self)
    }
}
