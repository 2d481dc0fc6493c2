//! SeaORM Entity for daily SNX price buckets

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_snx_prices")]
pub struct Model {
    /// floor(timestamp / 86400)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub count: i64,
    #[sea_orm(column_type = "Text")]
    pub average_price: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
