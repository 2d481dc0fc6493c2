//! SeaORM Entity for per-synth rate updates

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "rate_updates")]
pub struct Model {
    /// "<tx hash>-<synth>"
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub block: i64,
    pub timestamp: i64,
    /// bytes32 currency key, 0x-prefixed hex
    pub currency_key: String,
    pub synth: String,
    /// uint256 rate (18 decimals) as a decimal string
    #[sea_orm(column_type = "Text")]
    pub rate: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
