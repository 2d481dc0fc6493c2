//! SeaORM Entity for raw RatesUpdated batches

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "rates_updated")]
pub struct Model {
    /// "<tx hash>-<log index>"
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// bytes32 currency keys, 0x-prefixed hex
    #[sea_orm(column_type = "JsonBinary")]
    pub currency_keys: Json,
    /// uint256 rates as decimal strings, parallel to currency_keys
    #[sea_orm(column_type = "JsonBinary")]
    pub new_rates: Json,
    pub timestamp: i64,
    pub block: i64,
    pub from_address: String,
    #[sea_orm(column_type = "Text")]
    pub gas_price: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
