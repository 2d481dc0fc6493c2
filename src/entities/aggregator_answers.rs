//! SeaORM Entity for answers reported by rate aggregators

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "aggregator_answers")]
pub struct Model {
    /// "<tx hash>-<synth>"
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub block: i64,
    pub timestamp: i64,
    pub currency_key: String,
    pub synth: String,
    #[sea_orm(column_type = "Text")]
    pub rate: String,
    #[sea_orm(column_type = "Text")]
    pub round_id: String,
    /// Address of the aggregator that emitted the answer
    pub aggregator: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
