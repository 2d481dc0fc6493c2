use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestRateResponse {
    pub synth: String,
    /// Raw 18-decimal rate
    pub rate: String,
    /// Rate as a decimal number of USD, absent when it has too many digits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_decimal: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdValueResponse {
    pub synth: String,
    pub amount: String,
    pub rate: String,
    pub usd_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsdValueQuery {
    /// Asset amount in 18-decimal base units
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnxPriceResponse {
    pub id: String,
    pub granularity: String,
    pub count: u64,
    pub average_price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateUpdateResponse {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub currency_key: String,
    pub synth: String,
    pub rate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorAnswerResponse {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub currency_key: String,
    pub synth: String,
    pub rate: String,
    pub round_id: String,
    pub aggregator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
