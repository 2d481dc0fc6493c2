//! `SeaORM` Entity prelude

pub use super::aggregator_answers::Entity as AggregatorAnswers;
pub use super::daily_snx_prices::Entity as DailySnxPrices;
pub use super::fifteen_minute_snx_prices::Entity as FifteenMinuteSnxPrices;
pub use super::latest_rates::Entity as LatestRates;
pub use super::rate_updates::Entity as RateUpdates;
pub use super::rates_updated::Entity as RatesUpdated;
pub use super::sync_status::Entity as SyncStatus;
