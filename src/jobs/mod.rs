pub mod rates_sync;
