use alloy::primitives::{Address, B256, FixedBytes, I256, U256};

/// Transaction and block metadata attached to every indexed log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub tx_hash: B256,
    pub log_index: u64,
    pub block_number: u64,
    /// Block timestamp in seconds
    pub timestamp: u64,
    pub from: Address,
    pub gas_price: U256,
}

/// Place of a log in chain order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventPosition {
    pub block_number: u64,
    pub log_index: u64,
}

impl EventContext {
    /// Transaction hash as 0x-prefixed lowercase hex
    pub fn tx_hash_hex(&self) -> String {
        format!("{:?}", self.tx_hash)
    }

    pub fn position(&self) -> EventPosition {
        EventPosition {
            block_number: self.block_number,
            log_index: self.log_index,
        }
    }
}

/// `RatesUpdated(bytes32[] currencyKeys, uint256[] newRates)` emitted by ExchangeRates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatesUpdatedEvent {
    pub context: EventContext,
    pub currency_keys: Vec<FixedBytes<32>>,
    pub new_rates: Vec<U256>,
}

/// `AnswerUpdated(int256 current, uint256 roundId, uint256 updatedAt)` emitted by an aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerUpdatedEvent {
    pub context: EventContext,
    /// Address of the aggregator contract that emitted the log
    pub aggregator: Address,
    pub current: I256,
    pub round_id: U256,
    pub updated_at: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateEvent {
    RatesUpdated(RatesUpdatedEvent),
    AnswerUpdated(AnswerUpdatedEvent),
}

impl RateEvent {
    pub fn context(&self) -> &EventContext {
        match self {
            RateEvent::RatesUpdated(event) => &event.context,
            RateEvent::AnswerUpdated(event) => &event.context,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RateEvent::RatesUpdated(_) => "RatesUpdated",
            RateEvent::AnswerUpdated(_) => "AnswerUpdated",
        }
    }
}
