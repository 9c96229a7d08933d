//! Marketplace events and the ordered event log.
//!
//! Contract operations return the event they emit; the node runtime appends
//! committed events here. Reverted calls never reach the log.

use crate::types::{Address, TokenId};
use serde::{Deserialize, Serialize};

/// Events emitted by the DatasetNFT contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MarketplaceEvent {
    DatasetCreated {
        token_id: TokenId,
        creator: Address,
        price: u128,
    },
    DatasetPurchased {
        token_id: TokenId,
        buyer: Address,
        seller: Address,
        price: u128,
    },
    DatasetRented {
        token_id: TokenId,
        renter: Address,
        owner: Address,
        expires_at: u64,
        amount_paid: u128,
    },
    RentalPriceSet {
        token_id: TokenId,
        price_per_day: u128,
    },
    PriceUpdated {
        token_id: TokenId,
        new_price: u128,
    },
    MetadataUpdated {
        token_id: TokenId,
    },
    Transfer {
        from: Address,
        to: Address,
        token_id: TokenId,
    },
    DatasetDeleted {
        token_id: TokenId,
    },
    EmergencyWithdrawn {
        to: Address,
        amount: u128,
    },
}

impl MarketplaceEvent {
    /// ABI event name for this variant.
    pub fn name(&self) -> &'static str {
        match self {
            MarketplaceEvent::DatasetCreated { .. } => "DatasetCreated",
            MarketplaceEvent::DatasetPurchased { .. } => "DatasetPurchased",
            MarketplaceEvent::DatasetRented { .. } => "DatasetRented",
            MarketplaceEvent::RentalPriceSet { .. } => "RentalPriceSet",
            MarketplaceEvent::PriceUpdated { .. } => "PriceUpdated",
            MarketplaceEvent::MetadataUpdated { .. } => "MetadataUpdated",
            MarketplaceEvent::Transfer { .. } => "Transfer",
            MarketplaceEvent::DatasetDeleted { .. } => "DatasetDeleted",
            MarketplaceEvent::EmergencyWithdrawn { .. } => "EmergencyWithdrawn",
        }
    }

    /// Token the event concerns, when it concerns one.
    pub fn token_id(&self) -> Option<TokenId> {
        match self {
            MarketplaceEvent::DatasetCreated { token_id, .. }
            | MarketplaceEvent::DatasetPurchased { token_id, .. }
            | MarketplaceEvent::DatasetRented { token_id, .. }
            | MarketplaceEvent::RentalPriceSet { token_id, .. }
            | MarketplaceEvent::PriceUpdated { token_id, .. }
            | MarketplaceEvent::MetadataUpdated { token_id }
            | MarketplaceEvent::Transfer { token_id, .. }
            | MarketplaceEvent::DatasetDeleted { token_id } => Some(*token_id),
            MarketplaceEvent::EmergencyWithdrawn { .. } => None,
        }
    }
}

/// A committed event with its position in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number, unique per node
    pub seq: u64,
    /// Ledger timestamp of the emitting call
    pub timestamp: u64,
    pub event: MarketplaceEvent,
}

/// Ordered in-memory event log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_seq: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed event, returning its sequence number.
    pub fn append(&mut self, timestamp: u64, event: MarketplaceEvent) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.push(EventRecord {
            seq,
            timestamp,
            event,
        });
        seq
    }

    /// All committed events in order.
    pub fn all(&self) -> &[EventRecord] {
        &self.records
    }

    /// Events concerning a single token.
    pub fn for_token(&self, token_id: TokenId) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|r| r.event.token_id() == Some(token_id))
            .collect()
    }

    /// Events of one kind, by ABI event name.
    pub fn of_kind(&self, name: &str) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|r| r.event.name() == name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    #[test]
    fn test_append_assigns_increasing_seq() {
        let mut log = EventLog::new();
        let a = log.append(
            10,
            MarketplaceEvent::DatasetCreated {
                token_id: 1,
                creator: addr(1),
                price: 5,
            },
        );
        let b = log.append(11, MarketplaceEvent::MetadataUpdated { token_id: 1 });
        assert_eq!((a, b), (0, 1));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_for_token_filters() {
        let mut log = EventLog::new();
        log.append(1, MarketplaceEvent::MetadataUpdated { token_id: 1 });
        log.append(2, MarketplaceEvent::MetadataUpdated { token_id: 2 });
        log.append(
            3,
            MarketplaceEvent::EmergencyWithdrawn {
                to: addr(9),
                amount: 100,
            },
        );

        assert_eq!(log.for_token(1).len(), 1);
        assert_eq!(log.for_token(2).len(), 1);
        assert_eq!(log.for_token(3).len(), 0);
    }

    #[test]
    fn test_of_kind_matches_abi_names() {
        let mut log = EventLog::new();
        log.append(
            1,
            MarketplaceEvent::Transfer {
                from: addr(1),
                to: addr(2),
                token_id: 7,
            },
        );
        assert_eq!(log.of_kind("Transfer").len(), 1);
        assert!(log.of_kind("DatasetPurchased").is_empty());
    }
}
