//! DatasetNFT contract types: records, call environment, settlements, and
//! revert reasons.

use crate::types::{Address, TokenId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A dataset record stored on mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Token id backing the record
    pub token_id: TokenId,
    /// Dataset name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Category label (e.g. "finance")
    pub category: String,
    /// File format label (e.g. "csv")
    pub data_format: String,
    /// Content-address pointer to the (encrypted) payload, typically an IPFS CID
    pub content_ref: String,
    /// Lifetime purchase price in wei; zero means not for sale
    pub price: u128,
    /// Wallet that minted the token
    pub creator: Address,
    /// Mint timestamp (unix seconds)
    pub created_at: u64,
}

/// Parameters for `create_dataset`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetParams {
    pub name: String,
    pub description: String,
    pub category: String,
    pub data_format: String,
    pub content_ref: String,
    /// Lifetime purchase price in wei; zero disables purchase
    pub price: u128,
}

/// Partial metadata update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub data_format: Option<String>,
    pub content_ref: Option<String>,
}

/// Per-call environment: who is calling, how much value rides on the call,
/// and the ledger timestamp the call executes at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEnv {
    pub caller: Address,
    /// Attached value in wei (`msg.value`)
    pub value: u128,
    /// Call timestamp in unix seconds
    pub now: u64,
}

impl CallEnv {
    /// Environment for a non-payable call.
    pub fn new(caller: Address, now: u64) -> Self {
        Self {
            caller,
            value: 0,
            now,
        }
    }

    /// Environment for a payable call carrying `value` wei.
    pub fn payable(caller: Address, value: u128, now: u64) -> Self {
        Self { caller, value, now }
    }
}

/// A single outgoing transfer from the contract account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub to: Address,
    pub amount: u128,
}

/// Outgoing transfers produced by a contract operation. The runtime applies
/// these against the ledger after the operation succeeds; any transfer
/// failure reverts the whole call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    pub payouts: Vec<Payout>,
}

impl Settlement {
    /// No value leaves the contract.
    pub fn none() -> Self {
        Self::default()
    }

    /// Append a payout, skipping zero amounts.
    pub fn pay(mut self, to: Address, amount: u128) -> Self {
        if amount > 0 {
            self.payouts.push(Payout { to, amount });
        }
        self
    }

    /// Sum of all payouts. Payable operations settle exactly the value they
    /// received, so this equals `env.value` on success.
    pub fn total(&self) -> u128 {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}

/// Revert reasons. Each maps to a distinct require-style failure of the
/// original contract surface; any of these aborts the call with no state
/// change.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("unknown token: {0}")]
    UnknownToken(TokenId),
    #[error("caller {caller} does not own token {token_id}")]
    NotOwner { token_id: TokenId, caller: Address },
    #[error("caller {0} is not the contract owner")]
    NotContractOwner(Address),
    #[error("token {0} is not for sale")]
    NotForSale(TokenId),
    #[error("owner cannot purchase their own dataset (token {0})")]
    SelfPurchase(TokenId),
    #[error("token {0} has no rental price set")]
    NotRentable(TokenId),
    #[error("rental duration must be at least one day")]
    ZeroRentalDays,
    #[error("insufficient payment: required {required} wei, provided {provided} wei")]
    InsufficientPayment { required: u128, provided: u128 },
    #[error("rental cost or duration overflows")]
    RentalOverflow,
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("cannot transfer to the zero address")]
    TransferToZeroAddress,
    #[error("call is not payable")]
    NotPayable,
}
