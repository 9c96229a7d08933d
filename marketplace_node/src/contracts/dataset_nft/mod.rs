//! DatasetNFT Marketplace Contract
//!
//! Mints tokens representing datasets and tracks per-wallet access rights:
//! ownership, lifetime purchases, and time-bounded rentals.
//!
//! # Invariants
//! - The current owner of a token always has access to it
//! - Lifetime purchases are never revoked, including across resale
//! - Renewing a still-active rental extends the expiry additively
//! - Every settlement returned by a payable operation pays out exactly the
//!   value the call received

pub mod abi;
pub mod core;
pub mod events;
pub mod types;

pub use self::core::{CallEffect, DatasetNft};
pub use self::events::{EventLog, EventRecord, MarketplaceEvent};
pub use self::types::{
    CallEnv, ContractError, DatasetParams, DatasetRecord, MetadataUpdate, Payout, Settlement,
};
