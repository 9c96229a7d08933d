//! Dataset NFT marketplace node.
//!
//! Reimplements the on-chain `DatasetNFT` marketplace as an in-memory indexed
//! store guarded by the runtime's transaction boundary: an account ledger with
//! snapshot/revert, the marketplace contract state machine, an ordered event
//! log, and the structured ABI surface that off-chain callers read.

pub mod config;
pub mod contracts;
pub mod ledger;
pub mod node;
pub mod types;
