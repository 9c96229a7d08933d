//! Account ledger with snapshot-based atomic call semantics.
//!
//! Every marketplace call that moves value runs between `create_snapshot` and
//! either `commit_snapshot` or `revert_to_snapshot`, so a failed transfer
//! rolls the balances back to exactly the pre-call state.

use crate::types::Address;
use anyhow::{anyhow, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Ledger mutation failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Debit larger than the account balance
    #[error("insufficient funds for {address}: required {required} wei, available {available} wei")]
    InsufficientFunds {
        address: Address,
        required: u128,
        available: u128,
    },
    /// Credit would overflow the account balance
    #[error("balance overflow for {0}")]
    BalanceOverflow(Address),
    /// Snapshot id was never created or already resolved
    #[error("snapshot not found: {0}")]
    UnknownSnapshot(u64),
}

/// Wei balances by account, plus in-flight snapshots.
///
/// Snapshots are transient call-scoped state and are not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    balances: HashMap<Address, u128>,
    #[serde(skip)]
    snapshots: HashMap<u64, HashMap<Address, u128>>,
    #[serde(skip)]
    next_snapshot_id: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an account balance. Unknown accounts hold zero.
    pub fn balance_of(&self, address: &Address) -> u128 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Number of accounts with a recorded balance.
    pub fn account_count(&self) -> usize {
        self.balances.len()
    }

    /// Credit an account.
    pub fn credit(&mut self, address: &Address, amount: u128) -> Result<(), LedgerError> {
        let balance = self.balances.entry(address.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(address.clone()))?;
        Ok(())
    }

    /// Debit an account, failing when funds are insufficient.
    pub fn debit(&mut self, address: &Address, amount: u128) -> Result<(), LedgerError> {
        let available = self.balance_of(address);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                address: address.clone(),
                required: amount,
                available,
            });
        }
        self.balances.insert(address.clone(), available - amount);
        Ok(())
    }

    /// Move value between accounts. A zero-amount transfer is a no-op.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        // Check both sides before mutating so a failure cannot strand funds.
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                address: from.clone(),
                required: amount,
                available,
            });
        }
        self.balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(to.clone()))?;
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        Ok(())
    }

    /// Create a new snapshot of all balances for atomic operations.
    pub fn create_snapshot(&mut self) -> u64 {
        let snapshot_id = self.next_snapshot_id;
        self.next_snapshot_id += 1;
        debug!("creating ledger snapshot {snapshot_id}");
        self.snapshots.insert(snapshot_id, self.balances.clone());
        snapshot_id
    }

    /// Commit a snapshot (drop it, keeping the current balances).
    pub fn commit_snapshot(&mut self, snapshot_id: u64) -> Result<(), LedgerError> {
        self.snapshots
            .remove(&snapshot_id)
            .map(|_| ())
            .ok_or(LedgerError::UnknownSnapshot(snapshot_id))
    }

    /// Revert balances to a snapshot and drop it.
    pub fn revert_to_snapshot(&mut self, snapshot_id: u64) -> Result<(), LedgerError> {
        debug!("reverting ledger to snapshot {snapshot_id}");
        let snapshot = self
            .snapshots
            .remove(&snapshot_id)
            .ok_or(LedgerError::UnknownSnapshot(snapshot_id))?;
        self.balances = snapshot;
        Ok(())
    }

    /// Export balances for checkpointing.
    pub fn export_accounts(&self) -> Result<Vec<u8>> {
        let serialized = bincode::serialize(&self.balances)?;
        Ok(serialized)
    }

    /// Import balances from a checkpoint, replacing the current set.
    pub fn import_accounts(&mut self, data: &[u8]) -> Result<()> {
        let imported: HashMap<Address, u128> =
            bincode::deserialize(data).map_err(|e| anyhow!("invalid account checkpoint: {e}"))?;
        self.balances = imported;
        Ok(())
    }

    /// Feed the balances into a state-root digest in deterministic order.
    pub fn digest_into(&self, hasher: &mut blake3::Hasher) {
        let mut accounts: Vec<(&Address, &u128)> = self.balances.iter().collect();
        accounts.sort_by_key(|(address, _)| *address);
        for (address, balance) in accounts {
            hasher.update(address.as_str().as_bytes());
            hasher.update(&balance.to_le_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    #[test]
    fn test_credit_and_debit() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr(1), 100).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 100);

        ledger.debit(&addr(1), 40).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 60);
    }

    #[test]
    fn test_debit_insufficient_funds() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr(1), 10).unwrap();

        let err = ledger.debit(&addr(1), 11).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                address: addr(1),
                required: 11,
                available: 10,
            }
        );
        // Balance untouched by the failed debit.
        assert_eq!(ledger.balance_of(&addr(1)), 10);
    }

    #[test]
    fn test_transfer_moves_value() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr(1), 100).unwrap();

        ledger.transfer(&addr(1), &addr(2), 30).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 70);
        assert_eq!(ledger.balance_of(&addr(2)), 30);
    }

    #[test]
    fn test_zero_transfer_is_noop() {
        let mut ledger = Ledger::new();
        ledger.transfer(&addr(1), &addr(2), 0).unwrap();
        assert_eq!(ledger.account_count(), 0);
    }

    #[test]
    fn test_snapshot_revert_restores_balances() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr(1), 100).unwrap();

        let snapshot = ledger.create_snapshot();
        ledger.transfer(&addr(1), &addr(2), 100).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 0);

        ledger.revert_to_snapshot(snapshot).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)), 100);
        assert_eq!(ledger.balance_of(&addr(2)), 0);
    }

    #[test]
    fn test_snapshot_commit_keeps_changes() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr(1), 100).unwrap();

        let snapshot = ledger.create_snapshot();
        ledger.transfer(&addr(1), &addr(2), 25).unwrap();
        ledger.commit_snapshot(snapshot).unwrap();

        assert_eq!(ledger.balance_of(&addr(2)), 25);
        assert_eq!(
            ledger.revert_to_snapshot(snapshot).unwrap_err(),
            LedgerError::UnknownSnapshot(snapshot)
        );
    }

    #[test]
    fn test_export_import_roundtrip() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr(1), 7).unwrap();
        ledger.credit(&addr(2), 11).unwrap();

        let checkpoint = ledger.export_accounts().unwrap();

        let mut restored = Ledger::new();
        restored.import_accounts(&checkpoint).unwrap();
        assert_eq!(restored.balance_of(&addr(1)), 7);
        assert_eq!(restored.balance_of(&addr(2)), 11);
    }

    #[test]
    fn test_digest_is_order_independent() {
        let mut a = Ledger::new();
        a.credit(&addr(1), 5).unwrap();
        a.credit(&addr(2), 9).unwrap();

        let mut b = Ledger::new();
        b.credit(&addr(2), 9).unwrap();
        b.credit(&addr(1), 5).unwrap();

        let mut ha = blake3::Hasher::new();
        let mut hb = blake3::Hasher::new();
        a.digest_into(&mut ha);
        b.digest_into(&mut hb);
        assert_eq!(ha.finalize(), hb.finalize());
    }
}
