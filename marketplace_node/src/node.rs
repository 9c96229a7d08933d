//! Marketplace node runtime.
//!
//! Owns the ledger, the DatasetNFT contract, and the event log behind one
//! `RwLock`. Every mutating call takes the write lock, so calls execute in a
//! strict serial order; inside a call the ledger snapshot makes the whole
//! thing atomic. A revert restores contract state and balances exactly and
//! logs nothing.

use crate::config::NodeConfig;
use crate::contracts::dataset_nft::{
    CallEffect, CallEnv, ContractError, DatasetNft, DatasetParams, EventLog, EventRecord,
    MarketplaceEvent, MetadataUpdate,
};
use crate::ledger::state::{Ledger, LedgerError};
use crate::types::{Address, TokenId};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Why a marketplace call failed. Either way the call was a no-op.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The contract rejected the call
    #[error("reverted: {0}")]
    Reverted(#[from] ContractError),
    /// A value transfer failed while settling the call
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
}

/// Wall-clock unix timestamp for calls originating outside any test clock.
pub fn wall_clock_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Everything guarded by the node's transaction boundary.
#[derive(Debug)]
struct NodeInner {
    ledger: Ledger,
    contract: DatasetNft,
    events: EventLog,
    contract_address: Address,
}

impl NodeInner {
    /// Run one call body: move the attached value into the contract account,
    /// dispatch into the contract, then apply the settlement it returned.
    fn dispatch<T>(
        &mut self,
        env: &CallEnv,
        f: impl FnOnce(&CallEnv, &mut NodeInner) -> Result<(T, CallEffect), ContractError>,
    ) -> Result<(T, MarketplaceEvent), CallError> {
        if env.value > 0 {
            let contract_address = self.contract_address.clone();
            self.ledger
                .transfer(&env.caller, &contract_address, env.value)?;
        }
        let (value, effect) = f(env, self)?;
        let contract_address = self.contract_address.clone();
        for payout in &effect.settlement.payouts {
            self.ledger
                .transfer(&contract_address, &payout.to, payout.amount)?;
        }
        Ok((value, effect.event))
    }
}

/// Serializable node state for persistence
#[derive(Serialize, Deserialize)]
struct PersistedState {
    ledger: Ledger,
    contract: DatasetNft,
    events: EventLog,
}

/// The marketplace node.
pub struct MarketplaceNode {
    config: NodeConfig,
    inner: Arc<RwLock<NodeInner>>,
}

impl MarketplaceNode {
    /// Create a fresh node: deploy the contract and credit genesis balances.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let mut ledger = Ledger::new();
        for (address, amount) in &config.genesis_balances {
            ledger.credit(address, *amount)?;
        }
        let contract = DatasetNft::deploy(config.contract_owner.clone(), config.seconds_per_day);
        info!(
            "deployed DatasetNFT contract at {} (owner {})",
            config.contract_address, config.contract_owner
        );

        let inner = NodeInner {
            ledger,
            contract,
            events: EventLog::new(),
            contract_address: config.contract_address.clone(),
        };
        Ok(Self {
            config,
            inner: Arc::new(RwLock::new(inner)),
        })
    }

    /// Boot the node, loading persisted state when present.
    pub fn boot(config: NodeConfig) -> Result<Self> {
        if config.state_file().exists() {
            Self::load(config)
        } else {
            Self::new(config)
        }
    }

    /// Load a node from its persisted state file.
    fn load(config: NodeConfig) -> Result<Self> {
        let state_file = config.state_file();
        let data = fs::read(&state_file)
            .with_context(|| format!("failed to read state file {}", state_file.display()))?;
        let persisted: PersistedState = serde_json::from_slice(&data)
            .with_context(|| format!("invalid state file {}", state_file.display()))?;
        info!(
            "state loaded from {}: {} datasets, {} accounts",
            state_file.display(),
            persisted.contract.token_count(),
            persisted.ledger.account_count()
        );

        let inner = NodeInner {
            ledger: persisted.ledger,
            contract: persisted.contract,
            events: persisted.events,
            contract_address: config.contract_address.clone(),
        };
        Ok(Self {
            config,
            inner: Arc::new(RwLock::new(inner)),
        })
    }

    /// Persist the full node state to `<data_dir>/state.json`.
    pub async fn save(&self) -> Result<()> {
        let inner = self.inner.read().await;
        let persisted = PersistedState {
            ledger: inner.ledger.clone(),
            contract: inner.contract.clone(),
            events: inner.events.clone(),
        };
        drop(inner);

        let data = serde_json::to_vec_pretty(&persisted)?;
        fs::create_dir_all(&self.config.data_dir)?;
        fs::write(self.config.state_file(), data)?;
        info!("state saved to {}", self.config.state_file().display());
        Ok(())
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Run one contract call atomically: snapshot, dispatch, settle, and
    /// either commit plus log the emitted event, or revert with no state
    /// change at all.
    async fn execute<T>(
        &self,
        env: CallEnv,
        f: impl FnOnce(&CallEnv, &mut NodeInner) -> Result<(T, CallEffect), ContractError>,
    ) -> Result<T, CallError> {
        let mut inner = self.inner.write().await;
        let snapshot = inner.ledger.create_snapshot();
        let contract_backup = inner.contract.clone();

        match inner.dispatch(&env, f) {
            Ok((value, event)) => {
                inner.ledger.commit_snapshot(snapshot)?;
                let seq = inner.events.append(env.now, event);
                debug!("call committed, event seq {seq}");
                Ok(value)
            }
            Err(err) => {
                inner.contract = contract_backup;
                inner.ledger.revert_to_snapshot(snapshot)?;
                warn!("call from {} reverted: {err}", env.caller);
                Err(err)
            }
        }
    }

    // === Contract operations ===

    pub async fn create_dataset(
        &self,
        env: CallEnv,
        params: DatasetParams,
    ) -> Result<TokenId, CallError> {
        self.execute(env, |env, inner| inner.contract.create_dataset(env, params))
            .await
    }

    pub async fn purchase_dataset(&self, env: CallEnv, token_id: TokenId) -> Result<(), CallError> {
        self.execute(env, |env, inner| {
            inner
                .contract
                .purchase_dataset(env, token_id)
                .map(|effect| ((), effect))
        })
        .await
    }

    pub async fn set_rental_price(
        &self,
        env: CallEnv,
        token_id: TokenId,
        price_per_day: u128,
    ) -> Result<(), CallError> {
        self.execute(env, |env, inner| {
            inner
                .contract
                .set_rental_price(env, token_id, price_per_day)
                .map(|effect| ((), effect))
        })
        .await
    }

    /// Rent a dataset, returning the new expiry timestamp.
    pub async fn rent_dataset(
        &self,
        env: CallEnv,
        token_id: TokenId,
        days: u64,
    ) -> Result<u64, CallError> {
        self.execute(env, |env, inner| {
            let effect = inner.contract.rent_dataset(env, token_id, days)?;
            let expires_at = match effect.event {
                MarketplaceEvent::DatasetRented { expires_at, .. } => expires_at,
                _ => 0,
            };
            Ok((expires_at, effect))
        })
        .await
    }

    pub async fn update_purchase_price(
        &self,
        env: CallEnv,
        token_id: TokenId,
        new_price: u128,
    ) -> Result<(), CallError> {
        self.execute(env, |env, inner| {
            inner
                .contract
                .update_purchase_price(env, token_id, new_price)
                .map(|effect| ((), effect))
        })
        .await
    }

    pub async fn update_dataset_metadata(
        &self,
        env: CallEnv,
        token_id: TokenId,
        update: MetadataUpdate,
    ) -> Result<(), CallError> {
        self.execute(env, |env, inner| {
            inner
                .contract
                .update_dataset_metadata(env, token_id, update)
                .map(|effect| ((), effect))
        })
        .await
    }

    pub async fn transfer_dataset(
        &self,
        env: CallEnv,
        to: Address,
        token_id: TokenId,
    ) -> Result<(), CallError> {
        self.execute(env, |env, inner| {
            inner
                .contract
                .transfer_dataset(env, to, token_id)
                .map(|effect| ((), effect))
        })
        .await
    }

    pub async fn delete_dataset(&self, env: CallEnv, token_id: TokenId) -> Result<(), CallError> {
        self.execute(env, |env, inner| {
            inner
                .contract
                .delete_dataset(env, token_id)
                .map(|effect| ((), effect))
        })
        .await
    }

    /// Sweep the contract account to the contract owner, returning the swept
    /// amount.
    pub async fn emergency_withdraw(&self, env: CallEnv) -> Result<u128, CallError> {
        self.execute(env, |env, inner| {
            let balance = inner.ledger.balance_of(&inner.contract_address);
            inner
                .contract
                .emergency_withdraw(env, balance)
                .map(|effect| (balance, effect))
        })
        .await
    }

    // === Ledger access ===

    /// Credit an account out of thin air. Genesis/faucet only; not a
    /// contract operation.
    pub async fn fund_account(&self, address: &Address, amount: u128) -> Result<(), CallError> {
        let mut inner = self.inner.write().await;
        inner.ledger.credit(address, amount)?;
        info!("funded {address} with {amount} wei");
        Ok(())
    }

    pub async fn balance_of(&self, address: &Address) -> u128 {
        self.inner.read().await.ledger.balance_of(address)
    }

    /// Balance held by the contract account itself. Zero outside of direct
    /// transfers, since every call settles fully.
    pub async fn contract_balance(&self) -> u128 {
        let inner = self.inner.read().await;
        inner.ledger.balance_of(&inner.contract_address)
    }

    pub async fn account_count(&self) -> usize {
        self.inner.read().await.ledger.account_count()
    }

    // === Contract views ===

    pub async fn datasets(&self) -> Vec<crate::contracts::dataset_nft::DatasetRecord> {
        let inner = self.inner.read().await;
        inner.contract.datasets().into_iter().cloned().collect()
    }

    pub async fn dataset(
        &self,
        token_id: TokenId,
    ) -> Result<crate::contracts::dataset_nft::DatasetRecord, CallError> {
        let inner = self.inner.read().await;
        Ok(inner.contract.dataset(token_id)?.clone())
    }

    pub async fn datasets_of(
        &self,
        holder: &Address,
    ) -> Vec<crate::contracts::dataset_nft::DatasetRecord> {
        let inner = self.inner.read().await;
        inner
            .contract
            .datasets_of(holder)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn purchases_of(&self, wallet: &Address) -> Vec<TokenId> {
        self.inner.read().await.contract.purchases_of(wallet).to_vec()
    }

    pub async fn owner_of(&self, token_id: TokenId) -> Result<Address, CallError> {
        let inner = self.inner.read().await;
        Ok(inner.contract.owner_of(token_id)?.clone())
    }

    pub async fn rental_price_of(&self, token_id: TokenId) -> u128 {
        self.inner.read().await.contract.rental_price_of(token_id)
    }

    pub async fn rental_expiry_of(&self, token_id: TokenId, wallet: &Address) -> u64 {
        self.inner
            .read()
            .await
            .contract
            .rental_expiry_of(token_id, wallet)
    }

    pub async fn has_access(&self, token_id: TokenId, wallet: &Address, now: u64) -> bool {
        self.inner
            .read()
            .await
            .contract
            .has_access(token_id, wallet, now)
    }

    pub async fn total_minted(&self) -> u64 {
        self.inner.read().await.contract.total_minted()
    }

    // === Event log ===

    pub async fn events(&self) -> Vec<EventRecord> {
        self.inner.read().await.events.all().to_vec()
    }

    pub async fn events_for_token(&self, token_id: TokenId) -> Vec<EventRecord> {
        let inner = self.inner.read().await;
        inner
            .events
            .for_token(token_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Blake3 digest over the full node state, hex-encoded.
    pub async fn state_root(&self) -> String {
        let inner = self.inner.read().await;
        let mut hasher = blake3::Hasher::new();
        inner.ledger.digest_into(&mut hasher);
        inner.contract.digest_into(&mut hasher);
        hex::encode(hasher.finalize().as_bytes())
    }
}
