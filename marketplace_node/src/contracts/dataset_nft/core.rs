//! The DatasetNFT contract state machine.
//!
//! Pure, synchronous state transitions. Operations validate, mutate, and
//! return a [`CallEffect`] carrying the emitted event plus the settlement the
//! runtime must apply against the ledger. Operations never touch balances
//! directly.
//!
//! Access rule: a wallet has access to a token iff it is the current owner,
//! OR its purchase list contains the token, OR its rental expiry for the
//! token is strictly in the future. Access is never revoked on resale.

use super::events::MarketplaceEvent;
use super::types::{
    CallEnv, ContractError, DatasetParams, DatasetRecord, MetadataUpdate, Settlement,
};
use crate::types::{Address, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of a successful contract operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEffect {
    pub event: MarketplaceEvent,
    pub settlement: Settlement,
}

impl CallEffect {
    fn emit(event: MarketplaceEvent) -> Self {
        Self {
            event,
            settlement: Settlement::none(),
        }
    }

    fn settle(event: MarketplaceEvent, settlement: Settlement) -> Self {
        Self { event, settlement }
    }
}

/// DatasetNFT contract state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetNft {
    /// Deployer; sole caller allowed to sweep the contract account
    contract_owner: Address,
    /// Rental day length in seconds (86 400 outside of tests)
    seconds_per_day: u64,
    /// Next token id to mint; ids start at 1
    next_token_id: TokenId,
    /// Dataset records by token id
    records: HashMap<TokenId, DatasetRecord>,
    /// Current NFT owner by token id
    owners: HashMap<TokenId, Address>,
    /// Per-day rental price by token id; absent means not rentable
    rental_prices: HashMap<TokenId, u128>,
    /// Rental expiry timestamps by token id, then renter
    rental_expiries: HashMap<TokenId, HashMap<Address, u64>>,
    /// Lifetime purchases by wallet. Repeat purchases append duplicate
    /// entries; the access rule is idempotent over them.
    purchases: HashMap<Address, Vec<TokenId>>,
}

impl DatasetNft {
    /// Deploy a fresh contract instance.
    pub fn deploy(contract_owner: Address, seconds_per_day: u64) -> Self {
        Self {
            contract_owner,
            seconds_per_day,
            next_token_id: 1,
            records: HashMap::new(),
            owners: HashMap::new(),
            rental_prices: HashMap::new(),
            rental_expiries: HashMap::new(),
            purchases: HashMap::new(),
        }
    }

    pub fn contract_owner(&self) -> &Address {
        &self.contract_owner
    }

    /// Mint a token for a new dataset and store its record.
    pub fn create_dataset(
        &mut self,
        env: &CallEnv,
        params: DatasetParams,
    ) -> Result<(TokenId, CallEffect), ContractError> {
        Self::require_not_payable(env)?;
        if params.name.is_empty() {
            return Err(ContractError::EmptyField("name"));
        }
        if params.content_ref.is_empty() {
            return Err(ContractError::EmptyField("content_ref"));
        }

        let token_id = self.next_token_id;
        self.next_token_id += 1;

        let price = params.price;
        self.records.insert(
            token_id,
            DatasetRecord {
                token_id,
                name: params.name,
                description: params.description,
                category: params.category,
                data_format: params.data_format,
                content_ref: params.content_ref,
                price,
                creator: env.caller.clone(),
                created_at: env.now,
            },
        );
        self.owners.insert(token_id, env.caller.clone());

        let effect = CallEffect::emit(MarketplaceEvent::DatasetCreated {
            token_id,
            creator: env.caller.clone(),
            price,
        });
        Ok((token_id, effect))
    }

    /// Buy lifetime access. Forwards the exact price to the current owner and
    /// refunds any excess value to the caller.
    pub fn purchase_dataset(
        &mut self,
        env: &CallEnv,
        token_id: TokenId,
    ) -> Result<CallEffect, ContractError> {
        let price = self.record(token_id)?.price;
        let seller = self.owner_of(token_id)?.clone();

        if price == 0 {
            return Err(ContractError::NotForSale(token_id));
        }
        if seller == env.caller {
            return Err(ContractError::SelfPurchase(token_id));
        }
        if env.value < price {
            return Err(ContractError::InsufficientPayment {
                required: price,
                provided: env.value,
            });
        }
        let refund = env.value - price;

        // Deliberately no dedup: repeat purchases append repeat entries.
        self.purchases
            .entry(env.caller.clone())
            .or_default()
            .push(token_id);

        let settlement = Settlement::none()
            .pay(seller.clone(), price)
            .pay(env.caller.clone(), refund);
        let effect = CallEffect::settle(
            MarketplaceEvent::DatasetPurchased {
                token_id,
                buyer: env.caller.clone(),
                seller,
                price,
            },
            settlement,
        );
        Ok(effect)
    }

    /// Set the per-day rental price. Zero disables rental.
    pub fn set_rental_price(
        &mut self,
        env: &CallEnv,
        token_id: TokenId,
        price_per_day: u128,
    ) -> Result<CallEffect, ContractError> {
        Self::require_not_payable(env)?;
        self.require_owner(env, token_id)?;

        if price_per_day == 0 {
            self.rental_prices.remove(&token_id);
        } else {
            self.rental_prices.insert(token_id, price_per_day);
        }

        Ok(CallEffect::emit(MarketplaceEvent::RentalPriceSet {
            token_id,
            price_per_day,
        }))
    }

    /// Rent time-bounded access. Renewing a still-active rental extends the
    /// expiry additively; an expired one resets to `now + duration`.
    pub fn rent_dataset(
        &mut self,
        env: &CallEnv,
        token_id: TokenId,
        days: u64,
    ) -> Result<CallEffect, ContractError> {
        self.record(token_id)?;
        if days == 0 {
            return Err(ContractError::ZeroRentalDays);
        }
        let price_per_day = self
            .rental_prices
            .get(&token_id)
            .copied()
            .ok_or(ContractError::NotRentable(token_id))?;

        let total = price_per_day
            .checked_mul(u128::from(days))
            .ok_or(ContractError::RentalOverflow)?;
        if env.value < total {
            return Err(ContractError::InsufficientPayment {
                required: total,
                provided: env.value,
            });
        }
        let refund = env.value - total;

        let duration = days
            .checked_mul(self.seconds_per_day)
            .ok_or(ContractError::RentalOverflow)?;
        let owner = self.owner_of(token_id)?.clone();

        let expiries = self.rental_expiries.entry(token_id).or_default();
        let current = expiries.get(&env.caller).copied().unwrap_or(0);
        let base = if current > env.now { current } else { env.now };
        let expires_at = base
            .checked_add(duration)
            .ok_or(ContractError::RentalOverflow)?;
        expiries.insert(env.caller.clone(), expires_at);

        let settlement = Settlement::none()
            .pay(owner.clone(), total)
            .pay(env.caller.clone(), refund);
        Ok(CallEffect::settle(
            MarketplaceEvent::DatasetRented {
                token_id,
                renter: env.caller.clone(),
                owner,
                expires_at,
                amount_paid: total,
            },
            settlement,
        ))
    }

    /// Change the lifetime purchase price.
    pub fn update_purchase_price(
        &mut self,
        env: &CallEnv,
        token_id: TokenId,
        new_price: u128,
    ) -> Result<CallEffect, ContractError> {
        Self::require_not_payable(env)?;
        self.require_owner(env, token_id)?;

        if let Some(record) = self.records.get_mut(&token_id) {
            record.price = new_price;
        }

        Ok(CallEffect::emit(MarketplaceEvent::PriceUpdated {
            token_id,
            new_price,
        }))
    }

    /// Apply a partial metadata update. Provided fields must be non-empty.
    pub fn update_dataset_metadata(
        &mut self,
        env: &CallEnv,
        token_id: TokenId,
        update: MetadataUpdate,
    ) -> Result<CallEffect, ContractError> {
        Self::require_not_payable(env)?;
        self.require_owner(env, token_id)?;

        if matches!(update.name.as_deref(), Some("")) {
            return Err(ContractError::EmptyField("name"));
        }
        if matches!(update.content_ref.as_deref(), Some("")) {
            return Err(ContractError::EmptyField("content_ref"));
        }

        if let Some(record) = self.records.get_mut(&token_id) {
            if let Some(name) = update.name {
                record.name = name;
            }
            if let Some(description) = update.description {
                record.description = description;
            }
            if let Some(category) = update.category {
                record.category = category;
            }
            if let Some(data_format) = update.data_format {
                record.data_format = data_format;
            }
            if let Some(content_ref) = update.content_ref {
                record.content_ref = content_ref;
            }
        }

        Ok(CallEffect::emit(MarketplaceEvent::MetadataUpdated {
            token_id,
        }))
    }

    /// Transfer the NFT to another wallet. Prior purchasers and active
    /// renters keep their access.
    pub fn transfer_dataset(
        &mut self,
        env: &CallEnv,
        to: Address,
        token_id: TokenId,
    ) -> Result<CallEffect, ContractError> {
        Self::require_not_payable(env)?;
        self.require_owner(env, token_id)?;
        if to.is_zero() {
            return Err(ContractError::TransferToZeroAddress);
        }

        self.owners.insert(token_id, to.clone());

        Ok(CallEffect::emit(MarketplaceEvent::Transfer {
            from: env.caller.clone(),
            to,
            token_id,
        }))
    }

    /// Burn the token and drop its record, rental price, and expiries.
    /// Purchase lists are left untouched; a burned token grants access to
    /// nobody.
    pub fn delete_dataset(
        &mut self,
        env: &CallEnv,
        token_id: TokenId,
    ) -> Result<CallEffect, ContractError> {
        Self::require_not_payable(env)?;
        self.require_owner(env, token_id)?;

        self.records.remove(&token_id);
        self.owners.remove(&token_id);
        self.rental_prices.remove(&token_id);
        self.rental_expiries.remove(&token_id);

        Ok(CallEffect::emit(MarketplaceEvent::DatasetDeleted {
            token_id,
        }))
    }

    /// Sweep the contract account to the contract owner. Covers dust from
    /// direct transfers; all marketplace flows settle to zero on their own.
    pub fn emergency_withdraw(
        &self,
        env: &CallEnv,
        contract_balance: u128,
    ) -> Result<CallEffect, ContractError> {
        Self::require_not_payable(env)?;
        if env.caller != self.contract_owner {
            return Err(ContractError::NotContractOwner(env.caller.clone()));
        }

        let settlement = Settlement::none().pay(self.contract_owner.clone(), contract_balance);
        Ok(CallEffect::settle(
            MarketplaceEvent::EmergencyWithdrawn {
                to: self.contract_owner.clone(),
                amount: contract_balance,
            },
            settlement,
        ))
    }

    // === Views ===

    /// All dataset records, ordered by token id.
    pub fn datasets(&self) -> Vec<&DatasetRecord> {
        let mut all: Vec<&DatasetRecord> = self.records.values().collect();
        all.sort_by_key(|r| r.token_id);
        all
    }

    /// A single record by token id.
    pub fn dataset(&self, token_id: TokenId) -> Result<&DatasetRecord, ContractError> {
        self.record(token_id)
    }

    /// Current NFT owner of a token.
    pub fn owner_of(&self, token_id: TokenId) -> Result<&Address, ContractError> {
        self.owners
            .get(&token_id)
            .ok_or(ContractError::UnknownToken(token_id))
    }

    /// Records currently owned by a wallet, ordered by token id.
    pub fn datasets_of(&self, holder: &Address) -> Vec<&DatasetRecord> {
        let mut held: Vec<&DatasetRecord> = self
            .owners
            .iter()
            .filter(|(_, owner)| *owner == holder)
            .filter_map(|(token_id, _)| self.records.get(token_id))
            .collect();
        held.sort_by_key(|r| r.token_id);
        held
    }

    /// A wallet's lifetime purchase list, duplicates included.
    pub fn purchases_of(&self, wallet: &Address) -> &[TokenId] {
        self.purchases
            .get(wallet)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Per-day rental price; zero when rental is disabled.
    pub fn rental_price_of(&self, token_id: TokenId) -> u128 {
        self.rental_prices.get(&token_id).copied().unwrap_or(0)
    }

    /// Rental expiry for a wallet; zero when it never rented the token.
    pub fn rental_expiry_of(&self, token_id: TokenId, wallet: &Address) -> u64 {
        self.rental_expiries
            .get(&token_id)
            .and_then(|e| e.get(wallet))
            .copied()
            .unwrap_or(0)
    }

    /// Number of tokens ever minted (burned tokens included).
    pub fn total_minted(&self) -> u64 {
        self.next_token_id - 1
    }

    /// Number of live (non-burned) tokens.
    pub fn token_count(&self) -> usize {
        self.records.len()
    }

    /// The access predicate: ownership, lifetime purchase, or an unexpired
    /// rental. Burned tokens grant access to nobody.
    pub fn has_access(&self, token_id: TokenId, wallet: &Address, now: u64) -> bool {
        if !self.records.contains_key(&token_id) {
            return false;
        }
        if self.owners.get(&token_id) == Some(wallet) {
            return true;
        }
        if self
            .purchases
            .get(wallet)
            .is_some_and(|ids| ids.contains(&token_id))
        {
            return true;
        }
        self.rental_expiry_of(token_id, wallet) > now
    }

    /// Feed the contract state into a state-root digest in deterministic
    /// order.
    pub fn digest_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(self.contract_owner.as_str().as_bytes());
        hasher.update(&self.next_token_id.to_le_bytes());

        for record in self.datasets() {
            hasher.update(&record.token_id.to_le_bytes());
            hasher.update(record.name.as_bytes());
            hasher.update(record.content_ref.as_bytes());
            hasher.update(&record.price.to_le_bytes());
            if let Some(owner) = self.owners.get(&record.token_id) {
                hasher.update(owner.as_str().as_bytes());
            }
            hasher.update(&self.rental_price_of(record.token_id).to_le_bytes());

            if let Some(expiries) = self.rental_expiries.get(&record.token_id) {
                let mut sorted: Vec<(&Address, &u64)> = expiries.iter().collect();
                sorted.sort_by_key(|(renter, _)| *renter);
                for (renter, expiry) in sorted {
                    hasher.update(renter.as_str().as_bytes());
                    hasher.update(&expiry.to_le_bytes());
                }
            }
        }

        let mut buyers: Vec<(&Address, &Vec<TokenId>)> = self.purchases.iter().collect();
        buyers.sort_by_key(|(wallet, _)| *wallet);
        for (wallet, ids) in buyers {
            hasher.update(wallet.as_str().as_bytes());
            for id in ids {
                hasher.update(&id.to_le_bytes());
            }
        }
    }

    fn record(&self, token_id: TokenId) -> Result<&DatasetRecord, ContractError> {
        self.records
            .get(&token_id)
            .ok_or(ContractError::UnknownToken(token_id))
    }

    fn require_owner(&self, env: &CallEnv, token_id: TokenId) -> Result<(), ContractError> {
        let owner = self.owner_of(token_id)?;
        if *owner != env.caller {
            return Err(ContractError::NotOwner {
                token_id,
                caller: env.caller.clone(),
            });
        }
        Ok(())
    }

    fn require_not_payable(env: &CallEnv) -> Result<(), ContractError> {
        if env.value > 0 {
            return Err(ContractError::NotPayable);
        }
        Ok(())
    }
}
