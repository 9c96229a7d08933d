/// Property-based and invariant tests for the DatasetNFT contract
/// state machine: access rules, settlement conservation, and rental
/// expiry arithmetic.
use marketplace_node::contracts::dataset_nft::{CallEnv, DatasetNft, DatasetParams};
use marketplace_node::types::{Address, TokenId, SECONDS_PER_DAY};
use proptest::prelude::*;
use std::collections::HashSet;

fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

fn params(name: &str, price: u128) -> DatasetParams {
    DatasetParams {
        name: name.to_string(),
        description: String::new(),
        category: "test".to_string(),
        data_format: "csv".to_string(),
        content_ref: "QmTestCid".to_string(),
        price,
    }
}

// Invariant 1: the current owner of every live token has access
fn invariant_owner_has_access(contract: &DatasetNft, now: u64) -> bool {
    contract.datasets().iter().all(|record| {
        contract
            .owner_of(record.token_id)
            .map(|owner| contract.has_access(record.token_id, owner, now))
            .unwrap_or(false)
    })
}

// Invariant 2: every wallet with a purchase entry for a live token has access
fn invariant_purchasers_keep_access(
    contract: &DatasetNft,
    wallets: &[Address],
    now: u64,
) -> bool {
    wallets.iter().all(|wallet| {
        contract.purchases_of(wallet).iter().all(|&token_id| {
            contract.dataset(token_id).is_err() || contract.has_access(token_id, wallet, now)
        })
    })
}

// Invariant 3: token ids are unique and never exceed the mint counter
fn invariant_token_ids_bounded(contract: &DatasetNft) -> bool {
    let mut seen = HashSet::new();
    for record in contract.datasets() {
        if record.token_id == 0 || record.token_id > contract.total_minted() {
            return false;
        }
        if !seen.insert(record.token_id) {
            return false;
        }
    }
    true
}

// Invariant 4: a payable call settles exactly the value it received
fn invariant_settlement_conserves_value(settlement_total: u128, value: u128) -> bool {
    settlement_total == value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_contract() -> (DatasetNft, Vec<TokenId>) {
        let mut contract = DatasetNft::deploy(addr(1), SECONDS_PER_DAY);
        let creator = CallEnv::new(addr(2), 1_000);
        let a = contract
            .create_dataset(&creator, params("alpha", 100))
            .unwrap()
            .0;
        let b = contract
            .create_dataset(&creator, params("beta", 200))
            .unwrap()
            .0;
        (contract, vec![a, b])
    }

    #[test]
    fn test_owner_access_holds_after_mint() {
        let (contract, _) = seeded_contract();
        assert!(invariant_owner_has_access(&contract, 5_000));
        assert!(invariant_token_ids_bounded(&contract));
    }

    #[test]
    fn test_purchaser_access_holds_after_resale() {
        let (mut contract, tokens) = seeded_contract();
        let buyer = addr(3);

        contract
            .purchase_dataset(&CallEnv::payable(buyer.clone(), 100, 2_000), tokens[0])
            .unwrap();
        contract
            .transfer_dataset(&CallEnv::new(addr(2), 3_000), addr(4), tokens[0])
            .unwrap();

        assert!(invariant_owner_has_access(&contract, 3_000));
        assert!(invariant_purchasers_keep_access(
            &contract,
            &[buyer],
            3_000
        ));
    }

    #[test]
    fn test_purchaser_invariant_vacuous_after_burn() {
        let (mut contract, tokens) = seeded_contract();
        let buyer = addr(3);

        contract
            .purchase_dataset(&CallEnv::payable(buyer.clone(), 100, 2_000), tokens[0])
            .unwrap();
        contract
            .delete_dataset(&CallEnv::new(addr(2), 3_000), tokens[0])
            .unwrap();

        // The entry survives but the burned token grants nothing.
        assert_eq!(contract.purchases_of(&buyer), &[tokens[0]]);
        assert!(!contract.has_access(tokens[0], &buyer, 3_000));
        assert!(invariant_purchasers_keep_access(
            &contract,
            &[buyer],
            3_000
        ));
    }

    #[test]
    fn test_token_ids_stay_bounded_across_burns() {
        let (mut contract, tokens) = seeded_contract();
        contract
            .delete_dataset(&CallEnv::new(addr(2), 3_000), tokens[0])
            .unwrap();
        let creator = CallEnv::new(addr(2), 4_000);
        contract.create_dataset(&creator, params("gamma", 1)).unwrap();

        // Burned ids are never reused.
        assert_eq!(contract.total_minted(), 3);
        assert!(invariant_token_ids_bounded(&contract));
    }

    #[test]
    fn test_settlement_conservation_on_purchase() {
        let (mut contract, tokens) = seeded_contract();
        let env = CallEnv::payable(addr(3), 150, 2_000);
        let effect = contract.purchase_dataset(&env, tokens[0]).unwrap();
        assert!(invariant_settlement_conserves_value(
            effect.settlement.total(),
            env.value
        ));
    }
}

// Property-based tests using proptest
proptest! {
    #[test]
    fn prop_purchase_refunds_exact_overpayment(
        price in 1u128..1_000_000u128,
        overpay in 0u128..1_000_000u128,
    ) {
        let mut contract = DatasetNft::deploy(addr(1), SECONDS_PER_DAY);
        let creator = CallEnv::new(addr(2), 1_000);
        let (token_id, _) = contract.create_dataset(&creator, params("d", price)).unwrap();

        let env = CallEnv::payable(addr(3), price + overpay, 2_000);
        let effect = contract.purchase_dataset(&env, token_id).unwrap();

        prop_assert!(invariant_settlement_conserves_value(
            effect.settlement.total(),
            env.value
        ));
        // Seller gets the price; anything extra flows back to the buyer.
        prop_assert_eq!(effect.settlement.payouts[0].amount, price);
        let refund: u128 = effect
            .settlement
            .payouts
            .iter()
            .filter(|p| p.to == addr(3))
            .map(|p| p.amount)
            .sum();
        prop_assert_eq!(refund, overpay);
    }

    #[test]
    fn prop_rental_expiry_matches_days(
        days in 1u64..10_000u64,
        now in 0u64..1_000_000_000u64,
        price_per_day in 1u128..1_000_000u128,
    ) {
        let mut contract = DatasetNft::deploy(addr(1), SECONDS_PER_DAY);
        let creator = CallEnv::new(addr(2), 1_000);
        let (token_id, _) = contract.create_dataset(&creator, params("d", 1)).unwrap();
        contract
            .set_rental_price(&CallEnv::new(addr(2), 1_000), token_id, price_per_day)
            .unwrap();

        let cost = price_per_day * u128::from(days);
        let env = CallEnv::payable(addr(3), cost, now);
        contract.rent_dataset(&env, token_id, days).unwrap();

        let expiry = contract.rental_expiry_of(token_id, &addr(3));
        prop_assert_eq!(expiry, now + days * SECONDS_PER_DAY);
        prop_assert!(contract.has_access(token_id, &addr(3), expiry - 1));
        prop_assert!(!contract.has_access(token_id, &addr(3), expiry));
    }

    #[test]
    fn prop_minting_preserves_owner_access(count in 1usize..20usize, now in 0u64..1_000_000u64) {
        let mut contract = DatasetNft::deploy(addr(1), SECONDS_PER_DAY);
        for i in 0..count {
            let creator = CallEnv::new(addr(2 + (i as u64 % 3)), now);
            contract
                .create_dataset(&creator, params(&format!("d{i}"), 1))
                .unwrap();
        }
        prop_assert!(invariant_owner_has_access(&contract, now));
        prop_assert!(invariant_token_ids_bounded(&contract));
        prop_assert_eq!(contract.total_minted(), count as u64);
    }
}
