//! Structured ABI for the DatasetNFT contract surface.
//!
//! Off-chain callers consume the contract ABI as a structured array of
//! function and event descriptors, never as an embedded string. The entries
//! here mirror the operations in [`super::core`] one to one; serializing
//! [`dataset_nft_abi`] with `serde_json` yields the canonical ABI array
//! shape.

use serde::{Deserialize, Serialize};

/// Function state mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    Nonpayable,
    Payable,
    View,
}

/// A function or event parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    pub name: String,
    /// Solidity type name, e.g. `uint256` or `tuple[]`
    #[serde(rename = "type")]
    pub kind: String,
    /// Tuple member descriptors, present only for `tuple` kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<AbiParam>>,
    /// Present only on event parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

impl AbiParam {
    fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            components: None,
            indexed: None,
        }
    }

    fn tuple(name: &str, kind: &str, components: Vec<AbiParam>) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            components: Some(components),
            indexed: None,
        }
    }

    fn event(name: &str, kind: &str, indexed: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            components: None,
            indexed: Some(indexed),
        }
    }
}

/// One descriptor in the ABI array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AbiEntry {
    Function {
        name: String,
        inputs: Vec<AbiParam>,
        outputs: Vec<AbiParam>,
        #[serde(rename = "stateMutability")]
        state_mutability: StateMutability,
    },
    Event {
        name: String,
        inputs: Vec<AbiParam>,
        anonymous: bool,
    },
}

impl AbiEntry {
    /// Descriptor name, function or event.
    pub fn name(&self) -> &str {
        match self {
            AbiEntry::Function { name, .. } | AbiEntry::Event { name, .. } => name,
        }
    }
}

fn function(
    name: &str,
    inputs: Vec<AbiParam>,
    outputs: Vec<AbiParam>,
    state_mutability: StateMutability,
) -> AbiEntry {
    AbiEntry::Function {
        name: name.to_string(),
        inputs,
        outputs,
        state_mutability,
    }
}

fn event(name: &str, inputs: Vec<AbiParam>) -> AbiEntry {
    AbiEntry::Event {
        name: name.to_string(),
        inputs,
        anonymous: false,
    }
}

/// Tuple members of a dataset record as returned by the read views.
fn dataset_components() -> Vec<AbiParam> {
    vec![
        AbiParam::new("tokenId", "uint256"),
        AbiParam::new("name", "string"),
        AbiParam::new("description", "string"),
        AbiParam::new("category", "string"),
        AbiParam::new("format", "string"),
        AbiParam::new("contentRef", "string"),
        AbiParam::new("price", "uint256"),
        AbiParam::new("creator", "address"),
        AbiParam::new("createdAt", "uint256"),
    ]
}

/// The full DatasetNFT ABI as a structured descriptor array.
pub fn dataset_nft_abi() -> Vec<AbiEntry> {
    vec![
        // === Mutating functions ===
        function(
            "createDataset",
            vec![
                AbiParam::new("name", "string"),
                AbiParam::new("description", "string"),
                AbiParam::new("category", "string"),
                AbiParam::new("format", "string"),
                AbiParam::new("contentRef", "string"),
                AbiParam::new("price", "uint256"),
            ],
            vec![AbiParam::new("tokenId", "uint256")],
            StateMutability::Nonpayable,
        ),
        function(
            "purchaseDataset",
            vec![AbiParam::new("tokenId", "uint256")],
            vec![],
            StateMutability::Payable,
        ),
        function(
            "setRentalPrice",
            vec![
                AbiParam::new("tokenId", "uint256"),
                AbiParam::new("pricePerDay", "uint256"),
            ],
            vec![],
            StateMutability::Nonpayable,
        ),
        function(
            "rentDataset",
            vec![
                AbiParam::new("tokenId", "uint256"),
                AbiParam::new("numberOfDays", "uint256"),
            ],
            vec![],
            StateMutability::Payable,
        ),
        function(
            "updatePurchasePrice",
            vec![
                AbiParam::new("tokenId", "uint256"),
                AbiParam::new("newPrice", "uint256"),
            ],
            vec![],
            StateMutability::Nonpayable,
        ),
        function(
            "updateDatasetMetadata",
            vec![
                AbiParam::new("tokenId", "uint256"),
                AbiParam::new("name", "string"),
                AbiParam::new("description", "string"),
                AbiParam::new("category", "string"),
                AbiParam::new("format", "string"),
                AbiParam::new("contentRef", "string"),
            ],
            vec![],
            StateMutability::Nonpayable,
        ),
        function(
            "transferDataset",
            vec![
                AbiParam::new("to", "address"),
                AbiParam::new("tokenId", "uint256"),
            ],
            vec![],
            StateMutability::Nonpayable,
        ),
        function(
            "deleteDataset",
            vec![AbiParam::new("tokenId", "uint256")],
            vec![],
            StateMutability::Nonpayable,
        ),
        function("emergencyWithdraw", vec![], vec![], StateMutability::Nonpayable),
        // === Read views ===
        function(
            "getAllDatasets",
            vec![],
            vec![AbiParam::tuple("", "tuple[]", dataset_components())],
            StateMutability::View,
        ),
        function(
            "getDataset",
            vec![AbiParam::new("tokenId", "uint256")],
            vec![AbiParam::tuple("", "tuple", dataset_components())],
            StateMutability::View,
        ),
        function(
            "getDatasetsByHolder",
            vec![AbiParam::new("holder", "address")],
            vec![AbiParam::tuple("", "tuple[]", dataset_components())],
            StateMutability::View,
        ),
        function(
            "getMyPurchases",
            vec![],
            vec![AbiParam::new("", "uint256[]")],
            StateMutability::View,
        ),
        function(
            "getRentalPrice",
            vec![AbiParam::new("tokenId", "uint256")],
            vec![AbiParam::new("", "uint256")],
            StateMutability::View,
        ),
        function(
            "getRentalExpiry",
            vec![
                AbiParam::new("tokenId", "uint256"),
                AbiParam::new("renter", "address"),
            ],
            vec![AbiParam::new("", "uint256")],
            StateMutability::View,
        ),
        function(
            "ownerOf",
            vec![AbiParam::new("tokenId", "uint256")],
            vec![AbiParam::new("", "address")],
            StateMutability::View,
        ),
        function(
            "hasAccess",
            vec![
                AbiParam::new("tokenId", "uint256"),
                AbiParam::new("wallet", "address"),
            ],
            vec![AbiParam::new("", "bool")],
            StateMutability::View,
        ),
        function(
            "totalMinted",
            vec![],
            vec![AbiParam::new("", "uint256")],
            StateMutability::View,
        ),
        // === Events ===
        event(
            "DatasetCreated",
            vec![
                AbiParam::event("tokenId", "uint256", true),
                AbiParam::event("creator", "address", true),
                AbiParam::event("price", "uint256", false),
            ],
        ),
        event(
            "DatasetPurchased",
            vec![
                AbiParam::event("tokenId", "uint256", true),
                AbiParam::event("buyer", "address", true),
                AbiParam::event("seller", "address", true),
                AbiParam::event("price", "uint256", false),
            ],
        ),
        event(
            "DatasetRented",
            vec![
                AbiParam::event("tokenId", "uint256", true),
                AbiParam::event("renter", "address", true),
                AbiParam::event("owner", "address", false),
                AbiParam::event("expiresAt", "uint256", false),
                AbiParam::event("amountPaid", "uint256", false),
            ],
        ),
        event(
            "RentalPriceSet",
            vec![
                AbiParam::event("tokenId", "uint256", true),
                AbiParam::event("pricePerDay", "uint256", false),
            ],
        ),
        event(
            "PriceUpdated",
            vec![
                AbiParam::event("tokenId", "uint256", true),
                AbiParam::event("newPrice", "uint256", false),
            ],
        ),
        event(
            "MetadataUpdated",
            vec![AbiParam::event("tokenId", "uint256", true)],
        ),
        event(
            "Transfer",
            vec![
                AbiParam::event("from", "address", true),
                AbiParam::event("to", "address", true),
                AbiParam::event("tokenId", "uint256", true),
            ],
        ),
        event(
            "DatasetDeleted",
            vec![AbiParam::event("tokenId", "uint256", true)],
        ),
        event(
            "EmergencyWithdrawn",
            vec![
                AbiParam::event("to", "address", true),
                AbiParam::event("amount", "uint256", false),
            ],
        ),
    ]
}
