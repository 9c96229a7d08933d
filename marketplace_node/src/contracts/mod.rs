pub mod dataset_nft;
