// Contracts Module - Public ABIs Only

pub mod nft_market;

// Public exports
pub use nft_market::{NftItem, NftItemCreatedFilter, NftMarket, TransferFilter};
