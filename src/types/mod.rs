pub mod conversions;

use ethers::types::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contracts::NftItem;
use crate::types::conversions::{wei_to_ether, ConversionError};

/// One displayable trait from a token metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftAttribute {
    pub trait_type: String,
    pub value: String,
}

/// Off-chain metadata resolved from `tokenURI`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMeta {
    pub name: String,
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub attributes: Vec<NftAttribute>,
}

// On-chain sale data joined with off-chain metadata (what consumers render)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nft {
    pub token_id: u64,
    pub price: Decimal, // In ether, not wei
    pub creator: Address,
    pub is_listed: bool,
    pub meta: NftMeta,
}

impl Nft {
    /// Joins one raw marketplace item with its resolved metadata.
    pub fn from_onchain(item: NftItem, meta: NftMeta) -> Result<Self, ConversionError> {
        let token_id = u64::try_from(item.token_id).map_err(|_| ConversionError::Overflow)?;

        Ok(Nft {
            token_id,
            price: wei_to_ether(item.price)?,
            creator: item.creator,
            is_listed: item.is_listed,
            meta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U256;
    use std::str::FromStr;

    fn sample_meta() -> NftMeta {
        NftMeta {
            name: "Sly Fox".to_string(),
            description: "A fox in a waistcoat".to_string(),
            image: "https://example.test/fox.png".to_string(),
            attributes: vec![NftAttribute {
                trait_type: "attack".to_string(),
                value: "70".to_string(),
            }],
        }
    }

    #[test]
    fn test_from_onchain_converts_price_to_ether() {
        let item = NftItem {
            token_id: U256::from(1u64),
            price: U256::from_dec_str("300000000000000000").unwrap(),
            creator: Address::repeat_byte(0x11),
            is_listed: true,
        };

        let nft = Nft::from_onchain(item, sample_meta()).unwrap();
        assert_eq!(nft.token_id, 1);
        assert_eq!(nft.price, Decimal::from_str("0.3").unwrap());
        assert!(nft.is_listed);
        assert_eq!(nft.meta.name, "Sly Fox");
    }

    #[test]
    fn test_from_onchain_rejects_token_id_beyond_u64() {
        let item = NftItem {
            token_id: U256::MAX,
            price: U256::zero(),
            creator: Address::zero(),
            is_listed: false,
        };

        assert!(Nft::from_onchain(item, sample_meta()).is_err());
    }

    #[test]
    fn test_metadata_attributes_default_to_empty() {
        let raw = r#"{"name":"n","description":"d","image":"i"}"#;
        let meta: NftMeta = serde_json::from_str(raw).unwrap();
        assert!(meta.attributes.is_empty());
    }
}
