use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Decimals of the chain's native currency (wei per ether).
const ETHER_DECIMALS: u32 = 18;

/// Converts an integer wei amount into a decimal ether amount.
pub fn wei_to_ether(value: U256) -> Result<Decimal, ConversionError> {
    let value_str = value.to_string();
    let wei = Decimal::from_str(&value_str)
        .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))?;
    let divisor = Decimal::from(10u64.pow(ETHER_DECIMALS));

    Ok((wei / divisor).normalize())
}

/// Converts a decimal ether amount into integer wei.
///
/// Rejects negative amounts and amounts finer than one wei rather than
/// rounding silently.
pub fn ether_to_wei(value: Decimal) -> Result<U256, ConversionError> {
    if value.is_sign_negative() {
        return Err(ConversionError::Negative);
    }

    let multiplier = Decimal::from(10u64.pow(ETHER_DECIMALS));
    let wei = value
        .checked_mul(multiplier)
        .ok_or(ConversionError::Overflow)?
        .normalize();
    if wei.fract() != Decimal::ZERO {
        return Err(ConversionError::SubWeiPrecision);
    }

    U256::from_dec_str(&wei.to_string()).map_err(|e| ConversionError::InvalidDecimal(e.to_string()))
}

pub fn string_to_address(addr_str: &str) -> Result<Address, ConversionError> {
    Address::from_str(addr_str).map_err(|e| ConversionError::InvalidAddress(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),

    #[error("Overflow in conversion")]
    Overflow,

    #[error("Negative amount cannot be represented in wei")]
    Negative,

    #[error("Amount is finer than one wei")]
    SubWeiPrecision,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wei_to_ether_round_values() {
        let wei = U256::from_dec_str("300000000000000000").unwrap();
        assert_eq!(wei_to_ether(wei).unwrap().to_string(), "0.3");

        let wei = U256::from_dec_str("25000000000000000").unwrap();
        assert_eq!(wei_to_ether(wei).unwrap().to_string(), "0.025");

        assert_eq!(wei_to_ether(U256::zero()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_ether_to_wei_round_trip() {
        let ether = Decimal::from_str("0.3").unwrap();
        let wei = ether_to_wei(ether).unwrap();
        assert_eq!(wei, U256::from_dec_str("300000000000000000").unwrap());
        assert_eq!(wei_to_ether(wei).unwrap(), ether);
    }

    #[test]
    fn test_ether_to_wei_rejects_sub_wei_precision() {
        // 19 fractional digits of ether cannot land on an integer wei amount
        let too_fine = Decimal::from_str("0.0000000000000000001").unwrap();
        assert!(matches!(
            ether_to_wei(too_fine),
            Err(ConversionError::SubWeiPrecision)
        ));
    }

    #[test]
    fn test_ether_to_wei_rejects_negative() {
        let negative = Decimal::from_str("-1").unwrap();
        assert!(matches!(
            ether_to_wei(negative),
            Err(ConversionError::Negative)
        ));
    }

    #[test]
    fn test_string_to_address() {
        let addr = string_to_address("0x0000000000000000000000000000000000000001").unwrap();
        assert_eq!(addr, Address::from_low_u64_be(1));

        assert!(string_to_address("not-an-address").is_err());
    }
}
