//! Static gas prices such as `0.01ujuno`, and fee calculation from them.

use std::{fmt::Display, str::FromStr};

use crate::{
    error::GasPriceError,
    sign_doc::{AminoCoin, StdFee},
};

const DECIMALS: u32 = 18;
const ONE: u128 = 10u128.pow(DECIMALS);

/// Price of a single unit of gas in a given denom.
///
/// The amount is kept as a fixed point value with 18 fractional digits so
/// that fee calculation never goes through floating point.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GasPrice {
    atomics: u128,
    denom: String,
}

impl GasPrice {
    /// Build from a price already scaled by 10^18.
    pub fn from_atomics(atomics: u128, denom: impl Into<String>) -> Self {
        GasPrice {
            atomics,
            denom: denom.into(),
        }
    }

    /// The denom fees are paid in.
    pub fn denom(&self) -> &str {
        &self.denom
    }

    /// Fee amount for the given gas limit, rounded up.
    pub fn fee_amount(&self, gas_limit: u64) -> u128 {
        let gas = u128::from(gas_limit);
        let whole = gas.saturating_mul(self.atomics / ONE);
        let frac = gas * (self.atomics % ONE);
        whole.saturating_add(frac.div_ceil(ONE))
    }
}

/// Build a [StdFee] for the given gas limit.
pub fn calculate_fee(gas_limit: u64, gas_price: &GasPrice) -> StdFee {
    StdFee::new(
        vec![AminoCoin::new(
            gas_price.fee_amount(gas_limit),
            gas_price.denom.clone(),
        )],
        gas_limit,
    )
}

impl FromStr for GasPrice {
    type Err = GasPriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = || s.to_owned();
        if s.is_empty() {
            return Err(GasPriceError::Empty);
        }
        let split = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
            .map(|(idx, _)| idx)
            .ok_or_else(|| GasPriceError::MissingDenom { input: input() })?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty() {
            return Err(GasPriceError::MissingAmount { input: input() });
        }

        let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));
        if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
            return Err(GasPriceError::InvalidAmount { input: input() });
        }
        if frac.len() > DECIMALS as usize {
            return Err(GasPriceError::TooPrecise {
                input: input(),
                max: DECIMALS,
            });
        }
        let parse = |digits: &str| -> Result<u128, GasPriceError> {
            if digits.is_empty() {
                Ok(0)
            } else {
                digits
                    .parse()
                    .map_err(|_| GasPriceError::InvalidAmount { input: input() })
            }
        };
        let frac_scale = 10u128.pow(DECIMALS - frac.len() as u32);
        let atomics = parse(whole)?
            .checked_mul(ONE)
            .and_then(|whole| whole.checked_add(parse(frac).ok()? * frac_scale))
            .ok_or_else(|| GasPriceError::InvalidAmount { input: input() })?;

        Ok(GasPrice {
            atomics,
            denom: denom.to_owned(),
        })
    }
}

impl Display for GasPrice {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let whole = self.atomics / ONE;
        let frac = self.atomics % ONE;
        if frac == 0 {
            write!(f, "{whole}{}", self.denom)
        } else {
            let frac = format!("{frac:018}");
            write!(f, "{whole}.{}{}", frac.trim_end_matches('0'), self.denom)
        }
    }
}

impl serde::Serialize for GasPrice {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for GasPrice {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(s: &str) -> GasPrice {
        s.parse().unwrap()
    }

    #[test]
    fn juno_execute_fee() {
        let fee = calculate_fee(500000, &price("0.01ujuno"));
        assert_eq!(fee.gas, "500000");
        assert_eq!(fee.amount, vec![AminoCoin::new(5000, "ujuno")]);
    }

    #[test]
    fn rounds_up() {
        assert_eq!(price("0.025uatom").fee_amount(80001), 2001);
        assert_eq!(price("0.025uatom").fee_amount(80000), 2000);
        assert_eq!(price("1uiss").fee_amount(7), 7);
        assert_eq!(price("0uiss").fee_amount(7), 0);
    }

    #[test]
    fn display() {
        assert_eq!(price("0.0100ujuno").to_string(), "0.01ujuno");
        assert_eq!(price("3uatom").to_string(), "3uatom");
        assert_eq!(price(".5uatom").to_string(), "0.5uatom");
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<GasPrice>(), Err(GasPriceError::Empty));
        assert!(matches!(
            "0.01".parse::<GasPrice>(),
            Err(GasPriceError::MissingDenom { .. })
        ));
        assert!(matches!(
            "ujuno".parse::<GasPrice>(),
            Err(GasPriceError::MissingAmount { .. })
        ));
        assert!(matches!(
            ".ujuno".parse::<GasPrice>(),
            Err(GasPriceError::InvalidAmount { .. })
        ));
        assert!(matches!(
            "0.0000000000000000001ujuno".parse::<GasPrice>(),
            Err(GasPriceError::TooPrecise { max: 18, .. })
        ));
    }

    quickcheck::quickcheck! {
        fn fee_never_undercharges(gas: u32, micro: u32) -> bool {
            let micro = micro % 1_000_000;
            let price = price(&format!("0.{micro:06}uatom"));
            let fee = price.fee_amount(gas.into());
            fee * 1_000_000 >= u128::from(gas) * u128::from(micro)
        }
    }
}
