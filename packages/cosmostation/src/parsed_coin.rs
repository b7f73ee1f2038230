use std::{fmt::Display, str::FromStr};

use crate::{error::ParsedCoinError, sign_doc::AminoCoin, Coin};

/// Allows for parsing of a coin, it provides conversions to different coin types.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ParsedCoin {
    denom: String,
    amount: u128,
}

impl ParsedCoin {
    /// Build from parts.
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        ParsedCoin {
            denom: denom.into(),
            amount,
        }
    }

    #[allow(missing_docs)]
    pub fn denom(&self) -> &str {
        &self.denom
    }

    #[allow(missing_docs)]
    pub fn amount(&self) -> u128 {
        self.amount
    }
}

impl Display for ParsedCoin {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl From<ParsedCoin> for Coin {
    fn from(ParsedCoin { denom, amount }: ParsedCoin) -> Self {
        Coin {
            denom,
            amount: amount.to_string(),
        }
    }
}

impl From<ParsedCoin> for AminoCoin {
    fn from(ParsedCoin { denom, amount }: ParsedCoin) -> Self {
        AminoCoin::new(amount, denom)
    }
}

impl FromStr for ParsedCoin {
    type Err = ParsedCoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = || s.to_owned();
        if s.is_empty() {
            return Err(ParsedCoinError::Empty { input: input() });
        }

        let denom_first_index = s
            .char_indices()
            .find(|(_, char)| !char.is_ascii_digit())
            .map(|(index, _)| index);

        match denom_first_index {
            None => Err(ParsedCoinError::MissingDenom { input: input() }),
            Some(0) => Err(ParsedCoinError::MissingAmount { input: input() }),
            Some(denom_first_index) => {
                let amount = &s[..denom_first_index];
                let denom = &s[denom_first_index..];

                if denom
                    .chars()
                    .any(|char| !char.is_ascii_alphanumeric() && char != '/')
                {
                    return Err(ParsedCoinError::InvalidDenom { input: input() });
                }

                Ok(ParsedCoin {
                    denom: denom.to_owned(),
                    amount: amount
                        .parse()
                        .map_err(|source| ParsedCoinError::InvalidAmount {
                            input: input(),
                            source,
                        })?,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use quickcheck::Arbitrary;

    use super::*;

    fn parse_coin(s: &str) -> Result<ParsedCoin, ParsedCoinError> {
        s.parse()
    }

    #[test]
    fn sanity() {
        assert_eq!(parse_coin("1ujuno").unwrap(), ParsedCoin::new(1, "ujuno"));
        parse_coin("1.523ujuno").unwrap_err();
        assert_eq!(
            parse_coin("foobar").unwrap_err(),
            ParsedCoinError::MissingAmount {
                input: "foobar".to_owned()
            }
        );
        assert_eq!(
            parse_coin("123").unwrap_err(),
            ParsedCoinError::MissingDenom {
                input: "123".to_owned()
            }
        );
        parse_coin("123uiss!").unwrap_err();
        assert_eq!(
            parse_coin("123456factory/juno1abc/token").unwrap(),
            ParsedCoin::new(123456, "factory/juno1abc/token")
        );
    }

    #[derive(Clone, Debug)]
    struct DenomString(String);

    impl Arbitrary for DenomString {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            // See https://github.com/BurntSushi/quickcheck/issues/279
            let sizes = (3..20).collect::<Vec<_>>();
            let letters = ('a'..='z').collect::<Vec<_>>();
            DenomString(
                (1..*g.choose(&sizes).unwrap())
                    .map(|_| *g.choose(&letters).unwrap())
                    .collect(),
            )
        }
    }

    quickcheck::quickcheck! {
        fn roundtrip(amount: u128, denom: DenomString) -> bool {
            let expected = ParsedCoin::new(amount, denom.0);
            parse_coin(&expected.to_string()).unwrap() == expected
        }
    }
}
