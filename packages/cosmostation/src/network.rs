use std::{fmt::Display, str::FromStr};

use serde::de::Visitor;

use crate::{error::BuilderError, gas_price::GasPrice, AddressHrp, ClientBuilder};

/// Networks the Cosmostation example dApps talk to out of the box.
///
/// Any other chain works too through [ClientBuilder::new]; this list only
/// saves typing.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum DappNetwork {
    JunoMainnet,
    CosmoshubMainnet,
    StationTestnet,
}

impl DappNetwork {
    /// Every built-in network.
    pub const ALL: [DappNetwork; 3] = [
        DappNetwork::JunoMainnet,
        DappNetwork::CosmoshubMainnet,
        DappNetwork::StationTestnet,
    ];

    /// Construct a [ClientBuilder] for this network with default values.
    pub fn builder(self) -> ClientBuilder {
        let mut builder = ClientBuilder::new(
            self.chain_id(),
            self.denom(),
            self.get_address_hrp(),
            self.lcd_url(),
        );
        builder.set_gas_price(Some(self.gas_price()));
        builder.set_gas_limit(Some(self.default_gas_limit()));
        builder
    }

    /// Chain ID for the network
    pub fn chain_id(self) -> &'static str {
        match self {
            DappNetwork::JunoMainnet => "juno-1",
            DappNetwork::CosmoshubMainnet => "cosmoshub-4",
            DappNetwork::StationTestnet => "station-testnet",
        }
    }

    /// Native coin used for fees and transfers
    pub fn denom(self) -> &'static str {
        match self {
            DappNetwork::JunoMainnet => "ujuno",
            DappNetwork::CosmoshubMainnet => "uatom",
            DappNetwork::StationTestnet => "uiss",
        }
    }

    /// Default LCD endpoint
    pub fn lcd_url(self) -> &'static str {
        match self {
            DappNetwork::JunoMainnet => "https://lcd-juno.itastakers.com",
            DappNetwork::CosmoshubMainnet => "https://api-cosmoshub-ia.cosmosia.notional.ventures",
            DappNetwork::StationTestnet => "https://lcd-office.cosmostation.io/station-testnet",
        }
    }

    /// HRP of account addresses on this network.
    pub fn get_address_hrp(self) -> AddressHrp {
        match self {
            DappNetwork::JunoMainnet => AddressHrp::from_static("juno"),
            DappNetwork::CosmoshubMainnet | DappNetwork::StationTestnet => {
                AddressHrp::from_static("cosmos")
            }
        }
    }

    /// Gas price used when none is configured.
    ///
    /// The hub and station examples pay zero fees.
    pub fn gas_price(self) -> GasPrice {
        match self {
            // 0.01ujuno
            DappNetwork::JunoMainnet => GasPrice::from_atomics(10u128.pow(16), "ujuno"),
            DappNetwork::CosmoshubMainnet => GasPrice::from_atomics(0, "uatom"),
            DappNetwork::StationTestnet => GasPrice::from_atomics(0, "uiss"),
        }
    }

    /// Gas limit used when a transaction does not specify one.
    pub fn default_gas_limit(self) -> u64 {
        match self {
            DappNetwork::JunoMainnet => 500_000,
            DappNetwork::CosmoshubMainnet | DappNetwork::StationTestnet => 80_000,
        }
    }

    /// CW20 token contract used by the Juno example, if any.
    pub fn default_contract(self) -> Option<&'static str> {
        match self {
            DappNetwork::JunoMainnet => {
                Some("juno1vaeuky9hqacenay9nmuualugvv54tdhyt2wsvhnjasx9s946hhmqaq3kh7")
            }
            DappNetwork::CosmoshubMainnet | DappNetwork::StationTestnet => None,
        }
    }

    /// Stable string form, as used on the command line and in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            DappNetwork::JunoMainnet => "juno-mainnet",
            DappNetwork::CosmoshubMainnet => "cosmoshub-mainnet",
            DappNetwork::StationTestnet => "station-testnet",
        }
    }
}

impl Display for DappNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DappNetwork {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DappNetwork::ALL
            .into_iter()
            .find(|network| network.as_str() == s)
            .ok_or_else(|| BuilderError::UnknownNetwork {
                network: s.to_owned(),
            })
    }
}

impl serde::Serialize for DappNetwork {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for DappNetwork {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(DappNetworkVisitor)
    }
}

struct DappNetworkVisitor;

impl Visitor<'_> for DappNetworkVisitor {
    type Value = DappNetwork;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("DappNetwork")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        DappNetwork::from_str(v).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for network in DappNetwork::ALL {
            assert_eq!(network.as_str().parse::<DappNetwork>().unwrap(), network);
        }
        "osmosis-mainnet".parse::<DappNetwork>().unwrap_err();
    }

    #[test]
    fn juno_defaults() {
        let builder = DappNetwork::JunoMainnet.builder();
        assert_eq!(builder.chain_id(), "juno-1");
        assert_eq!(builder.gas_price().unwrap().to_string(), "0.01ujuno");
        assert_eq!(builder.gas_limit(), 500_000);
        let contract: crate::Address = DappNetwork::JunoMainnet
            .default_contract()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(contract.hrp(), builder.hrp());
    }

    #[test]
    fn zero_fee_examples() {
        let fee = crate::gas_price::calculate_fee(
            80_000,
            &DappNetwork::StationTestnet.gas_price(),
        );
        assert_eq!(fee.amount[0].amount, "0");
        assert_eq!(fee.amount[0].denom, "uiss");
    }
}
