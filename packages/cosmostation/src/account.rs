//! Accounts reported by the connected wallet.

use std::fmt::Display;

use crate::{Address, HasAddress};

/// Signing algorithm of a wallet account.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub enum Algo {
    /// Standard Cosmos accounts.
    #[serde(rename = "secp256k1")]
    Secp256k1,
    /// Ethermint-style accounts (Evmos, Injective, ...).
    #[serde(rename = "ethsecp256k1")]
    EthSecp256k1,
    /// Validator-style ed25519 keys.
    #[serde(rename = "ed25519")]
    Ed25519,
}

impl Display for Algo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            Algo::Secp256k1 => "secp256k1",
            Algo::EthSecp256k1 => "ethsecp256k1",
            Algo::Ed25519 => "ed25519",
        })
    }
}

/// An account controlled by the connected wallet.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub struct AccountData {
    /// Chain-specific bech32 address.
    pub address: Address,
    /// Compressed public key bytes. Empty when the wallet did not disclose it.
    #[serde(with = "crate::encoding::bytes")]
    pub pubkey: Vec<u8>,
    /// Algorithm the wallet signs with.
    pub algo: Algo,
}

impl HasAddress for AccountData {
    fn get_address(&self) -> Address {
        self.address
    }
}

/// Account entry returned by `cosmostation_wc_accounts_v1`.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmostationAccount {
    /// Raw address bytes.
    #[serde(with = "crate::encoding::bytes")]
    pub address: Vec<u8>,
    /// Algorithm string as reported by the wallet.
    pub algo: String,
    /// Bech32 form of the address.
    pub bech32_address: String,
    /// Whether the key lives on a Ledger device.
    #[serde(default)]
    pub is_nano_ledger: bool,
    /// Account name in the wallet.
    #[serde(default)]
    pub name: String,
    /// Compressed public key bytes.
    #[serde(with = "crate::encoding::bytes")]
    pub pub_key: Vec<u8>,
}
