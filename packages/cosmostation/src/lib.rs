#![deny(missing_docs)]
//! Library for connecting dApps to the Cosmostation wallet and Cosmos chains over LCD
pub use account::{AccountData, Algo};
pub use address::{Address, AddressHrp, HasAddress, HasAddressHrp, RawAddress};
pub use client::{BaseAccount, LcdClient, SignMode, SignedTx, SigningClient, TxResponse};
pub use client_builder::ClientBuilder;
pub use cosmos_sdk_proto as proto;
pub use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
pub use error::{Error, SignerError, SignerErrorKind};
pub use extension::ExtensionProvider;
pub use gas_price::GasPrice;
pub use local::LocalKeyProvider;
pub use network::DappNetwork;
pub use parsed_coin::ParsedCoin;
pub use signer::{
    Environment, ExtensionSigner, MobileSigner, OfflineSigner, SignerBackends, WalletSigner,
};
pub use txbuilder::{TxBuilder, TxMessage};
pub use wallet::{SeedPhrase, Wallet};

mod address;
mod client;
mod client_builder;
mod encoding;
mod local;
mod network;
mod parsed_coin;
mod signer;
mod txbuilder;
mod wallet;

#[cfg(feature = "clap")]
pub mod clap;

#[cfg(feature = "config")]
pub mod config;

pub mod account;
pub mod error;
pub mod extension;
pub mod gas_price;
pub mod relay;
pub mod sign_doc;

/// A result type with our error type provided as the default.
pub type Result<T, E = Error> = std::result::Result<T, E>;
